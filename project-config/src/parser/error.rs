// Parser error types
// Fatal decode errors with location context, plus the accumulated
// error/warning tiers threaded through shape normalization

use serde::Serialize;
use std::fmt;

/// Fatal decode error: the buffer is not well-formed YAML.
///
/// Raised only by the document decoder. Everything downstream of a
/// successful decode accumulates [`Diagnostic`]s instead of failing.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Line number (1-indexed, 0 when unknown)
    pub line: usize,
    /// Column number (1-indexed, 0 when unknown)
    pub column: usize,
    /// Surrounding source lines rendered for display
    pub context: String,
    /// Optional suggestion for fixing the error
    pub suggestion: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            context: String::new(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Render a few lines of source around the error location into `context`.
    pub fn with_source_context(mut self, source: &str, context_lines: usize) -> Self {
        let lines: Vec<&str> = source.lines().collect();
        let start = self.line.saturating_sub(context_lines + 1);
        let end = (self.line + context_lines).min(lines.len());

        let mut context = String::new();
        for (i, line) in lines.iter().enumerate().take(end).skip(start) {
            let line_num = i + 1;
            let prefix = if line_num == self.line { ">" } else { " " };
            context.push_str(&format!("{} {:4} | {}\n", prefix, line_num, line));

            if line_num == self.line && self.column > 0 {
                let indicator = " ".repeat(self.column + 7) + "^";
                context.push_str(&format!("       | {}\n", indicator));
            }
        }

        self.context = context;
        self
    }

    /// Build from a `serde_yaml` decode failure against the original source.
    pub fn from_yaml_error(err: &serde_yaml::Error, source: &str) -> Self {
        let location = err.location();
        let (line, column) = location
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let message = trim_location_suffix(&err.to_string());
        let suggestion = suggest_syntax_fix(source, line);

        let mut parsed = ParseError::new(message, line, column).with_source_context(source, 2);
        parsed.suggestion = suggestion;
        parsed
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;
        writeln!(f, "  --> line {}:{}", self.line, self.column)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            write!(f, "{}", self.context)?;
        }

        if let Some(suggestion) = &self.suggestion {
            writeln!(f)?;
            writeln!(f, "help: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Strip the trailing " at line X column Y" serde_yaml appends; the location
/// is rendered separately.
fn trim_location_suffix(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(pos) => message[..pos].to_string(),
        None => message.to_string(),
    }
}

/// Suggest fixes for common YAML syntax mistakes.
fn suggest_syntax_fix(source: &str, line: usize) -> Option<String> {
    let error_line = source.lines().nth(line.saturating_sub(1)).unwrap_or("");

    if error_line.starts_with('\t') {
        return Some(
            "YAML prefers spaces over tabs for indentation. Replace tabs with spaces.".to_string(),
        );
    }

    None
}

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

// =============================================================================
// Accumulated diagnostics
// =============================================================================

/// One accumulated defect, attributed to the record it was found on.
///
/// `path` carries enough context (task/variant name or positional index,
/// plus the field) for an author to locate the problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Per-parse-call collector of errors and warnings.
///
/// Two independent tiers: errors gate success, warnings never do. Entries
/// keep traversal order. A collector belongs to exactly one parse call.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    pub fn warning(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        (self.errors, self.warnings)
    }
}
