// Intermediate Project Builder
// Drives shape normalization across the whole configuration document and
// assembles the parse outcome

use crate::error::ConfigResult;
use crate::parser::error::{Diagnostic, Diagnostics, ParseError, ParseResult};
use crate::parser::models::IntermediateProject;
use crate::parser::shape;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

const PROJECT_FIELDS: &[&str] = &["display_name", "stepback", "batchtime", "tasks", "buildvariants"];

/// Result of one parse call.
///
/// The project is populated with every record that normalized cleanly even
/// when `success()` is false; consumers should only evaluate it when
/// `success()` is true and render the diagnostics to the author otherwise.
#[derive(Debug, Serialize)]
pub struct ParseOutcome {
    /// The normalized project, in document order
    pub project: IntermediateProject,
    /// Structural defects; any entry means the parse failed
    pub errors: Vec<Diagnostic>,
    /// Accepted-but-discouraged shapes; never affect success
    pub warnings: Vec<Diagnostic>,
}

impl ParseOutcome {
    /// True iff no errors were accumulated. Warnings never affect success.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parser for project configuration documents.
///
/// An instance holds the diagnostics and the in-progress project for exactly
/// one parse call; the entry points below create one internally, so
/// concurrent parses of independent documents are isolated by construction.
pub struct ProjectParser {
    project: IntermediateProject,
    diagnostics: Diagnostics,
}

impl ProjectParser {
    fn new() -> Self {
        Self {
            project: IntermediateProject::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Parse a configuration document from a byte buffer.
    ///
    /// The `Err` arm is exclusively the fatal decode error (the buffer is
    /// not well-formed YAML); every schema-level defect is accumulated in
    /// the returned outcome instead.
    pub fn parse(content: &[u8]) -> ParseResult<ParseOutcome> {
        let text = std::str::from_utf8(content)
            .map_err(|_| ParseError::new("configuration is not valid UTF-8", 0, 0))?;
        Self::parse_str(text)
    }

    /// Parse a configuration document from a string.
    pub fn parse_str(content: &str) -> ParseResult<ParseOutcome> {
        let document: Value = serde_yaml::from_str(content)
            .map_err(|err| ParseError::from_yaml_error(&err, content))?;

        let mut parser = ProjectParser::new();
        parser.build(&document);

        let ProjectParser {
            project,
            diagnostics,
        } = parser;
        let (errors, warnings) = diagnostics.into_parts();
        Ok(ParseOutcome {
            project,
            errors,
            warnings,
        })
    }

    /// Parse a configuration document from a file path.
    pub fn parse_file(path: impl AsRef<Path>) -> ConfigResult<ParseOutcome> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_str(&content)?)
    }

    fn build(&mut self, document: &Value) {
        // An empty document is an empty project, not a defect.
        if document.is_null() {
            return;
        }
        let Value::Mapping(mapping) = document else {
            self.diagnostics.error(Diagnostic::new(
                format!(
                    "expected the document root to be a mapping, found {}",
                    shape::kind_name(document)
                ),
                "project",
            ));
            return;
        };

        shape::warn_unknown_keys(mapping, PROJECT_FIELDS, "project", &mut self.diagnostics);

        self.project.display_name = self.scalar_field(document, "display_name");
        self.project.stepback = self.scalar_field(document, "stepback");
        self.project.batchtime = self.scalar_field(document, "batchtime");

        if let Some(tasks) = present(document.get("tasks")) {
            self.build_tasks(tasks);
        }
        if let Some(variants) = present(document.get("buildvariants")) {
            self.build_variants(variants);
        }
    }

    fn build_tasks(&mut self, node: &Value) {
        let Value::Sequence(items) = node else {
            self.diagnostics.error(Diagnostic::new(
                format!(
                    "'tasks' must be a list of task definitions, found {}",
                    shape::kind_name(node)
                ),
                "project",
            ));
            return;
        };
        for (index, item) in items.iter().enumerate() {
            if let Some(task) = shape::task_from_node(item, index, &mut self.diagnostics) {
                self.project.tasks.push(task);
            }
        }
    }

    fn build_variants(&mut self, node: &Value) {
        let Value::Sequence(items) = node else {
            self.diagnostics.error(Diagnostic::new(
                format!(
                    "'buildvariants' must be a list of build variants, found {}",
                    shape::kind_name(node)
                ),
                "project",
            ));
            return;
        };
        for (index, item) in items.iter().enumerate() {
            if let Some(variant) = shape::variant_from_node(item, index, &mut self.diagnostics) {
                self.project.buildvariants.push(variant);
            }
        }
    }

    /// Decode an optional scalar top-level field, accumulating (rather than
    /// propagating) a type mismatch so the rest of the document still parses.
    fn scalar_field<T: DeserializeOwned>(&mut self, document: &Value, key: &str) -> Option<T> {
        let value = present(document.get(key))?;
        match serde_yaml::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                self.diagnostics.error(Diagnostic::new(
                    format!("invalid '{}' value: {}", key, err),
                    "project",
                ));
                None
            }
        }
    }
}

/// A key set to `null` is treated the same as an absent key.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::models::{TaskDependency, TaskSelector};
    use std::io::Write;

    fn parse(yaml: &str) -> ParseOutcome {
        ProjectParser::parse_str(yaml).unwrap()
    }

    #[test]
    fn test_simple_project_parses() {
        let yaml = r#"
tasks:
- name: "compile"
- name: task0
- name: task1
  patchable: false
  tags: ["tag1", "tag2"]
  depends_on:
  - compile
  - name: "task0"
    status: "failed"
    patch_optional: true
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        assert_eq!(outcome.errors.len(), 0);
        assert_eq!(outcome.warnings.len(), 0);

        let task = &outcome.project.tasks[2];
        assert_eq!(task.patchable, Some(false));
        assert_eq!(task.tags, vec!["tag1".to_string(), "tag2".to_string()]);
        assert_eq!(task.depends_on[0].selector.name, "compile");
        assert!(!task.depends_on[0].patch_optional);
        assert_eq!(task.depends_on[1].selector.name, "task0");
        assert_eq!(task.depends_on[1].status.as_deref(), Some("failed"));
        assert!(task.depends_on[1].patch_optional);
    }

    #[test]
    fn test_single_dependency_shorthand() {
        let yaml = r#"
tasks:
- name: "compile"
- name: task0
- name: task1
  depends_on: task0
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        assert_eq!(outcome.warnings.len(), 0);
        assert_eq!(
            outcome.project.tasks[2].depends_on,
            vec![TaskDependency::named("task0")]
        );
    }

    #[test]
    fn test_empty_dependency_name_errors() {
        let yaml = r#"
tasks:
- name: "compile"
  depends_on: ""
"#;
        let outcome = parse(yaml);
        assert!(!outcome.success());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.warnings.len(), 0);
        assert!(outcome.project.tasks[0].depends_on.is_empty());
    }

    #[test]
    fn test_nameless_dependency_in_list_errors_once() {
        let yaml = r#"
tasks:
- name: "compile"
  depends_on:
  - name: "task1"
  - status: "failed"
"#;
        let outcome = parse(yaml);
        assert!(!outcome.success());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.warnings.len(), 0);
        // The valid sibling still normalizes.
        assert_eq!(
            outcome.project.tasks[0].depends_on,
            vec![TaskDependency::named("task1")]
        );
    }

    #[test]
    fn test_requirements_parse() {
        let yaml = r#"
tasks:
- name: task0
- name: task1
  requires:
  - name: "task0"
    variant: "v1"
  - "task2"
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        let requires = &outcome.project.tasks[1].requires;
        assert_eq!(requires[0].name, "task0");
        assert_eq!(requires[0].variant.as_deref(), Some("v1"));
        assert_eq!(requires[1].name, "task2");
        assert_eq!(requires[1].variant, None);
    }

    #[test]
    fn test_single_requirement_mapping() {
        let yaml = r#"
tasks:
- name: task1
  requires:
    name: "task0"
    variant: "v1"
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        assert_eq!(
            outcome.project.tasks[0].requires,
            vec![TaskSelector {
                name: "task0".to_string(),
                variant: Some("v1".to_string()),
            }]
        );
    }

    #[test]
    fn test_full_build_variant() {
        let yaml = r#"
buildvariants:
- name: "v1"
  stepback: true
  batchtime: 123
  modules: ["wow", "cool"]
  run_on:
  - "windows2000"
  tasks:
  - name: "t1"
  - name: "t2"
    depends_on:
    - name: "t3"
      variant: "v0"
    requires:
    - name: "t4"
    stepback: false
    priority: 77
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        assert_eq!(outcome.warnings.len(), 0);

        let bv = &outcome.project.buildvariants[0];
        assert_eq!(bv.name, "v1");
        assert_eq!(bv.stepback, Some(true));
        assert_eq!(bv.batchtime, Some(123));
        assert_eq!(bv.modules.len(), 2);
        assert_eq!(bv.run_on[0], "windows2000");
        assert_eq!(bv.tasks[0].name, "t1");
        assert_eq!(bv.tasks[1].name, "t2");
        assert_eq!(
            bv.tasks[1].depends_on.as_ref().unwrap()[0].selector,
            TaskSelector {
                name: "t3".to_string(),
                variant: Some("v0".to_string()),
            }
        );
        assert_eq!(bv.tasks[1].requires, vec![TaskSelector::named("t4")]);
        assert_eq!(bv.tasks[1].stepback, Some(false));
        assert_eq!(bv.tasks[1].priority, 77);
    }

    #[test]
    fn test_oneline_variant_tasks() {
        let yaml = r#"
buildvariants:
- name: "v1"
  tasks:
  - "t1"
  - name: "t2"
    depends_on: "t3"
    requires: "t4"
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());

        let bv = &outcome.project.buildvariants[0];
        assert_eq!(bv.tasks[0].name, "t1");
        assert!(!bv.tasks[0].has_overrides());
        assert_eq!(bv.tasks[1].name, "t2");
        assert_eq!(
            bv.tasks[1].depends_on,
            Some(vec![TaskDependency::named("t3")])
        );
        assert_eq!(bv.tasks[1].requires, vec![TaskSelector::named("t4")]);
    }

    #[test]
    fn test_wildcard_and_single_mapping_variant_tasks() {
        let yaml = r#"
buildvariants:
- name: "v1"
  tasks: "*"
- name: "v2"
  tasks:
    name: "t1"
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        assert_eq!(outcome.project.buildvariants.len(), 2);

        let v1 = &outcome.project.buildvariants[0];
        let v2 = &outcome.project.buildvariants[1];
        assert_eq!(v1.tasks.len(), 1);
        assert_eq!(v1.tasks[0].name, "*");
        assert!(!v1.tasks[0].has_overrides());
        assert_eq!(v2.tasks.len(), 1);
        assert_eq!(v2.tasks[0].name, "t1");
    }

    #[test]
    fn test_stepback_round_trips_three_states() {
        let unset = parse("buildvariants:\n- name: v1\n");
        assert_eq!(unset.project.buildvariants[0].stepback, None);

        let enabled = parse("buildvariants:\n- name: v1\n  stepback: true\n");
        assert_eq!(enabled.project.buildvariants[0].stepback, Some(true));

        let disabled = parse("buildvariants:\n- name: v1\n  stepback: false\n");
        assert_eq!(disabled.project.buildvariants[0].stepback, Some(false));
        assert_ne!(
            disabled.project.buildvariants[0].stepback,
            unset.project.buildvariants[0].stepback
        );
    }

    #[test]
    fn test_unit_stepback_override_survives_outer_defaults() {
        let yaml = r#"
stepback: true
buildvariants:
- name: "v1"
  stepback: true
  tasks:
  - name: "t1"
    stepback: false
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        assert_eq!(outcome.project.stepback, Some(true));
        assert_eq!(outcome.project.buildvariants[0].stepback, Some(true));
        assert_eq!(outcome.project.buildvariants[0].tasks[0].stepback, Some(false));
    }

    #[test]
    fn test_scalar_and_sequence_requires_are_equivalent() {
        let scalar = parse("tasks:\n- name: t1\n  requires: t2\n");
        let sequence = parse("tasks:\n- name: t1\n  requires: [t2]\n");
        let full = parse("tasks:\n- name: t1\n  requires:\n  - name: t2\n");

        assert_eq!(scalar.project, sequence.project);
        assert_eq!(sequence.project, full.project);
    }

    #[test]
    fn test_errors_do_not_stop_later_records() {
        let yaml = r#"
tasks:
- name: ""
- tags: [a]
- name: ok
buildvariants:
- name: "v1"
  tasks: "*"
"#;
        let outcome = parse(yaml);
        assert!(!outcome.success());
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.project.tasks.len(), 1);
        assert_eq!(outcome.project.tasks[0].name, "ok");
        assert_eq!(outcome.project.buildvariants.len(), 1);
    }

    #[test]
    fn test_project_level_defaults() {
        let yaml = r#"
display_name: "My Project"
stepback: false
batchtime: 60
tasks:
- name: t1
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        assert_eq!(outcome.project.display_name.as_deref(), Some("My Project"));
        assert_eq!(outcome.project.stepback, Some(false));
        assert_eq!(outcome.project.batchtime, Some(60));
    }

    #[test]
    fn test_bad_scalar_field_does_not_stop_tasks() {
        let yaml = r#"
batchtime: sixty
tasks:
- name: t1
"#;
        let outcome = parse(yaml);
        assert!(!outcome.success());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.project.batchtime, None);
        assert_eq!(outcome.project.tasks.len(), 1);
    }

    #[test]
    fn test_unknown_field_warns_but_passes() {
        let yaml = r#"
tasks:
- name: t1
  dependsOn: t2
"#;
        let outcome = parse(yaml);
        assert!(outcome.success());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(
            outcome.warnings[0].suggestion.as_deref(),
            Some("did you mean 'depends_on'?")
        );
    }

    #[test]
    fn test_empty_document_is_an_empty_project() {
        let outcome = parse("");
        assert!(outcome.success());
        assert!(outcome.project.tasks.is_empty());
        assert!(outcome.project.buildvariants.is_empty());
    }

    #[test]
    fn test_non_mapping_root_errors() {
        let outcome = parse("- a\n- b\n");
        assert!(!outcome.success());
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn test_tasks_of_wrong_kind_errors_but_variants_parse() {
        let yaml = r#"
tasks: 5
buildvariants:
- name: "v1"
"#;
        let outcome = parse(yaml);
        assert!(!outcome.success());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.project.buildvariants.len(), 1);
    }

    #[test]
    fn test_malformed_yaml_is_fatal() {
        let err = ProjectParser::parse_str("tasks:\n\t- name: t1\n").unwrap_err();
        assert!(err.line > 0);
        assert!(format!("{}", err).contains("error:"));
    }

    #[test]
    fn test_parse_accepts_bytes() {
        let outcome = ProjectParser::parse(b"tasks:\n- name: t1\n").unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.project.tasks[0].name, "t1");

        assert!(ProjectParser::parse(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "tasks:\n- name: t1\n  depends_on: t0\n").unwrap();

        let outcome = ProjectParser::parse_file(file.path()).unwrap();
        assert!(outcome.success());
        assert_eq!(
            outcome.project.tasks[0].depends_on,
            vec![TaskDependency::named("t0")]
        );

        assert!(ProjectParser::parse_file("/does/not/exist.yml").is_err());
    }
}
