// Crate-level error types
// Wraps I/O failures and fatal decode errors for file-based entry points

use crate::parser::ParseError;
use thiserror::Error;

/// Errors returned by the file-based configuration entry points.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read project configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
