// Project Configuration Library
// Shape-normalizing parser for timber project configurations: tolerant
// shorthand in, canonical intermediate representation plus diagnostics out

pub mod error;
pub mod parser;

// Re-export commonly used types
pub use error::{ConfigError, ConfigResult};

// Re-export parser types
pub use parser::{
    BuildVariant, BuildVariantTaskUnit, Diagnostic, IntermediateProject, ParseError, ParseOutcome,
    ParseResult, ProjectParser, TaskDef, TaskDependency, TaskSelector, ALL_TASKS,
};
