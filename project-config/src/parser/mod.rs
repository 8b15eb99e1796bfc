// Parser module for project configurations
// Decodes the raw document, normalizes polymorphic field shapes, and
// accumulates a complete diagnostic report per parse call

pub mod error;
pub mod models;
pub mod project;
mod shape;

pub use error::{Diagnostic, Diagnostics, ParseError, ParseResult};
pub use models::{
    BuildVariant, BuildVariantTaskUnit, IntermediateProject, TaskDef, TaskDependency,
    TaskSelector, ALL_TASKS,
};
pub use project::{ParseOutcome, ProjectParser};
