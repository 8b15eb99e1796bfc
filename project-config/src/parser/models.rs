// Intermediate Project Data Models
// Canonical types produced by shape normalization, consumed by the evaluator

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wildcard task name selecting every task declared by the project.
///
/// The parser treats it as an ordinary name; expansion happens in the
/// evaluator.
pub const ALL_TASKS: &str = "*";

// =============================================================================
// Project
// =============================================================================

/// Root of the normalized configuration tree.
///
/// Built exactly once per parse call, in document order. Cross-references
/// (whether a dependency names a declared task, and so on) are not resolved
/// here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntermediateProject {
    /// Human-friendly project name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Project-wide stepback default; `None` means "use the global default"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stepback: Option<bool>,

    /// Project-wide batch interval in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batchtime: Option<u32>,

    /// Task declarations, in document order
    pub tasks: Vec<TaskDef>,

    /// Build variant declarations, in document order
    pub buildvariants: Vec<BuildVariant>,
}

impl IntermediateProject {
    /// Look up a task declaration by name.
    pub fn task(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Look up a build variant by name.
    pub fn variant(&self, name: &str) -> Option<&BuildVariant> {
        self.buildvariants.iter().find(|v| v.name == name)
    }
}

// =============================================================================
// Tasks
// =============================================================================

/// One task declaration from the `tasks` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskDef {
    /// Task name, always non-empty
    pub name: String,

    /// Selector tags, in document order
    pub tags: Vec<String>,

    /// Whether the task runs in patch builds; `None` means "inherit"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patchable: Option<bool>,

    /// Scheduling priority, defaults to 0
    pub priority: i64,

    /// Tasks that must finish before this one starts
    pub depends_on: Vec<TaskDependency>,

    /// Task/variant pairings that must be scheduled alongside this task
    pub requires: Vec<TaskSelector>,
}

/// A reference to another task, optionally scoped to a variant.
///
/// `variant: None` means "any/current variant". Equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSelector {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl TaskSelector {
    /// Selector for a task by name, unscoped.
    pub fn named(name: impl Into<String>) -> Self {
        TaskSelector {
            name: name.into(),
            variant: None,
        }
    }
}

/// A dependency edge: the selected task must finish (with `status`, when
/// given) before the depending task may run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    #[serde(flatten)]
    pub selector: TaskSelector,

    /// Required finish status; `None` means the default success status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Whether the dependency is waived in patch builds
    #[serde(default)]
    pub patch_optional: bool,
}

impl TaskDependency {
    /// Dependency on a task by name, with default status.
    pub fn named(name: impl Into<String>) -> Self {
        TaskDependency {
            selector: TaskSelector::named(name),
            ..Default::default()
        }
    }
}

// =============================================================================
// Build variants
// =============================================================================

/// One build variant declaration from the `buildvariants` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildVariant {
    /// Variant name, always non-empty
    pub name: String,

    /// Human-friendly variant name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Stepback override; `None` means "use the project default"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stepback: Option<bool>,

    /// Batch interval override in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batchtime: Option<u32>,

    /// Modules checked out alongside the source, in document order
    pub modules: Vec<String>,

    /// Distro/host tags the variant runs on, in document order
    pub run_on: Vec<String>,

    /// Variant-scoped expansion values
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expansions: HashMap<String, String>,

    /// Tasks selected by this variant, in document order
    pub tasks: Vec<BuildVariantTaskUnit>,
}

/// A task as it appears inside a build variant, possibly overriding the
/// task's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildVariantTaskUnit {
    /// Task name; may be [`ALL_TASKS`]
    pub name: String,

    /// Replaces the task's `depends_on` when present. `None` means "no
    /// override", which is distinct from an explicit empty list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<TaskDependency>>,

    /// Extra requirements for this task/variant pairing
    pub requires: Vec<TaskSelector>,

    /// Stepback override; `None` means "use the variant/project default"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stepback: Option<bool>,

    /// Scheduling priority override, defaults to 0
    pub priority: i64,
}

impl BuildVariantTaskUnit {
    /// Unit selecting a task by name with no overrides.
    pub fn named(name: impl Into<String>) -> Self {
        BuildVariantTaskUnit {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the unit overrides any of the task's defaults.
    pub fn has_overrides(&self) -> bool {
        self.depends_on.is_some()
            || !self.requires.is_empty()
            || self.stepback.is_some()
            || self.priority != 0
    }
}
