// Shape normalization rules
// Resolves the polymorphic shorthand forms that configuration fields accept
// (bare name, single mapping, sequence of either) into canonical records

use crate::parser::error::{Diagnostic, Diagnostics};
use crate::parser::models::{BuildVariant, BuildVariantTaskUnit, TaskDef, TaskDependency, TaskSelector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

const TASK_FIELDS: &[&str] = &["name", "tags", "patchable", "priority", "depends_on", "requires"];
const VARIANT_FIELDS: &[&str] = &[
    "name",
    "display_name",
    "stepback",
    "batchtime",
    "modules",
    "run_on",
    "expansions",
    "tasks",
];
const VARIANT_TASK_FIELDS: &[&str] = &["name", "depends_on", "requires", "stepback", "priority"];

/// A field that accepts either a single string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringOrList {
    Single(String),
    List(Vec<String>),
}

impl StringOrList {
    pub(crate) fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::Single(value) => vec![value],
            StringOrList::List(values) => values,
        }
    }
}

/// Canonical record types that accept the bare-name shorthand.
///
/// The node's syntactic kind commits it to one interpretation: a string is
/// the shorthand, a mapping is the full form, and a sequence normalizes each
/// element independently. A mapping that decodes but lacks a name is a hard
/// error, never a silent fallback to a weaker shape.
pub(crate) trait ShorthandRecord: DeserializeOwned {
    /// Record kind as it appears in diagnostics.
    const KIND: &'static str;
    /// Keys the mapping form recognizes.
    const FIELDS: &'static [&'static str];

    fn from_name(name: String) -> Self;
    fn name(&self) -> &str;
}

impl ShorthandRecord for TaskSelector {
    const KIND: &'static str = "requirement";
    const FIELDS: &'static [&'static str] = &["name", "variant"];

    fn from_name(name: String) -> Self {
        TaskSelector::named(name)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl ShorthandRecord for TaskDependency {
    const KIND: &'static str = "dependency";
    const FIELDS: &'static [&'static str] = &["name", "variant", "status", "patch_optional"];

    fn from_name(name: String) -> Self {
        TaskDependency::named(name)
    }

    fn name(&self) -> &str {
        &self.selector.name
    }
}

/// Normalize a polymorphic field into a sequence of canonical records.
///
/// A sequence node normalizes each element independently and keeps document
/// order; any other node is treated as a single record. Malformed records
/// contribute one error each and are dropped without suppressing siblings.
pub(crate) fn records_from_value<T: ShorthandRecord>(
    node: &Value,
    path: &str,
    diags: &mut Diagnostics,
) -> Vec<T> {
    match node {
        Value::Sequence(items) => {
            let mut records = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if let Some(record) =
                    record_from_node(item, &format!("{}[{}]", path, index), diags)
                {
                    records.push(record);
                }
            }
            records
        }
        _ => record_from_node(node, path, diags).into_iter().collect(),
    }
}

fn record_from_node<T: ShorthandRecord>(
    node: &Value,
    path: &str,
    diags: &mut Diagnostics,
) -> Option<T> {
    match node {
        Value::String(name) if name.is_empty() => {
            diags.error(Diagnostic::new(format!("{} name is empty", T::KIND), path));
            None
        }
        Value::String(name) => Some(T::from_name(name.clone())),
        Value::Mapping(mapping) => {
            let record: T = match serde_yaml::from_value(node.clone()) {
                Ok(record) => record,
                Err(err) => {
                    diags.error(Diagnostic::new(format!("invalid {}: {}", T::KIND, err), path));
                    return None;
                }
            };
            if record.name().is_empty() {
                diags.error(Diagnostic::new(format!("{} is missing a name", T::KIND), path));
                return None;
            }
            warn_unknown_keys(mapping, T::FIELDS, path, diags);
            Some(record)
        }
        other => {
            diags.error(Diagnostic::new(
                format!(
                    "expected a {} name or mapping, found {}",
                    T::KIND,
                    kind_name(other)
                ),
                path,
            ));
            None
        }
    }
}

// =============================================================================
// Tasks
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default)]
    name: String,
    tags: Option<StringOrList>,
    patchable: Option<bool>,
    priority: Option<i64>,
    depends_on: Option<Value>,
    requires: Option<Value>,
}

/// Normalize one element of the top-level `tasks` list.
pub(crate) fn task_from_node(
    node: &Value,
    index: usize,
    diags: &mut Diagnostics,
) -> Option<TaskDef> {
    let position = format!("tasks[{}]", index);
    let Value::Mapping(mapping) = node else {
        diags.error(Diagnostic::new(
            format!("expected a task definition mapping, found {}", kind_name(node)),
            position,
        ));
        return None;
    };
    let raw: RawTask = match serde_yaml::from_value(node.clone()) {
        Ok(raw) => raw,
        Err(err) => {
            diags.error(Diagnostic::new(
                format!("invalid task definition: {}", err),
                position,
            ));
            return None;
        }
    };
    if raw.name.is_empty() {
        diags.error(Diagnostic::new("task is missing a name", position));
        return None;
    }

    let owner = format!("task '{}'", raw.name);
    warn_unknown_keys(mapping, TASK_FIELDS, &owner, diags);

    let depends_on = match raw.depends_on {
        Some(ref value) if !value.is_null() => {
            records_from_value(value, &format!("{}: depends_on", owner), diags)
        }
        _ => Vec::new(),
    };
    let requires = match raw.requires {
        Some(ref value) if !value.is_null() => {
            records_from_value(value, &format!("{}: requires", owner), diags)
        }
        _ => Vec::new(),
    };

    Some(TaskDef {
        name: raw.name,
        tags: raw.tags.map(StringOrList::into_vec).unwrap_or_default(),
        patchable: raw.patchable,
        priority: raw.priority.unwrap_or(0),
        depends_on,
        requires,
    })
}

// =============================================================================
// Build variants
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawVariant {
    #[serde(default)]
    name: String,
    display_name: Option<String>,
    stepback: Option<bool>,
    batchtime: Option<u32>,
    modules: Option<StringOrList>,
    run_on: Option<StringOrList>,
    #[serde(default)]
    expansions: HashMap<String, String>,
    tasks: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawVariantTask {
    #[serde(default)]
    name: String,
    depends_on: Option<Value>,
    requires: Option<Value>,
    stepback: Option<bool>,
    priority: Option<i64>,
}

/// Normalize one element of the top-level `buildvariants` list.
pub(crate) fn variant_from_node(
    node: &Value,
    index: usize,
    diags: &mut Diagnostics,
) -> Option<BuildVariant> {
    let position = format!("buildvariants[{}]", index);
    let Value::Mapping(mapping) = node else {
        diags.error(Diagnostic::new(
            format!("expected a build variant mapping, found {}", kind_name(node)),
            position,
        ));
        return None;
    };
    let raw: RawVariant = match serde_yaml::from_value(node.clone()) {
        Ok(raw) => raw,
        Err(err) => {
            diags.error(Diagnostic::new(
                format!("invalid build variant: {}", err),
                position,
            ));
            return None;
        }
    };
    if raw.name.is_empty() {
        diags.error(Diagnostic::new("build variant is missing a name", position));
        return None;
    }

    let owner = format!("variant '{}'", raw.name);
    warn_unknown_keys(mapping, VARIANT_FIELDS, &owner, diags);

    let tasks = match raw.tasks {
        Some(ref value) if !value.is_null() => variant_tasks_from_value(value, &owner, diags),
        _ => Vec::new(),
    };

    Some(BuildVariant {
        name: raw.name,
        display_name: raw.display_name,
        stepback: raw.stepback,
        batchtime: raw.batchtime,
        modules: raw.modules.map(StringOrList::into_vec).unwrap_or_default(),
        run_on: raw.run_on.map(StringOrList::into_vec).unwrap_or_default(),
        expansions: raw.expansions,
        tasks,
    })
}

/// Normalize a variant's `tasks` field into task units.
///
/// Accepts a single name (including the `*` wildcard), a single mapping, or
/// a sequence of either. Mapping forms recurse into the dependency and
/// requirement rules for their own override fields.
pub(crate) fn variant_tasks_from_value(
    node: &Value,
    owner: &str,
    diags: &mut Diagnostics,
) -> Vec<BuildVariantTaskUnit> {
    match node {
        Value::Sequence(items) => {
            let mut units = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if let Some(unit) =
                    unit_from_node(item, &format!("{}: tasks[{}]", owner, index), diags)
                {
                    units.push(unit);
                }
            }
            units
        }
        _ => unit_from_node(node, &format!("{}: tasks", owner), diags)
            .into_iter()
            .collect(),
    }
}

fn unit_from_node(
    node: &Value,
    path: &str,
    diags: &mut Diagnostics,
) -> Option<BuildVariantTaskUnit> {
    match node {
        Value::String(name) if name.is_empty() => {
            diags.error(Diagnostic::new("task name is empty", path));
            None
        }
        Value::String(name) => Some(BuildVariantTaskUnit::named(name.clone())),
        Value::Mapping(mapping) => {
            let raw: RawVariantTask = match serde_yaml::from_value(node.clone()) {
                Ok(raw) => raw,
                Err(err) => {
                    diags.error(Diagnostic::new(format!("invalid task entry: {}", err), path));
                    return None;
                }
            };
            if raw.name.is_empty() {
                diags.error(Diagnostic::new("task is missing a name", path));
                return None;
            }
            warn_unknown_keys(mapping, VARIANT_TASK_FIELDS, path, diags);

            let depends_on = match raw.depends_on {
                Some(ref value) if !value.is_null() => Some(records_from_value(
                    value,
                    &format!("{}: depends_on", path),
                    diags,
                )),
                _ => None,
            };
            let requires = match raw.requires {
                Some(ref value) if !value.is_null() => {
                    records_from_value(value, &format!("{}: requires", path), diags)
                }
                _ => Vec::new(),
            };

            Some(BuildVariantTaskUnit {
                name: raw.name,
                depends_on,
                requires,
                stepback: raw.stepback,
                priority: raw.priority.unwrap_or(0),
            })
        }
        other => {
            diags.error(Diagnostic::new(
                format!("expected a task name or mapping, found {}", kind_name(other)),
                path,
            ));
            None
        }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Warn about keys a mapping carries that the schema does not recognize.
///
/// Unrecognized keys are ignored by decoding, so this is the warning tier
/// only; it never affects success.
pub(crate) fn warn_unknown_keys(
    mapping: &Mapping,
    known: &[&str],
    path: &str,
    diags: &mut Diagnostics,
) {
    for key in mapping.keys() {
        let Some(key) = key.as_str() else {
            diags.warning(Diagnostic::new(
                format!("mapping key is not a string ({})", kind_name(key)),
                path,
            ));
            continue;
        };
        if known.contains(&key) {
            continue;
        }
        let mut diagnostic = Diagnostic::new(format!("unrecognized field '{}'", key), path);
        if let Some(expected) = nearest_field(key, known) {
            diagnostic = diagnostic.with_suggestion(format!("did you mean '{}'?", expected));
        }
        diags.warning(diagnostic);
    }
}

/// Match a misspelled key against the known set, ignoring case, underscores,
/// and dashes (catches `dependsOn`, `batch_time`, `runon`, and friends).
fn nearest_field<'a>(key: &str, known: &[&'a str]) -> Option<&'a str> {
    fn fold(name: &str) -> String {
        name.chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase()
    }

    let folded = fold(key);
    known.iter().copied().find(|k| fold(k) == folded)
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
