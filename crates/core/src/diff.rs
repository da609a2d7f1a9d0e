//! Field-level diff between two configuration snapshots.
//!
//! Both sides are flattened to dotted paths (`rag.temperature`,
//! `theme.primary_color`). Objects recurse; arrays, scalars and empty
//! objects are leaves compared by deep equality. Changes are emitted in the
//! canonical traversal order of the new side, followed by paths that only
//! exist on the old side.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a single field differs between the old and the new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl ChangeType {
    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a diff. Missing sides are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub change_type: ChangeType,
}

/// Flatten a JSON value into `(dotted_path, leaf)` pairs in canonical order.
///
/// A non-object root yields a single pair with an empty path.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(child, path, out);
            }
        }
        leaf => out.push((prefix, leaf.clone())),
    }
}

/// Compute the changes that turn `old` into `new`.
pub fn diff(old: &Value, new: &Value) -> Vec<FieldChange> {
    let old_flat = flatten(old);
    let new_flat = flatten(new);

    let old_index: BTreeMap<&str, &Value> =
        old_flat.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let new_index: BTreeMap<&str, &Value> =
        new_flat.iter().map(|(k, v)| (k.as_str(), v)).collect();

    let mut changes = Vec::new();

    for (field, new_value) in &new_flat {
        match old_index.get(field.as_str()) {
            None => changes.push(FieldChange {
                field: field.clone(),
                old_value: Value::Null,
                new_value: new_value.clone(),
                change_type: ChangeType::Added,
            }),
            Some(old_value) if *old_value != new_value => changes.push(FieldChange {
                field: field.clone(),
                old_value: (*old_value).clone(),
                new_value: new_value.clone(),
                change_type: ChangeType::Modified,
            }),
            Some(_) => {}
        }
    }

    for (field, old_value) in &old_flat {
        if !new_index.contains_key(field.as_str()) {
            changes.push(FieldChange {
                field: field.clone(),
                old_value: old_value.clone(),
                new_value: Value::Null,
                change_type: ChangeType::Removed,
            });
        }
    }

    changes
}
