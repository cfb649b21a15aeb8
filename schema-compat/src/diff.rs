//! Structural diff between a schema and a merged version of it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keywords::{KeywordShape, shape_of};
use crate::utils::{deep_equal, join_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

/// One divergence. A missing side is `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub path: String,
    pub kind: DiffKind,
    pub expected: Value,
    pub actual: Value,
}

impl SchemaDiff {
    fn new(path: String, kind: DiffKind, expected: Value, actual: Value) -> Self {
        Self {
            path,
            kind,
            expected,
            actual,
        }
    }
}

/// Lists every keyword-level difference between `original` and `merged`.
///
/// Keywords holding sub-schemas are descended into; anything else that
/// differs is reported once with both raw values.
#[must_use]
pub fn compute_diffs(original: &Value, merged: &Value, path: &str) -> Vec<SchemaDiff> {
    let mut diffs = Vec::new();
    collect(original, merged, path, &mut diffs);
    diffs
}

fn collect(original: &Value, merged: &Value, path: &str, diffs: &mut Vec<SchemaDiff>) {
    let (Some(before), Some(after)) = (original.as_object(), merged.as_object()) else {
        if !deep_equal(original, merged) {
            diffs.push(SchemaDiff::new(
                path.to_owned(),
                DiffKind::Changed,
                original.clone(),
                merged.clone(),
            ));
        }
        return;
    };

    for (key, value) in before {
        let at = join_path(path, key);
        match after.get(key) {
            None => diffs.push(SchemaDiff::new(at, DiffKind::Removed, value.clone(), Value::Null)),
            Some(other) if deep_equal(value, other) => {}
            Some(other) => collect_keyword(key, value, other, &at, diffs),
        }
    }
    for (key, value) in after {
        if !before.contains_key(key) {
            diffs.push(SchemaDiff::new(
                join_path(path, key),
                DiffKind::Added,
                Value::Null,
                value.clone(),
            ));
        }
    }
}

fn collect_keyword(
    key: &str,
    original: &Value,
    merged: &Value,
    path: &str,
    diffs: &mut Vec<SchemaDiff>,
) {
    match (shape_of(key), original, merged) {
        (KeywordShape::SubSchema | KeywordShape::Items, Value::Object(_), Value::Object(_)) => {
            collect(original, merged, path, diffs);
        }
        (
            KeywordShape::SchemaMap | KeywordShape::Dependencies,
            Value::Object(before),
            Value::Object(after),
        ) => collect_entries(before, after, path, diffs),
        _ => diffs.push(SchemaDiff::new(
            path.to_owned(),
            DiffKind::Changed,
            original.clone(),
            merged.clone(),
        )),
    }
}

/// Entries of a schema map; string-array `dependencies` compare by value.
fn collect_entries(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    path: &str,
    diffs: &mut Vec<SchemaDiff>,
) {
    for (name, schema) in before {
        let at = join_path(path, name);
        match after.get(name) {
            None => diffs.push(SchemaDiff::new(at, DiffKind::Removed, schema.clone(), Value::Null)),
            Some(other) if deep_equal(schema, other) => {}
            Some(other) if schema.is_array() || other.is_array() => {
                diffs.push(SchemaDiff::new(at, DiffKind::Changed, schema.clone(), other.clone()));
            }
            Some(other) => collect(schema, other, &at, diffs),
        }
    }
    for (name, schema) in after {
        if !before.contains_key(name) {
            diffs.push(SchemaDiff::new(
                join_path(path, name),
                DiffKind::Added,
                Value::Null,
                schema.clone(),
            ));
        }
    }
}
