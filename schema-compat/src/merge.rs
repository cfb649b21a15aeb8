//! Merge engine: pre-merge conflict detection around a [`MergePrimitive`].
//!
//! The primitive intersects keyword by keyword. The engine first looks for
//! contradictions the primitive would paper over: `const`/`enum` clashes
//! anywhere in the paired tree, two formats with no known inclusion, and
//! closed objects that cannot host a property the other side requires.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::SchemaCaches;
use crate::diff::{DiffKind, SchemaDiff};
use crate::format::is_format_subset;
use crate::keywords::{PairedWalk, paired_positions};
use crate::primitive::{AllOfMerge, MergePrimitive};
use crate::utils::{display_path, join_path, type_names, types_overlap, values_equal};

/// Why two schemas have no common value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    #[error("conflicting const at {}: {left} vs {right}", display_path(.path))]
    ConstConflict { path: String, left: Value, right: Value },

    #[error("const {value} at {} is not one of {members}", display_path(.path))]
    ConstNotInEnum {
        path: String,
        value: Value,
        members: Value,
    },

    #[error("no common enum member at {}: {left} vs {right}", display_path(.path))]
    EmptyEnum { path: String, left: Value, right: Value },

    #[error("conflicting type at {}: {left} vs {right}", display_path(.path))]
    TypeConflict { path: String, left: Value, right: Value },

    #[error("value {value} at {} does not have type {types}", display_path(.path))]
    ValueOutsideType {
        path: String,
        value: Value,
        types: Value,
    },

    #[error("incompatible formats at {}: '{left}' vs '{right}'", display_path(.path))]
    FormatConflict {
        path: String,
        left: String,
        right: String,
    },

    #[error("additionalProperties conflict at {}: {reason}", display_path(.path))]
    AdditionalProperties { path: String, reason: String },

    #[error(
        "empty range at {}: {lower_keyword} {lower} > {upper_keyword} {upper}",
        display_path(.path)
    )]
    BoundsConflict {
        path: String,
        lower_keyword: String,
        lower: Value,
        upper_keyword: String,
        upper: Value,
    },

    #[error("not a schema at {}: {value}", display_path(.path))]
    NotASchema { path: String, value: Value },
}

impl MergeError {
    /// Location of the conflict, relative to the merged roots.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::ConstConflict { path, .. }
            | Self::ConstNotInEnum { path, .. }
            | Self::EmptyEnum { path, .. }
            | Self::TypeConflict { path, .. }
            | Self::ValueOutsideType { path, .. }
            | Self::FormatConflict { path, .. }
            | Self::AdditionalProperties { path, .. }
            | Self::BoundsConflict { path, .. }
            | Self::NotASchema { path, .. } => path,
        }
    }

    /// Converts the conflict into a `changed` diff under `base_path`.
    ///
    /// Oriented like [`crate::diff::compute_diffs`]: `expected` holds the
    /// left-hand value, `actual` the right-hand one it could not meet.
    #[must_use]
    pub fn to_diff(&self, base_path: &str) -> SchemaDiff {
        let at = format!("{base_path}{}", self.path());
        let (path, expected, actual) = match self {
            Self::ConstConflict { left, right, .. } => {
                (join_path(&at, "const"), left.clone(), right.clone())
            }
            Self::ConstNotInEnum { value, members, .. } => {
                (join_path(&at, "const"), value.clone(), members.clone())
            }
            Self::EmptyEnum { left, right, .. } => {
                (join_path(&at, "enum"), left.clone(), right.clone())
            }
            Self::TypeConflict { left, right, .. } => {
                (join_path(&at, "type"), left.clone(), right.clone())
            }
            Self::ValueOutsideType { value, types, .. } => {
                (join_path(&at, "type"), value.clone(), types.clone())
            }
            Self::FormatConflict { left, right, .. } => (
                join_path(&at, "format"),
                Value::String(left.clone()),
                Value::String(right.clone()),
            ),
            Self::BoundsConflict {
                lower_keyword,
                lower,
                upper,
                ..
            } => (join_path(&at, lower_keyword), lower.clone(), upper.clone()),
            Self::AdditionalProperties { .. } | Self::NotASchema { .. } => {
                (at, Value::Null, Value::String(self.to_string()))
            }
        };
        SchemaDiff {
            path,
            kind: DiffKind::Changed,
            expected,
            actual,
        }
    }
}

pub struct MergeEngine {
    primitive: Box<dyn MergePrimitive>,
    caches: Arc<SchemaCaches>,
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("caches", &self.caches)
            .finish_non_exhaustive()
    }
}

impl MergeEngine {
    /// Engine over the default [`AllOfMerge`] primitive.
    #[must_use]
    pub fn new(caches: Arc<SchemaCaches>) -> Self {
        let primitive = Box::new(AllOfMerge::new(Arc::clone(&caches)));
        Self { primitive, caches }
    }

    #[must_use]
    pub fn with_primitive(primitive: Box<dyn MergePrimitive>, caches: Arc<SchemaCaches>) -> Self {
        Self { primitive, caches }
    }

    #[must_use]
    pub fn caches(&self) -> &Arc<SchemaCaches> {
        &self.caches
    }

    /// Intersection of `a` and `b`, or `None` when it is provably empty.
    #[must_use]
    pub fn merge(&self, a: &Value, b: &Value) -> Option<Value> {
        self.merge_or_throw(a, b)
            .inspect_err(|e| tracing::debug!("merge failed: {e}"))
            .ok()
    }

    /// Like [`MergeEngine::merge`] but reports why the intersection is empty.
    ///
    /// # Errors
    /// Returns the first conflict found by the pre-merge detectors or by the
    /// primitive.
    pub fn merge_or_throw(&self, a: &Value, b: &Value) -> Result<Value, MergeError> {
        if let Some(conflict) = find_const_conflict(a, b, "") {
            return Err(conflict);
        }
        if let Some(conflict) = find_format_conflict(a, b, "") {
            return Err(conflict);
        }
        if let Some(conflict) = self.find_closed_object_conflict(a, b, "") {
            return Err(conflict);
        }
        self.primitive.shallow_merge(a, b)
    }

    /// Structural ordering of two schemas; two `null`s are always equal.
    #[must_use]
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        if a.is_null() && b.is_null() {
            return Ordering::Equal;
        }
        self.primitive.compare(a, b)
    }

    #[must_use]
    pub fn is_equal(&self, a: &Value, b: &Value) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    fn find_closed_object_conflict(&self, a: &Value, b: &Value, path: &str) -> Option<MergeError> {
        let (Some(left), Some(right)) = (a.as_object(), b.as_object()) else {
            return None;
        };
        if let Some(conflict) = self
            .closed_against(left, right, path)
            .or_else(|| self.closed_against(right, left, path))
        {
            return Some(conflict);
        }
        let (Some(lp), Some(rp)) = (properties(left), properties(right)) else {
            return None;
        };
        let base = join_path(path, "properties");
        lp.iter()
            .filter(|(_, schema)| schema.is_object())
            .filter_map(|(name, schema)| rp.get(name).map(|other| (name, schema, other)))
            .find_map(|(name, schema, other)| {
                self.find_closed_object_conflict(schema, other, &join_path(&base, name))
            })
    }

    /// Can `other` ever be satisfied inside the object described by `closed`?
    fn closed_against(
        &self,
        closed: &Map<String, Value>,
        other: &Map<String, Value>,
        path: &str,
    ) -> Option<MergeError> {
        let extra = closed.get("additionalProperties")?;
        let own = properties(closed);
        let other_props = properties(other)?;
        let covered = |name: &str| {
            own.is_some_and(|own| own.contains_key(name)) || self.matches_pattern(closed, name)
        };

        for name in required(other) {
            let Some(declared) = other_props.get(name) else {
                continue;
            };
            if covered(name) {
                continue;
            }
            match extra {
                Value::Bool(false) if own.is_some_and(|own| !own.is_empty()) => {
                    return Some(MergeError::AdditionalProperties {
                        path: path.to_owned(),
                        reason: format!("required property '{name}' is not allowed"),
                    });
                }
                Value::Object(extra_schema) => {
                    let (Some(allowed), Some(wanted)) =
                        (extra_schema.get("type"), declared.get("type"))
                    else {
                        continue;
                    };
                    let disjoint = type_names(wanted)
                        .iter()
                        .all(|w| type_names(allowed).iter().all(|a| !types_overlap(w, a)));
                    if disjoint {
                        return Some(MergeError::AdditionalProperties {
                            path: path.to_owned(),
                            reason: format!(
                                "required property '{name}' has type {wanted}, \
                                 extra properties must be {allowed}"
                            ),
                        });
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn matches_pattern(&self, schema: &Map<String, Value>, name: &str) -> bool {
        schema
            .get("patternProperties")
            .and_then(Value::as_object)
            .is_some_and(|patterns| {
                patterns
                    .keys()
                    .any(|p| self.caches.regex(p).is_some_and(|re| re.is_match(name)))
            })
    }
}

fn properties(schema: &Map<String, Value>) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

fn required(schema: &Map<String, Value>) -> impl Iterator<Item = &str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn find_const_conflict(a: &Value, b: &Value, path: &str) -> Option<MergeError> {
    let (Some(left), Some(right)) = (a.as_object(), b.as_object()) else {
        return None;
    };
    const_against(left, right, path)
        .or_else(|| const_against(right, left, path))
        .or_else(|| {
            paired_positions(left, right, path, PairedWalk::ConstConflict)
                .into_iter()
                .find_map(|p| find_const_conflict(p.left, p.right, &p.path))
        })
}

fn const_against(
    holder: &Map<String, Value>,
    other: &Map<String, Value>,
    path: &str,
) -> Option<MergeError> {
    let value = holder.get("const")?;
    if let Some(other_value) = other.get("const")
        && !values_equal(value, other_value)
    {
        return Some(MergeError::ConstConflict {
            path: path.to_owned(),
            left: value.clone(),
            right: other_value.clone(),
        });
    }
    if let Some(Value::Array(members)) = other.get("enum")
        && !members.iter().any(|m| values_equal(m, value))
    {
        return Some(MergeError::ConstNotInEnum {
            path: path.to_owned(),
            value: value.clone(),
            members: Value::Array(members.clone()),
        });
    }
    None
}

fn find_format_conflict(a: &Value, b: &Value, path: &str) -> Option<MergeError> {
    let (Some(left), Some(right)) = (a.as_object(), b.as_object()) else {
        return None;
    };
    if let (Some(lf), Some(rf)) = (
        left.get("format").and_then(Value::as_str),
        right.get("format").and_then(Value::as_str),
    ) && lf != rf
        && is_format_subset(lf, rf) != Some(true)
        && is_format_subset(rf, lf) != Some(true)
    {
        return Some(MergeError::FormatConflict {
            path: path.to_owned(),
            left: lf.to_owned(),
            right: rf.to_owned(),
        });
    }
    paired_positions(left, right, path, PairedWalk::FormatConflict)
        .into_iter()
        .find_map(|p| find_format_conflict(p.left, p.right, &p.path))
}
