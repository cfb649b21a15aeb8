//! Static keyword dispatch table.
//!
//! Every component that walks schemas (normalizer, merge primitive, conflict
//! detectors, differ, branch reconciler) classifies keywords through
//! [`shape_of`] instead of keeping its own list. Walkers that compare two
//! schemas side by side pair their sub-schemas through [`paired_positions`].

use serde_json::{Map, Value};

use crate::utils::join_path;

/// Shape of the value a keyword holds, plus the reconciliation family it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordShape {
    /// A single sub-schema (`not`, `contains`, `additionalProperties`, ...).
    SubSchema,
    /// `items`: a single sub-schema or a tuple of sub-schemas.
    Items,
    /// An array of sub-schemas (`allOf`, `anyOf`, `oneOf`).
    SchemaArray,
    /// A map of name to sub-schema (`properties`, `patternProperties`, `definitions`).
    SchemaMap,
    /// `dependencies`: name to sub-schema or name to string array.
    Dependencies,
    /// Numeric floor; the larger value is the more restrictive one.
    LowerBound,
    /// Numeric ceiling; the smaller value is the more restrictive one.
    UpperBound,
    /// Annotation without validation semantics.
    Annotation,
    /// Anything else (`type`, `const`, `enum`, `pattern`, `format`, ...).
    Scalar,
}

/// Keywords introducing a conditional.
pub const CONDITION_KEYWORDS: [&str; 3] = ["if", "then", "else"];

#[must_use]
pub fn shape_of(keyword: &str) -> KeywordShape {
    match keyword {
        "additionalProperties" | "additionalItems" | "contains" | "propertyNames" | "not" | "if"
        | "then" | "else" => KeywordShape::SubSchema,
        "items" => KeywordShape::Items,
        "allOf" | "anyOf" | "oneOf" => KeywordShape::SchemaArray,
        "properties" | "patternProperties" | "definitions" => KeywordShape::SchemaMap,
        "dependencies" => KeywordShape::Dependencies,
        "minimum" | "exclusiveMinimum" | "minLength" | "minItems" | "minProperties" => {
            KeywordShape::LowerBound
        }
        "maximum" | "exclusiveMaximum" | "maxLength" | "maxItems" | "maxProperties" => {
            KeywordShape::UpperBound
        }
        "title" | "description" | "default" | "examples" | "$comment" | "$id" | "$schema"
        | "readOnly" | "writeOnly" => KeywordShape::Annotation,
        _ => KeywordShape::Scalar,
    }
}

/// Walks that pair the sub-schemas found at the same position in two schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairedWalk {
    /// Deep `const`/`enum` conflict detection.
    ConstConflict,
    /// `format` conflict detection.
    FormatConflict,
    /// The subset checker's `pattern`/`format`/`not` pre-check pass.
    Reconcile,
}

impl PairedWalk {
    /// Keywords the walk descends into, in visiting order.
    #[must_use]
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::ConstConflict => &[
                "properties",
                "patternProperties",
                "items",
                "additionalProperties",
                "contains",
                "propertyNames",
                "not",
            ],
            Self::FormatConflict => &["properties", "items", "additionalProperties"],
            Self::Reconcile => &["properties", "patternProperties", "items", "additionalProperties"],
        }
    }
}

/// Where a paired sub-schema sits inside its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Member of a schema map, e.g. `properties.name`.
    Keyed(&'static str, String),
    /// The whole value of a single-schema keyword.
    Single(&'static str),
    /// Tuple entry of `items`.
    Indexed(usize),
}

#[derive(Debug)]
pub struct Paired<'v> {
    pub slot: Slot,
    pub left: &'v Value,
    pub right: &'v Value,
    pub path: String,
}

/// Sub-schemas present at the same position on both sides, for the keywords
/// `walk` visits.
///
/// Schema maps pair by common key and tuple `items` by index. A tuple against
/// a single `items` schema pairs nothing.
#[must_use]
pub fn paired_positions<'v>(
    left: &'v Map<String, Value>,
    right: &'v Map<String, Value>,
    path: &str,
    walk: PairedWalk,
) -> Vec<Paired<'v>> {
    let mut pairs = Vec::new();
    for &keyword in walk.keywords() {
        let (Some(l), Some(r)) = (left.get(keyword), right.get(keyword)) else {
            continue;
        };
        let at = join_path(path, keyword);
        match (shape_of(keyword), l, r) {
            (KeywordShape::SchemaMap, Value::Object(lm), Value::Object(rm)) => {
                for (key, ls) in lm {
                    if let Some(rs) = rm.get(key) {
                        pairs.push(Paired {
                            slot: Slot::Keyed(keyword, key.clone()),
                            left: ls,
                            right: rs,
                            path: join_path(&at, key),
                        });
                    }
                }
            }
            (KeywordShape::Items, Value::Array(lt), Value::Array(rt)) => {
                for (i, (ls, rs)) in lt.iter().zip(rt).enumerate() {
                    pairs.push(Paired {
                        slot: Slot::Indexed(i),
                        left: ls,
                        right: rs,
                        path: format!("{at}[{i}]"),
                    });
                }
            }
            (KeywordShape::SchemaMap, _, _)
            | (KeywordShape::Items, Value::Array(_), _)
            | (KeywordShape::Items, _, Value::Array(_)) => {}
            _ => pairs.push(Paired {
                slot: Slot::Single(keyword),
                left: l,
                right: r,
                path: at,
            }),
        }
    }
    pairs
}

/// Value kind a bound keyword constrains (`minLength` only restricts strings, ...).
#[must_use]
pub fn bound_applies_to(keyword: &str) -> Option<&'static str> {
    match keyword {
        "minimum" | "maximum" | "exclusiveMinimum" | "exclusiveMaximum" | "multipleOf" => {
            Some("number")
        }
        "minLength" | "maxLength" | "pattern" | "format" => Some("string"),
        "minItems" | "maxItems" | "uniqueItems" => Some("array"),
        "minProperties" | "maxProperties" => Some("object"),
        _ => None,
    }
}
