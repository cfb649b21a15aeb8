//! Schema canonicalization.
//!
//! Removes representational redundancy without changing the accepted value
//! set: singleton `enum` becomes `const`, `const` gets an inferred `type`,
//! and an `enum` made redundant by `const` is dropped. Subtrees that need no
//! change are returned as borrowed input.

use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::keywords::{KeywordShape, shape_of};
use crate::utils::{infer_type, values_equal};

/// Canonical form of `schema`. Idempotent.
#[must_use]
pub fn normalize(schema: &Value) -> Value {
    normalize_cow(schema).into_owned()
}

/// Copy-on-write variant of [`normalize`].
#[must_use]
pub fn normalize_cow(schema: &Value) -> Cow<'_, Value> {
    let Value::Object(map) = schema else {
        return Cow::Borrowed(schema);
    };

    let mut owned: Option<Map<String, Value>> = None;
    for (key, value) in map {
        if let Cow::Owned(normalized) = normalize_keyword(key, value) {
            owned
                .get_or_insert_with(|| map.clone())
                .insert(key.clone(), normalized);
        }
    }

    let view = owned.as_ref().unwrap_or(map);
    let collapse_enum = !view.contains_key("const")
        && matches!(view.get("enum"), Some(Value::Array(members)) if members.len() == 1);
    if collapse_enum {
        let target = owned.get_or_insert_with(|| map.clone());
        if let Some(Value::Array(mut members)) = target.remove("enum")
            && let Some(only) = members.pop()
        {
            target.insert("const".to_owned(), only);
        }
    }

    let view = owned.as_ref().unwrap_or(map);
    let redundant_enum = match (view.get("const"), view.get("enum")) {
        (Some(constant), Some(Value::Array(members))) => {
            members.iter().any(|m| values_equal(m, constant))
        }
        _ => false,
    };
    if redundant_enum {
        owned.get_or_insert_with(|| map.clone()).remove("enum");
    }

    let view = owned.as_ref().unwrap_or(map);
    if !view.contains_key("type")
        && let Some(constant) = view.get("const")
    {
        let inferred = infer_type(constant);
        owned
            .get_or_insert_with(|| map.clone())
            .insert("type".to_owned(), Value::String(inferred.to_owned()));
    }

    match owned {
        Some(map) => Cow::Owned(Value::Object(map)),
        None => Cow::Borrowed(schema),
    }
}

fn normalize_keyword<'v>(keyword: &str, value: &'v Value) -> Cow<'v, Value> {
    match (shape_of(keyword), value) {
        (KeywordShape::SubSchema, _) | (KeywordShape::Items, Value::Object(_)) => {
            normalize_cow(value)
        }
        (KeywordShape::Items | KeywordShape::SchemaArray, Value::Array(items)) => {
            normalize_array(items).map_or(Cow::Borrowed(value), |a| Cow::Owned(Value::Array(a)))
        }
        (KeywordShape::SchemaMap | KeywordShape::Dependencies, Value::Object(entries)) => {
            normalize_map(entries).map_or(Cow::Borrowed(value), |m| Cow::Owned(Value::Object(m)))
        }
        _ => Cow::Borrowed(value),
    }
}

fn normalize_array(items: &[Value]) -> Option<Vec<Value>> {
    let normalized: Vec<Cow<'_, Value>> = items.iter().map(normalize_cow).collect();
    if normalized.iter().all(|item| matches!(item, Cow::Borrowed(_))) {
        return None;
    }
    Some(normalized.into_iter().map(Cow::into_owned).collect())
}

/// Normalizes schema-valued entries; string-array `dependencies` entries
/// are left as they are (`normalize_cow` borrows arrays).
fn normalize_map(entries: &Map<String, Value>) -> Option<Map<String, Value>> {
    let mut owned: Option<Map<String, Value>> = None;
    for (key, value) in entries {
        if let Cow::Owned(normalized) = normalize_cow(value) {
            owned
                .get_or_insert_with(|| entries.clone())
                .insert(key.clone(), normalized);
        }
    }
    owned
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_const_gets_type() {
        assert_eq!(
            normalize(&json!({"const": "a"})),
            json!({"const": "a", "type": "string"})
        );
        assert_eq!(
            normalize(&json!({"const": 4})),
            json!({"const": 4, "type": "integer"})
        );
        assert_eq!(
            normalize(&json!({"const": 4.5})),
            json!({"const": 4.5, "type": "number"})
        );
    }

    #[test]
    fn test_singleton_enum_collapses() {
        assert_eq!(
            normalize(&json!({"enum": [null]})),
            json!({"const": null, "type": "null"})
        );
    }

    #[test]
    fn test_redundant_enum_dropped() {
        assert_eq!(
            normalize(&json!({"const": "x", "enum": ["x", "y"], "type": "string"})),
            json!({"const": "x", "type": "string"})
        );
    }

    #[test]
    fn test_conflicting_const_and_enum_kept() {
        let schema = json!({"const": "z", "enum": ["x", "y"], "type": "string"});
        assert_eq!(normalize(&schema), schema);
    }

    #[test]
    fn test_recurses_into_every_position() {
        let schema = json!({
            "properties": {"a": {"enum": [1]}},
            "patternProperties": {"^x": {"const": true}},
            "items": [{"enum": ["t"]}, {"type": "string"}],
            "additionalProperties": {"const": null},
            "anyOf": [{"enum": ["q"]}],
            "not": {"const": 1},
            "if": {"properties": {"k": {"const": "v"}}},
            "dependencies": {"a": ["b"], "c": {"enum": [2]}}
        });
        let n = normalize(&schema);
        assert_eq!(n["properties"]["a"], json!({"const": 1, "type": "integer"}));
        assert_eq!(n["patternProperties"]["^x"]["type"], "boolean");
        assert_eq!(n["items"][0], json!({"const": "t", "type": "string"}));
        assert_eq!(n["items"][1], json!({"type": "string"}));
        assert_eq!(n["additionalProperties"]["type"], "null");
        assert_eq!(n["anyOf"][0]["const"], "q");
        assert_eq!(n["not"]["type"], "integer");
        assert_eq!(n["if"]["properties"]["k"]["type"], "string");
        assert_eq!(n["dependencies"]["a"], json!(["b"]));
        assert_eq!(n["dependencies"]["c"]["const"], 2);
    }

    #[test]
    fn test_idempotent() {
        let schema = json!({"properties": {"s": {"enum": ["a"]}}, "enum": [{"s": "a"}]});
        let once = normalize(&schema);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_untouched_schema_is_borrowed() {
        let schema = json!({"type": "object", "properties": {"a": {"type": "string"}}});
        assert!(matches!(normalize_cow(&schema), Cow::Borrowed(_)));
        let boolean = json!(true);
        assert!(matches!(normalize_cow(&boolean), Cow::Borrowed(_)));
    }
}
