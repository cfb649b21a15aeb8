//! Small pure helpers shared by every other module.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// Deep structural equality where numbers compare by value (`1 == 1.0`).
#[must_use]
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| deep_equal(l, r)))
        }
        _ => a == b,
    }
}

/// Equality used for `enum`/`const` membership.
///
/// `null` is always equal to `null`; enum intersections must never drop it.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_null() && b.is_null() {
        return true;
    }
    deep_equal(a, b)
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b) == Some(Ordering::Equal),
        _ => false,
    }
}

/// Copy of `map` without the listed keys.
#[must_use]
pub fn omit_keys(map: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Ordered, de-duplicated union of two string arrays. Non-string entries are dropped.
#[must_use]
pub fn union_strings(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(left.len() + right.len());
    for item in left.iter().chain(right) {
        if item.is_string() && !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// `true` when a number has no fractional part.
#[must_use]
pub fn is_integral(number: &Number) -> bool {
    if number.is_i64() || number.is_u64() {
        return true;
    }
    number
        .as_f64()
        .is_some_and(|f| f.is_finite() && f.fract().abs() < f64::EPSILON)
}

/// `value` is a whole multiple of `divisor`, up to floating point noise.
/// A non-positive divisor divides nothing.
#[must_use]
pub fn is_multiple_of(value: f64, divisor: f64) -> bool {
    if divisor <= 0.0 {
        return false;
    }
    let ratio = value / divisor;
    ratio.is_finite() && (ratio - ratio.round()).abs() < 1e-9
}

/// JSON type name of a runtime value, reporting integral numbers as `"integer"`.
#[must_use]
pub fn infer_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if is_integral(n) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Does `value` belong to the JSON Schema type `type_name`?
#[must_use]
pub fn value_has_type(value: &Value, type_name: &str) -> bool {
    match type_name {
        "number" => value.is_number(),
        "integer" => value.as_number().is_some_and(is_integral),
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => false,
    }
}

/// Type names listed by a `type` keyword value (string or array form).
#[must_use]
pub fn type_names(type_value: &Value) -> Vec<&str> {
    match type_value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Do two type names share at least one value (`integer` lives inside `number`)?
#[must_use]
pub fn types_overlap(a: &str, b: &str) -> bool {
    a == b || matches!((a, b), ("integer", "number") | ("number", "integer"))
}

/// Is every value of type `inner` also of type `outer`?
#[must_use]
pub fn type_within(inner: &str, outer: &str) -> bool {
    inner == outer || (inner == "integer" && outer == "number")
}

/// Joins a parent path and a key with the `.` separator used by diffs.
#[must_use]
pub fn join_path(parent: &str, key: &str) -> String {
    format!("{parent}.{key}")
}

/// Renders an internal path (root is `""`) in its `$`-rooted reporting form.
#[must_use]
pub fn display_path(path: &str) -> String {
    format!("${path}")
}
