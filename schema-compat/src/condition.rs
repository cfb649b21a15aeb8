//! Resolution of `if`/`then`/`else` against (partial) instance data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::cache::SchemaCaches;
use crate::format::validate_format;
use crate::keywords::{CONDITION_KEYWORDS, KeywordShape, shape_of};
use crate::merge::MergeEngine;
use crate::utils::{
    deep_equal, is_multiple_of, omit_keys, type_names, union_strings, value_has_type, values_equal,
};

/// Keywords whose presence on an `if` property marks its data field as consulted.
const DISCRIMINANT_KEYWORDS: [&str; 13] = [
    "const",
    "enum",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "pattern",
    "minLength",
    "maxLength",
    "multipleOf",
    "minItems",
    "maxItems",
    "format",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Then,
    Else,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConditionResult {
    /// The schema with every resolvable conditional folded in.
    pub resolved: Value,
    /// Branch taken by the top-level conditional, if there was one.
    pub branch: Option<Branch>,
    /// Data fields read while evaluating conditions; nested ones are dotted.
    pub discriminant: Map<String, Value>,
}

pub struct ConditionResolver<'a> {
    engine: &'a MergeEngine,
}

impl<'a> ConditionResolver<'a> {
    #[must_use]
    pub fn new(engine: &'a MergeEngine) -> Self {
        Self { engine }
    }

    /// Folds conditionals into `schema` in three passes: conditionals inside
    /// `allOf`, the schema's own conditional, then nested properties.
    #[must_use]
    pub fn resolve(&self, schema: &Value, data: &Value) -> ResolvedConditionResult {
        let Value::Object(map) = schema else {
            return ResolvedConditionResult {
                resolved: schema.clone(),
                branch: None,
                discriminant: Map::new(),
            };
        };
        let mut resolved = map.clone();
        let mut discriminant = Map::new();

        self.resolve_all_of(&mut resolved, data, &mut discriminant);
        let branch = self.resolve_own(&mut resolved, data, &mut discriminant);
        self.resolve_properties(&mut resolved, data, &mut discriminant);

        ResolvedConditionResult {
            resolved: Value::Object(resolved),
            branch,
            discriminant,
        }
    }

    fn resolve_all_of(
        &self,
        resolved: &mut Map<String, Value>,
        data: &Value,
        discriminant: &mut Map<String, Value>,
    ) {
        let Some(Value::Array(entries)) = resolved.get("allOf").cloned() else {
            return;
        };
        let mut kept = Vec::with_capacity(entries.len());
        let mut taken = Vec::new();
        for entry in &entries {
            let Some(conditional) = entry.as_object().filter(|e| e.contains_key("if")) else {
                kept.push(entry.clone());
                continue;
            };
            let condition = &conditional["if"];
            let holds = self.evaluate_condition(condition, data);
            collect_discriminants(condition, data, discriminant);
            if let Some(branch) = conditional.get(if holds { "then" } else { "else" }) {
                taken.push(branch);
            }
            let residue = omit_keys(conditional, &CONDITION_KEYWORDS);
            if !residue.is_empty() {
                kept.push(Value::Object(residue));
            }
        }
        if kept.is_empty() {
            resolved.remove("allOf");
        } else {
            resolved.insert("allOf".to_owned(), Value::Array(kept));
        }
        for branch in taken {
            self.merge_branch_into(resolved, branch);
        }
    }

    fn resolve_own(
        &self,
        resolved: &mut Map<String, Value>,
        data: &Value,
        discriminant: &mut Map<String, Value>,
    ) -> Option<Branch> {
        let condition = resolved.get("if").cloned()?;
        let holds = self.evaluate_condition(&condition, data);
        collect_discriminants(&condition, data, discriminant);
        let (branch, keyword) = if holds {
            (Branch::Then, "then")
        } else {
            (Branch::Else, "else")
        };
        tracing::debug!("conditional resolved to '{keyword}'");
        if let Some(chosen) = resolved.get(keyword).cloned() {
            self.merge_branch_into(resolved, &chosen);
        }
        for key in CONDITION_KEYWORDS {
            resolved.remove(key);
        }
        Some(branch)
    }

    fn resolve_properties(
        &self,
        resolved: &mut Map<String, Value>,
        data: &Value,
        discriminant: &mut Map<String, Value>,
    ) {
        let Some(Value::Object(mut properties)) = resolved.get("properties").cloned() else {
            return;
        };
        let mut changed = false;
        for (name, property) in &mut properties {
            if !has_conditional(property) {
                continue;
            }
            let nested_data = data
                .get(name)
                .filter(|v| v.is_object())
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            let nested = self.resolve(property, &nested_data);
            *property = nested.resolved;
            for (key, value) in nested.discriminant {
                discriminant.insert(format!("{name}.{key}"), value);
            }
            changed = true;
        }
        if changed {
            resolved.insert("properties".to_owned(), Value::Object(properties));
        }
    }

    /// Pragmatic evaluation of an `if` schema against `data`.
    #[must_use]
    pub fn evaluate_condition(&self, condition: &Value, data: &Value) -> bool {
        evaluate_condition(condition, data, self.engine.caches())
    }

    /// Reconciles `branch` into `resolved` keyword by keyword.
    pub fn merge_branch_into(&self, resolved: &mut Map<String, Value>, branch: &Value) {
        let mut rejecting = Map::new();
        let branch = match branch {
            Value::Object(map) => map,
            Value::Bool(false) => {
                rejecting.insert("not".to_owned(), json!({}));
                &rejecting
            }
            _ => return,
        };
        for (key, incoming) in branch {
            let Some(existing) = resolved.get(key) else {
                resolved.insert(key.clone(), incoming.clone());
                continue;
            };
            if deep_equal(existing, incoming) {
                continue;
            }
            let merged = match (key.as_str(), shape_of(key)) {
                ("required", _) => Value::Array(union_strings(
                    existing.as_array().map_or(&[], Vec::as_slice),
                    incoming.as_array().map_or(&[], Vec::as_slice),
                )),
                ("properties", _) => self.merge_properties(existing, incoming),
                ("dependencies", _) => self.merge_dependencies(existing, incoming),
                ("pattern" | "format", _) => incoming.clone(),
                ("uniqueItems", _) => Value::Bool(
                    existing.as_bool().unwrap_or(false) || incoming.as_bool().unwrap_or(false),
                ),
                (_, KeywordShape::LowerBound) => tighter(existing, incoming, true),
                (_, KeywordShape::UpperBound) => tighter(existing, incoming, false),
                _ => self
                    .merge_keyword(key, existing, incoming)
                    .unwrap_or_else(|| incoming.clone()),
            };
            resolved.insert(key.clone(), merged);
        }
    }

    /// Merges `{key: a}` with `{key: b}`; `None` unless the result is that single keyword.
    fn merge_keyword(&self, key: &str, a: &Value, b: &Value) -> Option<Value> {
        let merged = self.engine.merge(&json!({ key: a }), &json!({ key: b }))?;
        if let Value::Object(mut map) = merged
            && map.len() == 1
        {
            map.remove(key)
        } else {
            None
        }
    }

    fn merge_properties(&self, existing: &Value, incoming: &Value) -> Value {
        let (Some(current), Some(branch)) = (existing.as_object(), incoming.as_object()) else {
            return incoming.clone();
        };
        let mut out = current.clone();
        for (name, schema) in branch {
            let merged = match current.get(name) {
                Some(prior) => self
                    .engine
                    .merge(prior, schema)
                    .unwrap_or_else(|| schema.clone()),
                None => schema.clone(),
            };
            out.insert(name.clone(), merged);
        }
        Value::Object(out)
    }

    fn merge_dependencies(&self, existing: &Value, incoming: &Value) -> Value {
        let (Some(current), Some(branch)) = (existing.as_object(), incoming.as_object()) else {
            return incoming.clone();
        };
        let mut out = current.clone();
        for (name, dependency) in branch {
            let merged = match (current.get(name), dependency) {
                (Some(Value::Array(prior)), Value::Array(names)) => {
                    Value::Array(union_strings(prior, names))
                }
                (Some(prior), _) if !prior.is_array() && !dependency.is_array() => self
                    .engine
                    .merge(prior, dependency)
                    .unwrap_or_else(|| dependency.clone()),
                _ => dependency.clone(),
            };
            out.insert(name.clone(), merged);
        }
        Value::Object(out)
    }
}

fn tighter(existing: &Value, incoming: &Value, larger: bool) -> Value {
    match (existing.as_f64(), incoming.as_f64()) {
        (Some(e), Some(i)) if (larger && e > i) || (!larger && e < i) => existing.clone(),
        _ => incoming.clone(),
    }
}

fn has_conditional(schema: &Value) -> bool {
    schema.get("if").is_some()
        || schema
            .get("allOf")
            .and_then(Value::as_array)
            .is_some_and(|entries| entries.iter().any(|e| e.get("if").is_some()))
}

fn collect_discriminants(condition: &Value, data: &Value, out: &mut Map<String, Value>) {
    let (Some(properties), Some(fields)) = (
        condition.get("properties").and_then(Value::as_object),
        data.as_object(),
    ) else {
        return;
    };
    for (name, schema) in properties {
        let consulted = schema
            .as_object()
            .is_some_and(|s| DISCRIMINANT_KEYWORDS.iter().any(|k| s.contains_key(*k)));
        if consulted && let Some(value) = fields.get(name) {
            out.insert(name.clone(), value.clone());
        }
    }
}

pub(crate) fn evaluate_condition(condition: &Value, data: &Value, caches: &SchemaCaches) -> bool {
    match condition {
        Value::Bool(literal) => *literal,
        Value::Object(map) => evaluate_map(map, data, caches),
        _ => true,
    }
}

fn evaluate_map(condition: &Map<String, Value>, data: &Value, caches: &SchemaCaches) -> bool {
    let empty = Map::new();
    let fields = data.as_object().unwrap_or(&empty);

    if let Some(Value::Object(properties)) = condition.get("properties") {
        // Absent fields are `required`'s concern.
        let all_hold = properties.iter().all(|(name, schema)| {
            fields
                .get(name)
                .is_none_or(|value| value_satisfies(schema, value, caches))
        });
        if !all_hold {
            return false;
        }
    }
    if let Some(Value::Array(names)) = condition.get("required")
        && !names
            .iter()
            .filter_map(Value::as_str)
            .all(|name| fields.contains_key(name))
    {
        return false;
    }
    if let Some(Value::Array(entries)) = condition.get("allOf")
        && !entries.iter().all(|e| evaluate_condition(e, data, caches))
    {
        return false;
    }
    if let Some(Value::Array(entries)) = condition.get("anyOf")
        && !entries.iter().any(|e| evaluate_condition(e, data, caches))
    {
        return false;
    }
    if let Some(Value::Array(entries)) = condition.get("oneOf") {
        let matches = entries
            .iter()
            .filter(|e| evaluate_condition(e, data, caches))
            .take(2)
            .count();
        if matches != 1 {
            return false;
        }
    }
    if let Some(negated @ Value::Object(_)) = condition.get("not")
        && evaluate_condition(negated, data, caches)
    {
        return false;
    }
    true
}

/// Checks one data value against a property schema, keyword by keyword.
pub(crate) fn value_satisfies(schema: &Value, value: &Value, caches: &SchemaCaches) -> bool {
    let schema = match schema {
        Value::Bool(literal) => return *literal,
        Value::Object(map) => map,
        _ => return true,
    };
    let nested_holds = !value.is_object()
        || !(schema.contains_key("properties") || schema.contains_key("required"))
        || evaluate_map(schema, value, caches);

    literal_fits(schema, value)
        && numeric_fits(schema, value)
        && string_fits(schema, value, caches)
        && array_fits(schema, value)
        && nested_holds
}

fn bound(schema: &Map<String, Value>, key: &str) -> Option<f64> {
    schema.get(key).and_then(Value::as_f64)
}

fn literal_fits(schema: &Map<String, Value>, value: &Value) -> bool {
    let const_ok = schema
        .get("const")
        .is_none_or(|expected| values_equal(expected, value));
    let enum_ok = match schema.get("enum") {
        Some(Value::Array(members)) => members.iter().any(|m| values_equal(m, value)),
        _ => true,
    };
    let type_ok = schema.get("type").is_none_or(|declared| {
        let names = type_names(declared);
        names.is_empty() || names.iter().any(|name| value_has_type(value, name))
    });
    const_ok && enum_ok && type_ok
}

fn numeric_fits(schema: &Map<String, Value>, value: &Value) -> bool {
    let Some(n) = value.as_f64() else {
        return true;
    };
    bound(schema, "minimum").is_none_or(|m| n >= m)
        && bound(schema, "maximum").is_none_or(|m| n <= m)
        && bound(schema, "exclusiveMinimum").is_none_or(|m| n > m)
        && bound(schema, "exclusiveMaximum").is_none_or(|m| n < m)
        && bound(schema, "multipleOf").is_none_or(|m| is_multiple_of(n, m))
}

#[allow(clippy::cast_precision_loss)]
fn string_fits(schema: &Map<String, Value>, value: &Value, caches: &SchemaCaches) -> bool {
    let Some(text) = value.as_str() else {
        return true;
    };
    let length = text.chars().count() as f64;
    let pattern_ok = schema
        .get("pattern")
        .and_then(Value::as_str)
        .and_then(|pattern| caches.regex(pattern))
        .is_none_or(|re| re.is_match(text));
    let format_ok = schema
        .get("format")
        .and_then(Value::as_str)
        .is_none_or(|format| validate_format(value, format) != Some(false));
    bound(schema, "minLength").is_none_or(|m| length >= m)
        && bound(schema, "maxLength").is_none_or(|m| length <= m)
        && pattern_ok
        && format_ok
}

#[allow(clippy::cast_precision_loss)]
fn array_fits(schema: &Map<String, Value>, value: &Value) -> bool {
    let Some(items) = value.as_array() else {
        return true;
    };
    let count = items.len() as f64;
    let unique = schema.get("uniqueItems") != Some(&Value::Bool(true))
        || items
            .iter()
            .enumerate()
            .all(|(i, a)| items[i + 1..].iter().all(|b| !deep_equal(a, b)));
    bound(schema, "minItems").is_none_or(|m| count >= m)
        && bound(schema, "maxItems").is_none_or(|m| count <= m)
        && unique
}
