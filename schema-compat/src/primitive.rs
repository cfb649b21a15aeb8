//! Structural `allOf` intersection and structural comparison of schemas.
//!
//! This is the primitive the merge engine delegates to. It only resolves
//! what follows from the keywords themselves; cross-keyword conflicts that
//! need deeper reasoning (nested `const`, `format` inclusion, closed objects
//! versus `required`) are detected by [`crate::merge::MergeEngine`] before
//! it gets here.

use serde_json::{Map, Value, json};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::cache::SchemaCaches;
use crate::keywords::{CONDITION_KEYWORDS, KeywordShape, bound_applies_to, shape_of};
use crate::merge::MergeError;
use crate::utils::{
    deep_equal, is_multiple_of, join_path, type_names, type_within, union_strings, value_has_type,
    values_equal,
};

static TRUE_SCHEMA: Value = Value::Bool(true);

/// Sub-schema keywords whose intersection cannot be expressed in place.
const RESIDUAL_SUBSCHEMAS: [&str; 4] = ["contains", "if", "then", "else"];

/// Lower/upper bound pairs and whether equal values already leave no room.
const BOUND_PAIRS: &[(&str, &str, bool)] = &[
    ("minimum", "maximum", false),
    ("exclusiveMinimum", "maximum", true),
    ("minimum", "exclusiveMaximum", true),
    ("exclusiveMinimum", "exclusiveMaximum", true),
    ("minLength", "maxLength", false),
    ("minItems", "maxItems", false),
    ("minProperties", "maxProperties", false),
];

/// Capability the merge engine is built on.
pub trait MergePrimitive: Send + Sync {
    /// Intersection of `a` and `b` as a single schema.
    ///
    /// # Errors
    /// Returns `MergeError` when the keywords provably contradict each other.
    fn shallow_merge(&self, a: &Value, b: &Value) -> Result<Value, MergeError>;

    /// Structural ordering; `Ordering::Equal` means the schemas are equivalent.
    fn compare(&self, a: &Value, b: &Value) -> Ordering;
}

/// Default [`MergePrimitive`].
pub struct AllOfMerge {
    caches: Arc<SchemaCaches>,
}

impl MergePrimitive for AllOfMerge {
    fn shallow_merge(&self, a: &Value, b: &Value) -> Result<Value, MergeError> {
        self.merge_at(a, b, "")
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        canonical_form(a)
            .to_string()
            .cmp(&canonical_form(b).to_string())
    }
}

impl AllOfMerge {
    #[must_use]
    pub fn new(caches: Arc<SchemaCaches>) -> Self {
        Self { caches }
    }

    fn merge_at(&self, a: &Value, b: &Value, path: &str) -> Result<Value, MergeError> {
        let a = self.fold_all_of(a, path)?;
        let b = self.fold_all_of(b, path)?;
        match (a.as_ref(), b.as_ref()) {
            (Value::Bool(false), _) | (_, Value::Bool(false)) => Ok(Value::Bool(false)),
            (Value::Bool(true), other) | (other, Value::Bool(true)) => Ok(other.clone()),
            (Value::Object(left), Value::Object(right)) => {
                self.merge_maps(left, right, path).map(Value::Object)
            }
            (Value::Object(_), other) | (other, _) => Err(MergeError::NotASchema {
                path: path.to_owned(),
                value: other.clone(),
            }),
        }
    }

    /// Folds a schema's own `allOf` entries into the rest of it.
    fn fold_all_of<'v>(&self, schema: &'v Value, path: &str) -> Result<Cow<'v, Value>, MergeError> {
        let Some(Value::Array(entries)) = schema.get("allOf") else {
            return Ok(Cow::Borrowed(schema));
        };
        let mut rest = schema.clone();
        if let Some(map) = rest.as_object_mut() {
            map.remove("allOf");
        }
        let mut acc = rest;
        for entry in entries {
            acc = self.merge_at(&acc, entry, path)?;
        }
        Ok(Cow::Owned(acc))
    }

    fn merge_maps(
        &self,
        left: &Map<String, Value>,
        right: &Map<String, Value>,
        path: &str,
    ) -> Result<Map<String, Value>, MergeError> {
        let mut out = Map::new();
        let mut residual: Vec<Value> = Vec::new();

        // Two different conditionals cannot be combined keyword by keyword.
        let conditional_clash = left.contains_key("if")
            && right.contains_key("if")
            && CONDITION_KEYWORDS
                .iter()
                .any(|k| !option_equal(left.get(*k), right.get(*k)));
        if conditional_clash {
            residual.push(Value::Object(pick(right, &CONDITION_KEYWORDS)));
        }
        let handled_elsewhere = |key: &str| {
            matches!(key, "properties" | "items" | "additionalItems")
                || (conditional_clash && CONDITION_KEYWORDS.contains(&key))
        };

        for (key, lv) in left {
            if handled_elsewhere(key) {
                continue;
            }
            match right.get(key) {
                Some(rv) => self.merge_keyword(key, lv, rv, path, &mut out, &mut residual)?,
                None => {
                    out.insert(key.clone(), lv.clone());
                }
            }
        }
        for (key, rv) in right {
            if !left.contains_key(key) && !handled_elsewhere(key) {
                out.insert(key.clone(), rv.clone());
            }
        }
        if conditional_clash {
            for key in CONDITION_KEYWORDS {
                if let Some(lv) = left.get(key) {
                    out.insert(key.to_owned(), lv.clone());
                }
            }
        }

        if let Some(properties) = self.merge_properties(left, right, path)? {
            out.insert("properties".to_owned(), properties);
        }
        self.merge_items(left, right, path, &mut out)?;

        if !residual.is_empty() {
            let mut all_of = match out.remove("allOf") {
                Some(Value::Array(entries)) => entries,
                _ => Vec::new(),
            };
            for entry in residual {
                if !all_of.iter().any(|e| deep_equal(e, &entry)) {
                    all_of.push(entry);
                }
            }
            out.insert("allOf".to_owned(), Value::Array(all_of));
        }

        reconcile_values(&mut out, path)?;
        fold_implied_bounds(&mut out);
        check_bounds(&out, path)?;
        Ok(out)
    }

    fn merge_keyword(
        &self,
        key: &str,
        lv: &Value,
        rv: &Value,
        path: &str,
        out: &mut Map<String, Value>,
        residual: &mut Vec<Value>,
    ) -> Result<(), MergeError> {
        if deep_equal(lv, rv) {
            out.insert(key.to_owned(), lv.clone());
            return Ok(());
        }
        let child = join_path(path, key);
        let merged = match (key, shape_of(key)) {
            ("type", _) => merge_types(lv, rv, path)?,
            ("const", _) => {
                return Err(MergeError::ConstConflict {
                    path: path.to_owned(),
                    left: lv.clone(),
                    right: rv.clone(),
                });
            }
            ("enum", _) => merge_enums(lv, rv, path)?,
            ("required", _) => Value::Array(union_strings(
                lv.as_array().map_or(&[], Vec::as_slice),
                rv.as_array().map_or(&[], Vec::as_slice),
            )),
            ("uniqueItems", _) => {
                Value::Bool(lv.as_bool().unwrap_or(false) || rv.as_bool().unwrap_or(false))
            }
            ("multipleOf", _) => merge_multiple_of(lv, rv).unwrap_or_else(|| {
                residual.push(single(key, rv));
                lv.clone()
            }),
            ("not", _) => json!({ "anyOf": [lv, rv] }),
            ("allOf", _) => {
                let mut entries = lv.as_array().cloned().unwrap_or_default();
                for entry in rv.as_array().map_or(&[][..], Vec::as_slice) {
                    if !entries.iter().any(|e| deep_equal(e, entry)) {
                        entries.push(entry.clone());
                    }
                }
                Value::Array(entries)
            }
            ("definitions", _) => {
                let mut defs = rv.as_object().cloned().unwrap_or_default();
                if let Some(left_defs) = lv.as_object() {
                    for (name, schema) in left_defs {
                        defs.insert(name.clone(), schema.clone());
                    }
                }
                Value::Object(defs)
            }
            (_, KeywordShape::LowerBound) => pick_bound(lv, rv, true),
            (_, KeywordShape::UpperBound) => pick_bound(lv, rv, false),
            (_, KeywordShape::SubSchema) if !RESIDUAL_SUBSCHEMAS.contains(&key) => {
                self.merge_at(lv, rv, &child)?
            }
            (_, KeywordShape::SchemaMap) => self.merge_schema_maps(lv, rv, &child),
            (_, KeywordShape::Dependencies) => self.merge_dependencies(lv, rv, &child)?,
            (_, KeywordShape::Annotation) => lv.clone(),
            _ => {
                residual.push(single(key, rv));
                lv.clone()
            }
        };
        out.insert(key.to_owned(), merged);
        Ok(())
    }

    fn merge_properties(
        &self,
        left: &Map<String, Value>,
        right: &Map<String, Value>,
        path: &str,
    ) -> Result<Option<Value>, MergeError> {
        let lp = left.get("properties").and_then(Value::as_object);
        let rp = right.get("properties").and_then(Value::as_object);
        if lp.is_none() && rp.is_none() {
            return Ok(None);
        }
        let empty = Map::new();
        let (lp, rp) = (lp.unwrap_or(&empty), rp.unwrap_or(&empty));
        let required: Vec<&str> = required_names(left)
            .into_iter()
            .chain(required_names(right))
            .collect();
        let base = join_path(path, "properties");

        let mut out = Map::new();
        for (name, lv) in lp {
            let child = join_path(&base, name);
            let merged = match rp.get(name) {
                Some(rv) => self.merge_at(lv, rv, &child),
                None => self.constrain_undeclared(lv, right, name, &child),
            };
            out.insert(name.clone(), settle_property(merged, name, &required)?);
        }
        for (name, rv) in rp {
            if lp.contains_key(name) {
                continue;
            }
            let child = join_path(&base, name);
            let merged = self.constrain_undeclared(rv, left, name, &child);
            out.insert(name.clone(), settle_property(merged, name, &required)?);
        }
        Ok(Some(Value::Object(out)))
    }

    /// Applies what `owner` says about a property it does not declare:
    /// matching `patternProperties`, otherwise `additionalProperties`.
    fn constrain_undeclared(
        &self,
        schema: &Value,
        owner: &Map<String, Value>,
        name: &str,
        path: &str,
    ) -> Result<Value, MergeError> {
        let matching: Vec<&Value> = owner
            .get("patternProperties")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .filter(|(pattern, _)| {
                self.caches
                    .regex(pattern)
                    .is_some_and(|re| re.is_match(name))
            })
            .map(|(_, schema)| schema)
            .collect();
        let constraints = if matching.is_empty() {
            owner.get("additionalProperties").into_iter().collect()
        } else {
            matching
        };
        let mut acc = schema.clone();
        for constraint in constraints {
            acc = self.merge_at(&acc, constraint, path)?;
        }
        Ok(acc)
    }

    fn merge_items(
        &self,
        left: &Map<String, Value>,
        right: &Map<String, Value>,
        path: &str,
        out: &mut Map<String, Value>,
    ) -> Result<(), MergeError> {
        let base = join_path(path, "items");
        let extra_path = join_path(path, "additionalItems");
        let (la, ra) = (left.get("additionalItems"), right.get("additionalItems"));
        let merge_extra = |this: &Self, first: Option<&Value>, second: Option<&Value>| {
            match (first, second) {
                (Some(first), Some(second)) => this.merge_at(first, second, &extra_path).map(Some),
                (Some(one), None) | (None, Some(one)) => Ok(Some(one.clone())),
                (None, None) => Ok(None),
            }
        };

        let (items, extra) = match (left.get("items"), right.get("items")) {
            (None, None) => (None, merge_extra(self, la, ra)?),
            (Some(items), None) => (Some(items.clone()), la.cloned()),
            (None, Some(items)) => (Some(items.clone()), ra.cloned()),
            (Some(Value::Array(xs)), Some(Value::Array(ys))) => {
                let mut merged = Vec::with_capacity(xs.len().max(ys.len()));
                for i in 0..xs.len().max(ys.len()) {
                    let x = xs.get(i).or(la).unwrap_or(&TRUE_SCHEMA);
                    let y = ys.get(i).or(ra).unwrap_or(&TRUE_SCHEMA);
                    merged.push(self.merge_at(x, y, &format!("{base}[{i}]"))?);
                }
                (Some(Value::Array(merged)), merge_extra(self, la, ra)?)
            }
            (Some(Value::Array(tuple)), Some(single)) => {
                let merged = self.merge_tuple_with(tuple, single, &base)?;
                (Some(merged), merge_extra(self, la, Some(single))?)
            }
            (Some(single), Some(Value::Array(tuple))) => {
                let merged = self.merge_tuple_with(tuple, single, &base)?;
                (Some(merged), merge_extra(self, Some(single), ra)?)
            }
            (Some(x), Some(y)) => (Some(self.merge_at(x, y, &base)?), None),
        };
        if let Some(items) = items {
            out.insert("items".to_owned(), items);
        }
        if let Some(extra) = extra {
            out.insert("additionalItems".to_owned(), extra);
        }
        Ok(())
    }

    fn merge_tuple_with(
        &self,
        tuple: &[Value],
        single: &Value,
        base: &str,
    ) -> Result<Value, MergeError> {
        tuple
            .iter()
            .enumerate()
            .map(|(i, entry)| self.merge_at(entry, single, &format!("{base}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn merge_schema_maps(&self, lv: &Value, rv: &Value, path: &str) -> Value {
        let (Some(l), Some(r)) = (lv.as_object(), rv.as_object()) else {
            return lv.clone();
        };
        let mut out = l.clone();
        for (key, rs) in r {
            let merged = match l.get(key) {
                // A pattern whose schemas clash simply admits no matching key.
                Some(ls) => self
                    .merge_at(ls, rs, &join_path(path, key))
                    .unwrap_or(Value::Bool(false)),
                None => rs.clone(),
            };
            out.insert(key.clone(), merged);
        }
        Value::Object(out)
    }

    fn merge_dependencies(&self, lv: &Value, rv: &Value, path: &str) -> Result<Value, MergeError> {
        let (Some(l), Some(r)) = (lv.as_object(), rv.as_object()) else {
            return Ok(lv.clone());
        };
        let mut out = l.clone();
        for (key, rd) in r {
            let child = join_path(path, key);
            let merged = match (l.get(key), rd) {
                (None, _) => rd.clone(),
                (Some(Value::Array(a)), Value::Array(b)) => Value::Array(union_strings(a, b)),
                (Some(Value::Array(names)), schema) | (Some(schema), Value::Array(names)) => {
                    self.merge_at(schema, &json!({ "required": names }), &child)?
                }
                (Some(ld), _) => self.merge_at(ld, rd, &child)?,
            };
            out.insert(key.clone(), merged);
        }
        Ok(Value::Object(out))
    }
}

fn option_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => deep_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn pick(map: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn single(key: &str, value: &Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_owned(), value.clone());
    Value::Object(map)
}

fn required_names(map: &Map<String, Value>) -> Vec<&str> {
    map.get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect()
}

/// A clash on an optional property only forbids that property.
fn settle_property(
    merged: Result<Value, MergeError>,
    name: &str,
    required: &[&str],
) -> Result<Value, MergeError> {
    match merged {
        Ok(schema) => Ok(schema),
        Err(e) if !required.contains(&name) => {
            tracing::debug!("optional property '{name}' cannot be satisfied: {e}");
            Ok(Value::Bool(false))
        }
        Err(e) => Err(e),
    }
}

fn type_intersection<'a>(a: &'a str, b: &'a str) -> Option<&'a str> {
    if type_within(a, b) {
        Some(a)
    } else if type_within(b, a) {
        Some(b)
    } else {
        None
    }
}

fn merge_types(lv: &Value, rv: &Value, path: &str) -> Result<Value, MergeError> {
    let (left, right) = (type_names(lv), type_names(rv));
    let mut common: Vec<&str> = Vec::new();
    for l in &left {
        for r in &right {
            if let Some(t) = type_intersection(l, r)
                && !common.contains(&t)
            {
                common.push(t);
            }
        }
    }
    match common.as_slice() {
        [] => Err(MergeError::TypeConflict {
            path: path.to_owned(),
            left: lv.clone(),
            right: rv.clone(),
        }),
        [only] => Ok(Value::String((*only).to_owned())),
        many => Ok(Value::Array(
            many.iter().map(|t| Value::String((*t).to_owned())).collect(),
        )),
    }
}

fn merge_enums(lv: &Value, rv: &Value, path: &str) -> Result<Value, MergeError> {
    let (Some(left), Some(right)) = (lv.as_array(), rv.as_array()) else {
        return Ok(lv.clone());
    };
    let common: Vec<Value> = left
        .iter()
        .filter(|l| right.iter().any(|r| values_equal(l, r)))
        .cloned()
        .collect();
    if common.is_empty() {
        return Err(MergeError::EmptyEnum {
            path: path.to_owned(),
            left: lv.clone(),
            right: rv.clone(),
        });
    }
    Ok(Value::Array(common))
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn merge_multiple_of(lv: &Value, rv: &Value) -> Option<Value> {
    let (a, b) = (lv.as_f64()?, rv.as_f64()?);
    if a <= 0.0 || b <= 0.0 {
        return None;
    }
    if is_multiple_of(a, b) {
        return Some(lv.clone());
    }
    if is_multiple_of(b, a) {
        return Some(rv.clone());
    }
    let (left, right) = (lv.as_u64()?, rv.as_u64()?);
    let lcm = left.checked_div(gcd(left, right))?.checked_mul(right)?;
    Some(Value::from(lcm))
}

fn pick_bound(lv: &Value, rv: &Value, larger: bool) -> Value {
    match (lv.as_f64(), rv.as_f64()) {
        (Some(l), Some(r)) if (larger && r > l) || (!larger && r < l) => rv.clone(),
        _ => lv.clone(),
    }
}

/// Cross-checks `const`, `enum` and `type` of a merged schema.
fn reconcile_values(out: &mut Map<String, Value>, path: &str) -> Result<(), MergeError> {
    let types: Option<Vec<String>> = out
        .get("type")
        .map(|t| type_names(t).into_iter().map(str::to_owned).collect());
    let fits_type = |value: &Value| {
        types
            .as_ref()
            .is_none_or(|names| names.iter().any(|name| value_has_type(value, name)))
    };

    if let Some(constant) = out.get("const")
        && !fits_type(constant)
    {
        return Err(MergeError::ValueOutsideType {
            path: path.to_owned(),
            value: constant.clone(),
            types: out.get("type").cloned().unwrap_or(Value::Null),
        });
    }

    let Some(Value::Array(members)) = out.get("enum") else {
        return Ok(());
    };
    let constant = out.get("const");
    let kept: Vec<Value> = members
        .iter()
        .filter(|m| fits_type(m) && constant.is_none_or(|c| values_equal(m, c)))
        .cloned()
        .collect();
    if kept.is_empty() {
        return Err(match constant {
            Some(c) => MergeError::ConstNotInEnum {
                path: path.to_owned(),
                value: c.clone(),
                members: Value::Array(members.clone()),
            },
            None => MergeError::EmptyEnum {
                path: path.to_owned(),
                left: Value::Array(members.clone()),
                right: out.get("type").cloned().unwrap_or(Value::Null),
            },
        });
    }
    if kept.len() != members.len() {
        out.insert("enum".to_owned(), Value::Array(kept));
    }
    Ok(())
}

/// Drops the inclusive or exclusive numeric bound the other one already implies.
fn fold_implied_bounds(map: &mut Map<String, Value>) {
    for (soft_key, strict_key, lower) in [
        ("minimum", "exclusiveMinimum", true),
        ("maximum", "exclusiveMaximum", false),
    ] {
        let (Some(soft), Some(strict)) = (
            map.get(soft_key).and_then(Value::as_f64),
            map.get(strict_key).and_then(Value::as_f64),
        ) else {
            continue;
        };
        let soft_is_tighter = if lower { strict < soft } else { strict > soft };
        map.remove(if soft_is_tighter { strict_key } else { soft_key });
    }
}

/// Inverted bounds only empty the schema when `type` confines values to the
/// kind the bounds apply to; otherwise other kinds still pass.
fn check_bounds(out: &Map<String, Value>, path: &str) -> Result<(), MergeError> {
    for &(lower_keyword, upper_keyword, strict) in BOUND_PAIRS {
        let (Some(lower), Some(upper)) = (
            out.get(lower_keyword).and_then(Value::as_f64),
            out.get(upper_keyword).and_then(Value::as_f64),
        ) else {
            continue;
        };
        let empty = if strict { lower >= upper } else { lower > upper };
        if empty && type_confined_to(out, bound_applies_to(lower_keyword)) {
            return Err(MergeError::BoundsConflict {
                path: path.to_owned(),
                lower_keyword: lower_keyword.to_owned(),
                lower: out.get(lower_keyword).cloned().unwrap_or(Value::Null),
                upper_keyword: upper_keyword.to_owned(),
                upper: out.get(upper_keyword).cloned().unwrap_or(Value::Null),
            });
        }
    }
    Ok(())
}

fn type_confined_to(out: &Map<String, Value>, kind: Option<&str>) -> bool {
    let (Some(kind), Some(declared)) = (kind, out.get("type")) else {
        return false;
    };
    let names = type_names(declared);
    !names.is_empty() && names.iter().all(|name| type_within(name, kind))
}

/// Equivalence-preserving canonical form used by the comparator.
///
/// `true ≡ {}`, `false ≡ {"not": {}}`, set-like keywords are sorted,
/// default-valued keywords and annotations are dropped and numbers are
/// written in one representation.
#[must_use]
pub fn canonical_form(schema: &Value) -> Value {
    match schema {
        Value::Bool(true) => Value::Object(Map::new()),
        Value::Bool(false) => json!({ "not": {} }),
        Value::Object(map) => canonical_schema_map(map),
        other => canonical_value(other),
    }
}

fn canonical_schema_map(map: &Map<String, Value>) -> Value {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    let mut out = Map::new();
    for key in keys {
        if let Some(value) = map.get(key).and_then(|v| canonical_keyword(key, v)) {
            out.insert(key.clone(), value);
        }
    }
    fold_implied_bounds(&mut out);

    // Under a closed object, a `false` property is already forbidden.
    let closed = out
        .get("additionalProperties")
        .is_some_and(|ap| ap == &json!({ "not": {} }));
    if closed && !out.contains_key("patternProperties") {
        let forbidden = json!({ "not": {} });
        let mut drop_properties = false;
        if let Some(Value::Object(props)) = out.get_mut("properties") {
            props.retain(|_, schema| *schema != forbidden);
            drop_properties = props.is_empty();
        }
        if drop_properties {
            out.remove("properties");
        }
    }
    Value::Object(out)
}

fn is_empty_schema(value: &Value) -> bool {
    value.as_object().is_some_and(Map::is_empty)
}

/// Keywords that never change the accepted value set.
fn is_inert(key: &str, value: &Value) -> bool {
    match key {
        "uniqueItems" => value == &Value::Bool(false),
        "minLength" | "minItems" | "minProperties" => value.as_f64().is_some_and(|v| v <= 0.0),
        _ => shape_of(key) == KeywordShape::Annotation,
    }
}

fn canonical_keyword(key: &str, value: &Value) -> Option<Value> {
    if is_inert(key, value) {
        return None;
    }
    match (key, shape_of(key)) {
        ("type", _) => {
            let mut names: Vec<&str> = type_names(value);
            names.sort_unstable();
            names.dedup();
            Some(Value::Array(
                names.into_iter().map(|n| Value::String(n.to_owned())).collect(),
            ))
        }
        ("required", _) => {
            let mut names: Vec<&str> = value
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .collect();
            names.sort_unstable();
            names.dedup();
            (!names.is_empty()).then(|| {
                Value::Array(names.into_iter().map(|n| Value::String(n.to_owned())).collect())
            })
        }
        ("enum", _) => Some(sorted_set(
            value.as_array().map_or(&[][..], Vec::as_slice),
            canonical_value,
        )),
        ("additionalProperties" | "additionalItems" | "propertyNames", _) => {
            let canonical = canonical_form(value);
            (!is_empty_schema(&canonical)).then_some(canonical)
        }
        ("items", _) => match value {
            Value::Array(tuple) => Some(Value::Array(tuple.iter().map(canonical_form).collect())),
            single => {
                let canonical = canonical_form(single);
                (!is_empty_schema(&canonical)).then_some(canonical)
            }
        },
        (_, KeywordShape::SubSchema) => Some(canonical_form(value)),
        (_, KeywordShape::SchemaArray) => Some(sorted_set(
            value.as_array().map_or(&[][..], Vec::as_slice),
            canonical_form,
        )),
        (_, KeywordShape::SchemaMap | KeywordShape::Dependencies) => {
            let entries = value.as_object()?;
            let mut names: Vec<&String> = entries.keys().collect();
            names.sort();
            let mut out = Map::new();
            for name in names {
                let entry = &entries[name.as_str()];
                let canonical = match entry {
                    Value::Array(list) => sorted_set(list, canonical_value),
                    schema => canonical_form(schema),
                };
                out.insert(name.clone(), canonical);
            }
            (!out.is_empty()).then_some(Value::Object(out))
        }
        _ => Some(canonical_value(value)),
    }
}

fn sorted_set(items: &[Value], canonical: fn(&Value) -> Value) -> Value {
    let mut rendered: Vec<(String, Value)> = items
        .iter()
        .map(|item| {
            let c = canonical(item);
            (c.to_string(), c)
        })
        .collect();
    rendered.sort_by(|a, b| a.0.cmp(&b.0));
    rendered.dedup_by(|a, b| a.0 == b.0);
    Value::Array(rendered.into_iter().map(|(_, c)| c).collect())
}

#[allow(clippy::cast_possible_truncation)]
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if is_multiple_of(f, 1.0) && f.abs() < 9.0e15 => Value::from(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), canonical_value(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}
