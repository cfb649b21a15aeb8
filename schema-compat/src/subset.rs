//! Subset checking: does every value accepted by `sub` satisfy `sup`?
//!
//! Unions are split into branches first. Each atomic pair then goes through a
//! pre-check pass for the keywords the merge primitive cannot judge on its
//! own (`pattern`, `format`, `not`), after which `sub ⊆ sup` holds exactly
//! when `sub ∩ sup` is structurally equal to `sub`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::borrow::Cow;

use crate::diff::{DiffKind, SchemaDiff, compute_diffs};
use crate::format::{is_format_subset, is_known_format, validate_format};
use crate::keywords::{KeywordShape, PairedWalk, Slot, paired_positions, shape_of};
use crate::merge::MergeEngine;
use crate::normalize::normalize;
use crate::pattern::PatternApproximator;
use crate::utils::{
    infer_type, join_path, omit_keys, type_names, type_within, types_overlap, values_equal,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsetResult {
    pub is_subset: bool,
    /// `sub ∩ sup`, or `None` when the intersection is provably empty.
    pub merged: Option<Value>,
    pub diffs: Vec<SchemaDiff>,
}

impl SubsetResult {
    fn holds(merged: Value) -> Self {
        Self {
            is_subset: true,
            merged: Some(merged),
            diffs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    AnyOf,
    OneOf,
    None,
}

impl BranchKind {
    fn keyword(self) -> Option<&'static str> {
        match self {
            Self::AnyOf => Some("anyOf"),
            Self::OneOf => Some("oneOf"),
            Self::None => None,
        }
    }
}

/// Top-level alternatives of a schema. An atomic schema is its own single branch.
#[derive(Debug, Clone)]
pub struct Branches<'a> {
    pub kind: BranchKind,
    pub branches: Vec<&'a Value>,
}

/// Splits `schema` on its top-level `anyOf`, else its `oneOf`.
#[must_use]
pub fn decompose_branches(schema: &Value) -> Branches<'_> {
    for (keyword, kind) in [("anyOf", BranchKind::AnyOf), ("oneOf", BranchKind::OneOf)] {
        if let Some(Value::Array(entries)) = schema.get(keyword) {
            return Branches {
                kind,
                branches: entries.iter().collect(),
            };
        }
    }
    Branches {
        kind: BranchKind::None,
        branches: vec![schema],
    }
}

/// How the values of `sub` sit relative to a negated schema `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    /// `sub ∩ N = ∅`
    Disjoint,
    /// `sub ⊆ N`
    Contained,
    /// `sub ∩ N ≠ ∅`
    Overlaps,
    Unknown,
}

/// Keywords of a negated schema the relation table understands.
const NEGATION_KEYWORDS: [&str; 8] = [
    "type", "const", "enum", "format", "required", "properties", "anyOf", "oneOf",
];

pub struct SubsetChecker<'a> {
    engine: &'a MergeEngine,
    patterns: &'a PatternApproximator,
    sample_count: usize,
}

impl<'a> SubsetChecker<'a> {
    #[must_use]
    pub fn new(
        engine: &'a MergeEngine,
        patterns: &'a PatternApproximator,
        sample_count: usize,
    ) -> Self {
        Self {
            engine,
            patterns,
            sample_count,
        }
    }

    /// Normalizes both operands and checks `sub ⊆ sup`.
    #[must_use]
    pub fn check(&self, sub: &Value, sup: &Value) -> SubsetResult {
        self.check_normalized(&normalize(sub), &normalize(sup), "")
    }

    fn check_normalized(&self, sub: &Value, sup: &Value, path: &str) -> SubsetResult {
        if sub == &Value::Bool(false) {
            return SubsetResult {
                is_subset: true,
                merged: None,
                diffs: Vec::new(),
            };
        }
        if sup == &Value::Bool(true) || self.engine.is_equal(sup, &json!({})) {
            return SubsetResult::holds(sub.clone());
        }
        if sub == &Value::Bool(true) {
            return self.check_normalized(&json!({}), sup, path);
        }
        if self.engine.is_equal(sub, sup) {
            tracing::debug!("structurally equal at {path:?}");
            return SubsetResult::holds(sub.clone());
        }

        let decomposed = decompose_branches(sub);
        let (Some(keyword), Some(sub_map)) = (decomposed.kind.keyword(), sub.as_object()) else {
            return self.check_against_sup(sub, sup, path);
        };
        let residual = omit_keys(sub_map, &[keyword]);
        let mut is_subset = true;
        let mut diffs = Vec::new();
        let mut merged_branches = Vec::new();
        for (i, branch) in decomposed.branches.into_iter().enumerate() {
            let Some(effective) = self.with_residual(&residual, branch) else {
                tracing::debug!("{keyword}[{i}] is empty, skipping");
                continue;
            };
            let result = self.check_normalized(&effective, sup, &format!("{path}.{keyword}[{i}]"));
            is_subset &= result.is_subset;
            diffs.extend(result.diffs);
            merged_branches.extend(result.merged);
        }
        let merged = match merged_branches.len() {
            0 => None,
            1 => merged_branches.pop(),
            _ => Some(json!({ "anyOf": merged_branches })),
        };
        SubsetResult {
            is_subset,
            merged,
            diffs,
        }
    }

    /// An atomic `sub` must fit at least one branch of `sup`.
    fn check_against_sup(&self, sub: &Value, sup: &Value, path: &str) -> SubsetResult {
        let decomposed = decompose_branches(sup);
        let (Some(keyword), Some(sup_map)) = (decomposed.kind.keyword(), sup.as_object()) else {
            return self.check_atomic(sub, sup, path);
        };
        let residual = omit_keys(sup_map, &[keyword]);
        let mut closest: Option<SubsetResult> = None;
        for branch in decomposed.branches {
            let Some(effective) = self.with_residual(&residual, branch) else {
                continue;
            };
            let result = self.check_atomic(sub, &effective, path);
            if result.is_subset {
                return result;
            }
            let better = closest
                .as_ref()
                .is_none_or(|c| c.merged.is_none() && result.merged.is_some());
            if better {
                closest = Some(result);
            }
        }
        if let Some(split) = self.check_type_variants(sub, sup, path)
            && split.is_subset
        {
            tracing::debug!("each type of sub fits a branch at {path:?}");
            return split;
        }
        closest.unwrap_or_else(|| SubsetResult {
            is_subset: false,
            merged: None,
            diffs: vec![SchemaDiff {
                path: join_path(path, keyword),
                kind: DiffKind::Changed,
                expected: sub.clone(),
                actual: sup.clone(),
            }],
        })
    }

    /// Checks a multi-type `sub` one type at a time, so that
    /// `{"type": ["string", "null"]}` can fit two different sup branches.
    fn check_type_variants(&self, sub: &Value, sup: &Value, path: &str) -> Option<SubsetResult> {
        let Some(Value::Array(types)) = sub.get("type") else {
            return None;
        };
        if types.len() < 2 {
            return None;
        }
        let mut is_subset = true;
        let mut diffs = Vec::new();
        let mut merged_variants = Vec::new();
        for name in types {
            let mut only = Map::new();
            only.insert("type".to_owned(), name.clone());
            let Some(variant) = self.with_residual(&only, sub) else {
                continue;
            };
            let result = self.check_against_sup(&variant, sup, path);
            is_subset &= result.is_subset;
            diffs.extend(result.diffs);
            merged_variants.extend(result.merged);
        }
        let merged = match merged_variants.len() {
            0 => None,
            1 => merged_variants.pop(),
            _ => Some(json!({ "anyOf": merged_variants })),
        };
        Some(SubsetResult {
            is_subset,
            merged,
            diffs,
        })
    }

    /// `branch ∩ residual`, normalized; `None` when that is empty.
    fn with_residual(&self, residual: &Map<String, Value>, branch: &Value) -> Option<Value> {
        if residual.is_empty() {
            return Some(normalize(branch));
        }
        self.engine
            .merge(&Value::Object(residual.clone()), branch)
            .map(|merged| normalize(&merged))
    }

    fn check_atomic(&self, sub: &Value, sup: &Value, path: &str) -> SubsetResult {
        if self.engine.is_equal(sub, sup) {
            return SubsetResult::holds(sub.clone());
        }
        let mut failures = Vec::new();
        let sup = self.reconcile(sub, sup, path, &mut failures);
        if !failures.is_empty() {
            let merged = if self.excluded_by_not(sub, &sup) {
                None
            } else {
                self.engine.merge(sub, &sup).map(|m| normalize(&m))
            };
            return SubsetResult {
                is_subset: false,
                merged: merged.filter(|m| !self.is_unsatisfiable(m)),
                diffs: failures,
            };
        }
        match self.engine.merge_or_throw(sub, &sup) {
            Err(e) => {
                tracing::debug!("no common value at {path:?}: {e}");
                SubsetResult {
                    is_subset: false,
                    merged: None,
                    diffs: vec![e.to_diff(path)],
                }
            }
            Ok(merged) => {
                let merged = normalize(&merged);
                let is_subset = self.engine.is_equal(&merged, sub);
                let diffs = if is_subset {
                    Vec::new()
                } else {
                    compute_diffs(sub, &merged, path)
                };
                SubsetResult {
                    is_subset,
                    merged: Some(merged).filter(|m| !self.is_unsatisfiable(m)),
                    diffs,
                }
            }
        }
    }

    fn is_unsatisfiable(&self, schema: &Value) -> bool {
        self.engine.is_equal(schema, &Value::Bool(false))
    }

    /// `sub ⊆ N` for the `not: N` of `sup` leaves the two nothing in common.
    fn excluded_by_not(&self, sub: &Value, sup: &Value) -> bool {
        match (sub.as_object(), sup.get("not")) {
            (Some(sub_map), Some(negated)) => {
                self.relation(sub_map, &normalize(negated)) == Relation::Contained
            }
            _ => false,
        }
    }

    /// Settles `pattern`, `format` and `not` of `sup` against `sub` at every
    /// paired position. Settled keywords are rewritten or dropped from the
    /// returned sup; proven violations are pushed to `failures`.
    fn reconcile<'v>(
        &self,
        sub: &Value,
        sup: &'v Value,
        path: &str,
        failures: &mut Vec<SchemaDiff>,
    ) -> Cow<'v, Value> {
        let (Some(sub_map), Some(sup_map)) = (sub.as_object(), sup.as_object()) else {
            return Cow::Borrowed(sup);
        };
        let mut out: Option<Map<String, Value>> = None;
        self.reconcile_pattern(sub_map, sup_map, path, &mut out, failures);
        reconcile_format(sub_map, sup_map, path, &mut out, failures);
        self.reconcile_not(sub_map, sup_map, path, &mut out, failures);

        for paired in paired_positions(sub_map, sup_map, path, PairedWalk::Reconcile) {
            let settled = self.reconcile(paired.left, paired.right, &paired.path, failures);
            if let Cow::Owned(settled) = settled {
                place(out.get_or_insert_with(|| sup_map.clone()), &paired.slot, settled);
            }
        }
        out.map_or(Cow::Borrowed(sup), |map| Cow::Owned(Value::Object(map)))
    }

    fn reconcile_pattern(
        &self,
        sub: &Map<String, Value>,
        sup: &Map<String, Value>,
        path: &str,
        out: &mut Option<Map<String, Value>>,
        failures: &mut Vec<SchemaDiff>,
    ) {
        let Some(sup_pattern) = sup.get("pattern").and_then(Value::as_str) else {
            return;
        };
        let sub_pattern = sub.get("pattern").and_then(Value::as_str);
        let verdict = if let Some(values) = literal_values(sub) {
            let re = self.engine.caches().regex(sup_pattern);
            re.map(|re| {
                values
                    .into_iter()
                    .filter_map(Value::as_str)
                    .all(|s| re.is_match(s))
            })
        } else if let Some(sub_pattern) = sub_pattern {
            self.patterns
                .is_pattern_subset(sub_pattern, sup_pattern, self.sample_count)
        } else {
            None
        };
        match verdict {
            Some(true) => settle(sup, out, "pattern", sub.get("pattern")),
            Some(false) => failures.push(SchemaDiff {
                path: join_path(path, "pattern"),
                kind: DiffKind::Changed,
                expected: sub_pattern
                    .map_or_else(|| literal_of(sub), |p| Value::String(p.to_owned())),
                actual: Value::String(sup_pattern.to_owned()),
            }),
            None => {}
        }
    }

    fn reconcile_not(
        &self,
        sub: &Map<String, Value>,
        sup: &Map<String, Value>,
        path: &str,
        out: &mut Option<Map<String, Value>>,
        failures: &mut Vec<SchemaDiff>,
    ) {
        let Some(negated) = sup.get("not") else {
            return;
        };
        if sub.get("not").is_some_and(|own| self.engine.is_equal(own, negated)) {
            return;
        }
        match self.relation(sub, &normalize(negated)) {
            Relation::Disjoint => settle(sup, out, "not", None),
            Relation::Contained | Relation::Overlaps => failures.push(SchemaDiff {
                path: join_path(path, "not"),
                kind: DiffKind::Added,
                expected: Value::Null,
                actual: negated.clone(),
            }),
            Relation::Unknown => {}
        }
    }

    /// Finite case table relating `sub` to a (normalized) schema `negated`.
    fn relation(&self, sub: &Map<String, Value>, negated: &Value) -> Relation {
        let negated = match negated {
            Value::Bool(true) => return Relation::Contained,
            Value::Bool(false) => return Relation::Disjoint,
            Value::Object(map) if map.is_empty() => return Relation::Contained,
            Value::Object(map) => map,
            _ => return Relation::Unknown,
        };
        let groups = [
            type_relation(sub, negated),
            value_relation(sub, negated),
            format_relation(sub, negated),
            self.object_relation(sub, negated),
            self.union_relation(sub, negated),
        ];
        let relevant: Vec<Relation> = groups.into_iter().flatten().collect();
        if relevant.contains(&Relation::Disjoint) {
            return Relation::Disjoint;
        }
        let fully_described = negated.keys().all(|k| {
            NEGATION_KEYWORDS.contains(&k.as_str()) || shape_of(k) == KeywordShape::Annotation
        });
        if !fully_described || relevant.is_empty() || relevant.contains(&Relation::Unknown) {
            return Relation::Unknown;
        }
        match relevant.iter().filter(|r| **r == Relation::Overlaps).count() {
            0 => Relation::Contained,
            1 => Relation::Overlaps,
            _ => Relation::Unknown,
        }
    }

    /// `required`/`properties` of the negated schema. Only meaningful for objects.
    fn object_relation(
        &self,
        sub: &Map<String, Value>,
        negated: &Map<String, Value>,
    ) -> Option<Relation> {
        let wanted = string_list(negated.get("required"));
        let constrained = negated.get("properties").and_then(Value::as_object);
        if wanted.is_empty() && constrained.is_none() {
            return None;
        }
        let objects_only =
            confined_types(sub).is_some_and(|types| types.iter().all(|t| *t == "object"));
        let sub_required = string_list(sub.get("required"));
        let sub_properties = sub.get("properties").and_then(Value::as_object);
        let closed = sub.get("additionalProperties") == Some(&Value::Bool(false))
            && !sub.contains_key("patternProperties");

        if objects_only {
            let never_present = wanted.iter().any(|name| {
                let declared = sub_properties.and_then(|p| p.get(*name));
                (closed && declared.is_none()) || declared == Some(&Value::Bool(false))
            });
            let clashing = constrained.into_iter().flatten().any(|(name, schema)| {
                sub_required.contains(&name.as_str())
                    && sub_properties
                        .and_then(|p| p.get(name))
                        .and_then(Value::as_object)
                        .is_some_and(|own| {
                            self.relation(own, &normalize(schema)) == Relation::Disjoint
                        })
            });
            if never_present || clashing {
                return Some(Relation::Disjoint);
            }
        }

        let all_required = wanted.iter().all(|name| sub_required.contains(name));
        let all_contained = constrained.into_iter().flatten().all(|(name, schema)| {
            sub_properties
                .and_then(|p| p.get(name))
                .and_then(Value::as_object)
                .is_some_and(|own| self.relation(own, &normalize(schema)) == Relation::Contained)
        });
        Some(if all_required && all_contained {
            Relation::Contained
        } else {
            Relation::Unknown
        })
    }

    /// De Morgan: `sub ∩ (N1 ∪ N2) = ∅` iff every `sub ∩ Ni = ∅`.
    fn union_relation(
        &self,
        sub: &Map<String, Value>,
        negated: &Map<String, Value>,
    ) -> Option<Relation> {
        let alternatives = negated
            .get("anyOf")
            .or_else(|| negated.get("oneOf"))
            .and_then(Value::as_array)?;
        let relations: Vec<Relation> = alternatives
            .iter()
            .map(|alternative| self.relation(sub, &normalize(alternative)))
            .collect();
        Some(if relations.iter().all(|r| *r == Relation::Disjoint) {
            Relation::Disjoint
        } else if relations.contains(&Relation::Contained) {
            Relation::Contained
        } else if relations.contains(&Relation::Overlaps) {
            Relation::Overlaps
        } else {
            Relation::Unknown
        })
    }
}

/// Values `sub` is limited to by `const` or `enum`.
fn literal_values(sub: &Map<String, Value>) -> Option<Vec<&Value>> {
    if let Some(constant) = sub.get("const") {
        return Some(vec![constant]);
    }
    sub.get("enum")
        .and_then(Value::as_array)
        .map(|members| members.iter().collect())
}

fn literal_of(sub: &Map<String, Value>) -> Value {
    sub.get("const")
        .or_else(|| sub.get("enum"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn string_list(value: Option<&Value>) -> Vec<&str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect()
}

/// Replaces (or drops, when `replacement` is `None`) a settled sup keyword.
fn settle(
    sup: &Map<String, Value>,
    out: &mut Option<Map<String, Value>>,
    keyword: &str,
    replacement: Option<&Value>,
) {
    let target = out.get_or_insert_with(|| sup.clone());
    match replacement {
        Some(value) => {
            target.insert(keyword.to_owned(), value.clone());
        }
        None => {
            target.remove(keyword);
        }
    }
}

fn reconcile_format(
    sub: &Map<String, Value>,
    sup: &Map<String, Value>,
    path: &str,
    out: &mut Option<Map<String, Value>>,
    failures: &mut Vec<SchemaDiff>,
) {
    let Some(sup_format) = sup.get("format").and_then(Value::as_str) else {
        return;
    };
    let sub_format = sub.get("format").and_then(Value::as_str);
    let verdict = if let Some(values) = literal_values(sub) {
        let checks: Vec<Option<bool>> =
            values.iter().map(|v| validate_format(v, sup_format)).collect();
        if checks.contains(&Some(false)) {
            Some(false)
        } else if checks.iter().all(|c| *c == Some(true)) {
            Some(true)
        } else {
            None
        }
    } else if let Some(sub_format) = sub_format {
        if is_format_subset(sub_format, sup_format) == Some(true) {
            Some(true)
        } else if is_known_format(sub_format) && is_known_format(sup_format) {
            Some(false)
        } else {
            None
        }
    } else {
        None
    };
    match verdict {
        Some(true) => settle(sup, out, "format", sub.get("format")),
        Some(false) => failures.push(SchemaDiff {
            path: join_path(path, "format"),
            kind: DiffKind::Changed,
            expected: sub_format
                .map_or_else(|| literal_of(sub), |f| Value::String(f.to_owned())),
            actual: Value::String(sup_format.to_owned()),
        }),
        None => {}
    }
}

/// Types `sub` can take, derived from `const`, `enum` or `type` in that order.
fn confined_types(sub: &Map<String, Value>) -> Option<Vec<&str>> {
    if let Some(values) = literal_values(sub) {
        let mut types: Vec<&str> = values.into_iter().map(infer_type).collect();
        types.sort_unstable();
        types.dedup();
        return Some(types);
    }
    let names = type_names(sub.get("type")?);
    (!names.is_empty()).then_some(names)
}

fn type_relation(sub: &Map<String, Value>, negated: &Map<String, Value>) -> Option<Relation> {
    let excluded = type_names(negated.get("type")?);
    let Some(own) = confined_types(sub) else {
        return Some(Relation::Unknown);
    };
    Some(if own.iter().all(|t| excluded.iter().any(|e| type_within(t, e))) {
        Relation::Contained
    } else if own.iter().all(|t| excluded.iter().all(|e| !types_overlap(t, e))) {
        Relation::Disjoint
    } else {
        Relation::Overlaps
    })
}

/// `const`/`enum` of the negated schema against the literal values of `sub`.
fn value_relation(sub: &Map<String, Value>, negated: &Map<String, Value>) -> Option<Relation> {
    let excluded: Vec<&Value> = match (negated.get("const"), negated.get("enum")) {
        (Some(constant), _) => vec![constant],
        (None, Some(Value::Array(members))) => members.iter().collect(),
        _ => return None,
    };
    let Some(own) = literal_values(sub) else {
        return Some(Relation::Unknown);
    };
    let hits = own
        .iter()
        .filter(|v| excluded.iter().any(|e| values_equal(v, e)))
        .count();
    Some(if hits == 0 {
        Relation::Disjoint
    } else if hits == own.len() {
        Relation::Contained
    } else {
        Relation::Overlaps
    })
}

/// `format` only constrains strings; other kinds satisfy it vacuously.
fn format_relation(sub: &Map<String, Value>, negated: &Map<String, Value>) -> Option<Relation> {
    let format = negated.get("format").and_then(Value::as_str)?;
    let Some(types) = confined_types(sub) else {
        return Some(Relation::Unknown);
    };
    if types.iter().all(|t| *t != "string") {
        return Some(Relation::Contained);
    }
    if types.iter().any(|t| *t != "string") {
        return Some(Relation::Unknown);
    }
    if let Some(values) = literal_values(sub) {
        let checks: Vec<Option<bool>> =
            values.iter().map(|v| validate_format(v, format)).collect();
        return Some(if checks.iter().all(|c| *c == Some(false)) {
            Relation::Disjoint
        } else if checks.iter().all(|c| *c == Some(true)) {
            Relation::Contained
        } else {
            Relation::Unknown
        });
    }
    let own = sub.get("format").and_then(Value::as_str);
    Some(match own {
        Some(own) if own == format || is_format_subset(own, format) == Some(true) => {
            Relation::Contained
        }
        _ => Relation::Unknown,
    })
}

/// Sub-schemas at the same position on both sides, as far as pre-checks descend.
/// Puts a reconciled child back where it came from in the sup schema.
fn place(map: &mut Map<String, Value>, slot: &Slot, value: Value) {
    let target = match slot {
        Slot::Keyed(keyword, key) => map
            .get_mut(*keyword)
            .and_then(Value::as_object_mut)
            .and_then(|entries| entries.get_mut(key)),
        Slot::Single(keyword) => map.get_mut(*keyword),
        Slot::Indexed(i) => map
            .get_mut("items")
            .and_then(Value::as_array_mut)
            .and_then(|items| items.get_mut(*i)),
    };
    if let Some(target) = target {
        *target = value;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::cache::SchemaCaches;
    use crate::config::CheckerConfig;
    use std::sync::Arc;

    struct Fixture {
        engine: MergeEngine,
        patterns: PatternApproximator,
    }

    impl Fixture {
        fn new() -> Self {
            let caches = Arc::new(SchemaCaches::new());
            Self {
                engine: MergeEngine::new(Arc::clone(&caches)),
                patterns: PatternApproximator::new(caches, CheckerConfig::default()),
            }
        }

        fn check(&self, sub: &Value, sup: &Value) -> SubsetResult {
            SubsetChecker::new(&self.engine, &self.patterns, 200).check(sub, sup)
        }
    }

    #[test]
    fn test_decompose_atomic_borrows_input() {
        let schema = json!({"type": "string"});
        let branches = decompose_branches(&schema);
        assert_eq!(branches.kind, BranchKind::None);
        assert!(std::ptr::eq(branches.branches[0], &schema));

        let union = json!({"oneOf": [{"type": "string"}, {"type": "number"}]});
        let branches = decompose_branches(&union);
        assert_eq!(branches.kind, BranchKind::OneOf);
        assert_eq!(branches.branches.len(), 2);
    }

    #[test]
    fn test_boolean_fast_paths() {
        let f = Fixture::new();
        assert!(f.check(&json!(false), &json!({"type": "string"})).is_subset);
        assert!(f.check(&json!({"type": "string"}), &json!(true)).is_subset);
        assert!(f.check(&json!(true), &json!({"title": "anything"})).is_subset);
        assert!(!f.check(&json!(true), &json!({"type": "string"})).is_subset);
        assert!(!f.check(&json!({"type": "string"}), &json!(false)).is_subset);
    }

    #[test]
    fn test_sub_branches_must_all_fit() {
        let f = Fixture::new();
        let sup = json!({"type": ["string", "number"]});
        assert!(f.check(&json!({"anyOf": [{"type": "string"}, {"type": "integer"}]}), &sup).is_subset);
        let result = f.check(&json!({"anyOf": [{"type": "string"}, {"type": "boolean"}]}), &sup);
        assert!(!result.is_subset);
        assert!(result.diffs.iter().all(|d| d.path.starts_with(".anyOf[1]")));
    }

    #[test]
    fn test_sub_residual_applies_to_each_branch() {
        let f = Fixture::new();
        let sub = json!({"type": "string", "anyOf": [{"minLength": 2}, {"const": "x"}]});
        assert!(f.check(&sub, &json!({"type": "string"})).is_subset);
    }

    #[test]
    fn test_sup_branch_selection() {
        let f = Fixture::new();
        let sup = json!({"anyOf": [{"type": "string"}, {"type": "number", "minimum": 0}]});
        assert!(f.check(&json!({"type": "integer", "minimum": 5}), &sup).is_subset);
        assert!(!f.check(&json!({"type": "integer"}), &sup).is_subset);
    }

    #[test]
    fn test_multi_type_sub_spreads_over_sup_branches() {
        let f = Fixture::new();
        let sup = json!({"anyOf": [{"type": "string"}, {"type": "null"}]});
        let result = f.check(&json!({"type": ["string", "null"]}), &sup);
        assert!(result.is_subset);
        assert!(result.diffs.is_empty());
        assert!(result.merged.is_some());

        let bounded = json!({"type": ["string", "integer"], "minLength": 2, "minimum": 0});
        let sup = json!({"oneOf": [{"type": "string"}, {"type": "number", "minimum": -1}]});
        assert!(f.check(&bounded, &sup).is_subset);

        let sup = json!({"anyOf": [{"type": "string"}, {"type": "number"}]});
        assert!(!f.check(&json!({"type": ["string", "null"]}), &sup).is_subset);
    }

    #[test]
    fn test_pattern_precheck() {
        let f = Fixture::new();
        let sup = json!({"type": "string", "pattern": "^[a-z]+$"});
        assert!(f.check(&json!({"type": "string", "pattern": "^[a-z]{3}$"}), &sup).is_subset);
        assert!(f.check(&json!({"const": "abc"}), &sup).is_subset);
        let result = f.check(&json!({"enum": ["abc", "A1"]}), &sup);
        assert!(!result.is_subset);
        assert_eq!(result.diffs[0].path, ".pattern");
    }

    #[test]
    fn test_pattern_precheck_in_nested_positions() {
        let f = Fixture::new();
        let sub = json!({"properties": {"code": {"type": "string", "pattern": "^[A-Z]{2}$"}}, "items": {"pattern": "^x+$"}});
        let sup = json!({"properties": {"code": {"type": "string", "pattern": "^[A-Z]+$"}}, "items": {"pattern": "^x"}});
        assert!(f.check(&sub, &sup).is_subset);
    }

    #[test]
    fn test_format_precheck() {
        let f = Fixture::new();
        let sup = json!({"type": "string", "format": "idn-email"});
        assert!(f.check(&json!({"type": "string", "format": "email"}), &sup).is_subset);
        assert!(f.check(&json!({"const": "a@example.com"}), &sup).is_subset);
        assert!(!f.check(&json!({"type": "string", "format": "uri"}), &sup).is_subset);
        assert!(!f.check(&json!({"type": "string"}), &sup).is_subset);
    }

    #[test]
    fn test_not_case_table() {
        let f = Fixture::new();
        let cases = [
            (json!({"type": "string", "const": "active"}), json!({"not": {"const": "deleted"}}), true),
            (json!({"const": "deleted"}), json!({"not": {"const": "deleted"}}), false),
            (json!({"type": "string"}), json!({"not": {"type": "number"}}), true),
            (json!({"type": "integer"}), json!({"not": {"type": "number"}}), false),
            (json!({"enum": ["a", "b"]}), json!({"not": {"enum": ["c", "d"]}}), true),
            (json!({"enum": ["a", "c"]}), json!({"not": {"enum": ["c", "d"]}}), false),
            (
                json!({"type": "string"}),
                json!({"not": {"anyOf": [{"type": "number"}, {"type": "boolean"}]}}),
                true,
            ),
            (
                json!({"type": "object", "properties": {"kind": {"const": "a"}}, "required": ["kind"]}),
                json!({"not": {"properties": {"kind": {"const": "b"}}, "required": ["kind"]}}),
                true,
            ),
            (
                json!({"type": "object", "properties": {"a": {}}, "additionalProperties": false}),
                json!({"not": {"required": ["b"]}}),
                true,
            ),
            (json!({"const": "x@y.com"}), json!({"not": {"format": "ipv4"}}), true),
            (json!({"type": "string"}), json!({"not": false}), true),
            (json!({"type": "string"}), json!({"not": true}), false),
        ];
        for (sub, sup, expected) in &cases {
            assert_eq!(f.check(sub, sup).is_subset, *expected, "{sub} vs {sup}");
        }
    }

    #[test]
    fn test_uncovered_not_defers_to_merge() {
        let f = Fixture::new();
        let result = f.check(&json!({"type": "string"}), &json!({"not": {"minLength": 3}}));
        assert!(!result.is_subset);
        assert!(result.merged.is_some());
        assert!(result.diffs.iter().any(|d| d.path == ".not"));
    }

    #[test]
    fn test_excluded_sub_has_no_merge() {
        let f = Fixture::new();
        for (sub, sup) in [
            (json!({"const": "deleted"}), json!({"not": {"const": "deleted"}})),
            (json!({"type": "integer"}), json!({"not": {"type": "number"}})),
            (json!({"type": "string", "minLength": 1}), json!({"type": "string", "not": {"type": "string"}})),
        ] {
            let result = f.check(&sub, &sup);
            assert!(!result.is_subset, "{sub} vs {sup}");
            assert!(result.merged.is_none(), "{sub} vs {sup}");
            assert!(result.diffs.iter().any(|d| d.path == ".not"));
        }

        let partial = f.check(&json!({"enum": ["a", "c"]}), &json!({"not": {"enum": ["c", "d"]}}));
        assert!(!partial.is_subset);
        assert!(partial.merged.is_some());
    }

    #[test]
    fn test_false_operands_have_no_merge() {
        let f = Fixture::new();
        let rejected = f.check(&json!({"type": "string"}), &json!(false));
        assert!(!rejected.is_subset);
        assert!(rejected.merged.is_none());
        assert_eq!(rejected.diffs.len(), 1);
        assert_eq!(rejected.diffs[0].path, "");

        let empty = f.check(&json!(false), &json!({"type": "string"}));
        assert!(empty.is_subset);
        assert!(empty.merged.is_none());
        assert!(empty.diffs.is_empty());
    }

    #[test]
    fn test_incompatible_pair_has_no_merge_and_explains_why() {
        let f = Fixture::new();
        let result = f.check(&json!({"const": "a"}), &json!({"const": "b"}));
        assert!(!result.is_subset);
        assert!(result.merged.is_none());
        assert_eq!(result.diffs.len(), 1);
        assert_eq!(result.diffs[0].path, ".const");
    }

    #[test]
    fn test_wider_sub_reports_added_constraints() {
        let f = Fixture::new();
        let result = f.check(
            &json!({"type": "object", "properties": {"age": {"type": "integer"}}}),
            &json!({"type": "object", "properties": {"age": {"type": "integer", "minimum": 0}}, "required": ["age"]}),
        );
        assert!(!result.is_subset);
        let paths: Vec<&str> = result.diffs.iter().map(|d| d.path.as_str()).collect();
        assert!(paths.contains(&".properties.age.minimum"));
        assert!(paths.contains(&".required"));
    }
}
