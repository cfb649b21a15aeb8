//! The [`SchemaChecker`] facade and result rendering.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::cache::SchemaCaches;
use crate::condition::{ConditionResolver, ResolvedConditionResult};
use crate::config::CheckerConfig;
use crate::diff::DiffKind;
use crate::merge::MergeEngine;
use crate::normalize::normalize;
use crate::pattern::PatternApproximator;
use crate::primitive::MergePrimitive;
use crate::subset::{SubsetChecker, SubsetResult};
use crate::utils::display_path;

/// Direction label attached to [`SchemaChecker::can_connect`] results.
pub const CONNECT_DIRECTION: &str = "sourceOutput \u{2286} targetInput";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
    #[serde(flatten)]
    pub result: SubsetResult,
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSubsetResult {
    #[serde(flatten)]
    pub result: SubsetResult,
    pub resolved_sub: ResolvedConditionResult,
    pub resolved_sup: ResolvedConditionResult,
}

/// Entry point of the crate.
///
/// Owns the configuration, the caches and the components built on them. A
/// checker is `Send + Sync`; its caches only ever grow until
/// [`SchemaChecker::clear_caches`] is called.
#[derive(Debug)]
pub struct SchemaChecker {
    config: CheckerConfig,
    caches: Arc<SchemaCaches>,
    engine: MergeEngine,
    patterns: PatternApproximator,
}

impl Default for SchemaChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CheckerConfig) -> Self {
        let caches = Arc::new(SchemaCaches::new());
        let engine = MergeEngine::new(Arc::clone(&caches));
        Self::assemble(config, caches, engine)
    }

    /// Uses `primitive` instead of the built-in [`crate::AllOfMerge`].
    #[must_use]
    pub fn with_primitive(config: CheckerConfig, primitive: Box<dyn MergePrimitive>) -> Self {
        let caches = Arc::new(SchemaCaches::new());
        let engine = MergeEngine::with_primitive(primitive, Arc::clone(&caches));
        Self::assemble(config, caches, engine)
    }

    fn assemble(config: CheckerConfig, caches: Arc<SchemaCaches>, engine: MergeEngine) -> Self {
        let patterns = PatternApproximator::new(Arc::clone(&caches), config.clone());
        Self {
            config,
            caches,
            engine,
            patterns,
        }
    }

    fn subset_checker(&self) -> SubsetChecker<'_> {
        SubsetChecker::new(
            &self.engine,
            &self.patterns,
            self.config.pattern_sample_count,
        )
    }

    #[must_use]
    pub fn is_subset(&self, sub: &Value, sup: &Value) -> bool {
        self.check(sub, sup).is_subset
    }

    /// Checks `sub ⊆ sup` and explains a failure with diffs.
    #[must_use]
    pub fn check(&self, sub: &Value, sup: &Value) -> SubsetResult {
        let result = self.subset_checker().check(sub, sup);
        tracing::debug!(
            "subset check finished: is_subset={}, diffs={}",
            result.is_subset,
            result.diffs.len()
        );
        result
    }

    /// Can the output of a producer feed a consumer expecting `target_input`?
    #[must_use]
    pub fn can_connect(&self, source_output: &Value, target_input: &Value) -> ConnectResult {
        ConnectResult {
            result: self.check(source_output, target_input),
            direction: CONNECT_DIRECTION.to_owned(),
        }
    }

    #[must_use]
    pub fn is_equal(&self, a: &Value, b: &Value) -> bool {
        self.engine.is_equal(&normalize(a), &normalize(b))
    }

    /// Normalized `a ∩ b`, or `None` when the schemas cannot both hold.
    #[must_use]
    pub fn intersect(&self, a: &Value, b: &Value) -> Option<Value> {
        self.engine
            .merge(&normalize(a), &normalize(b))
            .map(|merged| normalize(&merged))
            .filter(|merged| !self.engine.is_equal(merged, &Value::Bool(false)))
    }

    #[must_use]
    pub fn resolve_conditions(&self, schema: &Value, data: &Value) -> ResolvedConditionResult {
        ConditionResolver::new(&self.engine).resolve(schema, data)
    }

    /// Resolves the conditionals of both sides, then checks the results.
    /// `sup_data` defaults to `sub_data`.
    #[must_use]
    pub fn check_resolved(
        &self,
        sub: &Value,
        sup: &Value,
        sub_data: &Value,
        sup_data: Option<&Value>,
    ) -> ResolvedSubsetResult {
        let resolved_sub = self.resolve_conditions(sub, sub_data);
        let resolved_sup = self.resolve_conditions(sup, sup_data.unwrap_or(sub_data));
        ResolvedSubsetResult {
            result: self.check(&resolved_sub.resolved, &resolved_sup.resolved),
            resolved_sub,
            resolved_sup,
        }
    }

    #[must_use]
    pub fn normalize(&self, schema: &Value) -> Value {
        normalize(schema)
    }

    #[must_use]
    pub fn is_pattern_subset(&self, sub: &str, sup: &str) -> Option<bool> {
        self.patterns
            .is_pattern_subset(sub, sup, self.config.pattern_sample_count)
    }

    #[must_use]
    pub fn are_patterns_equivalent(&self, a: &str, b: &str) -> Option<bool> {
        self.patterns
            .are_patterns_equivalent(a, b, self.config.pattern_sample_count)
    }

    #[must_use]
    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    #[must_use]
    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    #[must_use]
    pub fn caches(&self) -> &SchemaCaches {
        &self.caches
    }

    pub fn clear_caches(&self) {
        self.caches.clear();
    }
}

/// Renders a result as one verdict line followed by one line per diff.
#[must_use]
pub fn format_result(label: &str, result: &SubsetResult) -> String {
    let mark = if result.is_subset {
        "\u{2705}"
    } else {
        "\u{274C}"
    };
    let mut lines = vec![format!("{mark} {label}: {}", result.is_subset)];
    for diff in &result.diffs {
        let path = display_path(&diff.path);
        lines.push(match diff.kind {
            DiffKind::Added => format!("  + {path}: {}", diff.actual),
            DiffKind::Removed => format!("  - {path}: was {}", diff.expected),
            DiffKind::Changed => {
                format!("  ~ {path}: {} \u{2192} {}", diff.expected, diff.actual)
            }
        });
    }
    lines.join("\n")
}
