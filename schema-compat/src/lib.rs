//! Structural compatibility reasoning for JSON Schema (Draft-07) documents.
//!
//! The crate answers "does every value accepted by `sub` also satisfy `sup`?"
//! for pairs of schemas, computes schema intersections, resolves
//! `if`/`then`/`else` against partial data and explains failed checks with a
//! flat list of structural differences.
//!
//! Most callers only need [`SchemaChecker`]:
//!
//! ```rust
//! use schema_compat::SchemaChecker;
//! use serde_json::json;
//!
//! let checker = SchemaChecker::new();
//! assert!(checker.is_subset(&json!({"const": "x"}), &json!({"enum": ["x", "y"]})));
//! assert!(!checker.is_subset(&json!({}), &json!({"type": "string"})));
//! ```

pub mod cache;
pub mod checker;
pub mod condition;
pub mod config;
pub mod diff;
pub mod format;
pub mod keywords;
pub mod merge;
pub mod normalize;
pub mod pattern;
pub mod primitive;
pub mod sampler;
pub mod subset;
pub mod utils;

#[cfg(test)]
#[path = "checker_tests.rs"]
mod checker_tests;

// Re-export commonly used types
pub use cache::SchemaCaches;
pub use checker::{ConnectResult, ResolvedSubsetResult, SchemaChecker, format_result};
pub use condition::{Branch, ConditionResolver, ResolvedConditionResult};
pub use config::{CheckerConfig, ConfigError};
pub use diff::{DiffKind, SchemaDiff, compute_diffs};
pub use format::{is_format_subset, validate_format};
pub use merge::{MergeEngine, MergeError};
pub use normalize::normalize;
pub use pattern::{PatternApproximator, is_trivial_pattern};
pub use primitive::{AllOfMerge, MergePrimitive};
pub use subset::{BranchKind, Branches, SubsetChecker, SubsetResult, decompose_branches};
