//! Sampling-based approximation of regex language inclusion.
//!
//! Deciding `L(sub) ⊆ L(sup)` exactly is out of reach for general regexes, so
//! the approximator draws strings matching `sub` and tests them against
//! `sup`. The verdict is one-sided:
//!
//! - `Some(false)` comes with a concrete counter-example and is certain.
//! - `Some(true)` means every sample matched: confidence, not proof.
//! - `None` means no judgement was possible (invalid pattern, no samples).

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::SchemaCaches;
use crate::config::CheckerConfig;
use crate::sampler::Sampler;

/// Patterns accepted as "matches everything" without sampling.
pub const UNIVERSAL_PATTERNS: &[&str] = &[
    ".*", ".+", "^.*$", "^.+$", "^.*", "^.+", ".*$", ".+$", "^(.*)$", "^(.+)$",
];

/// `true` for the universal patterns and for empty or whitespace-only patterns.
#[must_use]
pub fn is_trivial_pattern(pattern: &str) -> bool {
    pattern.trim().is_empty() || UNIVERSAL_PATTERNS.contains(&pattern)
}

#[derive(Debug)]
pub struct PatternApproximator {
    caches: Arc<SchemaCaches>,
    config: CheckerConfig,
}

impl PatternApproximator {
    #[must_use]
    pub fn new(caches: Arc<SchemaCaches>, config: CheckerConfig) -> Self {
        Self { caches, config }
    }

    /// Approximates `L(sub) ⊆ L(sup)` with up to `sample_count` unique samples.
    #[must_use]
    pub fn is_pattern_subset(&self, sub: &str, sup: &str, sample_count: usize) -> Option<bool> {
        if sub == sup || is_trivial_pattern(sup) {
            return Some(true);
        }
        let key = (sub.to_owned(), sup.to_owned(), sample_count);
        if let Some(verdict) = self.caches.verdict(&key) {
            tracing::trace!("pattern verdict cache hit for {sub:?} <= {sup:?}");
            return verdict;
        }
        let verdict = self.sample_inclusion(sub, sup, sample_count);
        self.caches.store_verdict(key, verdict);
        verdict
    }

    /// Both inclusion directions must hold; an unknown direction makes the answer unknown.
    #[must_use]
    pub fn are_patterns_equivalent(&self, a: &str, b: &str, sample_count: usize) -> Option<bool> {
        if a == b {
            return Some(true);
        }
        let forward = self.is_pattern_subset(a, b, sample_count)?;
        let backward = self.is_pattern_subset(b, a, sample_count)?;
        Some(forward && backward)
    }

    fn sample_inclusion(&self, sub: &str, sup: &str, sample_count: usize) -> Option<bool> {
        let sup_re = self.caches.regex(sup)?;
        let sub_re = self.caches.regex(sub)?;
        let sampler = self.caches.sampler(sub, || {
            Sampler::new(sub, self.config.max_repeat, self.config.max_sample_length)
        })?;

        let mut rng = StdRng::seed_from_u64(self.config.sample_seed);
        let max_attempts = sample_count.saturating_mul(self.config.attempts_factor);
        let mut seen: HashSet<String> = HashSet::new();
        let mut attempts = 0;
        while seen.len() < sample_count && attempts < max_attempts {
            attempts += 1;
            let Some(candidate) = sampler.sample(&mut rng) else {
                continue;
            };
            if seen.contains(&candidate) || !sub_re.is_match(&candidate) {
                continue;
            }
            if !sup_re.is_match(&candidate) {
                tracing::debug!(
                    "pattern {sub:?} is not within {sup:?}: counter-example {candidate:?}"
                );
                return Some(false);
            }
            seen.insert(candidate);
        }

        if seen.is_empty() {
            tracing::debug!("no usable samples for pattern {sub:?}");
            return None;
        }
        Some(true)
    }
}
