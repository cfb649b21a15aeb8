//! Explicit memoization caches shared by the components of one checker.
//!
//! All keys are derived from immutable schema content, so entries never go
//! stale. Every map sits behind its own mutex; a poisoned lock is recovered
//! because the maps hold no cross-entry invariants.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::sampler::Sampler;

/// Key of a memoized pattern-inclusion verdict: `(sub, sup, sample_count)`.
pub type VerdictKey = (String, String, usize);

#[derive(Debug, Default)]
pub struct SchemaCaches {
    regexes: Mutex<HashMap<String, Option<Regex>>>,
    samplers: Mutex<HashMap<String, Option<Arc<Sampler>>>>,
    verdicts: Mutex<HashMap<VerdictKey, Option<bool>>>,
}

/// Number of entries per cache, mostly useful in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub regexes: usize,
    pub samplers: usize,
    pub verdicts: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SchemaCaches {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled regex for `pattern`, or `None` when it does not compile.
    ///
    /// Failures are cached too, so a bad pattern is only reported once.
    pub fn regex(&self, pattern: &str) -> Option<Regex> {
        let mut regexes = lock(&self.regexes);
        if let Some(hit) = regexes.get(pattern) {
            tracing::trace!("regex cache hit for {pattern:?}");
            return hit.clone();
        }
        let compiled = match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("pattern {pattern:?} does not compile: {e}");
                None
            }
        };
        regexes.insert(pattern.to_owned(), compiled.clone());
        compiled
    }

    /// Sampler for `pattern`, built with `build` on first use.
    pub fn sampler(
        &self,
        pattern: &str,
        build: impl FnOnce() -> Option<Sampler>,
    ) -> Option<Arc<Sampler>> {
        let mut samplers = lock(&self.samplers);
        if let Some(hit) = samplers.get(pattern) {
            return hit.clone();
        }
        let built = build().map(Arc::new);
        samplers.insert(pattern.to_owned(), built.clone());
        built
    }

    /// Memoized verdict, if any. The outer `Option` is the cache lookup.
    #[must_use]
    pub fn verdict(&self, key: &VerdictKey) -> Option<Option<bool>> {
        lock(&self.verdicts).get(key).copied()
    }

    pub fn store_verdict(&self, key: VerdictKey, verdict: Option<bool>) {
        lock(&self.verdicts).insert(key, verdict);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            regexes: lock(&self.regexes).len(),
            samplers: lock(&self.samplers).len(),
            verdicts: lock(&self.verdicts).len(),
        }
    }

    pub fn clear(&self) {
        lock(&self.regexes).clear();
        lock(&self.samplers).clear();
        lock(&self.verdicts).clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_cached_including_failures() {
        let caches = SchemaCaches::new();
        assert!(caches.regex("^[a-z]+$").is_some());
        assert!(caches.regex("[unclosed").is_none());
        assert!(caches.regex("^[a-z]+$").is_some());
        assert_eq!(caches.stats().regexes, 2);
    }

    #[test]
    fn test_clear_empties_every_cache() {
        let caches = SchemaCaches::new();
        caches.regex("a");
        caches.store_verdict(("a".to_owned(), "b".to_owned(), 10), Some(false));
        caches.sampler("a", || Sampler::new("a", 20, 100));
        assert_eq!(
            caches.stats(),
            CacheStats {
                regexes: 1,
                samplers: 1,
                verdicts: 1
            }
        );
        caches.clear();
        assert_eq!(caches.stats(), CacheStats::default());
    }

    #[test]
    fn test_verdict_lookup_distinguishes_unknown_from_missing() {
        let caches = SchemaCaches::new();
        let key = ("x".to_owned(), "y".to_owned(), 5);
        assert_eq!(caches.verdict(&key), None);
        caches.store_verdict(key.clone(), None);
        assert_eq!(caches.verdict(&key), Some(None));
    }
}
