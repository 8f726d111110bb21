// src/cache.rs
//! Pair-result cache (§4.3/§4.4): memoizes `compare()` outcomes keyed
//! on the canonicalized `(content_hash_a, content_hash_b)` pair,
//! backed by `moka::sync::Cache` — the same crate the store uses for
//! per-file fingerprints, so both layers share one eviction/TTL model.
//!
//! Single-flight is `moka::sync::Cache::get_with`: concurrent callers
//! asking for the same pair block on one computation instead of
//! racing duplicate work (§9, "single-flight" guarantee in §8).
//!
//! A cache entry is only valid while both backing fingerprints exist
//! in the store (§4.3). Rather than checking that lazily on every
//! read, the cache keeps a reverse-reference map from `content_hash`
//! to the pair keys that depend on it, so the store's eviction
//! listener can invalidate proactively — `get_pair` stays O(1) with no
//! validation branch.

use crate::model::PairResult;
use dashmap::DashMap;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

pub type PairKey = (String, String);

pub struct PairCache {
    entries: Cache<PairKey, Arc<PairResult>>,
    depends_on: DashMap<String, Vec<PairKey>>,
}

impl PairCache {
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).time_to_idle(ttl).build(),
            depends_on: DashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, hash_a: &str, hash_b: &str) -> Option<Arc<PairResult>> {
        let key = PairResult::canonical_pair(hash_a, hash_b);
        self.entries.get(&key)
    }

    /// Inserts `result` under the canonicalized pair key and records
    /// the dependency on both `hash_a` and `hash_b` for invalidation.
    pub fn put(&self, hash_a: &str, hash_b: &str, result: PairResult) {
        let key = PairResult::canonical_pair(hash_a, hash_b);
        self.entries.insert(key.clone(), Arc::new(result));
        self.depends_on.entry(hash_a.to_string()).or_default().push(key.clone());
        self.depends_on.entry(hash_b.to_string()).or_default().push(key);
    }

    /// Single-flight fetch-or-compute: concurrent callers for the same
    /// pair share one invocation of `compute`.
    pub fn get_with(&self, hash_a: &str, hash_b: &str, compute: impl FnOnce() -> PairResult) -> Arc<PairResult> {
        let key = PairResult::canonical_pair(hash_a, hash_b);
        let (a, b) = (hash_a.to_string(), hash_b.to_string());
        let depends_on = &self.depends_on;
        self.entries.get_with(key.clone(), || {
            let result = Arc::new(compute());
            depends_on.entry(a).or_default().push(key.clone());
            depends_on.entry(b).or_default().push(key);
            result
        })
    }

    /// Drops every cached pair result that depended on `content_hash`.
    /// Called from the store's eviction listener when a fingerprint
    /// for that hash is evicted.
    pub fn invalidate_content_hash(&self, content_hash: &str) {
        if let Some((_, keys)) = self.depends_on.remove(content_hash) {
            for key in keys {
                self.entries.invalidate(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn result(a: &str, b: &str) -> PairResult {
        PairResult {
            hash_a: a.to_string(),
            hash_b: b.to_string(),
            token_similarity: 0.5,
            ast_similarity: 0.5,
            matches: Vec::new(),
            reason: None,
        }
    }

    #[test]
    fn get_is_order_independent() {
        let cache = PairCache::new(100, Duration::from_secs(60));
        cache.put("aaa", "bbb", result("aaa", "bbb"));
        assert!(cache.get("bbb", "aaa").is_some());
    }

    #[test]
    fn invalidate_drops_dependent_entries_from_either_side() {
        let cache = PairCache::new(100, Duration::from_secs(60));
        cache.put("aaa", "bbb", result("aaa", "bbb"));
        cache.invalidate_content_hash("bbb");
        assert!(cache.get("aaa", "bbb").is_none());
    }

    #[test]
    fn get_with_computes_once_per_key() {
        let cache = PairCache::new(100, Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            result("aaa", "bbb")
        };
        let _ = cache.get_with("aaa", "bbb", compute);
        let _ = cache.get_with("bbb", "aaa", compute);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
