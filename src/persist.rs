// src/persist.rs
//! Persistent store boundary (§6/§9, supplemented): the external
//! store that `PairResult`s are written to. Kept as a narrow trait at
//! the seam, following the corpus's habit of type-checking the
//! collaborator boundary (HTTP API, Postgres, RabbitMQ) without
//! pulling any of that machinery into the crate. The in-memory
//! implementation here is for tests and the CLI demo only.

use crate::model::PairResult;
use dashmap::DashMap;
use std::sync::Arc;

/// Composite key a `PairResult` is upserted under (§6): task plus the
/// canonicalized content-hash pair.
pub type PairResultKey = (String, String, String);

pub trait PersistentStore: Send + Sync {
    /// Upserts a `PairResult` for `(task_id, hash_a, hash_b)`.
    fn write_pair_result(&self, task_id: &str, result: PairResult);

    /// Whether a result has already been written for this key — the
    /// hook the task runner's idempotent-retry logic checks (§4.6).
    fn has_pair_result(&self, task_id: &str, hash_a: &str, hash_b: &str) -> bool;
}

/// In-memory `PersistentStore`, standing in for the external store
/// during tests and the CLI demo (§9).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: DashMap<PairResultKey, Arc<PairResult>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, task_id: &str, hash_a: &str, hash_b: &str) -> Option<Arc<PairResult>> {
        let (a, b) = PairResult::canonical_pair(hash_a, hash_b);
        self.rows.get(&(task_id.to_string(), a, b)).map(|r| Arc::clone(r.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl PersistentStore for InMemoryStore {
    fn write_pair_result(&self, task_id: &str, result: PairResult) {
        let (a, b) = PairResult::canonical_pair(&result.hash_a, &result.hash_b);
        self.rows.insert((task_id.to_string(), a, b), Arc::new(result));
    }

    fn has_pair_result(&self, task_id: &str, hash_a: &str, hash_b: &str) -> bool {
        let (a, b) = PairResult::canonical_pair(hash_a, hash_b);
        self.rows.contains_key(&(task_id.to_string(), a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(a: &str, b: &str) -> PairResult {
        PairResult { hash_a: a.into(), hash_b: b.into(), token_similarity: 0.5, ast_similarity: 0.5, matches: Vec::new(), reason: None }
    }

    #[test]
    fn write_then_has_is_order_independent() {
        let store = InMemoryStore::new();
        store.write_pair_result("t1", result("aaa", "bbb"));
        assert!(store.has_pair_result("t1", "bbb", "aaa"));
    }

    #[test]
    fn distinct_tasks_do_not_collide() {
        let store = InMemoryStore::new();
        store.write_pair_result("t1", result("aaa", "bbb"));
        assert!(!store.has_pair_result("t2", "aaa", "bbb"));
    }
}
