//! Source-code plagiarism detection engine: language-aware
//! tokenization and AST parsing, winnowed k-gram and AST-subtree
//! fingerprints, a content-addressed store with an inverted index for
//! candidate pruning, and a pairwise similarity engine wired together
//! by a task runner.

pub mod broker;
pub mod cache;
pub mod candidates;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod lang;
pub mod model;
pub mod persist;
pub mod runner;
pub mod similarity;
pub mod store;

pub use config::EngineOptions;
pub use error::{DegradeReason, EngineError, Result};
pub use lang::Lang;
pub use model::{AstFingerprint, CandidateOverlap, FileRef, Match, PairResult, SourceFile, Task, TokenFingerprint};
pub use runner::{TaskRunner, TaskSummary};

use cache::PairCache;
use index::InvertedIndex;
use similarity::SimilarityEngine;
use std::sync::Arc;
use std::time::Duration;
use store::FingerprintStore;

/// Owns the process-wide collaborators (store, index, result cache)
/// as `Arc`s constructed once and handed out by reference — no
/// `static`/`lazy_static` engine instance (§9, "Global state").
pub struct Engine {
    pub index: Arc<InvertedIndex>,
    pub store: Arc<FingerprintStore>,
    pub cache: Arc<PairCache>,
    pub similarity: Arc<SimilarityEngine>,
}

impl Engine {
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let index = Arc::new(InvertedIndex::new());
        let cache = Arc::new(PairCache::new(max_capacity, ttl));
        let store = Arc::new(FingerprintStore::new(max_capacity, ttl, Arc::clone(&index), Arc::clone(&cache)));
        let similarity = Arc::new(SimilarityEngine::new(Arc::clone(&store), Arc::clone(&cache)));
        Self { index, store, cache, similarity }
    }

    #[must_use]
    pub fn task_runner(&self, persistent_store: Arc<dyn persist::PersistentStore>) -> TaskRunner {
        TaskRunner::new(Arc::clone(&self.similarity), Arc::clone(&self.index), persistent_store)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(100_000, Duration::from_secs(3600))
    }
}
