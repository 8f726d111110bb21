// src/store.rs
//! Fingerprint store (§4.3): a content-addressed cache of per-file
//! fingerprints keyed by `content_hash`, backed by `moka::sync::Cache`
//! — grounded in the corpus's `AstCache` over `moka::sync::Cache` with
//! TTL-based eviction, rather than a hand-rolled LRU.
//!
//! Eviction of a fingerprint must also drop its inverted-index
//! postings and any pair-result cache entries that depended on it
//! (§4.3's consistency invariant). `moka`'s eviction listener makes
//! that mechanical: it is registered once, at construction, and calls
//! back into both the index and the pair cache on every eviction
//! instead of leaving callers to remember to do it.

use crate::cache::PairCache;
use crate::fingerprint;
use crate::index::{InvertedIndex, PostingKey};
use crate::lang::{Lang, Token};
use crate::model::{AstFingerprint, TokenFingerprint};
use moka::notification::RemovalCause;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

pub struct FingerprintStore {
    token_fps: Cache<String, Arc<TokenFingerprint>>,
    ast_fps: Cache<String, Arc<AstFingerprint>>,
    index: Arc<InvertedIndex>,
}

impl FingerprintStore {
    /// `max_capacity` bounds entry *count* per fingerprint kind
    /// (§4.3's "bounded memory budget"); `ttl` is the idle-refresh
    /// lifetime (§6, "TTL is refreshable on access").
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration, index: Arc<InvertedIndex>, pair_cache: Arc<PairCache>) -> Self {
        let token_index = Arc::clone(&index);
        let token_pairs = Arc::clone(&pair_cache);
        let token_fps = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(ttl)
            .eviction_listener(move |content_hash: Arc<String>, _value, cause| {
                on_fingerprint_evicted(&content_hash, cause, &token_index, &token_pairs);
            })
            .build();

        let ast_index = Arc::clone(&index);
        let ast_pairs = Arc::clone(&pair_cache);
        let ast_fps = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(ttl)
            .eviction_listener(move |content_hash: Arc<String>, _value, cause| {
                on_fingerprint_evicted(&content_hash, cause, &ast_index, &ast_pairs);
            })
            .build();

        Self { token_fps, ast_fps, index }
    }

    #[must_use]
    pub fn get_token_fp(&self, content_hash: &str) -> Option<Arc<TokenFingerprint>> {
        self.token_fps.get(content_hash)
    }

    /// Forces `moka` to run its pending eviction maintenance rather
    /// than waiting for the next cache operation to trigger it
    /// lazily. Exposed mainly for tests that need eviction to have
    /// already happened before asserting on its side effects.
    pub fn run_pending_tasks(&self) {
        self.token_fps.run_pending_tasks();
        self.ast_fps.run_pending_tasks();
    }

    pub fn put_token_fp(&self, content_hash: &str, fp: TokenFingerprint) -> Arc<TokenFingerprint> {
        let fp = Arc::new(fp);
        self.token_fps.insert(content_hash.to_string(), Arc::clone(&fp));
        self.index.index_file(content_hash, fp.hashes.iter().copied(), PostingKey::Token);
        fp
    }

    #[must_use]
    pub fn get_ast_fp(&self, content_hash: &str) -> Option<Arc<AstFingerprint>> {
        self.ast_fps.get(content_hash)
    }

    pub fn put_ast_fp(&self, content_hash: &str, fp: AstFingerprint) -> Arc<AstFingerprint> {
        let fp = Arc::new(fp);
        self.ast_fps.insert(content_hash.to_string(), Arc::clone(&fp));
        self.index.index_file(content_hash, fp.hashes.iter().copied(), PostingKey::Ast);
        fp
    }

    /// Computes and stores both fingerprints for `content_hash` if
    /// either is missing, returning the (possibly cached) pair.
    ///
    /// # Errors
    ///
    /// Propagates tokenize/parse errors via the returned
    /// [`crate::error::EngineError`] variants; callers decide
    /// disposition per §7.
    pub fn ensure_fingerprints(
        &self,
        content_hash: &str,
        language: Lang,
        bytes: &str,
        k: usize,
        w: usize,
        min_subtree_tokens: usize,
    ) -> (Option<Arc<TokenFingerprint>>, Option<Arc<AstFingerprint>>) {
        let token_fp = match self.get_token_fp(content_hash) {
            Some(fp) => Some(fp),
            None => language
                .tokenize(content_hash, bytes)
                .ok()
                .map(|tokens: Vec<Token>| self.put_token_fp(content_hash, fingerprint::build_token_fingerprint(&tokens, k, w))),
        };

        let ast_fp = match self.get_ast_fp(content_hash) {
            Some(fp) => Some(fp),
            None => language
                .parse(content_hash, bytes)
                .ok()
                .map(|ast| self.put_ast_fp(content_hash, fingerprint::build_ast_fingerprint(&ast, min_subtree_tokens))),
        };

        (token_fp, ast_fp)
    }
}

fn on_fingerprint_evicted(content_hash: &str, cause: RemovalCause, index: &InvertedIndex, pair_cache: &PairCache) {
    if matches!(cause, RemovalCause::Explicit | RemovalCause::Replaced) {
        return;
    }
    index.remove_file(content_hash);
    pair_cache.invalidate_content_hash(content_hash);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fixture() -> FingerprintStore {
        let index = Arc::new(InvertedIndex::new());
        let pairs = Arc::new(PairCache::new(100, Duration::from_secs(60)));
        FingerprintStore::new(1000, Duration::from_secs(300), index, pairs)
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = fixture();
        let fp = TokenFingerprint { hashes: HashSet::from([1, 2, 3]), positions: Default::default(), total_kgrams: 3 };
        store.put_token_fp("h1", fp);
        assert!(store.get_token_fp("h1").is_some());
        assert_eq!(store.get_token_fp("h1").unwrap().hashes.len(), 3);
    }

    #[test]
    fn put_token_fp_populates_the_index() {
        let index = Arc::new(InvertedIndex::new());
        let pairs = Arc::new(PairCache::new(100, Duration::from_secs(60)));
        let store = FingerprintStore::new(1000, Duration::from_secs(300), Arc::clone(&index), pairs);
        let fp = TokenFingerprint { hashes: HashSet::from([7]), positions: Default::default(), total_kgrams: 1 };
        store.put_token_fp("h1", fp);
        let candidates = index.candidates(&HashSet::from([7]), PostingKey::Token, "other", 0.0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].content_hash, "h1");
    }

    #[test]
    fn ensure_fingerprints_computes_missing_and_reuses_cached() {
        let store = fixture();
        let (token_fp, ast_fp) = store.ensure_fingerprints("h1", Lang::Python, "x = 1 + 2\n", 3, 2, 1);
        assert!(token_fp.is_some());
        assert!(ast_fp.is_some());
        assert!(store.get_token_fp("h1").is_some());
        assert!(store.get_ast_fp("h1").is_some());
    }
}
