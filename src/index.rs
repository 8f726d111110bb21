// src/index.rs
//! Inverted fingerprint index (§4.3): a concurrent map from fingerprint
//! hash to the set of files that contain it, grounded in the corpus's
//! `DashMap`-backed concurrent indices (`duplicate_detector.rs`'s
//! `identifier_map`, `performance.rs`'s concurrent cache) rather than a
//! `Mutex<HashMap<_>>` — lookups and inserts for distinct hashes never
//! contend on the same shard.

use crate::model::CandidateOverlap;
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;

/// Tags a fingerprint hash with its kind so token-fingerprint hashes
/// and AST-fingerprint hashes never collide in the same keyspace, even
/// though both are plain `u64`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostingKey {
    Token(u64),
    Ast(u64),
}

/// Concurrent inverted index over fingerprint hashes. Re-indexing the
/// same `content_hash` is a no-op (idempotent retries, §5): the index
/// tracks, per `content_hash`, exactly which postings it already made,
/// so a retry diffs against that set instead of re-inserting blindly.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: DashMap<PostingKey, DashSet<String>>,
    posted_by_file: DashMap<String, HashSet<PostingKey>>,
}

impl InvertedIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts `content_hash` under every hash in `hashes`, wrapped in
    /// `kind`. A no-op for hashes already posted for this file.
    pub fn index_file(&self, content_hash: &str, hashes: impl IntoIterator<Item = u64>, kind: fn(u64) -> PostingKey) {
        let mut already = self.posted_by_file.entry(content_hash.to_string()).or_default();
        for raw in hashes {
            let key = kind(raw);
            if already.insert(key) {
                self.postings.entry(key).or_default().insert(content_hash.to_string());
            }
        }
    }

    /// Drops every posting made on behalf of `content_hash`. Called by
    /// the store's eviction listener so an evicted fingerprint never
    /// leaves a dangling posting behind (§4.3 consistency invariant).
    pub fn remove_file(&self, content_hash: &str) {
        if let Some((_, keys)) = self.posted_by_file.remove(content_hash) {
            for key in keys {
                if let Some(set) = self.postings.get(&key) {
                    set.remove(content_hash);
                }
            }
        }
    }

    /// Files sharing at least `ceil(min_overlap_ratio * hashes.len())`
    /// postings with `hashes`, excluding `self_hash`, sorted by
    /// `overlap_count` descending then `content_hash` ascending.
    #[must_use]
    pub fn candidates(
        &self,
        hashes: &HashSet<u64>,
        kind: fn(u64) -> PostingKey,
        self_hash: &str,
        min_overlap_ratio: f64,
    ) -> Vec<CandidateOverlap> {
        let mut overlap: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for &raw in hashes {
            let key = kind(raw);
            if let Some(set) = self.postings.get(&key) {
                for entry in set.iter() {
                    if entry.key() != self_hash {
                        *overlap.entry(entry.key().clone()).or_insert(0) += 1;
                    }
                }
            }
        }

        let threshold = min_overlap_required(hashes.len(), min_overlap_ratio);
        let mut out: Vec<CandidateOverlap> = overlap
            .into_iter()
            .filter(|(_, count)| *count >= threshold)
            .map(|(content_hash, overlap_count)| CandidateOverlap { content_hash, overlap_count })
            .collect();
        out.sort_by(|a, b| b.overlap_count.cmp(&a.overlap_count).then_with(|| a.content_hash.cmp(&b.content_hash)));
        out
    }
}

fn min_overlap_required(len: usize, ratio: f64) -> usize {
    ((len as f64) * ratio).ceil().max(1.0) as usize
}
