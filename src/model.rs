// src/model.rs
//! Core data model (§3): the shapes that flow between the language
//! adapter, the fingerprint builder, the store/index, and the
//! similarity engine. Kept free of any I/O — these are plain value
//! types, `serde`-derived so they cross the store/index/wire
//! boundaries without a bespoke codec.

use crate::error::DegradeReason;
use crate::lang::Lang;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An immutable, content-addressed source file. The engine only ever
/// holds a read-only view — ownership of the bytes belongs to the
/// submission record (§9, "treat it as an injected collaborator").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub content_hash: String,
    pub language: Lang,
    pub line_count: usize,
    pub bytes: std::sync::Arc<str>,
}

impl SourceFile {
    /// `content_hash` is the hex-encoded SHA-256 digest of the raw
    /// bytes, with no language or path mixed in (§6).
    #[must_use]
    pub fn new(language: Lang, bytes: impl Into<std::sync::Arc<str>>) -> Self {
        let bytes = bytes.into();
        let content_hash = content_hash(bytes.as_bytes());
        let line_count = bytes.lines().count().max(1);
        Self { content_hash, language, line_count, bytes }
    }
}

/// Hex-encoded SHA-256 digest of raw file bytes. The one and only
/// place a `content_hash` is minted, so every caller gets the same
/// digest for the same bytes regardless of where those bytes came
/// from (disk, network, a test fixture).
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// A 1-based, inclusive line span within a `SourceFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineSpan {
    #[must_use]
    pub fn new(start_line: usize, end_line: usize) -> Self {
        debug_assert!(start_line <= end_line);
        Self { start_line, end_line }
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            start_line: self.start_line.min(other.start_line),
            end_line: self.end_line.max(other.end_line),
        }
    }
}

/// Winnowed k-gram fingerprint of a file's normalized token stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenFingerprint {
    pub hashes: HashSet<u64>,
    pub positions: HashMap<u64, Vec<LineSpan>>,
    pub total_kgrams: usize,
}

impl TokenFingerprint {
    /// §3 invariant: every hash is a key in `positions`, with at
    /// least one (valid) span.
    #[must_use]
    pub fn is_consistent(&self, line_count: usize) -> bool {
        self.hashes.iter().all(|h| {
            self.positions.get(h).is_some_and(|spans| {
                !spans.is_empty()
                    && spans
                        .iter()
                        .all(|s| s.start_line <= s.end_line && s.end_line <= line_count && s.start_line >= 1)
            })
        })
    }
}

/// AST-subtree fingerprint: one hash per subtree of at least
/// `min_subtree_tokens` normalized tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstFingerprint {
    pub hashes: HashSet<u64>,
    pub total_subtrees: usize,
}

/// A line-range correspondence between file A and file B, grounded in
/// at least one shared token-fingerprint hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

/// Result of comparing an unordered pair of files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairResult {
    pub hash_a: String,
    pub hash_b: String,
    pub token_similarity: f64,
    pub ast_similarity: f64,
    pub matches: Vec<Match>,
    /// Set when one side of the pair could only contribute a
    /// degraded (empty) fingerprint — see §7.
    pub reason: Option<DegradeReason>,
}

impl PairResult {
    /// Canonicalizes `(hash_a, hash_b)` so `hash_a < hash_b`
    /// lexicographically, matching the cache/index key convention.
    #[must_use]
    pub fn canonical_pair(hash_a: &str, hash_b: &str) -> (String, String) {
        if hash_a <= hash_b {
            (hash_a.to_string(), hash_b.to_string())
        } else {
            (hash_b.to_string(), hash_a.to_string())
        }
    }
}

/// A file reference within a `Task`, as delivered by the submission
/// surface (§6) — referenced only by id, bytes resolved separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
    pub content_hash: String,
    pub language: Lang,
}

/// A batch of files submitted together for pairwise comparison.
/// Owned by the external task system; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub files: Vec<FileRef>,
    pub language: Lang,
}

/// Candidate returned by the inverted index / candidate selector:
/// a file sharing enough fingerprint hashes to warrant full
/// comparison, plus how many hashes it shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateOverlap {
    pub content_hash: String,
    pub overlap_count: usize,
}
