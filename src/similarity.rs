// src/similarity.rs
//! Similarity engine (§4.4): compares a pair of files by fingerprint
//! and reconstructs the line-range matches behind the score, with the
//! result cache sitting in front as a single-flight layer.

use crate::cache::PairCache;
use crate::config::EngineOptions;
use crate::error::{DegradeReason, EngineError, Result};
use crate::lang::Lang;
use crate::model::{AstFingerprint, LineSpan, Match, PairResult, TokenFingerprint};
use crate::store::FingerprintStore;
use std::collections::HashSet;
use std::sync::Arc;

pub struct SimilarityEngine {
    store: Arc<FingerprintStore>,
    cache: Arc<PairCache>,
}

impl SimilarityEngine {
    #[must_use]
    pub fn new(store: Arc<FingerprintStore>, cache: Arc<PairCache>) -> Self {
        Self { store, cache }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<FingerprintStore> {
        &self.store
    }

    /// Computes and caches fingerprints for `content_hash` without
    /// comparing it against anything yet — used by the task runner to
    /// index a task's own files before enumerating pairs.
    pub fn prime(&self, content_hash: &str, language: Lang, bytes: &str, options: &EngineOptions) {
        self.store.ensure_fingerprints(content_hash, language, bytes, options.k, options.w, options.min_subtree_tokens);
    }

    /// Compares two files identified by `(content_hash, language,
    /// bytes)`, consulting and populating the result cache.
    ///
    /// Never fails on a tokenize error: a side that can't be tokenized
    /// yields a degraded `PairResult` (`(0.0, 0.0, [])`, `reason:
    /// Some(TokenizeFailed)`) that is cached and returned like any
    /// other result (§7).
    ///
    /// # Errors
    ///
    /// Does not return [`EngineError::FingerprintUnavailable`] — unlike
    /// [`Self::compare_cached`], this always has bytes on hand to
    /// (re)compute a missing fingerprint, so a miss here is a tokenize
    /// failure, not unavailability.
    pub fn compare(
        &self,
        a: (&str, Lang, &str),
        b: (&str, Lang, &str),
        options: &EngineOptions,
    ) -> Result<Arc<PairResult>> {
        if let Some(cached) = self.cache.get(a.0, b.0) {
            return Ok(cached);
        }
        let (token_a, ast_a) = self.store.ensure_fingerprints(a.0, a.1, a.2, options.k, options.w, options.min_subtree_tokens);
        let (token_b, ast_b) = self.store.ensure_fingerprints(b.0, b.1, b.2, options.k, options.w, options.min_subtree_tokens);
        // `ensure_fingerprints` just attempted to tokenize both sides, so a
        // still-missing token fingerprint means tokenization itself failed
        // (§7), not a transient cache miss — degrade rather than error.
        self.finish(a.0, b.0, token_a, ast_a, token_b, ast_b, options, true)
    }

    /// Compares two files already fingerprinted and present in the
    /// store, without needing their bytes. Used for cross-task
    /// candidates, which only ever reach the runner because their
    /// fingerprint was already indexed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FingerprintUnavailable`] if either
    /// side's token fingerprint has since been evicted from the store.
    pub fn compare_cached(&self, hash_a: &str, hash_b: &str, options: &EngineOptions) -> Result<Arc<PairResult>> {
        if let Some(cached) = self.cache.get(hash_a, hash_b) {
            return Ok(cached);
        }
        let token_a = self.store.get_token_fp(hash_a);
        let token_b = self.store.get_token_fp(hash_b);
        let ast_a = self.store.get_ast_fp(hash_a);
        let ast_b = self.store.get_ast_fp(hash_b);
        // Nothing here attempted to (re)compute a missing fingerprint, so a
        // missing token fingerprint is genuinely unavailable (evicted, or
        // never indexed) rather than a known tokenize failure — error, so
        // the runner gets a chance to retry with a fresh computation (§7).
        self.finish(hash_a, hash_b, token_a, ast_a, token_b, ast_b, options, false)
    }

    /// Scores and caches a pair from already-resolved (possibly missing)
    /// fingerprints. `degrade_on_missing_token` distinguishes the two
    /// reasons a token fingerprint can be absent: `true` means tokenizing
    /// was just attempted and failed (§7's permanent `TokenizeFailed`
    /// degrade, written normally), `false` means the fingerprint simply
    /// wasn't found in the store (§7's retryable `FingerprintUnavailable`).
    fn finish(
        &self,
        hash_a: &str,
        hash_b: &str,
        token_a: Option<Arc<TokenFingerprint>>,
        ast_a: Option<Arc<AstFingerprint>>,
        token_b: Option<Arc<TokenFingerprint>>,
        ast_b: Option<Arc<AstFingerprint>>,
        options: &EngineOptions,
        degrade_on_missing_token: bool,
    ) -> Result<Arc<PairResult>> {
        if token_a.is_none() || token_b.is_none() {
            if degrade_on_missing_token {
                let result = PairResult {
                    hash_a: hash_a.to_string(),
                    hash_b: hash_b.to_string(),
                    token_similarity: 0.0,
                    ast_similarity: 0.0,
                    matches: Vec::new(),
                    reason: Some(DegradeReason::TokenizeFailed),
                };
                self.cache.put(hash_a, hash_b, result.clone());
                return Ok(Arc::new(result));
            }
            let missing = if token_a.is_none() { hash_a } else { hash_b };
            return Err(EngineError::FingerprintUnavailable(missing.to_string()));
        }
        let token_a = token_a.expect("checked above");
        let token_b = token_b.expect("checked above");

        let reason = match (ast_a.is_some(), ast_b.is_some()) {
            (true, true) => None,
            _ => Some(DegradeReason::ParseFailed),
        };

        let token_similarity = jaccard(&token_a.hashes, &token_b.hashes);

        if token_similarity < options.candidate_threshold {
            let result = PairResult {
                hash_a: hash_a.to_string(),
                hash_b: hash_b.to_string(),
                token_similarity,
                ast_similarity: 0.0,
                matches: Vec::new(),
                reason,
            };
            self.cache.put(hash_a, hash_b, result.clone());
            return Ok(Arc::new(result));
        }

        let ast_similarity = match (&ast_a, &ast_b) {
            (Some(fp_a), Some(fp_b)) => jaccard(&fp_a.hashes, &fp_b.hashes),
            _ => 0.0,
        };

        let matches = reconstruct_matches(&token_a, &token_b, options.gap, options.min_match_kgrams);

        let result = PairResult {
            hash_a: hash_a.to_string(),
            hash_b: hash_b.to_string(),
            token_similarity,
            ast_similarity,
            matches,
            reason,
        };
        self.cache.put(hash_a, hash_b, result.clone());
        Ok(Arc::new(result))
    }
}

fn jaccard(a: &HashSet<u64>, b: &HashSet<u64>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    a: LineSpan,
    b: LineSpan,
}

/// §4.4 steps 6-8: form candidate spans from shared k-gram positions,
/// then greedily merge left-to-right on A with a gap tolerance,
/// keeping B-ranges monotonic so an ambiguous B-mapping doesn't fold
/// unrelated regions together.
fn reconstruct_matches(
    a: &crate::model::TokenFingerprint,
    b: &crate::model::TokenFingerprint,
    gap: usize,
    min_match_kgrams: usize,
) -> Vec<Match> {
    let shared: HashSet<u64> = a.hashes.intersection(&b.hashes).copied().collect();

    let mut candidates = Vec::new();
    for h in &shared {
        let Some(a_spans) = a.positions.get(h) else { continue };
        let Some(b_spans) = b.positions.get(h) else { continue };
        for &a_span in a_spans {
            for &b_span in b_spans {
                candidates.push((Candidate { a: a_span, b: b_span }, *h));
            }
        }
    }
    candidates.sort_by_key(|(c, _)| c.a.start_line);

    let mut groups: Vec<(Candidate, HashSet<u64>)> = Vec::new();
    for (candidate, hash) in candidates {
        if let Some((last, hashes)) = groups.last_mut() {
            let a_touches = candidate.a.start_line <= last.a.end_line + gap;
            let b_touches = candidate.b.start_line <= last.b.end_line + gap;
            let b_monotonic = candidate.b.start_line + gap >= last.b.end_line;
            if a_touches && b_touches && b_monotonic {
                *last = Candidate { a: last.a.union(candidate.a), b: last.b.union(candidate.b) };
                hashes.insert(hash);
                continue;
            }
        }
        groups.push((candidate, HashSet::from([hash])));
    }

    let mut matches: Vec<Match> = groups
        .into_iter()
        .filter(|(_, hashes)| hashes.len() >= min_match_kgrams)
        .map(|(c, _)| Match { a_start: c.a.start_line, a_end: c.a.end_line, b_start: c.b.start_line, b_end: c.b.end_line })
        .collect();

    drop_a_overlaps(&mut matches);
    matches
}

/// Post-condition (§4.4 step 8): non-overlapping A-ranges. When the
/// merge above still yields an A-overlap (an ambiguous B-mapping fed
/// two groups the same A-territory), keep the earlier group and drop
/// the later one's overlapping continuation.
fn drop_a_overlaps(matches: &mut Vec<Match>) {
    matches.sort_by_key(|m| m.a_start);
    let mut kept: Vec<Match> = Vec::with_capacity(matches.len());
    for m in matches.drain(..) {
        if kept.last().is_some_and(|last| m.a_start <= last.a_end) {
            continue;
        }
        kept.push(m);
    }
    *matches = kept;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InvertedIndex;
    use std::time::Duration;

    fn engine() -> SimilarityEngine {
        let index = Arc::new(InvertedIndex::new());
        let cache = Arc::new(PairCache::new(1000, Duration::from_secs(300)));
        let store = Arc::new(FingerprintStore::new(1000, Duration::from_secs(300), index, Arc::clone(&cache)));
        SimilarityEngine::new(store, cache)
    }

    #[test]
    fn identical_files_score_one() {
        let eng = engine();
        let opts = EngineOptions::default();
        let src = "def f(a, b, c, d, e):\n    return a + b + c + d + e\n";
        let result = eng.compare(("h1", Lang::Python, src), ("h2", Lang::Python, src), &opts).unwrap();
        assert!((result.token_similarity - 1.0).abs() < 1e-9);
        assert!((result.ast_similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_files_exit_early_with_no_matches() {
        let eng = engine();
        let opts = EngineOptions::default();
        let a = "def f(a, b, c, d, e):\n    return a + b + c + d + e\n";
        let b = "class Widget:\n    def render(self):\n        print('hello world')\n";
        let result = eng.compare(("h1", Lang::Python, a), ("h2", Lang::Python, b), &opts).unwrap();
        assert!(result.token_similarity < opts.candidate_threshold);
        assert!(result.matches.is_empty());
        assert!((result.ast_similarity - 0.0).abs() < 1e-9);
    }

    #[test]
    fn compare_is_symmetric() {
        let eng = engine();
        let opts = EngineOptions::default();
        let a = "def f(a, b, c, d, e):\n    return a + b + c + d + e\n";
        let b = "def f(a, b, c, d, e):\n    return a - b + c + d + e\n";
        let r1 = eng.compare(("h1", Lang::Python, a), ("h2", Lang::Python, b), &opts).unwrap();

        let index2 = Arc::new(InvertedIndex::new());
        let cache2 = Arc::new(PairCache::new(1000, Duration::from_secs(300)));
        let store2 = Arc::new(FingerprintStore::new(1000, Duration::from_secs(300), index2, Arc::clone(&cache2)));
        let eng2 = SimilarityEngine::new(store2, cache2);
        let r2 = eng2.compare(("h2", Lang::Python, b), ("h1", Lang::Python, a), &opts).unwrap();

        assert!((r1.token_similarity - r2.token_similarity).abs() < 1e-9);
    }

    #[test]
    fn result_is_cached_on_second_call() {
        let eng = engine();
        let opts = EngineOptions::default();
        let src = "def f(a, b, c, d, e):\n    return a + b + c + d + e\n";
        let first = eng.compare(("h1", Lang::Python, src), ("h2", Lang::Python, src), &opts).unwrap();
        let second = eng.compare(("h2", Lang::Python, src), ("h1", Lang::Python, src), &opts).unwrap();
        assert_eq!(first.token_similarity, second.token_similarity);
    }

    #[test]
    fn matches_never_overlap_on_a() {
        let eng = engine();
        let opts = EngineOptions::default();
        let shared_one = "result = compute_value(first_param, second_param, third_param, fourth_param)\n";
        let shared_two = "second_result = compute_other(alpha_param, beta_param, gamma_param, delta_param)\n";
        let a = format!("{shared_one}{shared_two}");
        let b = format!("{shared_one}x = 1\n{shared_two}");
        let result = eng.compare(("h1", Lang::Python, &a), ("h2", Lang::Python, &b), &opts).unwrap();
        for pair in result.matches.windows(2) {
            assert!(pair[0].a_end < pair[1].a_start);
        }
    }

    #[test]
    fn a_tokenize_failure_degrades_instead_of_erroring() {
        let eng = engine();
        let opts = EngineOptions::default();
        let result = eng.finish("a", "b", None, None, None, None, &opts, true).unwrap();
        assert!((result.token_similarity - 0.0).abs() < 1e-9);
        assert!((result.ast_similarity - 0.0).abs() < 1e-9);
        assert!(result.matches.is_empty());
        assert_eq!(result.reason, Some(DegradeReason::TokenizeFailed));
    }

    #[test]
    fn compare_cached_reports_fingerprint_unavailable_for_an_unindexed_side() {
        let eng = engine();
        let opts = EngineOptions::default();
        let src = "def f(x):\n    return x + 1\n";
        let tokens = Lang::Python.tokenize("a.py", src).unwrap();
        let token_fp = crate::fingerprint::build_token_fingerprint(&tokens, opts.k, opts.w);
        eng.store().put_token_fp("a", token_fp);
        // "b" was never indexed, so this is a genuine miss, not a tokenize failure.
        let err = eng.compare_cached("a", "b", &opts).unwrap_err();
        assert!(matches!(err, EngineError::FingerprintUnavailable(_)));
    }
}
