// tests/scenarios.rs
//! End-to-end scenarios S1-S6 (§8): each exercises the engine through
//! its public surface (`Engine` + `SimilarityEngine::compare`) rather
//! than any one internal module.

use codematch_core::{EngineOptions, Lang};
use std::time::Duration;

fn engine() -> codematch_core::Engine {
    codematch_core::Engine::new(10_000, Duration::from_secs(300))
}

#[test]
fn s1_identical_files_score_one_with_one_full_match() {
    let engine = engine();
    let opts = EngineOptions::default();
    let body = "def f(x):\n    return x + 1\n";

    let result = engine.similarity.compare(("a", Lang::Python, body), ("b", Lang::Python, body), &opts).unwrap();

    assert!((result.token_similarity - 1.0).abs() < 1e-9);
    assert!((result.ast_similarity - 1.0).abs() < 1e-9);
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].a_start, 1);
    assert_eq!(result.matches[0].b_start, 1);
}

#[test]
fn s2_rename_only_keeps_high_token_and_full_ast_similarity() {
    let engine = engine();
    let mut opts = EngineOptions::default();
    opts.k = 3;
    opts.w = 2;

    let a = "def foo(x):\n    return x * 2\n";
    let b = "def bar(y):\n    return y * 2\n";

    let result = engine.similarity.compare(("a", Lang::Python, a), ("b", Lang::Python, b), &opts).unwrap();

    assert!(result.token_similarity >= 0.95, "token_similarity = {}", result.token_similarity);
    assert!((result.ast_similarity - 1.0).abs() < 1e-9);
}

#[test]
fn s3_unrelated_files_exit_early() {
    let engine = engine();
    let opts = EngineOptions::default();

    let a = "print(\"hello\")\n";
    let b = "for i in range(10):\n    pass\n";

    let result = engine.similarity.compare(("a", Lang::Python, a), ("b", Lang::Python, b), &opts).unwrap();

    assert!(result.token_similarity < 0.15, "token_similarity = {}", result.token_similarity);
    assert!((result.ast_similarity - 0.0).abs() < 1e-9);
    assert!(result.matches.is_empty());
}

#[test]
fn s4_partial_copy_produces_a_merged_match_over_the_shared_region() {
    let engine = engine();
    let mut opts = EngineOptions::default();
    opts.k = 3;
    opts.w = 2;
    opts.gap = 2;

    let shared_block: String = (0..100).map(|i| format!("shared_{i} = compute_shared_value({i}, {i})\n")).collect();

    let mut a_lines = Vec::new();
    for i in 0..9 {
        a_lines.push(format!("prefix_{i} = compute_prefix_value({i})\n"));
    }
    a_lines.push(shared_block.clone());
    for i in 0..90 {
        a_lines.push(format!("suffix_{i} = compute_suffix_value({i})\n"));
    }
    let file_a = a_lines.join("");

    let mut b_lines = Vec::new();
    for i in 0..49 {
        b_lines.push(format!("other_prefix_{i} = compute_other_prefix({i})\n"));
    }
    b_lines.push(shared_block);
    for i in 0..149 {
        b_lines.push(format!("other_suffix_{i} = compute_other_suffix({i})\n"));
    }
    let file_b = b_lines.join("");

    let result = engine.similarity.compare(("a", Lang::Python, &file_a), ("b", Lang::Python, &file_b), &opts).unwrap();

    assert!(!result.matches.is_empty(), "expected at least one match region");
    let longest = result.matches.iter().max_by_key(|m| m.a_end - m.a_start).unwrap();
    assert!(longest.a_start <= 10, "a_start = {}", longest.a_start);
    assert!(longest.a_end >= 109, "a_end = {}", longest.a_end);
    assert!(longest.b_start <= 50, "b_start = {}", longest.b_start);
    assert!(longest.b_end >= 149, "b_end = {}", longest.b_end);
}

#[test]
fn s5_a_missing_ast_fingerprint_is_tagged_and_does_not_block_token_similarity() {
    use codematch_core::model::{AstFingerprint, TokenFingerprint};

    let engine = engine();
    let opts = EngineOptions::default();
    let src = "def f(x):\n    return x + 1\n";

    let tokens = Lang::Python.tokenize("a.py", src).unwrap();
    let token_fp = codematch_core::fingerprint::build_token_fingerprint(&tokens, opts.k, opts.w);
    engine.store.put_token_fp("a", token_fp.clone());
    engine.store.put_token_fp("b", token_fp);
    engine.store.put_ast_fp("a", AstFingerprint::default());
    // "b" never gets an AST fingerprint, simulating a parse failure on that side.

    let result = engine.similarity.compare_cached("a", "b", &opts).unwrap();

    assert!(result.reason.is_some());
    assert!((result.ast_similarity - 0.0).abs() < 1e-9);
    assert!(result.token_similarity.is_finite());
}

#[test]
fn s6_candidate_pruning_finds_exact_overlap_among_many_unrelated_files() {
    use codematch_core::index::PostingKey;
    use std::collections::HashSet;

    let engine = engine();
    let opts = EngineOptions::default();

    for i in 0..200 {
        let src = format!("def unrelated_{i}(a, b):\n    return a * {i} + b\n");
        let tokens = Lang::Python.tokenize("u.py", &src).unwrap();
        let fp = codematch_core::fingerprint::build_token_fingerprint(&tokens, opts.k, opts.w);
        engine.store.put_token_fp(&format!("u{i}"), fp);
    }

    let shared = "def target(a, b, c, d, e):\n    return a + b + c + d + e\n";
    let tokens = Lang::Python.tokenize("shared.py", shared).unwrap();
    let shared_fp = codematch_core::fingerprint::build_token_fingerprint(&tokens, opts.k, opts.w);
    engine.store.put_token_fp("match1", shared_fp.clone());
    engine.store.put_token_fp("match2", shared_fp.clone());
    engine.store.put_token_fp("new", shared_fp.clone());

    let hashes: HashSet<u64> = shared_fp.hashes;
    let candidates = engine.index.candidates(&hashes, PostingKey::Token, "new", 0.5);
    let ids: Vec<&str> = candidates.iter().map(|c| c.content_hash.as_str()).collect();

    assert!(ids.contains(&"match1"));
    assert!(ids.contains(&"match2"));
    assert!(!ids.iter().any(|id| id.starts_with('u')), "pruning should exclude the unrelated files");
}
