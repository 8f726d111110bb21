// src/fingerprint/ast_hash.rs
//! AST subtree fingerprint (§4.2). Canonical hash of `(node.kind,
//! hash(child_0), hash(child_1), …)` in source order, computed
//! bottom-up with `xxhash-rust`'s `xxh64` — the fast non-cryptographic
//! hash the corpus reaches for in exactly this role (see
//! `duplicate_detector.rs`'s token/subtree hashing). Child order is
//! baked into the hashed buffer, so the hash is deliberately not
//! commutative: swapping two children changes every ancestor's hash.

use super::ENGINE_SEED;
use crate::lang::AstNode;
use crate::model::AstFingerprint;
use xxhash_rust::xxh64::xxh64;

pub fn build_ast_fingerprint(ast: &AstNode, min_subtree_tokens: usize) -> AstFingerprint {
    build_ast_fingerprint_seeded(ast, min_subtree_tokens, ENGINE_SEED)
}

pub fn build_ast_fingerprint_seeded(ast: &AstNode, min_subtree_tokens: usize, seed: u64) -> AstFingerprint {
    let mut out = AstFingerprint::default();
    hash_subtree(ast, min_subtree_tokens, seed, &mut out);
    out
}

fn hash_subtree(node: &AstNode, min_subtree_tokens: usize, seed: u64, out: &mut AstFingerprint) -> u64 {
    let mut buf = Vec::with_capacity(node.kind.len() + node.children.len() * 8);
    buf.extend_from_slice(node.kind.as_bytes());
    for child in &node.children {
        let child_hash = hash_subtree(child, min_subtree_tokens, seed, out);
        buf.extend_from_slice(&child_hash.to_le_bytes());
    }

    let hash = xxh64(&buf, seed);
    if node.token_count >= min_subtree_tokens {
        out.hashes.insert(hash);
        out.total_subtrees += 1;
    }
    hash
}
