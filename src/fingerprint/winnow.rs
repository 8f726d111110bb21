// src/fingerprint/winnow.rs
//! Winnowed k-gram token fingerprint (§4.2).
//!
//! K-gram hashing uses a genuine Rabin–Karp rolling hash — grounded
//! in the corpus's `TokenFingerprinter` (`crates/mcb-validate`):
//! a base/modulus polynomial hash over the token sequence, updated
//! incrementally (remove the outgoing token's contribution, shift,
//! add the incoming one) rather than rehashed from scratch per
//! window. Winnowing then slides a window of `w` consecutive k-gram
//! hashes and emits the minimum, only re-emitting when the selected
//! index changes, which is what bounds fingerprint density while
//! still guaranteeing detection of shared substrings (§8, property 6).

use super::ENGINE_SEED;
use crate::lang::Token;
use crate::model::{LineSpan, TokenFingerprint};
use std::collections::{HashMap, HashSet};

const RK_BASE: u128 = 131;
/// 2^61 - 1, a Mersenne prime — large enough to keep collisions rare
/// for k-gram alphabets this small, small enough that all arithmetic
/// fits comfortably in u128 intermediates.
const RK_MODULUS: u128 = (1u128 << 61) - 1;

pub fn build_token_fingerprint(tokens: &[Token], k: usize, w: usize) -> TokenFingerprint {
    build_token_fingerprint_seeded(tokens, k, w, ENGINE_SEED)
}

pub fn build_token_fingerprint_seeded(tokens: &[Token], k: usize, w: usize, seed: u64) -> TokenFingerprint {
    let codes: Vec<u8> = tokens.iter().map(|t| t.kind.code()).collect();
    let kgram_hashes = rolling_kgram_hashes(&codes, k, seed);
    let winnowed = winnow_indices(&kgram_hashes, w);
    let total_kgrams = winnowed.len();

    let mut hashes = HashSet::new();
    let mut positions: HashMap<u64, Vec<LineSpan>> = HashMap::new();
    for idx in winnowed {
        let hash = kgram_hashes[idx];
        let span = kgram_span(tokens, idx, k);
        hashes.insert(hash);
        positions.entry(hash).or_default().push(span);
    }

    TokenFingerprint { hashes, positions, total_kgrams }
}

/// Rolling Rabin–Karp hash of every contiguous window of `k` token
/// kind-codes. Returns one hash per k-gram, in source order.
fn rolling_kgram_hashes(codes: &[u8], k: usize, seed: u64) -> Vec<u64> {
    if k == 0 || codes.len() < k {
        return Vec::new();
    }

    let mut base_pow: u128 = 1;
    for _ in 0..k.saturating_sub(1) {
        base_pow = (base_pow * RK_BASE) % RK_MODULUS;
    }

    let value = |code: u8| -> u128 { u128::from(code) + 1 };

    let mut hash: u128 = 0;
    for &code in &codes[..k] {
        hash = (hash * RK_BASE + value(code)) % RK_MODULUS;
    }

    let mut out = Vec::with_capacity(codes.len() - k + 1);
    out.push((hash as u64) ^ seed);

    for i in k..codes.len() {
        let outgoing = value(codes[i - k]) * base_pow % RK_MODULUS;
        hash = (hash + RK_MODULUS - outgoing) % RK_MODULUS;
        hash = (hash * RK_BASE + value(codes[i])) % RK_MODULUS;
        out.push((hash as u64) ^ seed);
    }

    out
}

/// Classic winnowing: slide a window of (up to) `w` consecutive
/// k-gram hashes, select the minimum, break ties toward the rightmost
/// occurrence, and only emit when the selected position changes from
/// the previous window. When the document has fewer than `w` k-grams
/// total, the whole run is treated as one window.
fn winnow_indices(kgram_hashes: &[u64], w: usize) -> Vec<usize> {
    let n = kgram_hashes.len();
    if n == 0 {
        return Vec::new();
    }
    let window = w.clamp(1, n);

    let mut selected = Vec::new();
    let mut last_emitted = None;
    for start in 0..=(n - window) {
        let slice = &kgram_hashes[start..start + window];
        let mut min_idx = start;
        let mut min_val = slice[0];
        for (offset, &val) in slice.iter().enumerate() {
            if val <= min_val {
                min_val = val;
                min_idx = start + offset;
            }
        }
        if last_emitted != Some(min_idx) {
            selected.push(min_idx);
            last_emitted = Some(min_idx);
        }
    }
    selected
}

fn kgram_span(tokens: &[Token], start: usize, k: usize) -> LineSpan {
    let mut span = LineSpan::new(tokens[start].start_line, tokens[start].end_line);
    for token in &tokens[start + 1..start + k] {
        span = span.union(LineSpan::new(token.start_line, token.end_line));
    }
    span
}
