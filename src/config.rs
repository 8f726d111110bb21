// src/config.rs
//! Engine configuration (§4.4/§6): tunables for k-gram length, winnow
//! window, AST floor, and the candidate/matching thresholds, with the
//! defaults from §6's options table and a per-job override layer.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineOptions {
    pub k: usize,
    pub w: usize,
    pub min_subtree_tokens: usize,
    pub candidate_threshold: f64,
    pub gap: usize,
    pub min_match_kgrams: usize,
    pub max_candidates_per_file: usize,
}

impl EngineOptions {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` or `w` is zero, if `k < w` (the
    /// guaranteed-match length `w + k - 1` would be degenerate), or if
    /// `candidate_threshold` falls outside `[0.0, 1.0]`.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 || self.w == 0 {
            return Err(EngineError::Other(anyhow::anyhow!("k and w must be nonzero")));
        }
        if self.k < self.w {
            return Err(EngineError::Other(anyhow::anyhow!(
                "k must be >= w (guaranteed-match length is w + k - 1)"
            )));
        }
        if !(0.0..=1.0).contains(&self.candidate_threshold) {
            return Err(EngineError::Other(anyhow::anyhow!("candidate_threshold must be in [0.0, 1.0]")));
        }
        Ok(())
    }

    /// Loads options from a TOML file, falling back to [`Default`] for
    /// any field the file omits.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or doesn't parse as
    /// TOML matching this shape.
    pub fn load_toml(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Other(anyhow::anyhow!("reading {}: {e}", path.display())))?;
        let partial: PartialOptions = toml::from_str(&text)
            .map_err(|e| EngineError::Other(anyhow::anyhow!("parsing {}: {e}", path.display())))?;
        Ok(partial.merge_onto(Self::default()))
    }

    /// Applies a job's per-job option overrides (§6) on top of `self`,
    /// leaving any field the job didn't specify untouched.
    #[must_use]
    pub fn merge_overrides(&self, overrides: &HashMap<String, f64>) -> Self {
        let mut out = *self;
        for (key, value) in overrides {
            match key.as_str() {
                "k" => out.k = *value as usize,
                "w" => out.w = *value as usize,
                "min_subtree_tokens" => out.min_subtree_tokens = *value as usize,
                "candidate_threshold" => out.candidate_threshold = *value,
                "gap" => out.gap = *value as usize,
                "min_match_kgrams" => out.min_match_kgrams = *value as usize,
                "max_candidates_per_file" => out.max_candidates_per_file = *value as usize,
                _ => {}
            }
        }
        out
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            k: 6,
            w: 5,
            min_subtree_tokens: 20,
            candidate_threshold: 0.15,
            gap: 2,
            min_match_kgrams: 2,
            max_candidates_per_file: 256,
        }
    }
}

/// Mirror of [`EngineOptions`] with every field optional, for partial
/// TOML files that only override a handful of defaults.
#[derive(Debug, Default, Deserialize)]
struct PartialOptions {
    k: Option<usize>,
    w: Option<usize>,
    min_subtree_tokens: Option<usize>,
    candidate_threshold: Option<f64>,
    gap: Option<usize>,
    min_match_kgrams: Option<usize>,
    max_candidates_per_file: Option<usize>,
}

impl PartialOptions {
    fn merge_onto(self, base: EngineOptions) -> EngineOptions {
        EngineOptions {
            k: self.k.unwrap_or(base.k),
            w: self.w.unwrap_or(base.w),
            min_subtree_tokens: self.min_subtree_tokens.unwrap_or(base.min_subtree_tokens),
            candidate_threshold: self.candidate_threshold.unwrap_or(base.candidate_threshold),
            gap: self.gap.unwrap_or(base.gap),
            min_match_kgrams: self.min_match_kgrams.unwrap_or(base.min_match_kgrams),
            max_candidates_per_file: self.max_candidates_per_file.unwrap_or(base.max_candidates_per_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_options_table() {
        let opts = EngineOptions::default();
        assert_eq!(opts.k, 6);
        assert_eq!(opts.w, 5);
        assert_eq!(opts.min_subtree_tokens, 20);
        assert!((opts.candidate_threshold - 0.15).abs() < f64::EPSILON);
        assert_eq!(opts.gap, 2);
        assert_eq!(opts.min_match_kgrams, 2);
        assert_eq!(opts.max_candidates_per_file, 256);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn validate_rejects_k_less_than_w() {
        let mut opts = EngineOptions::default();
        opts.k = 2;
        opts.w = 5;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut opts = EngineOptions::default();
        opts.candidate_threshold = 1.5;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn merge_overrides_only_touches_named_keys() {
        let base = EngineOptions::default();
        let mut overrides = HashMap::new();
        overrides.insert("gap".to_string(), 4.0);
        let merged = base.merge_overrides(&overrides);
        assert_eq!(merged.gap, 4);
        assert_eq!(merged.k, base.k);
    }

    #[test]
    fn load_toml_merges_partial_file_onto_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codematch.toml");
        std::fs::write(&path, "gap = 3\ncandidate_threshold = 0.2\n").unwrap();
        let opts = EngineOptions::load_toml(&path).unwrap();
        assert_eq!(opts.gap, 3);
        assert!((opts.candidate_threshold - 0.2).abs() < f64::EPSILON);
        assert_eq!(opts.k, EngineOptions::default().k);
    }
}
