// src/candidates.rs
//! Candidate selector (§4.5): a pre-filter over the inverted index
//! that surfaces files beyond a task's own membership worth comparing
//! against. Within a task, every unordered pair is always compared
//! regardless of what this returns — the selector only adds candidates,
//! it never gates the within-task set.

use crate::index::{InvertedIndex, PostingKey};
use crate::model::CandidateOverlap;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    WithinTask(&'a [&'a str]),
    Global,
}

pub struct CandidateSelector<'a> {
    index: &'a InvertedIndex,
    candidate_threshold: f64,
    max_candidates_per_file: usize,
}

impl<'a> CandidateSelector<'a> {
    #[must_use]
    pub fn new(index: &'a InvertedIndex, candidate_threshold: f64, max_candidates_per_file: usize) -> Self {
        Self { index, candidate_threshold, max_candidates_per_file }
    }

    /// Candidates sharing at least `candidate_threshold` of `hashes`
    /// with `content_hash`, capped at `max_candidates_per_file`.
    /// `Scope::WithinTask` restricts results to the given set of task
    /// file hashes; `Scope::Global` searches the whole index.
    #[must_use]
    pub fn candidates_for(&self, content_hash: &str, hashes: &HashSet<u64>, scope: Scope) -> Vec<CandidateOverlap> {
        let mut found = self.index.candidates(hashes, PostingKey::Token, content_hash, self.candidate_threshold);

        if let Scope::WithinTask(task_hashes) = scope {
            let allowed: HashSet<&str> = task_hashes.iter().copied().collect();
            found.retain(|c| allowed.contains(c.content_hash.as_str()));
        }

        found.truncate(self.max_candidates_per_file);
        found
    }
}
