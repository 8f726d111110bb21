//! Error handling for the plagiarism engine.
//!
//! Unlike the CLI demo boundary (which uses `anyhow::Result` the way
//! `main.rs` always has), the engine itself needs callers to match on
//! error *kind* to decide whether a job is retried, dead-lettered, or
//! simply logged and continued. `EngineError` is that typed surface.

use thiserror::Error;

/// Errors the core engine can raise. Disposition for each variant is
/// described in full at the call sites that handle it (see `runner`).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The job named a language tag with no registered grammar.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The grammar could not produce a tree for this file's bytes.
    /// Non-fatal: the token path still runs.
    #[error("parse error in {file}: {source}")]
    ParseError {
        file: String,
        #[source]
        source: anyhow::Error,
    },

    /// Tokenization itself failed (distinct from a parse failure —
    /// tokenizing is expected to be robust even over malformed source).
    #[error("tokenize error in {file}: {source}")]
    TokenizeError {
        file: String,
        #[source]
        source: anyhow::Error,
    },

    /// A fingerprint could not be produced and no cached copy exists.
    /// Retryable once with a fresh computation.
    #[error("fingerprint unavailable for {0}")]
    FingerprintUnavailable(String),

    /// The backing store/index could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The job's caller-supplied timeout elapsed.
    #[error("job {0} timed out")]
    Timeout(String),

    /// Anything else is unrecoverable and dead-letters the job.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Tag recorded on a [`crate::model::PairResult`] when one side of the
/// pair degraded to an empty fingerprint. Lets a caller distinguish
/// "nothing in common" from "we couldn't fully analyze one of these
/// files" without re-deriving it from the scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DegradeReason {
    ParseFailed,
    TokenizeFailed,
}
