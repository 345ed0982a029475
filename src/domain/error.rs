// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Four failure families with four different policies:
//
//   ValidationError   — caller sent malformed input.
//                       Surfaced, nothing else happens.
//   ProvisioningError — checkpoint unreachable or corrupt.
//                       Logged; scoring falls back to
//                       anomaly 0 / label "neutral".
//   PersistenceError  — a result could not be stored.
//                       Logged and swallowed.
//   TrainingError     — the training run failed.
//                       Status flips to "error" and the
//                       message is returned to the caller.
//
// Reference: Rust Book §9 (Error Handling)

use thiserror::Error;

/// Malformed or incomplete caller input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{instrument} expects exactly {expected} numeric answers, got {actual}")]
    AnswerCount {
        instrument: &'static str,
        expected:   usize,
        actual:     usize,
    },

    #[error("{instrument} answer #{index} is not a number")]
    NonNumericAnswer {
        instrument: &'static str,
        index:      usize,
    },

    #[error("precomputed probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f64),

    #[error("text is required")]
    EmptyText,
}

/// Failure to bring a checkpoint onto local storage.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("unrecognised checkpoint source '{0}'")]
    InvalidSource(String),

    #[error("model hub request failed: {0}")]
    Hub(String),

    #[error("download from {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("downloaded artifact is empty")]
    EmptyArtifact,

    #[error("size mismatch: source has {expected} bytes, copy has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// A storage write that did not go through.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("post {0} does not exist")]
    UnknownPost(i64),

    #[error("comment {0} does not exist")]
    UnknownComment(i64),
}

/// Anything that aborts a training run.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("dataset: {0}")]
    Dataset(String),

    #[error("tokenizer: {0}")]
    Tokenizer(String),

    #[error("checkpoint: {0}")]
    Checkpoint(String),

    #[error("training loop: {0}")]
    Loop(String),

    #[error("a training run is already in progress")]
    AlreadyRunning,
}
