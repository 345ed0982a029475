// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the pure domain and everything that
// touches a model, a disk or a network:
//
//   AnomalySource — turns free text into a score in [0,1]
//                   (ModelManager in production, fixed
//                   values in tests)
//   EmotionSource — turns free text into an emotion label
//   ResultSink    — append-only store for InstrumentResult
//   PostStore     — community posts and comments
//
// Every model-facing method returns Option: "no model" is an
// ordinary answer the caller must handle, not an error.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::assessment::InstrumentResult;
use crate::domain::community::{Comment, Post};
use crate::domain::error::PersistenceError;

// ─── AnomalySource ────────────────────────────────────────────────────────────
pub trait AnomalySource {
    /// Anomaly score for `text`, or `None` when no model is available.
    fn anomaly_score(&self, text: &str) -> Option<f64>;
}

/// Never has a model. Scoring falls back to the rule signal alone.
pub struct NoModel;

impl AnomalySource for NoModel {
    fn anomaly_score(&self, _text: &str) -> Option<f64> {
        None
    }
}

impl EmotionSource for NoModel {
    fn emotion(&self, _text: &str) -> Option<EmotionLabel> {
        None
    }
}

// ─── EmotionSource ────────────────────────────────────────────────────────────
/// Predicted label with its softmax probability.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmotionLabel {
    pub label:      String,
    pub confidence: f64,
}

pub trait EmotionSource {
    fn emotion(&self, text: &str) -> Option<EmotionLabel>;
}

// ─── ResultSink ───────────────────────────────────────────────────────────────
pub trait ResultSink: Send + Sync {
    fn append(&self, result: &InstrumentResult) -> Result<(), PersistenceError>;
}

// ─── PostStore ────────────────────────────────────────────────────────────────
pub trait PostStore: Send + Sync {
    fn create_post(&self, space: &str, text: &str, emotion: &str) -> Result<Post, PersistenceError>;

    fn add_comment(&self, post_id: i64, text: &str, emotion: &str) -> Result<Comment, PersistenceError>;

    /// Posts of one space, newest first, comments oldest first.
    fn posts_in_space(&self, space: &str) -> Result<Vec<Post>, PersistenceError>;

    /// Removes the post together with its comments.
    fn delete_post(&self, post_id: i64) -> Result<(), PersistenceError>;

    fn delete_comment(&self, comment_id: i64) -> Result<(), PersistenceError>;
}
