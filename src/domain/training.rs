// ============================================================
// Layer 3 — Training Status
// ============================================================
// A snapshot of the most recent training run:
//
//   idle ──► training ──► completed
//                  │
//                  └────► error
//
// Overwritten by each run; no history is kept.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingPhase {
    #[default]
    Idle,
    Training,
    Completed,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub status: TrainingPhase,
    /// 1-based epoch currently running or last finished
    pub epoch:  usize,
    /// Total loss of the running epoch, or of the last one once finished
    pub loss:   Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error:  Option<String>,
}

impl TrainingStatus {
    pub fn started() -> Self {
        Self { status: TrainingPhase::Training, ..Self::default() }
    }

    pub fn is_running(&self) -> bool {
        self.status == TrainingPhase::Training
    }
}

/// Returned by a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub final_loss:  f64,
    pub epochs:      usize,
    pub samples:     usize,
    pub labels:      Vec<String>,
    /// Fraction of training samples classified correctly in the last epoch
    pub accuracy:    f64,
    pub checkpoint:  String,
}
