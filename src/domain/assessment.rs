// ============================================================
// Layer 3 — Assessment Types
// ============================================================
// The life of one submission:
//
//   AssessmentRequest  ← answers, optional text, optional
//          │              precomputed probability
//          ▼
//   ScoreOutcome       → what the caller gets back
//          │              (all scores rounded to 4 places)
//          ▼
//   InstrumentResult   → the immutable record handed to
//                        the storage collaborator
//
// Reference: Rust Book §5 (Structs), §6 (Enums)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::instrument::{Answers, Instrument};

pub const ANONYMOUS: &str = "Anonymous";

/// Round to the 4 decimal places used in every response.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

// ─── AssessmentRequest ────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// Respondent name; "Anonymous" when absent
    #[serde(default)]
    pub user_name: Option<String>,

    #[serde(default)]
    pub answers: Answers,

    /// Free text run through the anomaly head
    #[serde(default)]
    pub text: Option<String>,

    /// Rule probability computed elsewhere
    #[serde(default, alias = "lr_score")]
    pub probability: Option<f64>,
}

impl AssessmentRequest {
    pub fn new(answers: Answers) -> Self {
        Self { answers, ..Self::default() }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_user(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_probability(mut self, p: f64) -> Self {
        self.probability = Some(p);
        self
    }

    pub fn respondent(&self) -> &str {
        match self.user_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => ANONYMOUS,
        }
    }

    /// Text worth sending to the model: present and not blank.
    pub fn free_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

// ─── RiskLevel ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Low,
}

impl RiskLevel {
    /// The shared decision rule: High iff score >= threshold.
    pub fn classify(score: f64, threshold: f64) -> Self {
        if score >= threshold { RiskLevel::High } else { RiskLevel::Low }
    }

    pub fn is_high(self) -> bool {
        self == RiskLevel::High
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => f.write_str("High"),
            RiskLevel::Low  => f.write_str("Low"),
        }
    }
}

// ─── ScoreOutcome ─────────────────────────────────────────────────────────────
/// What a scoring call returns to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub rule_probability: f64,
    pub anomaly_score:    f64,
    pub hybrid_score:     f64,
    pub risk_level:       RiskLevel,
    pub is_high_risk:     bool,
}

// ─── InstrumentResult ─────────────────────────────────────────────────────────
/// One persisted submission. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentResult {
    pub instrument:       Instrument,
    pub user_name:        String,
    pub answers:          Answers,
    /// Plain sum of the numeric answers
    pub score:            f64,
    pub description:      String,
    pub rule_probability: f64,
    pub anomaly_score:    f64,
    pub hybrid_score:     f64,
    pub risk_level:       RiskLevel,
    pub is_high_risk:     bool,
    pub text:             Option<String>,
    pub created_at:       DateTime<Utc>,
}

impl InstrumentResult {
    pub fn new(
        instrument: Instrument,
        request:    &AssessmentRequest,
        outcome:    &ScoreOutcome,
    ) -> Self {
        Self {
            instrument,
            user_name:        request.respondent().to_string(),
            answers:          request.answers.clone(),
            score:            request.answers.total(),
            description:      instrument.description().to_string(),
            rule_probability: outcome.rule_probability,
            anomaly_score:    outcome.anomaly_score,
            hybrid_score:     outcome.hybrid_score,
            risk_level:       outcome.risk_level,
            is_high_risk:     outcome.is_high_risk,
            text:             request.free_text().map(str::to_string),
            created_at:       Utc::now(),
        }
    }
}
