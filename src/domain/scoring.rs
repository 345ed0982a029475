// ============================================================
// Layer 3 — Hybrid Risk Scorer
// ============================================================
// One scorer, parameterised by an InstrumentSpec:
//
//   rule     = logistic(w·x + b)        (or caller override)
//   anomaly  = model(text)  | 0.0 if no text / no model
//   hybrid   = rule_weight * rule + (1 - rule_weight) * anomaly
//   risk     = High if round4(hybrid) >= threshold else Low
//
// With the default policy (rule_weight 0.5, threshold 0.5) the
// hybrid score is the plain arithmetic mean of both signals.
//
// Validation happens before the anomaly source is consulted,
// so rejected input never reaches the model.

use serde::{Deserialize, Serialize};

use crate::domain::assessment::{round4, AssessmentRequest, RiskLevel, ScoreOutcome};
use crate::domain::error::ValidationError;
use crate::domain::instrument::{Instrument, InstrumentSpec};
use crate::domain::traits::AnomalySource;

pub const DEFAULT_THRESHOLD:   f64 = 0.5;
pub const DEFAULT_RULE_WEIGHT: f64 = 0.5;

/// Decision parameters shared by every instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Hybrid score at or above which a submission is High risk
    pub threshold:   f64,
    /// Share of the rule probability in the hybrid score
    pub rule_weight: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            threshold:   DEFAULT_THRESHOLD,
            rule_weight: DEFAULT_RULE_WEIGHT,
        }
    }
}

impl ScoringPolicy {
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.threshold) && (0.0..=1.0).contains(&self.rule_weight)
    }
}

pub struct HybridRiskScorer {
    spec:   InstrumentSpec,
    policy: ScoringPolicy,
}

impl HybridRiskScorer {
    pub fn new(spec: InstrumentSpec, policy: ScoringPolicy) -> Self {
        Self { spec, policy }
    }

    pub fn for_instrument(instrument: Instrument, policy: ScoringPolicy) -> Self {
        Self::new(InstrumentSpec::for_instrument(instrument), policy)
    }

    pub fn instrument(&self) -> Instrument {
        self.spec.instrument
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    pub fn validate(&self, request: &AssessmentRequest) -> Result<(), ValidationError> {
        self.spec.validate(&request.answers, request.probability)
    }

    /// Score one submission against `signal`.
    pub fn score(
        &self,
        request: &AssessmentRequest,
        signal:  &dyn AnomalySource,
    ) -> Result<ScoreOutcome, ValidationError> {
        let rule = self.spec.rule_probability(&request.answers, request.probability)?;

        let anomaly = request
            .free_text()
            .and_then(|text| signal.anomaly_score(text))
            .unwrap_or(0.0);

        tracing::debug!(
            instrument = %self.spec.instrument,
            rule,
            anomaly,
            "scored submission"
        );
        Ok(self.combine(rule, anomaly))
    }

    /// Merge the two signals into one decision.
    pub fn combine(&self, rule: f64, anomaly: f64) -> ScoreOutcome {
        let rule    = rule.clamp(0.0, 1.0);
        let anomaly = anomaly.clamp(0.0, 1.0);
        let w       = self.policy.rule_weight;

        let hybrid     = round4(w * rule + (1.0 - w) * anomaly);
        let risk_level = RiskLevel::classify(hybrid, self.policy.threshold);

        ScoreOutcome {
            rule_probability: round4(rule),
            anomaly_score:    round4(anomaly),
            hybrid_score:     hybrid,
            risk_level,
            is_high_risk:     risk_level.is_high(),
        }
    }
}
