// ============================================================
// Layer 2 — Assess Use Case
// ============================================================
// One instrument submission, end to end:
//
//   validate answers ──► rule probability
//   free text?       ──► anomaly score (model, or 0.0)
//   combine          ──► ScoreOutcome
//   persist          ──► best effort, failures only logged
//
// Validation errors are returned before the model or the store
// is touched.

use std::sync::Once;

use crate::domain::assessment::{AssessmentRequest, InstrumentResult, ScoreOutcome};
use crate::domain::error::ValidationError;
use crate::domain::instrument::{Instrument, InstrumentSpec, Polarity};
use crate::domain::scoring::{HybridRiskScorer, ScoringPolicy};
use crate::domain::traits::{AnomalySource, ResultSink};

static WHO5_POLARITY_WARNING: Once = Once::new();

pub struct AssessUseCase<'a> {
    scorer:  HybridRiskScorer,
    anomaly: &'a dyn AnomalySource,
    sink:    &'a dyn ResultSink,
}

impl<'a> AssessUseCase<'a> {
    pub fn new(
        instrument: Instrument,
        policy:     ScoringPolicy,
        who5:       Polarity,
        anomaly:    &'a dyn AnomalySource,
        sink:       &'a dyn ResultSink,
    ) -> Self {
        let mut spec = InstrumentSpec::for_instrument(instrument);
        if instrument == Instrument::Who5 {
            if who5 == Polarity::Direct {
                WHO5_POLARITY_WARNING.call_once(|| {
                    tracing::warn!(
                        "WHO-5 is scored with direct polarity: higher well-being answers raise the risk score. \
                         Set scoring.who5_polarity = \"inverted\" to flip it."
                    );
                });
            }
            spec = spec.with_polarity(who5);
        }
        Self { scorer: HybridRiskScorer::new(spec, policy), anomaly, sink }
    }

    pub fn execute(&self, request: &AssessmentRequest) -> Result<ScoreOutcome, ValidationError> {
        let instrument = self.scorer.instrument();
        let outcome    = self.scorer.score(request, self.anomaly)?;

        let result = InstrumentResult::new(instrument, request, &outcome);
        if let Err(e) = self.sink.append(&result) {
            tracing::warn!("{} result for '{}' was not stored: {e}", instrument, result.user_name);
        }

        tracing::info!(
            "{} assessed: hybrid={:.4} risk={}",
            instrument, outcome.hybrid_score, outcome.risk_level,
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assessment::RiskLevel;
    use crate::domain::error::PersistenceError;
    use crate::domain::instrument::Answers;
    use crate::domain::traits::NoModel;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        rows: Mutex<Vec<InstrumentResult>>,
    }

    impl ResultSink for Recorder {
        fn append(&self, result: &InstrumentResult) -> Result<(), PersistenceError> {
            self.rows.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    struct Broken;

    impl ResultSink for Broken {
        fn append(&self, _: &InstrumentResult) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io(std::io::Error::other("disk full")))
        }
    }

    struct Fixed(f64);

    impl AnomalySource for Fixed {
        fn anomaly_score(&self, _: &str) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn test_result_is_persisted() {
        let sink = Recorder::default();
        let uc = AssessUseCase::new(Instrument::Gad7, ScoringPolicy::default(), Polarity::Direct, &NoModel, &sink);

        let request = AssessmentRequest::new(Answers::from_numbers(&[1.0; 7])).with_user("sam");
        let outcome = uc.execute(&request).unwrap();
        assert_eq!(outcome.rule_probability, 0.9309);

        let rows = sink.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_name, "sam");
        assert_eq!(rows[0].score, 7.0);
        assert_eq!(rows[0].instrument.table(), "anxiety_results");
    }

    #[test]
    fn test_invalid_phq9_touches_nothing() {
        let sink = Recorder::default();
        let uc = AssessUseCase::new(Instrument::Phq9, ScoringPolicy::default(), Polarity::Direct, &NoModel, &sink);

        let request = AssessmentRequest::new(Answers::from_numbers(&[2.0; 8]));
        assert!(matches!(uc.execute(&request), Err(ValidationError::AnswerCount { .. })));
        assert!(sink.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_storage_failure_is_swallowed() {
        let uc = AssessUseCase::new(Instrument::Bfi10, ScoringPolicy::default(), Polarity::Direct, &Fixed(0.9), &Broken);
        let request = AssessmentRequest::new(Answers::default())
            .with_probability(0.3)
            .with_text("cannot sleep");
        let outcome = uc.execute(&request).unwrap();
        assert_eq!(outcome.hybrid_score, 0.6);
        assert_eq!(outcome.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_who5_polarity_is_applied() {
        let sink = Recorder::default();
        let request = AssessmentRequest::new(Answers::from_numbers(&[5.0; 5]));

        let direct = AssessUseCase::new(Instrument::Who5, ScoringPolicy::default(), Polarity::Direct, &NoModel, &sink)
            .execute(&request)
            .unwrap();
        let inverted = AssessUseCase::new(Instrument::Who5, ScoringPolicy::default(), Polarity::Inverted, &NoModel, &sink)
            .execute(&request)
            .unwrap();

        assert!(direct.rule_probability > 0.99);
        assert!(inverted.rule_probability < 0.01);
    }
}
