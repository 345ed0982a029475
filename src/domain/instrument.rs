// ============================================================
// Layer 3 — Instruments
// ============================================================
// Each questionnaire is described as data instead of code:
//
//   Instrument     │ answers │ rule model
//   ───────────────┼─────────┼──────────────────────────────
//   GAD-7 anxiety  │    7    │ logistic, lenient, override
//   PHQ-9 mood     │    9    │ logistic, strict
//   WHO-5 wellbeing│    5    │ logistic, lenient, override
//   BFI-10 traits  │  5 map  │ supplied probability or 0
//
// The rule-based probability is a fixed logistic model:
//
//   p = 1 / (1 + e^-(w·x + b))
//
// with per-instrument weights w and intercept b. These are
// design constants, never fitted at request time.
//
// Reference: Spitzer et al. (2006) GAD-7
//            Kroenke et al. (2001) PHQ-9
//            Rammstedt & John (2007) BFI-10

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::error::ValidationError;

pub const GAD7_WEIGHTS:   [f64; 7] = [0.5, 0.7, 0.6, 0.4, 0.6, 0.5, 0.8];
pub const GAD7_INTERCEPT: f64      = -1.5;

pub const PHQ9_WEIGHTS:   [f64; 9] = [0.6, 0.8, 0.5, 0.7, 0.4, 0.9, 0.6, 0.5, 1.0];
pub const PHQ9_INTERCEPT: f64      = -2.0;

pub const WHO5_WEIGHTS:   [f64; 5] = [0.6, 0.7, 0.5, 0.8, 0.6];
pub const WHO5_INTERCEPT: f64      = -1.2;

/// Big Five trait names carried by a BFI-10 submission.
pub const BFI_TRAITS: [&str; 5] = [
    "Extraversion",
    "Agreeableness",
    "Neuroticism",
    "Openness",
    "Conscientiousness",
];

/// The standard logistic function.
pub fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

// ─── Instrument ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Gad7,
    Phq9,
    Who5,
    Bfi10,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::Gad7,
        Instrument::Phq9,
        Instrument::Who5,
        Instrument::Bfi10,
    ];

    /// Display name used in logs and validation messages.
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Gad7  => "GAD-7",
            Instrument::Phq9  => "PHQ-9",
            Instrument::Who5  => "WHO-5",
            Instrument::Bfi10 => "BFI-10",
        }
    }

    /// Name of the append-only result table for this instrument.
    pub fn table(self) -> &'static str {
        match self {
            Instrument::Gad7  => "anxiety_results",
            Instrument::Phq9  => "depression_results",
            Instrument::Who5  => "wellbeing_results",
            Instrument::Bfi10 => "personality_results",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Instrument::Gad7  => "Hybrid GAD-7 + text analysis",
            Instrument::Phq9  => "PHQ-9 Depression + text analysis",
            Instrument::Who5  => "WHO-5 Well-Being + text analysis",
            Instrument::Bfi10 => "BFI-10 Personality + text analysis",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Answers ──────────────────────────────────────────────────────────────────
/// Raw answers as submitted: either an ordered list or a
/// keyed map (WHO-5 forms and BFI-10 trait aggregates).
/// Kept as JSON values so the stored record mirrors the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answers {
    List(Vec<Value>),
    Map(serde_json::Map<String, Value>),
}

impl Default for Answers {
    fn default() -> Self {
        Answers::List(Vec::new())
    }
}

impl Answers {
    pub fn from_numbers(values: &[f64]) -> Self {
        Answers::List(values.iter().map(|&v| Value::from(v)).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Answers::List(v) => v.len(),
            Answers::Map(m)  => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Answers in submission order, `None` where an entry is not numeric.
    pub fn numeric(&self) -> Vec<Option<f64>> {
        match self {
            Answers::List(v) => v.iter().map(Value::as_f64).collect(),
            Answers::Map(m)  => m.values().map(Value::as_f64).collect(),
        }
    }

    /// Sum of the numeric answers, non-numeric entries ignored.
    pub fn total(&self) -> f64 {
        self.numeric().into_iter().flatten().sum()
    }

    /// Look up a keyed answer, e.g. a BFI-10 trait aggregate.
    pub fn get(&self, key: &str) -> Option<f64> {
        match self {
            Answers::Map(m)  => m.get(key).and_then(Value::as_f64),
            Answers::List(_) => None,
        }
    }
}

// ─── Rule model ───────────────────────────────────────────────────────────────
/// How strictly the answer list is checked before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerRule {
    /// Exactly `n` numeric answers or the request is rejected.
    Strict,
    /// Anything else than `n` answers scores 0; non-numeric entries count as 0.
    Lenient,
}

/// Direction of the logistic model.
///
/// WHO-5 measures well-being (higher is better), yet the observed
/// weights are positive, so a higher sum reads as higher risk. `Direct`
/// keeps that behaviour; `Inverted` negates the logit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Direct,
    Inverted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleModel {
    Logistic {
        weights:   Vec<f64>,
        intercept: f64,
        rule:      AnswerRule,
    },
    /// No local model: the caller's probability or 0.
    SuppliedOnly,
}

// ─── InstrumentSpec ───────────────────────────────────────────────────────────
/// Everything the hybrid scorer needs to know about one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub instrument:       Instrument,
    pub model:            RuleModel,
    pub accepts_override: bool,
    pub polarity:         Polarity,
}

impl InstrumentSpec {
    pub fn for_instrument(instrument: Instrument) -> Self {
        let (model, accepts_override) = match instrument {
            Instrument::Gad7 => (
                RuleModel::Logistic {
                    weights:   GAD7_WEIGHTS.to_vec(),
                    intercept: GAD7_INTERCEPT,
                    rule:      AnswerRule::Lenient,
                },
                true,
            ),
            Instrument::Phq9 => (
                RuleModel::Logistic {
                    weights:   PHQ9_WEIGHTS.to_vec(),
                    intercept: PHQ9_INTERCEPT,
                    rule:      AnswerRule::Strict,
                },
                false,
            ),
            Instrument::Who5 => (
                RuleModel::Logistic {
                    weights:   WHO5_WEIGHTS.to_vec(),
                    intercept: WHO5_INTERCEPT,
                    rule:      AnswerRule::Lenient,
                },
                true,
            ),
            Instrument::Bfi10 => (RuleModel::SuppliedOnly, true),
        };

        Self {
            instrument,
            model,
            accepts_override,
            polarity: Polarity::Direct,
        }
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Number of answers the logistic model expects, if it has one.
    pub fn answer_count(&self) -> Option<usize> {
        match &self.model {
            RuleModel::Logistic { weights, .. } => Some(weights.len()),
            RuleModel::SuppliedOnly             => None,
        }
    }

    /// Reject input that can never be scored. Runs before any model
    /// call or storage write.
    pub fn validate(
        &self,
        answers:  &Answers,
        supplied: Option<f64>,
    ) -> Result<(), ValidationError> {
        if let Some(p) = supplied {
            if self.accepts_override && !(0.0..=1.0).contains(&p) {
                return Err(ValidationError::ProbabilityOutOfRange(p));
            }
        }

        if let RuleModel::Logistic { weights, rule: AnswerRule::Strict, .. } = &self.model {
            let values = answers.numeric();
            if values.len() != weights.len() {
                return Err(ValidationError::AnswerCount {
                    instrument: self.instrument.name(),
                    expected:   weights.len(),
                    actual:     values.len(),
                });
            }
            if let Some(index) = values.iter().position(Option::is_none) {
                return Err(ValidationError::NonNumericAnswer {
                    instrument: self.instrument.name(),
                    index,
                });
            }
        }
        Ok(())
    }

    /// Rule-based probability in [0, 1].
    pub fn rule_probability(
        &self,
        answers:  &Answers,
        supplied: Option<f64>,
    ) -> Result<f64, ValidationError> {
        self.validate(answers, supplied)?;

        if self.accepts_override {
            if let Some(p) = supplied {
                return Ok(p);
            }
        }

        match &self.model {
            RuleModel::SuppliedOnly => Ok(0.0),
            RuleModel::Logistic { weights, intercept, .. } => {
                let values = answers.numeric();
                if values.len() != weights.len() {
                    // Lenient: missing or partial answers
                    return Ok(0.0);
                }
                let logit = values
                    .iter()
                    .zip(weights)
                    .map(|(x, w)| x.unwrap_or(0.0) * w)
                    .sum::<f64>()
                    + intercept;
                let logit = match self.polarity {
                    Polarity::Direct   => logit,
                    Polarity::Inverted => -logit,
                };
                Ok(logistic(logit))
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(i: Instrument) -> InstrumentSpec {
        InstrumentSpec::for_instrument(i)
    }

    #[test]
    fn test_gad7_all_ones() {
        // weights sum to 4.1, so logit = 4.1 - 1.5 = 2.6
        let p = spec(Instrument::Gad7)
            .rule_probability(&Answers::from_numbers(&[1.0; 7]), None)
            .unwrap();
        assert!((p - 0.9309).abs() < 1e-4, "got {p}");
    }

    #[test]
    fn test_phq9_rejects_wrong_count() {
        let err = spec(Instrument::Phq9)
            .rule_probability(&Answers::from_numbers(&[1.0; 8]), None)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::AnswerCount { instrument: "PHQ-9", expected: 9, actual: 8 }
        );
    }

    #[test]
    fn test_phq9_rejects_non_numeric() {
        let mut answers: Vec<Value> = vec![json!(1); 9];
        answers[4] = json!("often");
        let err = spec(Instrument::Phq9)
            .validate(&Answers::List(answers), None)
            .unwrap_err();
        assert_eq!(err, ValidationError::NonNumericAnswer { instrument: "PHQ-9", index: 4 });
    }

    #[test]
    fn test_phq9_zero_answers() {
        let p = spec(Instrument::Phq9)
            .rule_probability(&Answers::from_numbers(&[0.0; 9]), None)
            .unwrap();
        assert!((p - logistic(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_lenient_partial_answers_score_zero() {
        let p = spec(Instrument::Gad7)
            .rule_probability(&Answers::from_numbers(&[3.0, 3.0]), None)
            .unwrap();
        assert_eq!(p, 0.0);

        let p = spec(Instrument::Who5)
            .rule_probability(&Answers::default(), None)
            .unwrap();
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_override_skips_local_model() {
        let p = spec(Instrument::Gad7)
            .rule_probability(&Answers::from_numbers(&[3.0; 7]), Some(0.25))
            .unwrap();
        assert_eq!(p, 0.25);
    }

    #[test]
    fn test_override_out_of_range() {
        let err = spec(Instrument::Who5)
            .rule_probability(&Answers::default(), Some(1.5))
            .unwrap_err();
        assert_eq!(err, ValidationError::ProbabilityOutOfRange(1.5));
    }

    #[test]
    fn test_phq9_ignores_override() {
        let answers = Answers::from_numbers(&[0.0; 9]);
        let p = spec(Instrument::Phq9).rule_probability(&answers, Some(0.9)).unwrap();
        assert!((p - logistic(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_who5_map_answers_and_non_numeric() {
        let answers: Answers = serde_json::from_value(json!({
            "q1": 1, "q2": 1, "q3": "n/a", "q4": 1, "q5": 1
        }))
        .unwrap();
        let p = spec(Instrument::Who5).rule_probability(&answers, None).unwrap();
        // 0.6 + 0.7 + 0.8 + 0.6 - 1.2 = 1.5
        assert!((p - logistic(1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_who5_inverted_polarity_is_complement() {
        let answers = Answers::from_numbers(&[2.0, 3.0, 1.0, 4.0, 2.0]);
        let direct = spec(Instrument::Who5).rule_probability(&answers, None).unwrap();
        let inverted = spec(Instrument::Who5)
            .with_polarity(Polarity::Inverted)
            .rule_probability(&answers, None)
            .unwrap();
        assert!((direct + inverted - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bfi10_without_override_is_zero() {
        let answers: Answers = serde_json::from_value(json!({
            "Extraversion": 4, "Neuroticism": 2
        }))
        .unwrap();
        let p = spec(Instrument::Bfi10).rule_probability(&answers, None).unwrap();
        assert_eq!(p, 0.0);
        assert_eq!(answers.get("Extraversion"), Some(4.0));
        assert_eq!(answers.get("Openness"), None);
    }

    #[test]
    fn test_answers_total_skips_text() {
        let answers = Answers::List(vec![json!(2), json!("x"), json!(1.5)]);
        assert_eq!(answers.total(), 3.5);
        assert_eq!(answers.len(), 3);
    }
}
