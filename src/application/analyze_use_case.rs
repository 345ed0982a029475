// ============================================================
// Layer 2 — Analyze Use Case
// ============================================================
// Emotion label for a piece of free text. Without a model the
// answer is "neutral" with no score.

use serde::Serialize;

use crate::domain::assessment::round4;
use crate::domain::community::NEUTRAL_EMOTION;
use crate::domain::error::ValidationError;
use crate::domain::traits::EmotionSource;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub label: String,
    /// Softmax probability of `label`, absent for the fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Analysis {
    pub fn neutral() -> Self {
        Self { label: NEUTRAL_EMOTION.to_string(), score: None }
    }
}

pub struct AnalyzeUseCase<'a> {
    emotions: &'a dyn EmotionSource,
}

impl<'a> AnalyzeUseCase<'a> {
    pub fn new(emotions: &'a dyn EmotionSource) -> Self {
        Self { emotions }
    }

    /// Rejects blank text.
    pub fn execute(&self, text: &str) -> Result<Analysis, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(self.label_or_neutral(text))
    }

    /// Never fails: blank text or no model gives "neutral".
    pub fn label_or_neutral(&self, text: &str) -> Analysis {
        if text.trim().is_empty() {
            return Analysis::neutral();
        }
        match self.emotions.emotion(text) {
            Some(e) => Analysis { label: e.label, score: Some(round4(e.confidence)) },
            None => Analysis::neutral(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::{EmotionLabel, NoModel};

    struct Always(&'static str, f64);

    impl EmotionSource for Always {
        fn emotion(&self, _: &str) -> Option<EmotionLabel> {
            Some(EmotionLabel { label: self.0.to_string(), confidence: self.1 })
        }
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let uc = AnalyzeUseCase::new(&NoModel);
        assert_eq!(uc.execute("   \n"), Err(ValidationError::EmptyText));
    }

    #[test]
    fn test_no_model_is_neutral() {
        let uc = AnalyzeUseCase::new(&NoModel);
        assert_eq!(uc.execute("hello").unwrap(), Analysis::neutral());
    }

    #[test]
    fn test_score_is_rounded() {
        let source = Always("joy", 0.876543);
        let uc = AnalyzeUseCase::new(&source);
        let a = uc.execute("great news").unwrap();
        assert_eq!(a.label, "joy");
        assert_eq!(a.score, Some(0.8765));
        // the posting path skips the model entirely for blank text
        assert_eq!(uc.label_or_neutral(""), Analysis::neutral());
    }
}
