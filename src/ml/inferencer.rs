// ============================================================
// Layer 5 — Inferencer
// ============================================================
// LoadedModel bundles everything one inference call needs:
//
//   classifier  — DualHeadClassifier in eval mode (behind a Mutex)
//   tokenizer   — the one the classifier was trained with
//   labels      — class index → label string
//
// text ─► TextEncoding ─► embed ─┬─► classify      ─► (label, confidence)
//                                └─► score_anomaly ─► anomaly in [0,1]
//
// `analyze` runs the encoder once and reads both heads.

use anyhow::{Context, Result};
use std::sync::{Mutex, PoisonError};
use tokenizers::Tokenizer;

use crate::data::{batcher::encoding_tensors, encoding::TextEncoding, labels::LabelVocabulary};
use crate::domain::traits::EmotionLabel;
use crate::infra::checkpoint::{CheckpointError, ModelCheckpoint};
use crate::ml::model::{ClassifierMode, DualHeadClassifier};
use crate::ml::{Device, InferBackend};

/// Output of both heads for one text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAnalysis {
    pub emotion: EmotionLabel,
    pub anomaly: f64,
}

pub struct LoadedModel {
    classifier: Mutex<DualHeadClassifier<InferBackend>>,
    tokenizer:  Tokenizer,
    labels:     LabelVocabulary,
    window:     usize,
    device:     Device,
}

impl LoadedModel {
    pub fn new(
        classifier: DualHeadClassifier<InferBackend>,
        tokenizer:  Tokenizer,
        labels:     LabelVocabulary,
        window:     usize,
    ) -> Self {
        Self {
            classifier: Mutex::new(classifier.with_mode(ClassifierMode::Eval)),
            tokenizer,
            labels,
            window,
            device: Device::default(),
        }
    }

    /// Rebuild classifier, tokenizer and label vocabulary from a checkpoint.
    pub fn from_checkpoint(checkpoint: &ModelCheckpoint) -> Result<Self, CheckpointError> {
        let tokenizer = checkpoint.tokenizer()?;
        checkpoint.check_tokenizer(&tokenizer)?;

        let device     = Device::default();
        let classifier = checkpoint.restore::<InferBackend>(&device)?;
        tracing::info!(
            "Classifier restored: {} labels, window {}",
            checkpoint.num_labels, checkpoint.window,
        );
        Ok(Self::new(classifier, tokenizer, checkpoint.label_vocabulary(), checkpoint.window))
    }

    pub fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn analyze(&self, text: &str) -> Result<TextAnalysis> {
        let encoding    = TextEncoding::encode(&self.tokenizer, text, self.window)?;
        let (ids, mask) = encoding_tensors::<InferBackend>(&encoding, &self.device);

        let output = {
            let classifier = self.classifier.lock().unwrap_or_else(PoisonError::into_inner);
            classifier.forward(ids, mask)
        };

        let probs: Vec<f32> = output
            .label_probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read label probabilities: {e:?}"))?;
        let anomaly: Vec<f32> = output
            .anomaly
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read anomaly score: {e:?}"))?;

        let (index, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .context("Classifier produced no label probabilities")?;
        let label = self
            .labels
            .label(index)
            .with_context(|| format!("Predicted class {index} is outside the label vocabulary"))?;
        let anomaly = anomaly.first().copied().context("Classifier produced no anomaly score")?;

        tracing::debug!("Analyzed text: label={} conf={:.4} anomaly={:.4}", label, confidence, anomaly);

        Ok(TextAnalysis {
            emotion: EmotionLabel { label: label.to_string(), confidence: confidence as f64 },
            anomaly: (anomaly as f64).clamp(0.0, 1.0),
        })
    }

    pub fn classify(&self, text: &str) -> Result<EmotionLabel> {
        Ok(self.analyze(text)?.emotion)
    }

    pub fn anomaly(&self, text: &str) -> Result<f64> {
        Ok(self.analyze(text)?.anomaly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;
    use crate::ml::model::DualHeadClassifierConfig;

    fn model() -> LoadedModel {
        let corpus = vec!["calm and happy".to_string(), "angry and upset".to_string()];
        let tokenizer = TokenizerStore::build_word_level(&corpus, 64).unwrap();
        let labels = LabelVocabulary::fit(["joy", "anger", "fear"]);
        let config = DualHeadClassifierConfig::new(TokenizerStore::embedding_size(&tokenizer), labels.len())
            .with_max_seq_len(12)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(32);
        let classifier = config.init::<InferBackend>(&Device::default());
        LoadedModel::new(classifier, tokenizer, labels, 12)
    }

    #[test]
    fn test_analyze_returns_known_label_and_bounded_scores() {
        let model = model();
        let analysis = model.analyze("I am so angry").unwrap();
        assert!(model.labels().index_of(&analysis.emotion.label).is_some());
        assert!((0.0..=1.0).contains(&analysis.emotion.confidence));
        assert!((0.0..=1.0).contains(&analysis.anomaly));
    }

    #[test]
    fn test_heads_agree_with_combined_pass() {
        let model = model();
        let both = model.analyze("calm").unwrap();
        assert_eq!(model.classify("calm").unwrap(), both.emotion);
        assert_eq!(model.anomaly("calm").unwrap(), both.anomaly);
    }

    #[test]
    fn test_long_text_is_truncated_not_rejected() {
        let model = model();
        let long = "happy ".repeat(500);
        assert!(model.analyze(&long).is_ok());
    }
}
