use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::encoding::TextEncoding;
use crate::data::labels::LabelVocabulary;
use crate::data::loader::EmotionRecord;

/// One fully tokenised and padded training sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          usize,
}

impl EmotionSample {
    pub fn new(encoding: TextEncoding, label: usize) -> Self {
        Self {
            input_ids:      encoding.input_ids,
            attention_mask: encoding.attention_mask,
            label,
        }
    }
}

pub struct EmotionDataset {
    samples: Vec<EmotionSample>,
}

impl EmotionDataset {
    pub fn new(samples: Vec<EmotionSample>) -> Self { Self { samples } }

    /// Encode every record against `vocab`. A label missing from the
    /// vocabulary is a programming error upstream and fails the build.
    pub fn from_records(
        records:   &[EmotionRecord],
        vocab:     &LabelVocabulary,
        tokenizer: &Tokenizer,
        window:    usize,
    ) -> Result<Self> {
        let samples = records
            .iter()
            .map(|r| {
                let label = vocab
                    .index_of(&r.label)
                    .with_context(|| format!("label '{}' missing from vocabulary", r.label))?;
                let encoding = TextEncoding::encode(tokenizer, &r.text, window)?;
                Ok(EmotionSample::new(encoding, label))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(samples))
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<EmotionSample> for EmotionDataset {
    fn get(&self, index: usize) -> Option<EmotionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
