// ============================================================
// Layer 6 — Checkpoint Envelope
// ============================================================
// One self-contained file per trained classifier:
//
//   checkpoints/emotion_classifier.mpk
//     ├── weights         BinBytesRecorder blob (full precision)
//     ├── labels          sorted label vocabulary
//     ├── num_labels      == labels.len()
//     ├── classifier      DualHeadClassifierConfig
//     ├── window          encoding window used in training
//     └── tokenizer_json  serialised tokenizer
//
// The envelope is MessagePack (rmp-serde). Carrying the
// architecture and tokenizer means a checkpoint fetched from
// a remote source needs nothing else to be rebuilt.
//
// Writes go through a temp file in the same directory followed
// by a rename, so readers see either the old file or the new
// one, never a partial write.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::labels::LabelVocabulary;
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::{ClassifierMode, DualHeadClassifier, DualHeadClassifierConfig};

/// Canonical checkpoint file name inside the checkpoint directory.
pub const CHECKPOINT_FILE: &str = "emotion_classifier.mpk";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint envelope is malformed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("cannot encode checkpoint: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("unsupported checkpoint format version {0}")]
    Version(u32),

    #[error("checkpoint declares {declared} labels but lists {listed}")]
    LabelCount { declared: usize, listed: usize },

    #[error("checkpoint parameters do not fit the classifier: {0}")]
    Record(String),

    #[error("checkpoint tokenizer is unusable: {0}")]
    Tokenizer(String),

    #[error("checkpoint is inconsistent with its classifier: {0}")]
    Incompatible(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    pub format_version: u32,
    #[serde(with = "serde_bytes")]
    pub weights:        Vec<u8>,
    pub labels:         Vec<String>,
    pub num_labels:     usize,
    pub classifier:     DualHeadClassifierConfig,
    pub window:         usize,
    pub tokenizer_json: String,
}

impl ModelCheckpoint {
    /// Snapshot a trained classifier together with everything needed to rebuild it.
    pub fn capture<B: Backend>(
        model:     &DualHeadClassifier<B>,
        config:    &DualHeadClassifierConfig,
        labels:    &LabelVocabulary,
        tokenizer: &Tokenizer,
        window:    usize,
    ) -> Result<Self, CheckpointError> {
        let weights = BinBytesRecorder::<FullPrecisionSettings>::default()
            .record(model.clone().into_record(), ())
            .map_err(|e| CheckpointError::Record(e.to_string()))?;
        let tokenizer_json = tokenizer
            .to_string(false)
            .map_err(|e| CheckpointError::Tokenizer(e.to_string()))?;

        Ok(Self {
            format_version: FORMAT_VERSION,
            weights,
            labels: labels.labels().to_vec(),
            num_labels: labels.len(),
            classifier: config.clone(),
            window,
            tokenizer_json,
        })
    }

    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.format_version != FORMAT_VERSION {
            return Err(CheckpointError::Version(self.format_version));
        }
        if self.num_labels != self.labels.len() || self.classifier.num_labels != self.labels.len() {
            return Err(CheckpointError::LabelCount {
                declared: self.num_labels,
                listed:   self.labels.len(),
            });
        }

        let classifier = &self.classifier;
        if self.window < 2 || self.window > classifier.max_seq_len {
            return Err(CheckpointError::Incompatible(format!(
                "window {} outside 2..={}",
                self.window, classifier.max_seq_len
            )));
        }
        if classifier.num_heads == 0 || classifier.d_model % classifier.num_heads != 0 {
            return Err(CheckpointError::Incompatible(format!(
                "d_model {} is not divisible by {} heads",
                classifier.d_model, classifier.num_heads
            )));
        }
        Ok(())
    }

    /// Every id the tokenizer can emit must index the embedding table.
    pub fn check_tokenizer(&self, tokenizer: &Tokenizer) -> Result<(), CheckpointError> {
        let needed = TokenizerStore::embedding_size(tokenizer);
        if needed > self.classifier.vocab_size {
            return Err(CheckpointError::Incompatible(format!(
                "tokenizer needs {needed} embeddings, classifier has {}",
                self.classifier.vocab_size
            )));
        }
        Ok(())
    }

    pub fn label_vocabulary(&self) -> LabelVocabulary {
        LabelVocabulary::from_labels(self.labels.clone())
    }

    pub fn tokenizer(&self) -> Result<Tokenizer, CheckpointError> {
        Tokenizer::from_str(&self.tokenizer_json)
            .map_err(|e| CheckpointError::Tokenizer(e.to_string()))
    }

    /// Build a classifier sized to the stored labels and load the weights into it.
    pub fn restore<B: Backend>(&self, device: &B::Device) -> Result<DualHeadClassifier<B>, CheckpointError> {
        self.validate()?;
        let model = self.classifier.init::<B>(device);
        let record = BinBytesRecorder::<FullPrecisionSettings>::default()
            .load(self.weights.clone(), device)
            .map_err(|e| CheckpointError::Record(e.to_string()))?;
        Ok(model.load_record(record).with_mode(ClassifierMode::Eval))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = rmp_serde::from_slice(bytes)?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Owns the canonical checkpoint path.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Atomic write: temp file in the same directory, fsync, rename.
    pub fn save(&self, checkpoint: &ModelCheckpoint) -> Result<PathBuf, CheckpointError> {
        checkpoint.validate()?;
        fs::create_dir_all(&self.dir)?;
        let bytes = checkpoint.to_bytes()?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;

        let path = self.path();
        tmp.persist(&path).map_err(|e| CheckpointError::Io(e.error))?;

        tracing::info!(
            "Checkpoint written to '{}' ({} bytes, {} labels)",
            path.display(),
            bytes.len(),
            checkpoint.num_labels
        );
        Ok(path)
    }

    pub fn load(&self) -> Result<ModelCheckpoint, CheckpointError> {
        let path  = self.path();
        let bytes = fs::read(&path)?;
        tracing::debug!("Read checkpoint '{}' ({} bytes)", path.display(), bytes.len());
        ModelCheckpoint::from_bytes(&bytes)
    }
}
