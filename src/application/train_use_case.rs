// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run:
//
//   Step 1: Load the labelled CSV         (Layer 4 - data)
//   Step 2: Seeded shuffle
//   Step 3: Fit the sorted label set      (Layer 4 - data)
//   Step 4: Resolve the tokenizer         (Layer 6 - infra)
//   Step 5: Encode samples                (Layer 4 - data)
//   Step 6: Run the training loop         (Layer 5 - ml)
//   Step 7: Write the checkpoint          (Layer 6 - infra)
//   Step 8: Publish to the ModelManager   (Layer 6 - infra)
//
// Status goes idle/completed/error → training → completed or
// error. Any failure before step 7 leaves the checkpoint on
// disk untouched.
//
// Reference: Burn Book §5 (Training)

use std::{path::PathBuf, sync::Arc};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::EmotionDataset,
    encoding::ENCODING_WINDOW,
    labels::LabelVocabulary,
    loader::CsvDatasetLoader,
};
use crate::domain::error::TrainingError;
use crate::domain::training::TrainingReport;
use crate::infra::{
    checkpoint::{CheckpointManager, ModelCheckpoint},
    metrics::MetricsLogger,
    model_manager::ModelManager,
    status::TrainingMonitor,
    tokenizer_store::{TokenizerStore, DEFAULT_HUB_TOKENIZER},
};
use crate::ml::inferencer::LoadedModel;
use crate::ml::model::{DualHeadClassifierConfig, HEAD_DROPOUT};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_path:   PathBuf,
    pub checkpoint_dir: PathBuf,
    /// Encoding window, also the model's position table size
    pub max_seq_len:    usize,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub seed:           u64,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_layers:     usize,
    pub d_ff:           usize,
    pub dropout:        f64,
    pub head_dropout:   f64,
    /// Hub repo for the tokenizer; `None` skips the hub
    pub tokenizer_repo: Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_path:   PathBuf::from("emotion_dataset.csv"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            max_seq_len:    ENCODING_WINDOW,
            batch_size:     8,
            epochs:         5,
            lr:             2e-5,
            seed:           42,
            d_model:        128,
            num_heads:      4,
            num_layers:     2,
            d_ff:           512,
            dropout:        0.1,
            head_dropout:   HEAD_DROPOUT,
            tokenizer_repo: Some(DEFAULT_HUB_TOKENIZER.to_string()),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.epochs == 0 {
            return Err("epochs must be at least 1".into());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".into());
        }
        if self.max_seq_len < 2 {
            return Err("max_seq_len must hold [CLS] and [SEP]".into());
        }
        if !(self.lr > 0.0) {
            return Err(format!("lr must be positive, got {}", self.lr));
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            return Err(format!("d_model {} is not divisible by num_heads {}", self.d_model, self.num_heads));
        }
        for (name, p) in [("dropout", self.dropout), ("head_dropout", self.head_dropout)] {
            if !(0.0..1.0).contains(&p) {
                return Err(format!("{name} must be in [0, 1), got {p}"));
            }
        }
        Ok(())
    }

    pub fn classifier_config(&self, vocab_size: usize, num_labels: usize) -> DualHeadClassifierConfig {
        DualHeadClassifierConfig::new(vocab_size, num_labels)
            .with_max_seq_len(self.max_seq_len)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
            .with_head_dropout(self.head_dropout)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config:   TrainConfig,
    hf_token: Option<String>,
    monitor:  TrainingMonitor,
    models:   Arc<ModelManager>,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig, monitor: TrainingMonitor, models: Arc<ModelManager>) -> Self {
        Self { config, hf_token: None, monitor, models }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.hf_token = token;
        self
    }

    pub fn monitor(&self) -> &TrainingMonitor {
        &self.monitor
    }

    /// Run training end to end, keeping the status in step.
    pub fn execute(&self) -> Result<TrainingReport, TrainingError> {
        self.monitor.begin()?;
        match self.run() {
            Ok(report) => {
                self.monitor.complete(report.epochs, report.final_loss);
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Training failed: {e}");
                self.monitor.fail(e.to_string());
                Err(e)
            }
        }
    }

    fn run(&self) -> Result<TrainingReport, TrainingError> {
        let cfg = &self.config;
        cfg.validate().map_err(TrainingError::Dataset)?;

        // ── Step 1: Load the dataset ──────────────────────────────────────────
        tracing::info!("Loading dataset from '{}'", cfg.dataset_path.display());
        let mut records = CsvDatasetLoader::new(&cfg.dataset_path)
            .load_all()
            .map_err(|e| TrainingError::Dataset(format!("{e:#}")))?;
        if records.is_empty() {
            return Err(TrainingError::Dataset(format!(
                "'{}' has no usable rows",
                cfg.dataset_path.display()
            )));
        }

        // ── Step 2: Seeded shuffle ────────────────────────────────────────────
        records.shuffle(&mut StdRng::seed_from_u64(cfg.seed));

        // ── Step 3: Label vocabulary (sorted) ─────────────────────────────────
        let vocab = LabelVocabulary::fit(records.iter().map(|r| r.label.as_str()));
        tracing::info!("{} samples, {} labels: {:?}", records.len(), vocab.len(), vocab.labels());

        // ── Step 4: Tokenizer ─────────────────────────────────────────────────
        let corpus: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir)
            .with_hub(cfg.tokenizer_repo.clone().unwrap_or_default(), self.hf_token.clone())
            .resolve(&corpus)
            .map_err(|e| TrainingError::Tokenizer(format!("{e:#}")))?;

        // ── Step 5: Encode ────────────────────────────────────────────────────
        let dataset = EmotionDataset::from_records(&records, &vocab, &tokenizer, cfg.max_seq_len)
            .map_err(|e| TrainingError::Dataset(format!("{e:#}")))?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let model_cfg = cfg.classifier_config(TokenizerStore::embedding_size(&tokenizer), vocab.len());
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)
            .map_err(|e| TrainingError::Checkpoint(format!("{e:#}")))?;
        let trained = run_training(cfg, model_cfg, dataset, &metrics, &self.monitor)
            .map_err(|e| TrainingError::Loop(format!("{e:#}")))?;

        // ── Step 7: Checkpoint ────────────────────────────────────────────────
        let checkpoint = ModelCheckpoint::capture(&trained.model, &trained.config, &vocab, &tokenizer, cfg.max_seq_len)
            .map_err(|e| TrainingError::Checkpoint(e.to_string()))?;
        let path = CheckpointManager::new(&cfg.checkpoint_dir)
            .save(&checkpoint)
            .map_err(|e| TrainingError::Checkpoint(e.to_string()))?;
        drop(checkpoint);

        // ── Step 8: Publish ───────────────────────────────────────────────────
        let handle = self.models.publish(LoadedModel::new(trained.model, tokenizer, vocab.clone(), cfg.max_seq_len));
        tracing::info!("Trained model live as generation {}", handle.generation());

        Ok(TrainingReport {
            final_loss: trained.final_loss,
            epochs:     trained.epochs,
            samples:    records.len(),
            labels:     vocab.into_labels(),
            accuracy:   trained.accuracy,
            checkpoint: path.display().to_string(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::training::TrainingPhase;
    use crate::infra::provisioner::CheckpointProvisioner;
    use std::fs;
    use std::path::Path;

    fn write_dataset(dir: &Path) -> PathBuf {
        let mut csv = String::from("text,label\n");
        for i in 0..12 {
            csv.push_str(&format!("sunny bright cheerful day {i},joy\n"));
            csv.push_str(&format!("dark gloomy heavy night {i},sadness\n"));
        }
        let path = dir.join("emotion_dataset.csv");
        fs::write(&path, csv).unwrap();
        path
    }

    fn small_config(dir: &Path) -> TrainConfig {
        TrainConfig {
            dataset_path:   dir.join("emotion_dataset.csv"),
            checkpoint_dir: dir.join("checkpoints"),
            max_seq_len:    12,
            batch_size:     4,
            epochs:         15,
            lr:             5e-3,
            d_model:        16,
            num_heads:      2,
            num_layers:     1,
            d_ff:           32,
            dropout:        0.0,
            head_dropout:   0.0,
            tokenizer_repo: None,
            ..TrainConfig::default()
        }
    }

    fn models(dir: &Path) -> Arc<ModelManager> {
        Arc::new(ModelManager::new(CheckpointProvisioner::new(
            CheckpointManager::new(dir.join("checkpoints")),
            None,
        )))
    }

    #[test]
    fn test_training_writes_checkpoint_that_beats_chance() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let models = models(dir.path());
        let use_case = TrainUseCase::new(small_config(dir.path()), TrainingMonitor::new(), models.clone());

        let report = use_case.execute().unwrap();
        assert_eq!(report.labels, vec!["joy", "sadness"]);
        assert_eq!(report.samples, 24);
        assert_eq!(use_case.monitor().snapshot().status, TrainingPhase::Completed);
        assert_eq!(models.generation(), 1);

        // restore from disk, independently of the published instance
        let checkpoint = CheckpointManager::new(dir.path().join("checkpoints")).load().unwrap();
        assert_eq!(checkpoint.num_labels, 2);
        let restored = LoadedModel::from_checkpoint(&checkpoint).unwrap();

        let records = CsvDatasetLoader::new(dir.path().join("emotion_dataset.csv")).load_all().unwrap();
        let correct = records
            .iter()
            .filter(|r| restored.classify(&r.text).unwrap().label == r.label)
            .count();
        assert!(correct * 2 > records.len(), "only {correct}/{} correct", records.len());
    }

    #[test]
    fn test_missing_dataset_sets_error_and_keeps_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointManager::new(dir.path().join("checkpoints"));
        fs::create_dir_all(checkpoints.dir()).unwrap();
        fs::write(checkpoints.path(), b"previous checkpoint").unwrap();

        let use_case = TrainUseCase::new(small_config(dir.path()), TrainingMonitor::new(), models(dir.path()));
        let err = use_case.execute().unwrap_err();

        assert!(matches!(err, TrainingError::Dataset(_)));
        let status = use_case.monitor().snapshot();
        assert_eq!(status.status, TrainingPhase::Error);
        assert!(status.error.is_some());
        assert_eq!(fs::read(checkpoints.path()).unwrap(), b"previous checkpoint");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = TrainConfig { d_model: 30, num_heads: 4, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        assert!(TrainConfig::default().validate().is_ok());
    }
}
