// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Supervised fine-tuning of the label head on the training
// backend (Autodiff over NdArray, or Wgpu with --features wgpu).
//
//   for epoch in 1..=epochs:
//       for batch in shuffled mini-batches:
//           logits = label_head(dropout(embed(batch)))
//           loss   = cross_entropy(logits, labels)
//           AdamW step
//       → status (epoch, total loss), metrics.csv row
//
// The anomaly head is not trained here; its weights are
// carried into the checkpoint unchanged.
//
// After the last epoch model.valid() drops the autodiff graph
// and the classifier is switched to eval mode.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::EmotionBatcher, dataset::EmotionDataset};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::infra::status::TrainingMonitor;
use crate::ml::model::{ClassifierMode, DualHeadClassifier, DualHeadClassifierConfig};
use crate::ml::{Device, InferBackend, TrainBackend};

/// Decoupled weight decay applied by AdamW.
pub const WEIGHT_DECAY: f32 = 0.01;

pub fn optimizer_config() -> AdamWConfig {
    AdamWConfig::new().with_weight_decay(WEIGHT_DECAY)
}

/// A trained classifier on the inference backend, ready to checkpoint.
pub struct TrainedClassifier {
    pub model:      DualHeadClassifier<InferBackend>,
    pub config:     DualHeadClassifierConfig,
    /// Total loss of the last epoch
    pub final_loss: f64,
    /// Training accuracy of the last epoch
    pub accuracy:   f64,
    pub epochs:     usize,
}

pub fn run_training(
    cfg:       &TrainConfig,
    model_cfg: DualHeadClassifierConfig,
    dataset:   EmotionDataset,
    metrics:   &MetricsLogger,
    monitor:   &TrainingMonitor,
) -> Result<TrainedClassifier> {
    let device = Device::default();
    tracing::info!("Training on device {:?}", device);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: DualHeadClassifier<TrainBackend> = model_cfg
        .init(&device)
        .with_mode(ClassifierMode::Train);
    tracing::info!(
        "Classifier ready: {} layers, d_model={}, {} labels",
        model_cfg.num_layers, model_cfg.d_model, model_cfg.num_labels,
    );

    let mut optim = optimizer_config().init();

    // Reshuffled every epoch from a fixed seed.
    let loader = DataLoaderBuilder::new(EmotionBatcher::new())
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(dataset);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut last = EpochMetrics::new(0, f64::NAN, 0, 0, 0);
    for epoch in 1..=cfg.epochs {
        let mut total_loss = 0.0f64;
        let mut batches    = 0usize;
        let mut correct    = 0usize;
        let mut seen       = 0usize;

        for batch in loader.iter() {
            let output = model.forward_classification(batch);

            total_loss += output.loss.clone().into_scalar().elem::<f64>();
            batches    += 1;

            seen += output.targets.dims()[0];
            let hits: i64 = output
                .logits
                .clone()
                .argmax(1)
                .flatten::<1>(0, 1)
                .equal(output.targets.clone())
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>();
            correct += hits as usize;

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            monitor.progress(epoch, total_loss);
        }

        last = EpochMetrics::new(epoch, total_loss, batches, correct, seen);
        tracing::info!(
            "Epoch {:>3}/{} | total_loss={:.4} | mean_loss={:.4} | accuracy={:.1}%",
            epoch, cfg.epochs, last.total_loss, last.mean_loss, last.accuracy * 100.0,
        );
        metrics.log(&last)?;
    }

    let model = model.valid().with_mode(ClassifierMode::Eval);
    tracing::info!("Training complete: final loss {:.4}", last.total_loss);

    Ok(TrainedClassifier {
        model,
        config:     model_cfg,
        final_loss: last.total_loss,
        accuracy:   last.accuracy,
        epochs:     cfg.epochs,
    })
}
