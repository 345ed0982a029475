// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here. The data layer builds
// tensors; everything above this layer only sees plain Rust
// values (labels, confidences, anomaly scores).
//
//   model.rs      — DualHeadClassifier
//                   • Token + positional embeddings
//                   • Transformer encoder blocks (padding-masked)
//                   • Label head   (linear → softmax)
//                   • Anomaly head (linear → sigmoid)
//
//   trainer.rs    — Fine-tuning loop for the label head
//                   AdamW, shuffled mini-batches, per-epoch
//                   loss/accuracy, status updates
//
//   inferencer.rs — LoadedModel: checkpoint + tokenizer +
//                   label vocabulary, ready to score text
//
// Backend selection:
//   default        → NdArray (CPU)
//   --features wgpu → Wgpu
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Devlin et al. (2019) BERT

/// Inference backend: no autodiff.
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

/// Training backend: autodiff over the inference backend.
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub type Device = <InferBackend as burn::prelude::Backend>::Device;

/// Dual-head transformer classifier
pub mod model;

/// Training loop for the label head
pub mod trainer;

/// Checkpoint-backed inference
pub mod inferencer;
