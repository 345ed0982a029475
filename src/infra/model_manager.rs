// ============================================================
// Layer 6 — Model Lifecycle Manager
// ============================================================
// Owns the one shared LoadedModel for the process.
//
//   get_model()
//     ├─ loaded?  ──────────────► handle (no freshness check)
//     └─ lock held for the whole sequence:
//          provision ─► false/err ─► None (nothing cached)
//          load + validate ─► err ─► None (logged)
//          publish ─► generation += 1 ─► handle
//
//   publish(model)   ← training swaps in a new model here
//
// Racing first callers queue on the mutex: exactly one of them
// downloads and loads, the rest see its result. A handle pins
// the generation it was taken from; a later publish does not
// disturb inference already in flight.

use std::{
    ops::Deref,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use crate::domain::traits::{AnomalySource, EmotionLabel, EmotionSource};
use crate::infra::provisioner::CheckpointProvisioner;
use crate::ml::inferencer::LoadedModel;

/// Shared borrow of the loaded model.
#[derive(Clone)]
pub struct ModelHandle {
    model:      Arc<LoadedModel>,
    generation: u64,
}

impl ModelHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn same_instance(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.model, &other.model)
    }
}

impl Deref for ModelHandle {
    type Target = LoadedModel;

    fn deref(&self) -> &LoadedModel {
        &self.model
    }
}

pub struct ModelManager {
    provisioner: CheckpointProvisioner,
    slot:        Mutex<Option<ModelHandle>>,
    generation:  AtomicU64,
}

impl ModelManager {
    pub fn new(provisioner: CheckpointProvisioner) -> Self {
        Self {
            provisioner,
            slot:       Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// The shared model, provisioning and loading it on first success.
    pub fn get_model(&self) -> Option<ModelHandle> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.as_ref() {
            return Some(handle.clone());
        }

        match self.provisioner.ensure_available() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!("Checkpoint provisioning failed: {e}");
                return None;
            }
        }

        let loaded = self
            .provisioner
            .checkpoints()
            .load()
            .and_then(|checkpoint| LoadedModel::from_checkpoint(&checkpoint));
        match loaded {
            Ok(model) => Some(self.install(&mut slot, model)),
            Err(e) => {
                tracing::warn!(
                    "Cannot load checkpoint '{}': {e}",
                    self.provisioner.checkpoints().path().display()
                );
                None
            }
        }
    }

    /// Replace the shared model, e.g. after training.
    pub fn publish(&self, model: LoadedModel) -> ModelHandle {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        self.install(&mut slot, model)
    }

    fn install(&self, slot: &mut Option<ModelHandle>, model: LoadedModel) -> ModelHandle {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = ModelHandle { model: Arc::new(model), generation };
        *slot = Some(handle.clone());
        tracing::info!("Model generation {} published", generation);
        handle
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// 0 until the first publish.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn checkpoint_present(&self) -> bool {
        self.provisioner.checkpoints().exists()
    }

    pub fn provisioner(&self) -> &CheckpointProvisioner {
        &self.provisioner
    }
}

impl AnomalySource for ModelManager {
    fn anomaly_score(&self, text: &str) -> Option<f64> {
        let model = self.get_model()?;
        model
            .anomaly(text)
            .map_err(|e| tracing::warn!("Anomaly scoring failed: {e:#}"))
            .ok()
    }
}

impl EmotionSource for ModelManager {
    fn emotion(&self, text: &str) -> Option<EmotionLabel> {
        let model = self.get_model()?;
        model
            .classify(text)
            .map_err(|e| tracing::warn!("Emotion classification failed: {e:#}"))
            .ok()
    }
}
