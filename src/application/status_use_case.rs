// ============================================================
// Layer 2 — Status Use Case
// ============================================================
// Snapshot of training progress and model availability.

use serde::Serialize;

use crate::domain::training::TrainingStatus;
use crate::infra::model_manager::ModelManager;
use crate::infra::status::TrainingMonitor;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub training:           TrainingStatus,
    pub model_loaded:       bool,
    pub checkpoint_present: bool,
    pub model_generation:   u64,
    pub checkpoint_path:    String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_source:  Option<String>,
}

pub struct StatusUseCase<'a> {
    models:  &'a ModelManager,
    monitor: &'a TrainingMonitor,
}

impl<'a> StatusUseCase<'a> {
    pub fn new(models: &'a ModelManager, monitor: &'a TrainingMonitor) -> Self {
        Self { models, monitor }
    }

    /// In-process training state, or the last mirrored state when this
    /// process has not trained.
    pub fn execute(&self) -> StatusReport {
        let provisioner = self.models.provisioner();
        let checkpoints = provisioner.checkpoints();

        let mut training = self.monitor.snapshot();
        if training == TrainingStatus::default() {
            training = TrainingMonitor::read_mirror(checkpoints.dir());
        }

        StatusReport {
            training,
            model_loaded:       self.models.is_loaded(),
            checkpoint_present: self.models.checkpoint_present(),
            model_generation:   self.models.generation(),
            checkpoint_path:    checkpoints.path().display().to_string(),
            checkpoint_source:  provisioner.source().map(|s| s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::training::TrainingPhase;
    use crate::infra::checkpoint::CheckpointManager;
    use crate::infra::provisioner::CheckpointProvisioner;

    #[test]
    fn test_fresh_process_reports_mirrored_training() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TrainingMonitor::new().with_mirror(dir.path());
        writer.begin().unwrap();
        writer.complete(5, 1.5);

        let models = ModelManager::new(CheckpointProvisioner::new(CheckpointManager::new(dir.path()), None));
        let monitor = TrainingMonitor::new();
        let report = StatusUseCase::new(&models, &monitor).execute();

        assert_eq!(report.training.status, TrainingPhase::Completed);
        assert_eq!(report.training.epoch, 5);
        assert!(!report.model_loaded);
        assert!(!report.checkpoint_present);
        assert_eq!(report.model_generation, 0);
        assert_eq!(report.checkpoint_source, None);
    }
}
