// ============================================================
// Layer 6 — Training Monitor
// ============================================================
// Shared, process-wide view of the current training run.
// The training loop is the only writer; status queries read
// snapshots.
//
// With a mirror directory set, every update is also written to
// {dir}/training_status.json so a status query from another
// process sees the same state. The file is replaced atomically
// and stamped with the time of the write; a `training` entry
// that has not been refreshed for STALE_AFTER_MINUTES is read back as
// an error.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use crate::domain::error::TrainingError;
use crate::domain::training::{TrainingPhase, TrainingStatus};

pub const STATUS_FILE: &str = "training_status.json";

const STALE_AFTER_MINUTES: i64 = 15;

#[derive(Debug, Serialize, Deserialize)]
struct MirrorRecord {
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    status:     TrainingStatus,
}

impl MirrorRecord {
    fn into_status(self, now: DateTime<Utc>) -> TrainingStatus {
        let mut status = self.status;
        if status.is_running() && now - self.updated_at > Duration::minutes(STALE_AFTER_MINUTES) {
            status.status = TrainingPhase::Error;
            status.error  = Some(format!(
                "training stopped reporting at {}",
                self.updated_at.to_rfc3339()
            ));
        }
        status
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainingMonitor {
    inner:  Arc<RwLock<TrainingStatus>>,
    mirror: Option<PathBuf>,
}

impl TrainingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mirror(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mirror = Some(dir.into());
        self
    }

    pub fn snapshot(&self) -> TrainingStatus {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Move to `training`, refusing while another run is in progress.
    pub fn begin(&self) -> Result<(), TrainingError> {
        {
            let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            if status.is_running() {
                return Err(TrainingError::AlreadyRunning);
            }
            *status = TrainingStatus::started();
        }
        self.mirror_out();
        Ok(())
    }

    pub fn progress(&self, epoch: usize, loss: f64) {
        self.update(|s| {
            s.epoch = epoch;
            s.loss  = Some(loss);
        });
    }

    pub fn complete(&self, epoch: usize, loss: f64) {
        self.update(|s| {
            s.status = TrainingPhase::Completed;
            s.epoch  = epoch;
            s.loss   = Some(loss);
        });
    }

    pub fn fail(&self, error: impl Into<String>) {
        let error = error.into();
        self.update(|s| {
            s.status = TrainingPhase::Error;
            s.error  = Some(error);
        });
    }

    fn update(&self, f: impl FnOnce(&mut TrainingStatus)) {
        {
            let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut status);
        }
        self.mirror_out();
    }

    fn mirror_out(&self) {
        let Some(dir) = &self.mirror else { return };
        let record = MirrorRecord { updated_at: Utc::now(), status: self.snapshot() };
        if let Err(e) = write_mirror(dir, &record) {
            tracing::warn!("Cannot mirror training status to '{}': {e:#}", dir.display());
        }
    }

    /// Last status written by any process into `dir`, or idle.
    pub fn read_mirror(dir: &Path) -> TrainingStatus {
        fs::read(dir.join(STATUS_FILE))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<MirrorRecord>(&bytes).ok())
            .map(|record| record.into_status(Utc::now()))
            .unwrap_or_default()
    }
}

fn write_mirror(dir: &Path, record: &MirrorRecord) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&serde_json::to_vec_pretty(record)?)?;
    tmp.persist(dir.join(STATUS_FILE)).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_to_completed() {
        let monitor = TrainingMonitor::new();
        assert_eq!(monitor.snapshot().status, TrainingPhase::Idle);

        monitor.begin().unwrap();
        monitor.progress(2, 7.5);
        let s = monitor.snapshot();
        assert!(s.is_running());
        assert_eq!((s.epoch, s.loss), (2, Some(7.5)));

        monitor.complete(5, 3.25);
        let s = monitor.snapshot();
        assert_eq!(s.status, TrainingPhase::Completed);
        assert_eq!(s.loss, Some(3.25));
    }

    #[test]
    fn test_second_run_refused_while_running() {
        let monitor = TrainingMonitor::new();
        monitor.begin().unwrap();
        assert!(matches!(monitor.begin(), Err(TrainingError::AlreadyRunning)));

        monitor.fail("dataset missing");
        assert_eq!(monitor.snapshot().error.as_deref(), Some("dataset missing"));
        // a failed run no longer blocks, and the new run clears the error
        monitor.begin().unwrap();
        assert_eq!(monitor.snapshot().error, None);
    }

    #[test]
    fn test_mirror_is_readable_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(TrainingMonitor::read_mirror(dir.path()).status, TrainingPhase::Idle);

        let monitor = TrainingMonitor::new().with_mirror(dir.path());
        monitor.begin().unwrap();
        monitor.progress(1, 10.0);

        let seen = TrainingMonitor::read_mirror(dir.path());
        assert_eq!(seen, monitor.snapshot());

        // only the status file is left behind, no temp files
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_abandoned_run_reads_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let record = MirrorRecord {
            updated_at: Utc::now() - Duration::hours(1),
            status:     TrainingStatus { epoch: 2, ..TrainingStatus::started() },
        };
        write_mirror(dir.path(), &record).unwrap();

        let seen = TrainingMonitor::read_mirror(dir.path());
        assert_eq!(seen.status, TrainingPhase::Error);
        assert_eq!(seen.epoch, 2);
        assert!(seen.error.unwrap().contains("stopped reporting"));
    }

    #[test]
    fn test_fresh_run_still_reads_as_training() {
        let record = MirrorRecord { updated_at: Utc::now(), status: TrainingStatus::started() };
        assert!(record.into_status(Utc::now()).is_running());
    }
}
