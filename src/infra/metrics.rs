// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch:
//
//   checkpoints/metrics.csv
//     epoch,total_loss,mean_loss,accuracy
//     1,41.273100,1.375770,0.412500
//     2,33.108400,1.103613,0.587500
//     ...
//
//   total_loss — sum of batch cross-entropy losses (the value
//                reported in the training status)
//   mean_loss  — total_loss / number of batches
//   accuracy   — fraction of training samples whose arg-max
//                label matched the ground truth
//
// The header is written once; later runs append below it.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

pub const METRICS_FILE: &str = "metrics.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub total_loss: f64,
    pub mean_loss:  f64,
    pub accuracy:   f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, total_loss: f64, batches: usize, correct: usize, seen: usize) -> Self {
        let mean_loss = if batches > 0 { total_loss / batches as f64 } else { f64::NAN };
        let accuracy  = if seen > 0 { correct as f64 / seen as f64 } else { 0.0 };
        Self { epoch, total_loss, mean_loss, accuracy }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;
        Ok(Self { csv_path: dir.join(METRICS_FILE) })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let is_new = !self.csv_path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(Row {
            epoch:      m.epoch,
            total_loss: format!("{:.6}", m.total_loss),
            mean_loss:  format!("{:.6}", m.mean_loss),
            accuracy:   format!("{:.6}", m.accuracy),
        })?;
        writer.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: total_loss={:.4}, accuracy={:.3}",
            m.epoch, m.total_loss, m.accuracy,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[derive(Serialize)]
struct Row {
    epoch:      usize,
    total_loss: String,
    mean_loss:  String,
    accuracy:   String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_metrics_derivation() {
        let m = EpochMetrics::new(3, 12.0, 4, 30, 40);
        assert_eq!(m.mean_loss, 3.0);
        assert_eq!(m.accuracy, 0.75);

        let empty = EpochMetrics::new(1, 0.0, 0, 0, 0);
        assert!(empty.mean_loss.is_nan());
        assert_eq!(empty.accuracy, 0.0);
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 4.0, 2, 1, 4)).unwrap();
        logger.log(&EpochMetrics::new(2, 2.0, 2, 3, 4)).unwrap();

        let content = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "epoch,total_loss,mean_loss,accuracy");
        assert_eq!(lines[1], "1,4.000000,2.000000,0.250000");
        assert_eq!(lines.len(), 3);
    }
}
