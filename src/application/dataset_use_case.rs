// ============================================================
// Layer 2 — Dataset Use Case
// ============================================================
// Quick look at the training CSV before committing to a run:
// row count, rows per label and the first few rows.

use anyhow::Result;
use serde::Serialize;
use std::{collections::BTreeMap, path::PathBuf};

use crate::data::loader::{CsvDatasetLoader, EmotionRecord};

const SAMPLE_ROWS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub path:   String,
    pub rows:   usize,
    pub labels: BTreeMap<String, usize>,
    pub sample: Vec<EmotionRecord>,
}

pub struct DatasetUseCase {
    path: PathBuf,
}

impl DatasetUseCase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn execute(&self) -> Result<DatasetSummary> {
        let records = CsvDatasetLoader::new(&self.path).load_all()?;

        let mut labels = BTreeMap::new();
        for r in &records {
            *labels.entry(r.label.clone()).or_insert(0) += 1;
        }

        Ok(DatasetSummary {
            path:   self.path.display().to_string(),
            rows:   records.len(),
            labels,
            sample: records.into_iter().take(SAMPLE_ROWS).collect(),
        })
    }
}
