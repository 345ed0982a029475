// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads the labelled emotion dataset from a CSV file.
//
// Expected layout (extra columns are ignored):
//
//   text,label
//   "I can't sleep and my chest is tight",fear
//   "Best day of the year!",joy
//   ...
//
// Rows with an empty text or label are skipped with a warning
// rather than failing the whole run.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::preprocessor::Preprocessor;

/// One labelled example as it appears in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub text:  String,
    pub label: String,
}

impl EmotionRecord {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self { text: text.into(), label: label.into() }
    }
}

/// Loads every usable row of a `text,label` CSV file.
pub struct CsvDatasetLoader {
    path: PathBuf,
}

impl CsvDatasetLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn load_all(&self) -> Result<Vec<EmotionRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open dataset '{}'", self.path.display()))?;

        let preprocessor = Preprocessor::new();
        let mut records  = Vec::new();
        let mut skipped  = 0usize;

        for (row, result) in reader.deserialize::<EmotionRecord>().enumerate() {
            let record = result.with_context(|| {
                format!("Malformed row {} in '{}'", row + 2, self.path.display())
            })?;

            let text = preprocessor.clean(&record.text);
            if text.is_empty() || record.label.is_empty() {
                skipped += 1;
                continue;
            }
            records.push(EmotionRecord::new(text, record.label));
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} rows with empty text or label", skipped);
        }
        tracing::info!(
            "Loaded {} labelled rows from '{}'",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}
