// ============================================================
// Layer 6 — Result Store
// ============================================================
// Append-only JSON-lines files, one per instrument table:
//
//   data/anxiety_results.jsonl
//   data/depression_results.jsonl
//   data/personality_results.jsonl
//   data/wellbeing_results.jsonl
//
// One InstrumentResult per line. Appends are serialised by a
// mutex so concurrent writers never interleave a line.

use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use crate::domain::assessment::InstrumentResult;
use crate::domain::error::PersistenceError;
use crate::domain::instrument::Instrument;
use crate::domain::traits::ResultSink;

pub struct JsonlResultStore {
    dir:   PathBuf,
    write: Mutex<()>,
}

impl JsonlResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), write: Mutex::new(()) }
    }

    pub fn table_path(&self, instrument: Instrument) -> PathBuf {
        self.dir.join(format!("{}.jsonl", instrument.table()))
    }

    /// Every stored result for `instrument`, oldest first.
    pub fn read_all(&self, instrument: Instrument) -> Result<Vec<InstrumentResult>, PersistenceError> {
        let path = self.table_path(instrument);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_lines(&path)
    }
}

fn read_lines(path: &Path) -> Result<Vec<InstrumentResult>, PersistenceError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut results = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        results.push(serde_json::from_str(&line)?);
    }
    Ok(results)
}

impl ResultSink for JsonlResultStore {
    fn append(&self, result: &InstrumentResult) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');

        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(result.instrument))?;
        file.write_all(&line)?;

        tracing::debug!("Stored {} result for '{}'", result.instrument, result.user_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assessment::AssessmentRequest;
    use crate::domain::instrument::Answers;
    use crate::domain::scoring::{HybridRiskScorer, ScoringPolicy};

    fn result(instrument: Instrument, user: &str) -> InstrumentResult {
        let scorer  = HybridRiskScorer::for_instrument(instrument, ScoringPolicy::default());
        let request = AssessmentRequest::new(Answers::default()).with_user(user);
        let outcome = scorer.combine(0.25, 0.0);
        InstrumentResult::new(instrument, &request, &outcome)
    }

    #[test]
    fn test_results_go_to_their_own_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlResultStore::new(dir.path());

        store.append(&result(Instrument::Gad7, "ana")).unwrap();
        store.append(&result(Instrument::Gad7, "ben")).unwrap();
        store.append(&result(Instrument::Who5, "ana")).unwrap();

        assert!(dir.path().join("anxiety_results.jsonl").is_file());
        let gad7 = store.read_all(Instrument::Gad7).unwrap();
        assert_eq!(gad7.len(), 2);
        assert_eq!(gad7[1].user_name, "ben");
        assert_eq!(store.read_all(Instrument::Who5).unwrap().len(), 1);
        assert!(store.read_all(Instrument::Phq9).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_appends_keep_lines_whole() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlResultStore::new(dir.path());

        std::thread::scope(|s| {
            for i in 0..8 {
                let store = &store;
                s.spawn(move || store.append(&result(Instrument::Bfi10, &format!("user{i}"))).unwrap());
            }
        });

        assert_eq!(store.read_all(Instrument::Bfi10).unwrap().len(), 8);
    }
}
