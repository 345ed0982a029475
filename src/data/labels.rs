// ============================================================
// Layer 4 — Label Vocabulary
// ============================================================
// Maps emotion label strings to class indices and back.
//
// Labels are kept in collation (sorted) order, so fitting the
// same dataset twice always yields the same index for each
// label regardless of row order:
//
//   ["sadness", "joy", "fear", "joy"]  →  fear=0, joy=1, sadness=2
//
// The ordered list is written into every checkpoint; the
// classifier head is sized to its length.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    /// Fit from observed labels: distinct values, sorted.
    pub fn fit<I, S>(observed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = observed
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        Self { labels: distinct.into_iter().collect() }
    }

    /// Restore a vocabulary exactly as recorded, order preserved.
    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<String> {
        self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_is_sorted_and_distinct() {
        let v = LabelVocabulary::fit(["sadness", "joy", "fear", "joy"]);
        assert_eq!(v.labels(), &["fear", "joy", "sadness"]);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_fit_ignores_row_order() {
        let a = LabelVocabulary::fit(["b", "a", "c"]);
        let b = LabelVocabulary::fit(["c", "c", "a", "b"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_index_round_trip() {
        let v = LabelVocabulary::fit(["anger", "love"]);
        assert_eq!(v.index_of("love"), Some(1));
        assert_eq!(v.label(1), Some("love"));
        assert_eq!(v.index_of("surprise"), None);
        assert_eq!(v.label(7), None);
    }

    #[test]
    fn test_from_labels_keeps_order() {
        let v = LabelVocabulary::from_labels(vec!["z".into(), "a".into()]);
        assert_eq!(v.label(0), Some("z"));
    }
}
