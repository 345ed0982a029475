// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a CSV file (or a single request text)
// and tensor batches:
//
//   emotion_dataset.csv
//       │
//       ▼
//   CsvDatasetLoader  → EmotionRecord { text, label }
//       │
//       ▼
//   Preprocessor      → single-line, whitespace-normalised text
//       │
//       ▼
//   LabelVocabulary   → label string ⇄ class index
//       │
//       ▼
//   TextEncoding      → [CLS] ids [SEP] [PAD]... + attention mask
//       │
//       ▼
//   EmotionDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   EmotionBatcher    → stacks samples into tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the labelled `text,label` CSV file
pub mod loader;

/// Normalises raw text before tokenisation
pub mod preprocessor;

/// Sorted label vocabulary shared by training and inference
pub mod labels;

/// Fixed-window token framing and padding
pub mod encoding;

/// Implements Burn's Dataset trait for emotion samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
