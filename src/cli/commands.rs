// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Subcommands and their flags. Values that can also come from
// the environment are marked with `env = ...`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::domain::community::DEFAULT_SPACE;
use crate::domain::instrument::{Answers, Instrument};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the emotion classifier on a labelled CSV
    Train(TrainArgs),

    /// Score one self-assessment submission
    Assess(AssessArgs),

    /// Predict the emotion label of a text
    Analyze(AnalyzeArgs),

    /// Training progress and model availability
    Status,

    /// Fetch the checkpoint from CHECKPOINT_SOURCE if it is missing
    Provision,

    /// Summarise the training dataset
    Dataset(DatasetArgs),

    /// Community posts and comments
    #[command(subcommand)]
    Post(PostCommand),
}

// ─── train ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// CSV with `text` and `label` columns
    #[arg(long, default_value = "emotion_dataset.csv")]
    pub dataset: PathBuf,

    /// Passes over the dataset
    #[arg(long)]
    pub epochs: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// AdamW learning rate
    #[arg(long)]
    pub lr: Option<f64>,

    /// Seed for the dataset shuffle
    #[arg(long)]
    pub seed: Option<u64>,
}

impl TrainArgs {
    /// Flags win over the config file, which wins over the defaults.
    pub fn apply(self, base: TrainConfig, checkpoint_dir: PathBuf) -> TrainConfig {
        TrainConfig {
            dataset_path: self.dataset,
            checkpoint_dir,
            epochs:       self.epochs.unwrap_or(base.epochs),
            batch_size:   self.batch_size.unwrap_or(base.batch_size),
            lr:           self.lr.unwrap_or(base.lr),
            seed:         self.seed.unwrap_or(base.seed),
            ..base
        }
    }
}

// ─── assess ───────────────────────────────────────────────────────────────────
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentArg {
    Gad7,
    Phq9,
    Who5,
    Bfi10,
}

impl From<InstrumentArg> for Instrument {
    fn from(a: InstrumentArg) -> Self {
        match a {
            InstrumentArg::Gad7  => Instrument::Gad7,
            InstrumentArg::Phq9  => Instrument::Phq9,
            InstrumentArg::Who5  => Instrument::Who5,
            InstrumentArg::Bfi10 => Instrument::Bfi10,
        }
    }
}

#[derive(Args, Debug)]
pub struct AssessArgs {
    #[arg(value_enum)]
    pub instrument: InstrumentArg,

    /// JSON request file (`-` for stdin); flags below override its fields
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Answers as `1,2,0,3` or as a JSON list / object
    #[arg(long)]
    pub answers: Option<String>,

    /// Free text describing how the respondent feels
    #[arg(long)]
    pub text: Option<String>,

    /// Respondent name, "Anonymous" when omitted
    #[arg(long)]
    pub user: Option<String>,

    /// Precomputed rule probability in [0, 1]
    #[arg(long)]
    pub probability: Option<f64>,
}

/// `1,2,x` → [1, 2, "x"]; anything starting with `[` or `{` is JSON.
pub fn parse_answers(raw: &str) -> Result<Answers> {
    let raw = raw.trim();
    if raw.starts_with('[') || raw.starts_with('{') {
        return serde_json::from_str(raw).context("Answers are not valid JSON");
    }
    if raw.is_empty() {
        return Ok(Answers::default());
    }
    let values = raw
        .split(',')
        .map(str::trim)
        .map(|s| match s.parse::<f64>() {
            Ok(n) => serde_json::json!(n),
            Err(_) => serde_json::json!(s),
        })
        .collect();
    Ok(Answers::List(values))
}

// ─── analyze / dataset ────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    pub text: String,
}

#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[arg(long, default_value = "emotion_dataset.csv")]
    pub dataset: PathBuf,
}

// ─── post ─────────────────────────────────────────────────────────────────────
#[derive(Subcommand, Debug)]
pub enum PostCommand {
    /// Publish a post in a space
    Create {
        text: String,
        #[arg(long, default_value = DEFAULT_SPACE)]
        space: String,
    },

    /// Comment on a post
    Comment { post_id: i64, text: String },

    /// Posts of a space, newest first
    List {
        #[arg(long, default_value = DEFAULT_SPACE)]
        space: String,
    },

    /// Delete a post and its comments
    Delete { post_id: i64 },

    DeleteComment { comment_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_answers() {
        let answers = parse_answers("1, 2,x").unwrap();
        assert_eq!(answers.numeric(), vec![Some(1.0), Some(2.0), None]);
    }

    #[test]
    fn test_json_answers() {
        let answers = parse_answers(r#"{"q1": 3, "q2": 1}"#).unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers.get("q1"), Some(3.0));
        assert!(parse_answers("[1, 2").is_err());
    }

    #[test]
    fn test_train_flags_override_base() {
        let args = TrainArgs {
            dataset:    PathBuf::from("d.csv"),
            epochs:     Some(9),
            batch_size: None,
            lr:         None,
            seed:       None,
        };
        let cfg = args.apply(TrainConfig::default(), PathBuf::from("ckpt"));
        assert_eq!(cfg.epochs, 9);
        assert_eq!(cfg.batch_size, 8);
        assert_eq!(cfg.checkpoint_dir, PathBuf::from("ckpt"));
        assert_eq!(cfg.dataset_path, PathBuf::from("d.csv"));
    }
}
