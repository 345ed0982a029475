// ============================================================
// Configuration
// ============================================================
// Optional TOML file, located by --config / MINDCHECK_CONFIG,
// else ./mindcheck.toml. Every key is optional:
//
//   [scoring]
//   threshold     = 0.5
//   rule_weight   = 0.5
//   who5_polarity = "direct"      # or "inverted"
//
//   [model]
//   download_timeout_secs = 300
//   tokenizer_repo        = "google-bert/bert-base-uncased"   # "" disables the hub
//
//   [training]
//   epochs = 5
//   batch_size = 8
//   lr = 2e-5
//   seed = 42
//   max_seq_len = 128
//   d_model = 128
//   num_heads = 4
//   num_layers = 2
//   d_ff = 512
//
// A missing file means defaults; a file that does not parse or
// holds out-of-range values is an error.

use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::instrument::Polarity;
use crate::domain::scoring::ScoringPolicy;
use crate::infra::provisioner::DEFAULT_DOWNLOAD_TIMEOUT;

pub const DEFAULT_CONFIG_FILE: &str = "mindcheck.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path:   String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub scoring:  ScoringConfig,
    #[serde(default)]
    pub model:    ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct ScoringConfig {
    pub threshold:   Option<f64>,
    pub rule_weight: Option<f64>,
    #[serde(default)]
    pub who5_polarity: Polarity,
}

#[derive(Debug, Deserialize, Default)]
pub struct ModelConfig {
    pub download_timeout_secs: Option<u64>,
    pub tokenizer_repo:        Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TrainingConfig {
    pub epochs:       Option<usize>,
    pub batch_size:   Option<usize>,
    pub lr:           Option<f64>,
    pub seed:         Option<u64>,
    pub max_seq_len:  Option<usize>,
    pub d_model:      Option<usize>,
    pub num_heads:    Option<usize>,
    pub num_layers:   Option<usize>,
    pub d_ff:         Option<usize>,
    pub dropout:      Option<f64>,
    pub head_dropout: Option<f64>,
}

/// Load `explicit`, else ./mindcheck.toml, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if !path.exists() {
        if explicit.is_some() {
            tracing::warn!("Config file '{}' not found, using defaults", path.display());
        }
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&content).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse { path: path.display().to_string(), message },
        other => other,
    })?;
    tracing::debug!("Loaded configuration from '{}'", path.display());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        path:    "<inline>".to_string(),
        message: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if !config.scoring_policy().is_valid() {
        return Err(ConfigError::Invalid(
            "scoring.threshold and scoring.rule_weight must lie in [0, 1]".into(),
        ));
    }
    if config.model.download_timeout_secs == Some(0) {
        return Err(ConfigError::Invalid("model.download_timeout_secs must be positive".into()));
    }
    config
        .train_config(TrainConfig::default())
        .validate()
        .map_err(|e| ConfigError::Invalid(format!("training: {e}")))
}

impl AppConfig {
    pub fn scoring_policy(&self) -> ScoringPolicy {
        let defaults = ScoringPolicy::default();
        ScoringPolicy {
            threshold:   self.scoring.threshold.unwrap_or(defaults.threshold),
            rule_weight: self.scoring.rule_weight.unwrap_or(defaults.rule_weight),
        }
    }

    pub fn who5_polarity(&self) -> Polarity {
        self.scoring.who5_polarity
    }

    pub fn download_timeout(&self) -> Duration {
        self.model
            .download_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT)
    }

    /// Overlay the `[training]` and `[model]` keys on `base`.
    pub fn train_config(&self, base: TrainConfig) -> TrainConfig {
        let t = &self.training;
        let tokenizer_repo = match &self.model.tokenizer_repo {
            Some(repo) if repo.trim().is_empty() => None,
            Some(repo) => Some(repo.clone()),
            None => base.tokenizer_repo.clone(),
        };
        TrainConfig {
            epochs:       t.epochs.unwrap_or(base.epochs),
            batch_size:   t.batch_size.unwrap_or(base.batch_size),
            lr:           t.lr.unwrap_or(base.lr),
            seed:         t.seed.unwrap_or(base.seed),
            max_seq_len:  t.max_seq_len.unwrap_or(base.max_seq_len),
            d_model:      t.d_model.unwrap_or(base.d_model),
            num_heads:    t.num_heads.unwrap_or(base.num_heads),
            num_layers:   t.num_layers.unwrap_or(base.num_layers),
            d_ff:         t.d_ff.unwrap_or(base.d_ff),
            dropout:      t.dropout.unwrap_or(base.dropout),
            head_dropout: t.head_dropout.unwrap_or(base.head_dropout),
            tokenizer_repo,
            ..base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.scoring_policy(), ScoringPolicy::default());
        assert_eq!(config.who5_polarity(), Polarity::Direct);
        assert_eq!(config.download_timeout(), Duration::from_secs(300));
        assert_eq!(config.train_config(TrainConfig::default()), TrainConfig::default());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = parse_config(
            r#"
            [scoring]
            threshold = 0.6
            who5_polarity = "inverted"

            [model]
            download_timeout_secs = 30
            tokenizer_repo = ""

            [training]
            epochs = 2
            lr = 1e-4
            "#,
        )
        .unwrap();

        assert_eq!(config.scoring_policy().threshold, 0.6);
        assert_eq!(config.scoring_policy().rule_weight, 0.5);
        assert_eq!(config.who5_polarity(), Polarity::Inverted);
        assert_eq!(config.download_timeout(), Duration::from_secs(30));

        let train = config.train_config(TrainConfig::default());
        assert_eq!(train.epochs, 2);
        assert_eq!(train.lr, 1e-4);
        assert_eq!(train.batch_size, 8);
        assert_eq!(train.tokenizer_repo, None);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert!(matches!(parse_config("[scoring]\nthreshold = 1.5"), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse_config("[training]\nbatch_size = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse_config("[scoring]\nwho5_polarity = \"sideways\""), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.scoring_policy(), ScoringPolicy::default());
    }
}
