// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
//   train     — CSV → classifier checkpoint
//   assess    — score GAD-7 / PHQ-9 / WHO-5 / BFI-10 answers
//   analyze   — emotion label for a text
//   status    — training progress, model availability
//   provision — fetch the checkpoint from CHECKPOINT_SOURCE
//   dataset   — inspect the training CSV
//   post      — community posts and comments
//
// Results are printed as pretty JSON on stdout; logs go to stderr.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::{io::Read, path::PathBuf, sync::Arc};

use commands::{AnalyzeArgs, AssessArgs, Commands, DatasetArgs, PostCommand, TrainArgs};

use crate::config::{load_config, AppConfig};
use crate::domain::assessment::AssessmentRequest;
use crate::domain::error::ProvisioningError;
use crate::infra::{
    checkpoint::CheckpointManager,
    model_manager::ModelManager,
    post_store::JsonPostStore,
    provisioner::{CheckpointProvisioner, CheckpointSource},
    result_store::JsonlResultStore,
    status::TrainingMonitor,
};

#[derive(Parser, Debug)]
#[command(
    name = "mindcheck",
    version,
    about = "Hybrid mental-health self-assessment scoring with an emotion classifier."
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "MINDCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where assessment results and community posts are stored
    #[arg(long, global = true, env = "MINDCHECK_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Where the classifier checkpoint, tokenizer and metrics live
    #[arg(long, global = true, env = "MINDCHECK_CHECKPOINT_DIR", default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// `hf://owner/repo[/file]` on the Hugging Face Hub, or an http(s) URL
    #[arg(long, global = true, env = "CHECKPOINT_SOURCE")]
    pub checkpoint_source: Option<String>,

    /// Hub token for private repositories
    #[arg(long, global = true, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;

        match &self.command {
            Commands::Train(args)    => self.run_train(&config, args),
            Commands::Assess(args)   => self.run_assess(&config, args),
            Commands::Analyze(args)  => self.run_analyze(&config, args),
            Commands::Status         => self.run_status(&config),
            Commands::Provision      => self.run_provision(&config),
            Commands::Dataset(args)  => self.run_dataset(args),
            Commands::Post(command)  => self.run_post(&config, command),
        }
    }

    // ─── Shared wiring ────────────────────────────────────────────────────────
    fn checkpoint_source(&self) -> Result<Option<CheckpointSource>, ProvisioningError> {
        match self.checkpoint_source.as_deref() {
            Some(descriptor) => CheckpointSource::parse(descriptor),
            None => Ok(None),
        }
    }

    fn provisioner(&self, config: &AppConfig, source: Option<CheckpointSource>) -> CheckpointProvisioner {
        CheckpointProvisioner::new(CheckpointManager::new(&self.checkpoint_dir), source)
            .with_token(self.hf_token.clone())
            .with_timeout(config.download_timeout())
    }

    /// A bad source only disables remote provisioning; scoring carries on.
    fn model_manager(&self, config: &AppConfig) -> ModelManager {
        let source = self.checkpoint_source().unwrap_or_else(|e| {
            tracing::warn!("Ignoring CHECKPOINT_SOURCE: {e}");
            None
        });
        ModelManager::new(self.provisioner(config, source))
    }

    fn monitor(&self) -> TrainingMonitor {
        TrainingMonitor::new().with_mirror(&self.checkpoint_dir)
    }

    // ─── Commands ─────────────────────────────────────────────────────────────
    fn run_train(&self, config: &AppConfig, args: &TrainArgs) -> Result<()> {
        use crate::application::train_use_case::{TrainConfig, TrainUseCase};

        let train_config = args
            .clone()
            .apply(config.train_config(TrainConfig::default()), self.checkpoint_dir.clone());

        tracing::info!("Starting training on '{}'", train_config.dataset_path.display());

        let models   = Arc::new(self.model_manager(config));
        let use_case = TrainUseCase::new(train_config, self.monitor(), models).with_token(self.hf_token.clone());
        let report   = use_case.execute()?;

        print_json(&report)
    }

    fn run_assess(&self, config: &AppConfig, args: &AssessArgs) -> Result<()> {
        use crate::application::assess_use_case::AssessUseCase;

        let request = build_request(args)?;
        let models  = self.model_manager(config);
        let results = JsonlResultStore::new(&self.data_dir);

        let outcome = AssessUseCase::new(
            args.instrument.into(),
            config.scoring_policy(),
            config.who5_polarity(),
            &models,
            &results,
        )
        .execute(&request)?;

        print_json(&outcome)
    }

    fn run_analyze(&self, config: &AppConfig, args: &AnalyzeArgs) -> Result<()> {
        use crate::application::analyze_use_case::AnalyzeUseCase;

        let models   = self.model_manager(config);
        let analysis = AnalyzeUseCase::new(&models).execute(&args.text)?;
        print_json(&analysis)
    }

    fn run_status(&self, config: &AppConfig) -> Result<()> {
        use crate::application::status_use_case::StatusUseCase;

        let models  = self.model_manager(config);
        let monitor = self.monitor();
        print_json(&StatusUseCase::new(&models, &monitor).execute())
    }

    fn run_provision(&self, config: &AppConfig) -> Result<()> {
        let provisioner = self.provisioner(config, self.checkpoint_source()?);
        let available = provisioner.ensure_available()?;

        if available {
            println!("Checkpoint ready at {}", provisioner.checkpoints().path().display());
        } else {
            println!("No checkpoint at {} and no CHECKPOINT_SOURCE configured.", provisioner.checkpoints().path().display());
        }
        Ok(())
    }

    fn run_dataset(&self, args: &DatasetArgs) -> Result<()> {
        use crate::application::dataset_use_case::DatasetUseCase;

        print_json(&DatasetUseCase::new(&args.dataset).execute()?)
    }

    fn run_post(&self, config: &AppConfig, command: &PostCommand) -> Result<()> {
        use crate::application::community_use_case::CommunityUseCase;

        let models    = self.model_manager(config);
        let store     = JsonPostStore::new(&self.data_dir);
        let community = CommunityUseCase::new(&store, &models);

        match command {
            PostCommand::Create { text, space } => print_json(&community.create_post(space, text)?),
            PostCommand::Comment { post_id, text } => print_json(&community.add_comment(*post_id, text)?),
            PostCommand::List { space } => print_json(&community.list(space)?),
            PostCommand::Delete { post_id } => {
                community.delete_post(*post_id)?;
                println!("Deleted post {post_id}");
                Ok(())
            }
            PostCommand::DeleteComment { comment_id } => {
                community.delete_comment(*comment_id)?;
                println!("Deleted comment {comment_id}");
                Ok(())
            }
        }
    }
}

/// Request file first, then the individual flags on top.
fn build_request(args: &AssessArgs) -> Result<AssessmentRequest> {
    let mut request = match &args.request {
        Some(path) => {
            let raw = if path.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).context("Failed to read request from stdin")?;
                buf
            } else {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read request file '{}'", path.display()))?
            };
            serde_json::from_str::<AssessmentRequest>(&raw).context("Request is not a valid assessment")?
        }
        None => AssessmentRequest::default(),
    };

    if let Some(answers) = &args.answers {
        request.answers = commands::parse_answers(answers)?;
    }
    if let Some(text) = &args.text {
        request.text = Some(text.clone());
    }
    if let Some(user) = &args.user {
        request.user_name = Some(user.clone());
    }
    if let Some(p) = args.probability {
        request.probability = Some(p);
    }
    Ok(request)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::InstrumentArg;

    fn assess_args() -> AssessArgs {
        AssessArgs {
            instrument:  InstrumentArg::Gad7,
            request:     None,
            answers:     None,
            text:        None,
            user:        None,
            probability: None,
        }
    }

    #[test]
    fn test_flags_override_request_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("req.json");
        std::fs::write(&path, r#"{"user_name": "ana", "answers": [1, 1], "text": "tired"}"#).unwrap();

        let args = AssessArgs {
            request: Some(path),
            answers: Some("3,3,3".into()),
            ..assess_args()
        };
        let request = build_request(&args).unwrap();
        assert_eq!(request.answers.len(), 3);
        assert_eq!(request.user_name.as_deref(), Some("ana"));
        assert_eq!(request.text.as_deref(), Some("tired"));
    }

    #[test]
    fn test_cli_parses_assess() {
        let cli = Cli::try_parse_from(["mindcheck", "assess", "phq9", "--answers", "0,1,2"]).unwrap();
        match cli.command {
            Commands::Assess(args) => assert_eq!(args.instrument, InstrumentArg::Phq9),
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn cli_in(dir: &std::path::Path, args: &[&str]) -> Cli {
        let dir = dir.to_str().unwrap();
        let mut argv = vec![
            "mindcheck",
            "--config", "absent.toml",
            "--data-dir", dir,
            "--checkpoint-dir", dir,
        ];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_bad_checkpoint_source_still_scores() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli_in(dir.path(), &[
            "--checkpoint-source", "acme/emotion:emotion_classifier.mpk",
            "assess", "gad7", "--answers", "1,1,1,1,1,1,1",
        ]);
        let config = AppConfig::default();
        assert!(cli.model_manager(&config).provisioner().source().is_none());

        cli.run().unwrap();
        let stored = JsonlResultStore::new(dir.path())
            .read_all(crate::domain::instrument::Instrument::Gad7)
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_bad_checkpoint_source_fails_provision() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli_in(dir.path(), &["--checkpoint-source", "acme/emotion", "provision"]);
        assert!(cli.run().is_err());
    }

    #[test]
    fn test_cli_parses_post_defaults() {
        let cli = Cli::try_parse_from(["mindcheck", "post", "list"]).unwrap();
        match cli.command {
            Commands::Post(PostCommand::List { space }) => assert_eq!(space, "Community Support"),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
