//! Command line interface
//!
//! ```bash
//! impago train --data-path data/loans.json --model-name distilbert-base-uncased
//! impago train --config run.yaml --num-epochs 3
//! impago evaluate --checkpoint models/best_model --data-path data/loans.json
//! ```
//!
//! Multi-word flags are also accepted in snake_case (`--data_path`).

use super::loader::{load_spec, parse_spec};
use super::schema::TrainSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fine-tune a pretrained transformer encoder for loan default classification
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "impago")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fine-tune and keep the best checkpoint by F1
    Train(TrainArgs),

    /// Evaluate a saved checkpoint
    Evaluate(EvaluateArgs),
}

/// Arguments for the train command
///
/// Unset flags fall back to the YAML config, then to the built-in defaults.
#[derive(Parser, Debug, Clone, PartialEq, Default)]
pub struct TrainArgs {
    /// YAML training spec
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Dataset file [default: data/loan_default_dataset.json]
    #[arg(long, alias = "data_path")]
    pub data_path: Option<PathBuf>,

    /// Local model directory or Hugging Face repo id
    /// [default: huawei-noah/TinyBERT_General_6L_768D]
    #[arg(long, alias = "model_name")]
    pub model_name: Option<String>,

    /// Checkpoint directory [default: models]
    #[arg(long, alias = "output_dir")]
    pub output_dir: Option<PathBuf>,

    /// [default: 32]
    #[arg(long, alias = "batch_size")]
    pub batch_size: Option<usize>,

    /// AdamW learning rate [default: 2e-5]
    #[arg(long, alias = "learning_rate")]
    pub learning_rate: Option<f32>,

    /// [default: 5]
    #[arg(long, alias = "num_epochs")]
    pub num_epochs: Option<usize>,

    /// Held-out fraction [default: 0.4]
    #[arg(long, alias = "test_size")]
    pub test_size: Option<f64>,

    /// Maximum tokens per text [default: 128]
    #[arg(long, alias = "max_length")]
    pub max_length: Option<usize>,

    /// Random seed [default: 42]
    #[arg(long)]
    pub seed: Option<u64>,

    /// AdamW weight decay [default: 0.01]
    #[arg(long, alias = "weight_decay")]
    pub weight_decay: Option<f32>,

    /// Hugging Face download cache
    #[arg(long, alias = "cache_dir")]
    pub cache_dir: Option<PathBuf>,

    /// Hub revision with `model.safetensors` when `main` only has pickle
    /// weights [default: main, then refs/pr/1]
    #[arg(long, alias = "weights_revision")]
    pub weights_revision: Option<String>,
}

/// Arguments for the evaluate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct EvaluateArgs {
    /// Checkpoint directory (e.g. models/best_model)
    #[arg(long)]
    pub checkpoint: PathBuf,

    /// Dataset file
    #[arg(long, alias = "data_path", default_value = "data/loan_default_dataset.json")]
    pub data_path: PathBuf,

    /// Score every record instead of the held-out split
    #[arg(long)]
    pub full: bool,

    /// Held-out fraction used in training
    #[arg(long, alias = "test_size", default_value_t = 0.4)]
    pub test_size: f64,

    /// Seed used in training
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, alias = "batch_size", default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, alias = "max_length", default_value_t = 128)]
    pub max_length: usize,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> std::result::Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a TrainSpec
pub fn apply_overrides(spec: &mut TrainSpec, args: &TrainArgs) {
    if let Some(path) = &args.data_path {
        spec.data.path = path.clone();
    }
    if let Some(name) = &args.model_name {
        spec.model.name = name.clone();
    }
    if let Some(dir) = &args.output_dir {
        spec.training.output_dir = dir.clone();
    }
    if let Some(batch_size) = args.batch_size {
        spec.data.batch_size = batch_size;
    }
    if let Some(lr) = args.learning_rate {
        spec.optimizer.lr = lr;
    }
    if let Some(epochs) = args.num_epochs {
        spec.training.epochs = epochs;
    }
    if let Some(test_size) = args.test_size {
        spec.data.test_size = test_size;
    }
    if let Some(max_length) = args.max_length {
        spec.model.max_length = max_length;
    }
    if let Some(seed) = args.seed {
        spec.training.seed = seed;
    }
    if let Some(weight_decay) = args.weight_decay {
        spec.optimizer.weight_decay = weight_decay;
    }
    if let Some(cache_dir) = &args.cache_dir {
        spec.model.cache_dir = Some(cache_dir.clone());
    }
    if let Some(revision) = &args.weights_revision {
        spec.model.weights_revision = Some(revision.clone());
    }
}

/// Defaults, then the YAML file (if any), then flags; validated
pub fn resolve_train_spec(args: &TrainArgs) -> Result<TrainSpec> {
    let mut spec = match &args.config {
        Some(path) => load_spec(path)?,
        None => parse_spec("")?,
    };
    apply_overrides(&mut spec, args);
    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_defaults() {
        let cli = parse_args(["impago", "train"]).unwrap();
        let Command::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(args, TrainArgs::default());
        let spec = resolve_train_spec(&args).unwrap();
        assert_eq!(spec, TrainSpec::default());
    }

    #[test]
    fn test_kebab_and_snake_case_flags() {
        let cli = parse_args([
            "impago",
            "train",
            "--data-path",
            "loans.json",
            "--model_name",
            "distilbert-base-uncased",
            "--batch_size",
            "8",
            "--learning-rate",
            "0.001",
            "--num_epochs",
            "2",
            "--test_size",
            "0.25",
        ])
        .unwrap();
        let Command::Train(args) = cli.command else { panic!("expected train") };
        let spec = resolve_train_spec(&args).unwrap();
        assert_eq!(spec.data.path, PathBuf::from("loans.json"));
        assert_eq!(spec.model.name, "distilbert-base-uncased");
        assert_eq!(spec.data.batch_size, 8);
        assert!((spec.optimizer.lr - 0.001).abs() < 1e-9);
        assert_eq!(spec.training.epochs, 2);
        assert!((spec.data.test_size - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_weights_revision_flag() {
        let cli = parse_args(["impago", "train", "--weights_revision", "refs/pr/3"]).unwrap();
        let Command::Train(args) = cli.command else { panic!("expected train") };
        let spec = resolve_train_spec(&args).unwrap();
        assert_eq!(spec.model.weights_revision.as_deref(), Some("refs/pr/3"));
    }

    #[test]
    fn test_global_flags() {
        let cli = parse_args(["impago", "train", "--verbose"]).unwrap();
        assert!(cli.verbose);
        let cli = parse_args(["impago", "-q", "train"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_flags_override_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(&path, "training:\n  epochs: 9\n  seed: 7\n").unwrap();
        let args = TrainArgs { config: Some(path), num_epochs: Some(1), ..TrainArgs::default() };
        let spec = resolve_train_spec(&args).unwrap();
        assert_eq!(spec.training.epochs, 1);
        assert_eq!(spec.training.seed, 7);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = TrainArgs { test_size: Some(1.0), ..TrainArgs::default() };
        assert!(resolve_train_spec(&args).is_err());
    }

    #[test]
    fn test_parse_evaluate() {
        let cli = parse_args([
            "impago",
            "evaluate",
            "--checkpoint",
            "models/best_model",
            "--data_path",
            "loans.json",
            "--full",
        ])
        .unwrap();
        let Command::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        assert_eq!(args.checkpoint, PathBuf::from("models/best_model"));
        assert_eq!(args.data_path, PathBuf::from("loans.json"));
        assert!(args.full);
        assert_eq!(args.seed, 42);
        assert!(parse_args(["impago", "evaluate"]).is_err());
    }
}
