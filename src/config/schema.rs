//! YAML schema for a fine-tuning run
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the same run as the command line defaults:
//!
//! ```yaml
//! model:
//!   name: huawei-noah/TinyBERT_General_6L_768D
//!   max_length: 128
//! data:
//!   path: data/loan_default_dataset.json
//!   test_size: 0.4
//!   batch_size: 32
//! optimizer:
//!   name: adamw
//!   lr: 2.0e-5
//!   weight_decay: 0.01
//! training:
//!   epochs: 5
//!   output_dir: models
//!   seed: 42
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete training specification
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainSpec {
    #[serde(default)]
    pub model: ModelSpec,

    #[serde(default)]
    pub data: DataSpec,

    #[serde(default)]
    pub optimizer: OptimSpec,

    #[serde(default)]
    pub training: TrainingParams,
}

/// Pretrained model to start from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Local directory or Hugging Face repo id
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Hub download cache (defaults to `~/.cache/huggingface/hub`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Extra Hub revision to search for `model.safetensors` (e.g. `refs/pr/3`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights_revision: Option<String>,

    /// Tokens per sequence, including `[CLS]` and `[SEP]`
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

/// Dataset and batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    /// JSON array or JSON Lines of `{text, label}` records
    #[serde(default = "default_data_path")]
    pub path: PathBuf,

    /// Fraction of samples held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Optimizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimSpec {
    /// Only `adamw` is supported
    #[serde(default = "default_optimizer")]
    pub name: String,

    #[serde(default = "default_lr")]
    pub lr: f32,

    #[serde(default = "default_weight_decay")]
    pub weight_decay: f32,
}

/// Epoch loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Receives `best_model/` and `latest_model/`
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Seeds the split, shuffling, head initialization and dropout
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_model_name() -> String {
    "huawei-noah/TinyBERT_General_6L_768D".to_string()
}

fn default_max_length() -> usize {
    128
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/loan_default_dataset.json")
}

fn default_test_size() -> f64 {
    0.4
}

fn default_batch_size() -> usize {
    32
}

fn default_optimizer() -> String {
    "adamw".to_string()
}

fn default_lr() -> f32 {
    2e-5
}

fn default_weight_decay() -> f32 {
    0.01
}

fn default_epochs() -> usize {
    5
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_seed() -> u64 {
    42
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            cache_dir: None,
            weights_revision: None,
            max_length: default_max_length(),
        }
    }
}

impl Default for DataSpec {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            test_size: default_test_size(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for OptimSpec {
    fn default() -> Self {
        Self { name: default_optimizer(), lr: default_lr(), weight_decay: default_weight_decay() }
    }
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self { epochs: default_epochs(), output_dir: default_output_dir(), seed: default_seed() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let spec: TrainSpec = serde_yaml::from_str("{}").unwrap();
        assert_eq!(spec, TrainSpec::default());
        assert_eq!(spec.data.batch_size, 32);
        assert_eq!(spec.training.epochs, 5);
        assert!((spec.data.test_size - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let yaml = "data:\n  batch_size: 8\noptimizer:\n  lr: 1.0e-4\n";
        let spec: TrainSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.data.batch_size, 8);
        assert_eq!(spec.data.path, PathBuf::from("data/loan_default_dataset.json"));
        assert!((spec.optimizer.lr - 1e-4).abs() < 1e-10);
        assert_eq!(spec.optimizer.name, "adamw");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let spec = TrainSpec::default();
        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert!(!yaml.contains("cache_dir"));
        let back: TrainSpec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, spec);
    }
}
