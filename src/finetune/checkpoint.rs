//! Training checkpoints
//!
//! A checkpoint directory is a complete pretrained model directory
//! (`config.json`, `model.safetensors`, `vocab.txt`, `tokenizer_config.json`)
//! plus the training state next to it:
//!
//! - `optimizer.safetensors`: AdamW moments as `{param}.exp_avg` and
//!   `{param}.exp_avg_sq`, hyperparameters and the step count in the header
//! - `metadata.json`: epoch, losses, test metrics, learning rate, base model

use super::classifier::SequenceClassifier;
use crate::data::LABEL_NAMES;
use crate::error::{Error, Result};
use crate::eval::EvalMetrics;
use crate::optim::{AdamW, Optimizer};
use crate::tokenizer::WordPieceTokenizer;
use crate::transformer::weights::{read_safetensors, read_safetensors_metadata, write_safetensors};
use crate::transformer::StateEntry;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Directory under the output dir holding the best checkpoint by F1
pub const BEST_MODEL_DIR: &str = "best_model";
/// Directory under the output dir holding the most recent epoch
pub const LATEST_MODEL_DIR: &str = "latest_model";

const METADATA_FILE: &str = "metadata.json";
const OPTIMIZER_FILE: &str = "optimizer.safetensors";

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// 1-based epoch that produced the checkpoint
    pub epoch: usize,
    pub train_loss: f64,
    pub test_loss: f64,
    pub test_metrics: EvalMetrics,
    pub learning_rate: f32,
    /// Base model the run started from
    pub model_name: String,
}

/// Write model, tokenizer, optimizer state and metadata into `dir`
pub fn save_checkpoint(
    dir: &Path,
    model: &SequenceClassifier,
    optimizer: &AdamW,
    tokenizer: &WordPieceTokenizer,
    metadata: &CheckpointMetadata,
) -> Result<()> {
    model.save_pretrained(dir, tokenizer, &LABEL_NAMES)?;
    save_optimizer_state(&dir.join(OPTIMIZER_FILE), optimizer, model.parameter_names())?;

    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| Error::Serialization(format!("Failed to serialize metadata: {e}")))?;
    std::fs::write(dir.join(METADATA_FILE), json)?;
    Ok(())
}

fn save_optimizer_state(path: &Path, optimizer: &AdamW, names: &[String]) -> Result<()> {
    let mut entries = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let m = optimizer.first_moments().get(i).and_then(Option::as_ref);
        let v = optimizer.second_moments().get(i).and_then(Option::as_ref);
        if let (Some(m), Some(v)) = (m, v) {
            entries.push(StateEntry {
                name: format!("{name}.exp_avg"),
                shape: vec![m.len()],
                data: m.to_vec(),
            });
            entries.push(StateEntry {
                name: format!("{name}.exp_avg_sq"),
                shape: vec![v.len()],
                data: v.to_vec(),
            });
        }
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("step".to_string(), optimizer.step_count().to_string());
    metadata.insert("lr".to_string(), optimizer.lr().to_string());
    metadata.insert("beta1".to_string(), optimizer.beta1().to_string());
    metadata.insert("beta2".to_string(), optimizer.beta2().to_string());
    metadata.insert("eps".to_string(), optimizer.epsilon().to_string());
    metadata.insert("weight_decay".to_string(), optimizer.weight_decay().to_string());
    write_safetensors(path, entries.iter().map(|e| (e.name.as_str(), e)), metadata)
}

/// Read `metadata.json` from a checkpoint directory
pub fn load_metadata(dir: &Path) -> Result<CheckpointMetadata> {
    let path = dir.join(METADATA_FILE);
    let text = std::fs::read_to_string(&path)
        .map_err(|e| Error::Io(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::Serialization(format!("Failed to parse {}: {e}", path.display())))
}

/// Restore AdamW moments and step count saved with `model`'s parameters
///
/// Moments are matched to parameters by name; returns how many parameters
/// had state restored.
pub fn load_optimizer_state(
    dir: &Path,
    optimizer: &mut AdamW,
    model: &SequenceClassifier,
) -> Result<usize> {
    let path = dir.join(OPTIMIZER_FILE);
    let header = read_safetensors_metadata(&path)?;
    let step = header
        .get("step")
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| Error::InvalidFormat(format!("{} has no step count", path.display())))?;
    let tensors = read_safetensors(&path)?;

    let mut restored = 0;
    for (i, (name, param)) in model.named_parameters().into_iter().enumerate() {
        let m = tensors.get(&format!("{name}.exp_avg"));
        let v = tensors.get(&format!("{name}.exp_avg_sq"));
        let (Some(m), Some(v)) = (m, v) else { continue };
        if m.data.len() != param.len() || v.data.len() != param.len() {
            return Err(Error::ShapeMismatch {
                name: format!("{name}.exp_avg"),
                expected: vec![param.len()],
                actual: m.shape.clone(),
            });
        }
        optimizer.set_first_moment(i, Array1::from(m.data.clone()));
        optimizer.set_second_moment(i, Array1::from(v.data.clone()));
        restored += 1;
    }
    optimizer.set_step_count(step);
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::backward;
    use crate::tokenizer::TokenizerConfig;
    use crate::transformer::EncoderConfig;
    use tempfile::TempDir;

    fn tokenizer() -> WordPieceTokenizer {
        let vocab = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "late", "paid"];
        WordPieceTokenizer::from_tokens(
            vocab.iter().map(|s| s.to_string()).collect(),
            TokenizerConfig::default(),
        )
        .unwrap()
    }

    fn metadata() -> CheckpointMetadata {
        CheckpointMetadata {
            epoch: 2,
            train_loss: 0.61,
            test_loss: 0.58,
            test_metrics: EvalMetrics { accuracy: 0.7, precision: 0.5, recall: 1.0, f1: 0.6667 },
            learning_rate: 0.125,
            model_name: "local-tiny".into(),
        }
    }

    fn trained_step() -> (SequenceClassifier, AdamW) {
        let mut model = SequenceClassifier::new(&EncoderConfig::tiny(7), 2, 5);
        let mut optimizer = AdamW::default_params(1e-3);
        let ids = [vec![2, 5, 3], vec![2, 6, 3]];
        let mask = [vec![1, 1, 1], vec![1, 1, 1]];
        let out = model.forward(&ids, &mask, Some(&[1, 0])).unwrap();
        let mut loss = out.loss.unwrap();
        backward(&mut loss, None);
        optimizer.step_refs(&mut model.parameters_mut());
        (model, optimizer)
    }

    #[test]
    fn test_checkpoint_layout_and_metadata() {
        let dir = TempDir::new().unwrap();
        let (model, optimizer) = trained_step();
        save_checkpoint(dir.path(), &model, &optimizer, &tokenizer(), &metadata()).unwrap();

        for file in ["config.json", "model.safetensors", "vocab.txt", "optimizer.safetensors"] {
            assert!(dir.path().join(file).exists(), "{file} missing");
        }
        assert_eq!(load_metadata(dir.path()).unwrap(), metadata());

        let config: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("config.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(config["id2label"]["1"], "Defaulted");
        assert_eq!(config["num_labels"], 2);
    }

    #[test]
    fn test_optimizer_state_roundtrip() {
        let dir = TempDir::new().unwrap();
        let (model, optimizer) = trained_step();
        save_checkpoint(dir.path(), &model, &optimizer, &tokenizer(), &metadata()).unwrap();

        let mut restored = AdamW::default_params(1e-3);
        let count = load_optimizer_state(dir.path(), &mut restored, &model).unwrap();
        assert_eq!(restored.step_count(), 1);
        assert!(count > 0);
        for (i, m) in optimizer.first_moments().iter().enumerate() {
            if let Some(m) = m {
                assert_eq!(restored.first_moments()[i].as_ref(), Some(m));
            }
        }
    }

    #[test]
    fn test_missing_checkpoint_files_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_metadata(dir.path()).is_err());
        let (model, _) = trained_step();
        let mut optimizer = AdamW::default_params(1e-3);
        assert!(load_optimizer_state(dir.path(), &mut optimizer, &model).is_err());
    }
}
