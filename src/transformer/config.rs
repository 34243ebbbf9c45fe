//! Encoder configuration
//!
//! Parsed from a Hugging Face `config.json` for DistilBERT or BERT-family
//! checkpoints (TinyBERT loads as BERT). The parsed JSON is kept so a saved
//! checkpoint writes back every field it was loaded with.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Encoder family, which decides weight names and head layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// DistilBERT: no token type embeddings, `pre_classifier` head
    DistilBert,
    /// BERT and its distillations (TinyBERT): token types, pooler head
    Bert,
}

impl Architecture {
    /// The `model_type` string Hugging Face uses
    pub fn model_type(self) -> &'static str {
        match self {
            Self::DistilBert => "distilbert",
            Self::Bert => "bert",
        }
    }

    /// Class name written to `architectures` in a saved config
    pub fn classifier_class(self) -> &'static str {
        match self {
            Self::DistilBert => "DistilBertForSequenceClassification",
            Self::Bert => "BertForSequenceClassification",
        }
    }
}

/// Feed-forward activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Gelu,
    Relu,
}

/// Configuration for a transformer encoder
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub architecture: Architecture,
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub max_position_embeddings: usize,
    /// 0 for DistilBERT, which has no token type embeddings
    pub type_vocab_size: usize,
    pub hidden_dropout: f32,
    pub attention_dropout: f32,
    /// Dropout in front of the classifier layer
    pub classifier_dropout: f32,
    pub layer_norm_eps: f32,
    pub activation: Activation,
    pub pad_token_id: u32,
    raw: Value,
}

fn usize_field(raw: &Value, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| raw.get(*n)?.as_u64()).map(|v| v as usize)
}

fn f32_field(raw: &Value, names: &[&str]) -> Option<f32> {
    names.iter().find_map(|n| raw.get(*n)?.as_f64()).map(|v| v as f32)
}

fn require(value: Option<usize>, field: &str) -> Result<usize> {
    value.ok_or_else(|| Error::ConfigError(format!("config.json is missing `{field}`")))
}

impl EncoderConfig {
    /// Parse a Hugging Face `config.json` value
    pub fn from_json(raw: Value) -> Result<Self> {
        let architecture = match raw.get("model_type").and_then(Value::as_str) {
            Some("distilbert") => Architecture::DistilBert,
            Some("bert") => Architecture::Bert,
            Some(other) => {
                return Err(Error::ConfigError(format!(
                    "Unsupported model_type `{other}` (expected distilbert or bert)"
                )))
            }
            None if raw.get("dim").is_some() => Architecture::DistilBert,
            None => Architecture::Bert,
        };

        let config = match architecture {
            Architecture::DistilBert => {
                let hidden_dropout = f32_field(&raw, &["dropout"]).unwrap_or(0.1);
                Self {
                    architecture,
                    vocab_size: require(usize_field(&raw, &["vocab_size"]), "vocab_size")?,
                    hidden_size: require(usize_field(&raw, &["dim", "hidden_size"]), "dim")?,
                    num_hidden_layers: require(
                        usize_field(&raw, &["n_layers", "num_hidden_layers"]),
                        "n_layers",
                    )?,
                    num_attention_heads: require(
                        usize_field(&raw, &["n_heads", "num_attention_heads"]),
                        "n_heads",
                    )?,
                    intermediate_size: require(
                        usize_field(&raw, &["hidden_dim", "intermediate_size"]),
                        "hidden_dim",
                    )?,
                    max_position_embeddings: usize_field(&raw, &["max_position_embeddings"])
                        .unwrap_or(512),
                    type_vocab_size: 0,
                    hidden_dropout,
                    attention_dropout: f32_field(&raw, &["attention_dropout"]).unwrap_or(0.1),
                    classifier_dropout: f32_field(&raw, &["seq_classif_dropout"]).unwrap_or(0.2),
                    layer_norm_eps: 1e-12,
                    activation: parse_activation(
                        raw.get("activation").and_then(Value::as_str).unwrap_or("gelu"),
                    )?,
                    pad_token_id: usize_field(&raw, &["pad_token_id"]).unwrap_or(0) as u32,
                    raw: Value::Null,
                }
            }
            Architecture::Bert => {
                let hidden_dropout = f32_field(&raw, &["hidden_dropout_prob"]).unwrap_or(0.1);
                Self {
                    architecture,
                    vocab_size: require(usize_field(&raw, &["vocab_size"]), "vocab_size")?,
                    hidden_size: require(usize_field(&raw, &["hidden_size"]), "hidden_size")?,
                    num_hidden_layers: require(
                        usize_field(&raw, &["num_hidden_layers"]),
                        "num_hidden_layers",
                    )?,
                    num_attention_heads: require(
                        usize_field(&raw, &["num_attention_heads"]),
                        "num_attention_heads",
                    )?,
                    intermediate_size: require(
                        usize_field(&raw, &["intermediate_size"]),
                        "intermediate_size",
                    )?,
                    max_position_embeddings: usize_field(&raw, &["max_position_embeddings"])
                        .unwrap_or(512),
                    type_vocab_size: usize_field(&raw, &["type_vocab_size"]).unwrap_or(2),
                    hidden_dropout,
                    attention_dropout: f32_field(&raw, &["attention_probs_dropout_prob"])
                        .unwrap_or(0.1),
                    classifier_dropout: f32_field(&raw, &["classifier_dropout"])
                        .unwrap_or(hidden_dropout),
                    layer_norm_eps: f32_field(&raw, &["layer_norm_eps"]).unwrap_or(1e-12),
                    activation: parse_activation(
                        raw.get("hidden_act").and_then(Value::as_str).unwrap_or("gelu"),
                    )?,
                    pad_token_id: usize_field(&raw, &["pad_token_id"]).unwrap_or(0) as u32,
                    raw: Value::Null,
                }
            }
        };

        let config = Self { raw, ..config };
        config.validate()?;
        Ok(config)
    }

    /// Read and parse `config.json`
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(format!("Failed to read {}: {e}", path.display()))
        })?;
        let raw: Value = serde_json::from_str(&text).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Self::from_json(raw)
    }

    /// Check the sizes are usable
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("vocab_size", self.vocab_size),
            ("hidden_size", self.hidden_size),
            ("num_hidden_layers", self.num_hidden_layers),
            ("num_attention_heads", self.num_attention_heads),
            ("intermediate_size", self.intermediate_size),
            ("max_position_embeddings", self.max_position_embeddings),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(Error::ConfigError(format!("{name} must be positive")));
            }
        }
        if self.hidden_size % self.num_attention_heads != 0 {
            return Err(Error::ConfigError(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        Ok(())
    }

    /// Dimension of one attention head
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }

    /// `config.json` for a fine-tuned sequence classifier built on this encoder
    ///
    /// Starts from the fields the encoder was loaded with and records the
    /// classification head (`num_labels`, `id2label`, `label2id`).
    pub fn to_classifier_json(&self, label_names: &[&str]) -> Value {
        let mut map = match &self.raw {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let id2label: Map<String, Value> =
            label_names.iter().enumerate().map(|(i, n)| (i.to_string(), json!(n))).collect();
        let label2id: Map<String, Value> =
            label_names.iter().enumerate().map(|(i, n)| ((*n).to_string(), json!(i))).collect();

        map.insert("model_type".into(), json!(self.architecture.model_type()));
        map.insert("architectures".into(), json!([self.architecture.classifier_class()]));
        map.insert("num_labels".into(), json!(label_names.len()));
        map.insert("id2label".into(), Value::Object(id2label));
        map.insert("label2id".into(), Value::Object(label2id));
        map.insert("problem_type".into(), json!("single_label_classification"));
        Value::Object(map)
    }

    /// Number of labels recorded in the config, if it is a fine-tuned classifier
    pub fn num_labels(&self) -> Option<usize> {
        usize_field(&self.raw, &["num_labels"])
            .or_else(|| self.raw.get("id2label")?.as_object().map(Map::len))
    }

    /// Small DistilBERT-shaped config for tests
    pub fn tiny(vocab_size: usize) -> Self {
        let raw = json!({
            "model_type": "distilbert",
            "vocab_size": vocab_size,
            "dim": 16,
            "n_layers": 2,
            "n_heads": 2,
            "hidden_dim": 32,
            "max_position_embeddings": 64,
            "dropout": 0.1,
            "attention_dropout": 0.1,
            "seq_classif_dropout": 0.2,
            "activation": "gelu",
            "pad_token_id": 0
        });
        Self::from_json(raw).unwrap_or_else(|e| unreachable!("tiny config is valid: {e}"))
    }

    /// Small BERT-shaped config for tests
    pub fn tiny_bert(vocab_size: usize) -> Self {
        let raw = json!({
            "model_type": "bert",
            "vocab_size": vocab_size,
            "hidden_size": 16,
            "num_hidden_layers": 2,
            "num_attention_heads": 4,
            "intermediate_size": 32,
            "max_position_embeddings": 64,
            "type_vocab_size": 2,
            "hidden_dropout_prob": 0.1,
            "attention_probs_dropout_prob": 0.1,
            "hidden_act": "gelu",
            "layer_norm_eps": 1e-12,
            "pad_token_id": 0
        });
        Self::from_json(raw).unwrap_or_else(|e| unreachable!("tiny config is valid: {e}"))
    }
}

fn parse_activation(name: &str) -> Result<Activation> {
    match name {
        "gelu" | "gelu_new" | "gelu_pytorch_tanh" | "gelu_fast" => Ok(Activation::Gelu),
        "relu" => Ok(Activation::Relu),
        other => Err(Error::ConfigError(format!("Unsupported activation `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distilbert_config() {
        let raw = json!({
            "model_type": "distilbert",
            "vocab_size": 30522,
            "dim": 768,
            "n_layers": 6,
            "n_heads": 12,
            "hidden_dim": 3072,
            "dropout": 0.1,
            "attention_dropout": 0.1,
            "seq_classif_dropout": 0.2,
            "max_position_embeddings": 512
        });
        let config = EncoderConfig::from_json(raw).unwrap();
        assert_eq!(config.architecture, Architecture::DistilBert);
        assert_eq!(config.hidden_size, 768);
        assert_eq!(config.head_dim(), 64);
        assert_eq!(config.type_vocab_size, 0);
        assert!((config.classifier_dropout - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_tinybert_config() {
        // huawei-noah/TinyBERT_General_6L_768D ships a BERT config without model_type
        let raw = json!({
            "vocab_size": 30522,
            "hidden_size": 768,
            "num_hidden_layers": 6,
            "num_attention_heads": 12,
            "intermediate_size": 3072,
            "hidden_act": "gelu",
            "hidden_dropout_prob": 0.1,
            "attention_probs_dropout_prob": 0.1,
            "max_position_embeddings": 512,
            "type_vocab_size": 2
        });
        let config = EncoderConfig::from_json(raw).unwrap();
        assert_eq!(config.architecture, Architecture::Bert);
        assert_eq!(config.num_hidden_layers, 6);
        assert_eq!(config.type_vocab_size, 2);
        assert!((config.classifier_dropout - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_indivisible_heads() {
        let raw = json!({
            "model_type": "bert",
            "vocab_size": 10,
            "hidden_size": 10,
            "num_hidden_layers": 1,
            "num_attention_heads": 3,
            "intermediate_size": 20
        });
        assert!(EncoderConfig::from_json(raw).is_err());
    }

    #[test]
    fn test_rejects_unknown_model_type() {
        let raw = json!({"model_type": "gpt2", "vocab_size": 10});
        let err = EncoderConfig::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("gpt2"));
    }

    #[test]
    fn test_missing_required_field() {
        let raw = json!({"model_type": "bert", "vocab_size": 10});
        let err = EncoderConfig::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("hidden_size"));
    }

    #[test]
    fn test_classifier_json_keeps_fields_and_adds_labels() {
        let config = EncoderConfig::tiny(50);
        let value = config.to_classifier_json(&["Not Defaulted", "Defaulted"]);
        assert_eq!(value["dim"], json!(16));
        assert_eq!(value["num_labels"], json!(2));
        assert_eq!(value["id2label"]["1"], json!("Defaulted"));
        assert_eq!(value["architectures"][0], json!("DistilBertForSequenceClassification"));

        let reparsed = EncoderConfig::from_json(value).unwrap();
        assert_eq!(reparsed.num_labels(), Some(2));
        assert_eq!(reparsed.hidden_size, 16);
    }
}
