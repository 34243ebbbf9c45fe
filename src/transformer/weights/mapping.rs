//! Weight name mapping between checkpoints and encoder layers
//!
//! Canonical names are the Hugging Face names with the encoder prefix
//! removed:
//!
//! | part | DistilBERT | BERT |
//! |------|------------|------|
//! | query | `transformer.layer.{i}.attention.q_lin` | `encoder.layer.{i}.attention.self.query` |
//! | attention out | `transformer.layer.{i}.attention.out_lin` | `encoder.layer.{i}.attention.output.dense` |
//! | attention norm | `transformer.layer.{i}.sa_layer_norm` | `encoder.layer.{i}.attention.output.LayerNorm` |
//! | ffn in | `transformer.layer.{i}.ffn.lin1` | `encoder.layer.{i}.intermediate.dense` |
//! | ffn out | `transformer.layer.{i}.ffn.lin2` | `encoder.layer.{i}.output.dense` |
//! | output norm | `transformer.layer.{i}.output_layer_norm` | `encoder.layer.{i}.output.LayerNorm` |

use crate::transformer::Architecture;

const ENCODER_PREFIXES: [&str; 2] = ["distilbert.", "bert."];

/// Heads that sit beside the encoder in `*ForSequenceClassification` models
const HEAD_PREFIXES: [&str; 2] = ["pre_classifier.", "classifier."];

/// Strip the encoder prefix and normalize legacy LayerNorm parameter names
pub fn canonical_name(name: &str) -> String {
    let stripped =
        ENCODER_PREFIXES.iter().find_map(|p| name.strip_prefix(p)).unwrap_or(name);

    if let Some(base) = stripped.strip_suffix(".gamma") {
        format!("{base}.weight")
    } else if let Some(base) = stripped.strip_suffix(".beta") {
        format!("{base}.bias")
    } else {
        stripped.to_string()
    }
}

/// Name to write in a checkpoint for a canonical name
pub fn checkpoint_name(arch: Architecture, canonical: &str) -> String {
    if HEAD_PREFIXES.iter().any(|p| canonical.starts_with(p)) {
        canonical.to_string()
    } else {
        format!("{}.{canonical}", arch.model_type())
    }
}

/// Module names inside one encoder layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerNames {
    pub query: String,
    pub key: String,
    pub value: String,
    pub attention_output: String,
    pub attention_norm: String,
    pub intermediate: String,
    pub output: String,
    pub output_norm: String,
}

/// Module names of the embedding block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingNames {
    pub word: String,
    pub position: String,
    pub token_type: Option<String>,
    pub norm: String,
}

/// Canonical module names for layer `i`
pub fn layer_names(arch: Architecture, i: usize) -> LayerNames {
    match arch {
        Architecture::DistilBert => {
            let p = format!("transformer.layer.{i}");
            LayerNames {
                query: format!("{p}.attention.q_lin"),
                key: format!("{p}.attention.k_lin"),
                value: format!("{p}.attention.v_lin"),
                attention_output: format!("{p}.attention.out_lin"),
                attention_norm: format!("{p}.sa_layer_norm"),
                intermediate: format!("{p}.ffn.lin1"),
                output: format!("{p}.ffn.lin2"),
                output_norm: format!("{p}.output_layer_norm"),
            }
        }
        Architecture::Bert => {
            let p = format!("encoder.layer.{i}");
            LayerNames {
                query: format!("{p}.attention.self.query"),
                key: format!("{p}.attention.self.key"),
                value: format!("{p}.attention.self.value"),
                attention_output: format!("{p}.attention.output.dense"),
                attention_norm: format!("{p}.attention.output.LayerNorm"),
                intermediate: format!("{p}.intermediate.dense"),
                output: format!("{p}.output.dense"),
                output_norm: format!("{p}.output.LayerNorm"),
            }
        }
    }
}

/// Canonical module names of the embedding block
pub fn embedding_names(arch: Architecture) -> EmbeddingNames {
    EmbeddingNames {
        word: "embeddings.word_embeddings".into(),
        position: "embeddings.position_embeddings".into(),
        token_type: match arch {
            Architecture::DistilBert => None,
            Architecture::Bert => Some("embeddings.token_type_embeddings".into()),
        },
        norm: "embeddings.LayerNorm".into(),
    }
}
