//! Complete encoder: embeddings followed by a stack of encoder layers

use super::block::EncoderLayer;
use super::config::EncoderConfig;
use super::embedding::Embeddings;
use super::weights::{detect_architecture, StateEntry, WeightMap};
use crate::autograd::Context;
use crate::error::{Error, Result};
use crate::Tensor;
use rand::rngs::StdRng;

/// Transformer encoder producing one hidden vector per token
pub struct Encoder {
    pub config: EncoderConfig,
    pub embeddings: Embeddings,
    pub layers: Vec<EncoderLayer>,
}

impl Encoder {
    /// Randomly initialized encoder
    pub fn new(config: &EncoderConfig, rng: &mut StdRng) -> Self {
        Self {
            config: config.clone(),
            embeddings: Embeddings::new(config, rng),
            layers: (0..config.num_hidden_layers)
                .map(|i| EncoderLayer::new(config, i, rng))
                .collect(),
        }
    }

    /// Build from pretrained weights, taking the encoder tensors out of `weights`
    ///
    /// Fails when the tensors belong to the other encoder family or any
    /// encoder tensor is missing or has the wrong shape.
    pub fn from_weights(config: &EncoderConfig, weights: &mut WeightMap) -> Result<Self> {
        let names = weights.remaining();
        if let Some(found) = detect_architecture(names.iter().map(String::as_str)) {
            if found != config.architecture {
                return Err(Error::ConfigError(format!(
                    "config.json describes a {} encoder but the weights are {}",
                    config.architecture.model_type(),
                    found.model_type()
                )));
            }
        }

        let embeddings = Embeddings::from_weights(config, weights)?;
        let layers = (0..config.num_hidden_layers)
            .map(|i| EncoderLayer::from_weights(config, i, weights))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config: config.clone(), embeddings, layers })
    }

    /// Encode `batch` padded sequences of length `seq`
    ///
    /// Returns `(batch * seq) x hidden_size` hidden states.
    pub fn forward(
        &self,
        input_ids: &[u32],
        attention_mask: &[u32],
        batch: usize,
        seq: usize,
        ctx: &mut Context,
    ) -> Result<Tensor> {
        if input_ids.len() != batch * seq || attention_mask.len() != batch * seq {
            return Err(Error::ShapeMismatch {
                name: "input_ids".into(),
                expected: vec![batch, seq],
                actual: vec![input_ids.len(), attention_mask.len()],
            });
        }
        let mut hidden = self.embeddings.forward(input_ids, batch, seq, ctx)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden, attention_mask, batch, seq, ctx);
        }
        Ok(hidden)
    }

    pub fn hidden_size(&self) -> usize {
        self.config.hidden_size
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.embeddings.parameters();
        for layer in &self.layers {
            params.extend(layer.parameters());
        }
        params
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.embeddings.parameters_mut();
        for layer in &mut self.layers {
            params.extend(layer.parameters_mut());
        }
        params
    }

    /// Canonical-name entries in `parameters()` order
    pub fn state_dict(&self) -> Vec<StateEntry> {
        let mut entries = self.embeddings.state_dict();
        for layer in &self.layers {
            entries.extend(layer.state_dict());
        }
        entries
    }

    /// Total number of trainable values
    pub fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}
