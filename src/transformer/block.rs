//! Encoder layer: attention and feed-forward, each followed by residual + LayerNorm

use super::attention::SelfAttention;
use super::config::{Architecture, EncoderConfig};
use super::feedforward::FeedForward;
use super::norm::LayerNorm;
use super::weights::{layer_names, StateEntry, WeightMap};
use crate::autograd::{add, dropout, Context};
use crate::error::Result;
use crate::Tensor;
use rand::rngs::StdRng;

/// Post-norm encoder layer as used by BERT and DistilBERT
pub struct EncoderLayer {
    layer_idx: usize,
    pub attention: SelfAttention,
    pub attention_norm: LayerNorm,
    pub ffn: FeedForward,
    pub output_norm: LayerNorm,
    /// BERT applies dropout to the attention output projection; DistilBERT does not
    attention_output_dropout: f32,
}

impl EncoderLayer {
    pub fn new(config: &EncoderConfig, layer_idx: usize, rng: &mut StdRng) -> Self {
        let names = layer_names(config.architecture, layer_idx);
        let (h, eps) = (config.hidden_size, config.layer_norm_eps);
        Self {
            layer_idx,
            attention: SelfAttention::new(config, &names, rng),
            attention_norm: LayerNorm::new(&names.attention_norm, h, eps),
            ffn: FeedForward::new(config, &names, rng),
            output_norm: LayerNorm::new(&names.output_norm, h, eps),
            attention_output_dropout: attention_output_dropout(config),
        }
    }

    pub fn from_weights(
        config: &EncoderConfig,
        layer_idx: usize,
        weights: &mut WeightMap,
    ) -> Result<Self> {
        let names = layer_names(config.architecture, layer_idx);
        let (h, eps) = (config.hidden_size, config.layer_norm_eps);
        Ok(Self {
            layer_idx,
            attention: SelfAttention::from_weights(config, &names, weights)?,
            attention_norm: LayerNorm::require(weights, &names.attention_norm, h, eps)?,
            ffn: FeedForward::from_weights(config, &names, weights)?,
            output_norm: LayerNorm::require(weights, &names.output_norm, h, eps)?,
            attention_output_dropout: attention_output_dropout(config),
        })
    }

    /// `x` is `(batch * seq) x hidden`
    pub fn forward(
        &self,
        x: &Tensor,
        attention_mask: &[u32],
        batch: usize,
        seq: usize,
        ctx: &mut Context,
    ) -> Tensor {
        let rows = batch * seq;
        let attn = self.attention.forward(x, attention_mask, batch, seq, ctx);
        let attn = dropout(&attn, self.attention_output_dropout, ctx);
        let x = self.attention_norm.forward(&add(x, &attn), rows);

        let ffn = self.ffn.forward(&x, rows, ctx);
        self.output_norm.forward(&add(&x, &ffn), rows)
    }

    pub fn layer_idx(&self) -> usize {
        self.layer_idx
    }

    /// Parameters in checkpoint order
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.attention.parameters();
        params.extend(self.attention_norm.parameters());
        params.extend(self.ffn.parameters());
        params.extend(self.output_norm.parameters());
        params
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.attention.parameters_mut();
        params.extend(self.attention_norm.parameters_mut());
        params.extend(self.ffn.parameters_mut());
        params.extend(self.output_norm.parameters_mut());
        params
    }

    pub fn state_dict(&self) -> Vec<StateEntry> {
        let mut entries = self.attention.state_dict();
        entries.extend(self.attention_norm.state_dict());
        entries.extend(self.ffn.state_dict());
        entries.extend(self.output_norm.state_dict());
        entries
    }
}

fn attention_output_dropout(config: &EncoderConfig) -> f32 {
    match config.architecture {
        Architecture::Bert => config.hidden_dropout,
        Architecture::DistilBert => 0.0,
    }
}
