//! Multi-head self-attention module

use super::config::EncoderConfig;
use super::linear::Linear;
use super::weights::{LayerNames, StateEntry, WeightMap};
use crate::autograd::{multi_head_attention, AttentionShape, Context};
use crate::error::Result;
use crate::Tensor;
use rand::rngs::StdRng;

/// Self-attention with query/key/value projections and an output projection
pub struct SelfAttention {
    pub query: Linear,
    pub key: Linear,
    pub value: Linear,
    pub output: Linear,
    num_heads: usize,
    head_dim: usize,
    dropout: f32,
}

impl SelfAttention {
    /// Fresh attention block
    pub fn new(config: &EncoderConfig, names: &LayerNames, rng: &mut StdRng) -> Self {
        let h = config.hidden_size;
        Self {
            query: Linear::new(&names.query, h, h, rng),
            key: Linear::new(&names.key, h, h, rng),
            value: Linear::new(&names.value, h, h, rng),
            output: Linear::new(&names.attention_output, h, h, rng),
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim(),
            dropout: config.attention_dropout,
        }
    }

    /// Load the four projections of one layer
    pub fn from_weights(
        config: &EncoderConfig,
        names: &LayerNames,
        weights: &mut WeightMap,
    ) -> Result<Self> {
        let h = config.hidden_size;
        Ok(Self {
            query: Linear::require(weights, &names.query, h, h)?,
            key: Linear::require(weights, &names.key, h, h)?,
            value: Linear::require(weights, &names.value, h, h)?,
            output: Linear::require(weights, &names.attention_output, h, h)?,
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim(),
            dropout: config.attention_dropout,
        })
    }

    /// Attend over `batch` sequences of `seq` positions
    ///
    /// `attention_mask` has one entry per position; padded keys (0) are ignored.
    pub fn forward(
        &self,
        x: &Tensor,
        attention_mask: &[u32],
        batch: usize,
        seq: usize,
        ctx: &mut Context,
    ) -> Tensor {
        let rows = batch * seq;
        let q = self.query.forward(x, rows);
        let k = self.key.forward(x, rows);
        let v = self.value.forward(x, rows);
        let shape =
            AttentionShape { batch, seq, heads: self.num_heads, head_dim: self.head_dim };
        let context = multi_head_attention(&q, &k, &v, attention_mask, shape, self.dropout, ctx);
        self.output.forward(&context, rows)
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        [&self.query, &self.key, &self.value, &self.output]
            .into_iter()
            .flat_map(Linear::parameters)
            .collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.query.parameters_mut();
        params.extend(self.key.parameters_mut());
        params.extend(self.value.parameters_mut());
        params.extend(self.output.parameters_mut());
        params
    }

    pub fn state_dict(&self) -> Vec<StateEntry> {
        [&self.query, &self.key, &self.value, &self.output]
            .into_iter()
            .flat_map(Linear::state_dict)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::weights::layer_names;
    use crate::transformer::Architecture;
    use rand::SeedableRng;

    fn attention() -> SelfAttention {
        let config = EncoderConfig::tiny(20);
        let mut rng = StdRng::seed_from_u64(3);
        SelfAttention::new(&config, &layer_names(Architecture::DistilBert, 0), &mut rng)
    }

    #[test]
    fn test_output_shape() {
        let attn = attention();
        let mut ctx = Context::with_seed(0);
        ctx.eval();
        let x = Tensor::from_vec(vec![0.1; 2 * 3 * 16], false);
        let y = attn.forward(&x, &[1, 1, 0, 1, 1, 1], 2, 3, &mut ctx);
        assert_eq!(y.len(), 2 * 3 * 16);
    }

    #[test]
    fn test_padding_does_not_change_real_positions() {
        let attn = attention();
        let mut ctx = Context::with_seed(0);
        ctx.eval();
        let real: Vec<f32> = (0..2 * 16).map(|i| (i as f32 * 0.37).sin()).collect();
        let short = attn.forward(&Tensor::from_vec(real.clone(), false), &[1, 1], 1, 2, &mut ctx);

        let mut padded = real;
        padded.extend((0..16).map(|i| i as f32));
        let long = attn.forward(&Tensor::from_vec(padded, false), &[1, 1, 0], 1, 3, &mut ctx);

        for (a, b) in short.to_vec().iter().zip(&long.to_vec()[..2 * 16]) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_parameter_and_state_counts_agree() {
        let attn = attention();
        assert_eq!(attn.parameters().len(), 8);
        assert_eq!(attn.state_dict().len(), 8);
        assert_eq!(attn.state_dict()[0].name, "transformer.layer.0.attention.q_lin.weight");
    }
}
