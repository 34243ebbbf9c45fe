//! Position-wise feed-forward network

use super::config::{Activation, EncoderConfig};
use super::linear::Linear;
use super::weights::{LayerNames, StateEntry, WeightMap};
use crate::autograd::{dropout, gelu, relu, Context};
use crate::error::Result;
use crate::Tensor;
use rand::rngs::StdRng;

/// `dropout(W2 act(W1 x))`
pub struct FeedForward {
    pub intermediate: Linear,
    pub output: Linear,
    activation: Activation,
    dropout: f32,
}

impl FeedForward {
    pub fn new(config: &EncoderConfig, names: &LayerNames, rng: &mut StdRng) -> Self {
        let (h, i) = (config.hidden_size, config.intermediate_size);
        Self {
            intermediate: Linear::new(&names.intermediate, h, i, rng),
            output: Linear::new(&names.output, i, h, rng),
            activation: config.activation,
            dropout: config.hidden_dropout,
        }
    }

    pub fn from_weights(
        config: &EncoderConfig,
        names: &LayerNames,
        weights: &mut WeightMap,
    ) -> Result<Self> {
        let (h, i) = (config.hidden_size, config.intermediate_size);
        Ok(Self {
            intermediate: Linear::require(weights, &names.intermediate, h, i)?,
            output: Linear::require(weights, &names.output, i, h)?,
            activation: config.activation,
            dropout: config.hidden_dropout,
        })
    }

    pub fn forward(&self, x: &Tensor, rows: usize, ctx: &mut Context) -> Tensor {
        let hidden = self.intermediate.forward(x, rows);
        let hidden = match self.activation {
            Activation::Gelu => gelu(&hidden),
            Activation::Relu => relu(&hidden),
        };
        let out = self.output.forward(&hidden, rows);
        dropout(&out, self.dropout, ctx)
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.intermediate.parameters();
        params.extend(self.output.parameters());
        params
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.intermediate.parameters_mut();
        params.extend(self.output.parameters_mut());
        params
    }

    pub fn state_dict(&self) -> Vec<StateEntry> {
        let mut entries = self.intermediate.state_dict();
        entries.extend(self.output.state_dict());
        entries
    }
}
