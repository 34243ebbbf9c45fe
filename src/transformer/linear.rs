//! Dense layer with bias
//!
//! The weight is kept as `[in, out]` so the forward pass is a plain
//! `x * W`; checkpoints store PyTorch's `[out, in]`, so loading and saving
//! transpose.

use super::weights::{StateEntry, WeightMap};
use crate::autograd::{add_bias, matmul, transpose};
use crate::error::Result;
use crate::Tensor;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Standard deviation of freshly initialized weights (BERT `initializer_range`)
pub const INIT_STD: f32 = 0.02;

/// Draw `len` values from N(0, std)
pub fn normal_init(len: usize, std: f32, rng: &mut StdRng) -> Vec<f32> {
    match Normal::new(0.0f32, std) {
        Ok(dist) => (0..len).map(|_| dist.sample(rng)).collect(),
        Err(_) => vec![0.0; len],
    }
}

/// Linear projection `y = x W + b`
pub struct Linear {
    name: String,
    /// `[in_features, out_features]`, row-major
    pub weight: Tensor,
    pub bias: Tensor,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Fresh layer: N(0, 0.02) weights, zero bias
    pub fn new(name: &str, in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        Self {
            name: name.to_string(),
            weight: Tensor::from_vec(normal_init(in_features * out_features, INIT_STD, rng), true),
            bias: Tensor::zeros(out_features, true),
            in_features,
            out_features,
        }
    }

    /// Take `{name}.weight` and `{name}.bias` out of the map, if both are present
    pub fn from_weights(
        weights: &mut WeightMap,
        name: &str,
        in_features: usize,
        out_features: usize,
    ) -> Result<Option<Self>> {
        let w_name = format!("{name}.weight");
        let b_name = format!("{name}.bias");
        if !weights.contains(&w_name) || !weights.contains(&b_name) {
            return Ok(None);
        }
        let w = weights.require(&w_name, &[out_features, in_features])?;
        let b = weights.require(&b_name, &[out_features])?;
        Ok(Some(Self {
            name: name.to_string(),
            weight: Tensor::from_vec(transpose(&w, out_features, in_features), true),
            bias: Tensor::from_vec(b, true),
            in_features,
            out_features,
        }))
    }

    /// Load from the map, failing if the tensors are missing
    pub fn require(
        weights: &mut WeightMap,
        name: &str,
        in_features: usize,
        out_features: usize,
    ) -> Result<Self> {
        Self::from_weights(weights, name, in_features, out_features)?.ok_or_else(|| {
            crate::Error::ConfigError(format!("Missing weight tensors for {name}"))
        })
    }

    /// Forward pass over `rows` input rows
    pub fn forward(&self, x: &Tensor, rows: usize) -> Tensor {
        let y = matmul(x, &self.weight, rows, self.in_features, self.out_features);
        add_bias(&y, &self.bias, rows, self.out_features)
    }

    /// Module name (without `.weight` / `.bias`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight, &mut self.bias]
    }

    /// Entries in checkpoint layout, in `parameters()` order
    pub fn state_dict(&self) -> Vec<StateEntry> {
        vec![
            StateEntry {
                name: format!("{}.weight", self.name),
                shape: vec![self.out_features, self.in_features],
                data: transpose(&self.weight.to_vec(), self.in_features, self.out_features),
            },
            StateEntry {
                name: format!("{}.bias", self.name),
                shape: vec![self.out_features],
                data: self.bias.to_vec(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_forward_matches_manual() {
        let mut weights = WeightMap::new();
        // PyTorch layout [out=2, in=3]
        weights.insert("proj.weight", vec![2, 3], vec![1.0, 0.0, 2.0, 0.0, 1.0, -1.0]);
        weights.insert("proj.bias", vec![2], vec![0.5, -0.5]);
        let linear = Linear::require(&mut weights, "proj", 3, 2).unwrap();

        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0], false);
        let y = linear.forward(&x, 1);
        assert_eq!(y.to_vec(), vec![1.0 + 6.0 + 0.5, 2.0 - 3.0 - 0.5]);
    }

    #[test]
    fn test_state_dict_restores_pytorch_layout() {
        let mut weights = WeightMap::new();
        let original = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        weights.insert("proj.weight", vec![2, 3], original.clone());
        weights.insert("proj.bias", vec![2], vec![0.0, 0.0]);
        let linear = Linear::require(&mut weights, "proj", 3, 2).unwrap();

        let state = linear.state_dict();
        assert_eq!(state[0].name, "proj.weight");
        assert_eq!(state[0].shape, vec![2, 3]);
        assert_eq!(state[0].data, original);
    }

    #[test]
    fn test_missing_weights_return_none() {
        let mut weights = WeightMap::new();
        assert!(Linear::from_weights(&mut weights, "pre_classifier", 4, 4).unwrap().is_none());
        assert!(Linear::require(&mut weights, "pre_classifier", 4, 4).is_err());
    }

    #[test]
    fn test_new_initializes_small_weights() {
        let mut rng = StdRng::seed_from_u64(0);
        let linear = Linear::new("classifier", 64, 2, &mut rng);
        assert!(linear.bias.data().iter().all(|&b| b == 0.0));
        let max = linear.weight.data().iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(max > 0.0 && max < 0.2);
    }
}
