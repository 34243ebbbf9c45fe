//! Layer normalization module

use super::weights::{StateEntry, WeightMap};
use crate::autograd::layer_norm;
use crate::error::Result;
use crate::Tensor;

/// LayerNorm over the hidden dimension with learned scale and shift
pub struct LayerNorm {
    name: String,
    /// Scale (gamma)
    pub weight: Tensor,
    /// Shift (beta)
    pub bias: Tensor,
    eps: f32,
    dim: usize,
}

impl LayerNorm {
    /// Identity-initialized norm: weight 1, bias 0
    pub fn new(name: &str, dim: usize, eps: f32) -> Self {
        Self {
            name: name.to_string(),
            weight: Tensor::from_vec(vec![1.0; dim], true),
            bias: Tensor::zeros(dim, true),
            eps,
            dim,
        }
    }

    /// Load `{name}.weight` and `{name}.bias`
    pub fn require(weights: &mut WeightMap, name: &str, dim: usize, eps: f32) -> Result<Self> {
        let weight = weights.require(&format!("{name}.weight"), &[dim])?;
        let bias = weights.require(&format!("{name}.bias"), &[dim])?;
        Ok(Self {
            name: name.to_string(),
            weight: Tensor::from_vec(weight, true),
            bias: Tensor::from_vec(bias, true),
            eps,
            dim,
        })
    }

    /// Normalize each of `rows` rows
    pub fn forward(&self, x: &Tensor, rows: usize) -> Tensor {
        layer_norm(x, &self.weight, &self.bias, rows, self.dim, self.eps)
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight, &mut self.bias]
    }

    pub fn state_dict(&self) -> Vec<StateEntry> {
        vec![
            StateEntry {
                name: format!("{}.weight", self.name),
                shape: vec![self.dim],
                data: self.weight.to_vec(),
            },
            StateEntry {
                name: format!("{}.bias", self.name),
                shape: vec![self.dim],
                data: self.bias.to_vec(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_norm_centers_rows() {
        let norm = LayerNorm::new("embeddings.LayerNorm", 4, 1e-12);
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 10.0, 10.0, 10.0, 10.0], false);
        let y = norm.forward(&x, 2).to_vec();
        let mean: f32 = y[..4].iter().sum::<f32>() / 4.0;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-5);
        // Constant row normalizes to zero
        assert!(y[4..].iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_require_checks_length() {
        let mut weights = WeightMap::new();
        weights.insert("embeddings.LayerNorm.weight", vec![3], vec![1.0; 3]);
        weights.insert("embeddings.LayerNorm.bias", vec![3], vec![0.0; 3]);
        assert!(LayerNorm::require(&mut weights, "embeddings.LayerNorm", 4, 1e-12).is_err());
    }
}
