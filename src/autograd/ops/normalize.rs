//! Layer normalization over the last dimension

use super::matmul::contiguous;
use super::tracks;
use crate::autograd::{BackwardOp, GradCell, Tensor};
use ndarray::Array1;
use std::rc::Rc;

/// Row-wise layer normalization of a `rows x cols` buffer
///
/// y = (x - mean) / sqrt(var + eps) * gamma + beta, with the biased variance.
pub fn layer_norm(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
    rows: usize,
    cols: usize,
    eps: f32,
) -> Tensor {
    assert_eq!(x.len(), rows * cols, "layer_norm: input is not rows x cols");
    assert_eq!(gamma.len(), cols, "layer_norm: gamma length must equal cols");
    assert_eq!(beta.len(), cols, "layer_norm: beta length must equal cols");

    let src = contiguous(x.data());
    let g = gamma.data();
    let b = beta.data();
    let mut normalized = Array1::<f32>::zeros(rows * cols);
    let mut inv_std = Vec::with_capacity(rows);
    let mut out = Array1::<f32>::zeros(rows * cols);

    for r in 0..rows {
        let base = r * cols;
        let row = &src[base..base + cols];
        let mean = row.iter().sum::<f32>() / cols as f32;
        let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / cols as f32;
        let istd = 1.0 / (var + eps).sqrt();
        inv_std.push(istd);
        for c in 0..cols {
            let xhat = (row[c] - mean) * istd;
            normalized[base + c] = xhat;
            out[base + c] = xhat * g[c] + b[c];
        }
    }

    let requires_grad = tracks(&[x, gamma, beta]);
    let mut result = Tensor::new(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(LayerNormBackward {
            x: x.clone(),
            gamma: gamma.clone(),
            beta: beta.clone(),
            normalized,
            inv_std,
            rows,
            cols,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct LayerNormBackward {
    x: Tensor,
    gamma: Tensor,
    beta: Tensor,
    normalized: Array1<f32>,
    inv_std: Vec<f32>,
    rows: usize,
    cols: usize,
    result_grad: GradCell,
}

impl BackwardOp for LayerNormBackward {
    fn backward(&self) {
        let Some(grad) = self.result_grad.borrow().as_ref().cloned() else {
            return;
        };
        let cols = self.cols;
        let g = self.gamma.data();

        if self.gamma.requires_grad() || self.beta.requires_grad() {
            let mut grad_gamma = Array1::<f32>::zeros(cols);
            let mut grad_beta = Array1::<f32>::zeros(cols);
            for r in 0..self.rows {
                let base = r * cols;
                for c in 0..cols {
                    grad_gamma[c] += grad[base + c] * self.normalized[base + c];
                    grad_beta[c] += grad[base + c];
                }
            }
            if self.gamma.requires_grad() {
                self.gamma.accumulate_grad(grad_gamma);
            }
            if self.beta.requires_grad() {
                self.beta.accumulate_grad(grad_beta);
            }
        }

        if self.x.requires_grad() {
            let mut grad_x = Array1::<f32>::zeros(self.rows * cols);
            let n = cols as f32;
            for r in 0..self.rows {
                let base = r * cols;
                let mut sum_dxhat = 0.0f32;
                let mut sum_dxhat_xhat = 0.0f32;
                for c in 0..cols {
                    let dxhat = grad[base + c] * g[c];
                    sum_dxhat += dxhat;
                    sum_dxhat_xhat += dxhat * self.normalized[base + c];
                }
                let istd = self.inv_std[r];
                for c in 0..cols {
                    let dxhat = grad[base + c] * g[c];
                    let xhat = self.normalized[base + c];
                    grad_x[base + c] = istd * (dxhat - sum_dxhat / n - xhat * sum_dxhat_xhat / n);
                }
            }
            self.x.accumulate_grad(grad_x);
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.x, &self.gamma, &self.beta]
    }
}
