//! Cross-entropy loss over class logits

use super::activations::softmax_rows;
use super::matmul::contiguous;
use super::tracks;
use crate::autograd::{BackwardOp, GradCell, Tensor};
use ndarray::Array1;
use std::rc::Rc;

/// Mean cross-entropy of `batch x classes` logits against integer labels
///
/// Returns a single-element tensor. Labels must be below `classes`.
pub fn cross_entropy(logits: &Tensor, labels: &[usize], batch: usize, classes: usize) -> Tensor {
    assert_eq!(logits.len(), batch * classes, "cross_entropy: logits are not batch x classes");
    assert_eq!(labels.len(), batch, "cross_entropy: one label per row");

    let z = contiguous(logits.data());
    let probs = softmax_rows(z, batch, classes);
    let mut total = 0.0f32;
    for (i, &label) in labels.iter().enumerate() {
        assert!(label < classes, "cross_entropy: label {label} out of range");
        let row = &z[i * classes..(i + 1) * classes];
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let log_sum_exp = max + row.iter().map(|v| (v - max).exp()).sum::<f32>().ln();
        total += log_sum_exp - row[label];
    }
    let loss = if batch == 0 { 0.0 } else { total / batch as f32 };

    let requires_grad = tracks(&[logits]);
    let mut result = Tensor::from_vec(vec![loss], requires_grad);

    if requires_grad {
        let backward_op = Rc::new(CrossEntropyBackward {
            logits: logits.clone(),
            probs,
            labels: labels.to_vec(),
            classes,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct CrossEntropyBackward {
    logits: Tensor,
    probs: Vec<f32>,
    labels: Vec<usize>,
    classes: usize,
    result_grad: GradCell,
}

impl BackwardOp for CrossEntropyBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.logits.requires_grad() && !self.labels.is_empty() {
                // d/dz = (softmax - onehot) / batch
                let upstream = grad.first().copied().unwrap_or(1.0);
                let factor = upstream / self.labels.len() as f32;
                let mut grad_logits = Array1::from(self.probs.clone());
                for (i, &label) in self.labels.iter().enumerate() {
                    grad_logits[i * self.classes + label] -= 1.0;
                }
                grad_logits *= factor;
                self.logits.accumulate_grad(grad_logits);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.logits]
    }
}
