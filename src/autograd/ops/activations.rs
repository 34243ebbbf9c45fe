//! Activation functions: relu, gelu, tanh, dropout, and a row softmax helper

use super::tracks;
use crate::autograd::{BackwardOp, Context, GradCell, Tensor};
use ndarray::{Array1, Zip};
use rand::Rng;
use std::rc::Rc;

const SQRT_2_OVER_PI: f32 = 0.797_884_6;
const GELU_COEFF: f32 = 0.044_715;

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| x.max(0.0));
    let requires_grad = tracks(&[a]);

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ReluBackward { a: a.clone(), result_grad: result.grad_cell() });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReluBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for ReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let mut grad_a = grad.clone();
                Zip::from(&mut grad_a).and(self.a.data()).for_each(|g, &x| {
                    if x <= 0.0 {
                        *g = 0.0;
                    }
                });
                self.a.accumulate_grad(grad_a);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}

/// GELU activation (tanh approximation)
///
/// GELU(x) = 0.5 * x * (1 + tanh(sqrt(2/π) * (x + 0.044715 * x³)))
pub fn gelu(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| {
        let inner = SQRT_2_OVER_PI * (x + GELU_COEFF * x * x * x);
        0.5 * x * (1.0 + inner.tanh())
    });
    let requires_grad = tracks(&[a]);

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(GeluBackward { a: a.clone(), result_grad: result.grad_cell() });
        result.set_backward_op(backward_op);
    }

    result
}

struct GeluBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for GeluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let mut grad_a = grad.clone();
                Zip::from(&mut grad_a).and(self.a.data()).for_each(|g, &x| {
                    let inner = SQRT_2_OVER_PI * (x + GELU_COEFF * x * x * x);
                    let t = inner.tanh();
                    let d_inner = SQRT_2_OVER_PI * (1.0 + 3.0 * GELU_COEFF * x * x);
                    *g *= 0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * d_inner;
                });
                self.a.accumulate_grad(grad_a);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}

/// Hyperbolic tangent
pub fn tanh(a: &Tensor) -> Tensor {
    let data = a.data().mapv(f32::tanh);
    let requires_grad = tracks(&[a]);

    let mut result = Tensor::new(data.clone(), requires_grad);

    if requires_grad {
        let backward_op =
            Rc::new(TanhBackward { a: a.clone(), output: data, result_grad: result.grad_cell() });
        result.set_backward_op(backward_op);
    }

    result
}

struct TanhBackward {
    a: Tensor,
    output: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for TanhBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let grad_a = grad * &self.output.mapv(|y| 1.0 - y * y);
                self.a.accumulate_grad(grad_a);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}

/// Inverted dropout
///
/// Identity outside training mode or when `p == 0`. Otherwise each element is
/// zeroed with probability `p` and survivors are scaled by `1 / (1 - p)`.
pub fn dropout(a: &Tensor, p: f32, ctx: &mut Context) -> Tensor {
    if !ctx.is_training() || p <= 0.0 {
        return a.clone();
    }
    let keep_scale = if p < 1.0 { 1.0 / (1.0 - p) } else { 0.0 };
    let rng = ctx.rng_mut();
    let mask: Array1<f32> =
        (0..a.len()).map(|_| if rng.random::<f32>() < p { 0.0 } else { keep_scale }).collect();

    let data = a.data() * &mask;
    let requires_grad = tracks(&[a]);

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op =
            Rc::new(DropoutBackward { a: a.clone(), mask, result_grad: result.grad_cell() });
        result.set_backward_op(backward_op);
    }

    result
}

struct DropoutBackward {
    a: Tensor,
    mask: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for DropoutBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad * &self.mask);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}

/// Numerically stable softmax over each row of a `rows x cols` buffer
pub fn softmax_rows(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    assert_eq!(data.len(), rows * cols, "softmax_rows: buffer is not rows x cols");
    let mut out = vec![0.0f32; data.len()];
    for (src, dst) in data.chunks_exact(cols.max(1)).zip(out.chunks_exact_mut(cols.max(1))) {
        let max = src.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = (s - max).exp();
            sum += *d;
        }
        if sum > 0.0 {
            for d in dst.iter_mut() {
                *d /= sum;
            }
        }
    }
    out
}
