//! Basic autograd operations: add, add_bias, scale

use super::tracks;
use crate::autograd::{BackwardOp, GradCell, Tensor};
use ndarray::{Array1, Axis};
use std::rc::Rc;

/// Add two tensors of equal length
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    assert_eq!(a.len(), b.len(), "add: length mismatch");
    let data = a.data() + b.data();
    let requires_grad = tracks(&[a, b]);

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad.clone());
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad.clone());
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a, &self.b]
    }
}

/// Add a bias vector to every row of a `rows x cols` matrix
pub fn add_bias(x: &Tensor, bias: &Tensor, rows: usize, cols: usize) -> Tensor {
    assert_eq!(x.len(), rows * cols, "add_bias: input is not rows x cols");
    assert_eq!(bias.len(), cols, "add_bias: bias length must equal cols");

    let mut data = x.data().clone();
    for mut row in data.exact_chunks_mut(cols) {
        row += bias.data();
    }
    let requires_grad = tracks(&[x, bias]);

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBiasBackward {
            x: x.clone(),
            bias: bias.clone(),
            rows,
            cols,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBiasBackward {
    x: Tensor,
    bias: Tensor,
    rows: usize,
    cols: usize,
    result_grad: GradCell,
}

impl BackwardOp for AddBiasBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.accumulate_grad(grad.clone());
            }
            if self.bias.requires_grad() {
                if let Ok(view) = grad.view().into_shape_with_order((self.rows, self.cols)) {
                    self.bias.accumulate_grad(view.sum_axis(Axis(0)));
                }
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.x, &self.bias]
    }
}

/// Scale tensor by a scalar
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let data = a.data() * factor;
    let requires_grad = tracks(&[a]);

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op =
            Rc::new(ScaleBackward { a: a.clone(), factor, result_grad: result.grad_cell() });
        result.set_backward_op(backward_op);
    }

    result
}

struct ScaleBackward {
    a: Tensor,
    factor: f32,
    result_grad: GradCell,
}

impl BackwardOp for ScaleBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let grad_a: Array1<f32> = grad * self.factor;
                self.a.accumulate_grad(grad_a);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a]
    }
}
