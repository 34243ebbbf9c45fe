//! Matrix multiplication autograd operations
//!
//! Buffers are row-major; the GEMM itself is ndarray's `dot`, which handles
//! transposed views without materializing them.

use super::tracks;
use crate::autograd::{BackwardOp, GradCell, Tensor};
use ndarray::{Array1, Array2, ArrayView2};
use std::rc::Rc;

/// View a flat buffer as a `rows x cols` matrix
pub(crate) fn view2(data: &[f32], rows: usize, cols: usize) -> ArrayView2<'_, f32> {
    assert_eq!(data.len(), rows * cols, "buffer is not {rows}x{cols}");
    ArrayView2::from_shape((rows, cols), data).expect("buffer length checked above")
}

/// Flatten a matrix into a row-major buffer
pub(crate) fn flatten(m: &Array2<f32>) -> Array1<f32> {
    m.iter().copied().collect()
}

/// Transpose a row-major matrix (rows x cols) to (cols x rows)
pub fn transpose(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    view2(data, rows, cols).t().iter().copied().collect()
}

/// Compute `a (m x k) * b (k x n)` into a row-major `m x n` buffer
pub fn matmul_compute(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let c = view2(a, m, k).dot(&view2(b, k, n));
    c.iter().copied().collect()
}

/// Matrix multiplication
///
/// `a` is `m x k`, `b` is `k x n`, the result is `m x n`.
pub fn matmul(a: &Tensor, b: &Tensor, m: usize, k: usize, n: usize) -> Tensor {
    let data = Array1::from(matmul_compute(
        contiguous(a.data()),
        contiguous(b.data()),
        m,
        k,
        n,
    ));
    let requires_grad = tracks(&[a, b]);

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MatmulBackward {
            a: a.clone(),
            b: b.clone(),
            m,
            k,
            n,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

pub(crate) fn contiguous(a: &Array1<f32>) -> &[f32] {
    a.as_slice().expect("owned Array1 is contiguous")
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
    m: usize,
    k: usize,
    n: usize,
    result_grad: GradCell,
}

impl BackwardOp for MatmulBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            let grad_c = view2(contiguous(grad), self.m, self.n);

            if self.a.requires_grad() {
                // dA = dC * B^T
                let b = view2(contiguous(self.b.data()), self.k, self.n);
                self.a.accumulate_grad(flatten(&grad_c.dot(&b.t())));
            }
            if self.b.requires_grad() {
                // dB = A^T * dC
                let a = view2(contiguous(self.a.data()), self.m, self.k);
                self.b.accumulate_grad(flatten(&a.t().dot(&grad_c)));
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a, &self.b]
    }
}
