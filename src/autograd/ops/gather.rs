//! Row gather: embedding lookup and CLS-position selection

use super::tracks;
use crate::autograd::{BackwardOp, GradCell, Tensor};
use ndarray::Array1;
use std::rc::Rc;

/// Gather rows of a `? x cols` table
///
/// Returns an `indices.len() x cols` buffer. The backward pass scatter-adds
/// into the table, so repeated indices receive the sum of their gradients.
pub fn gather_rows(table: &Tensor, indices: &[usize], cols: usize) -> Tensor {
    let rows = if cols == 0 { 0 } else { table.len() / cols };
    let src = table.data();
    let mut data = Array1::zeros(indices.len() * cols);
    for (out_row, &idx) in indices.iter().enumerate() {
        assert!(idx < rows, "gather_rows: index {idx} out of range for {rows} rows");
        data.slice_mut(ndarray::s![out_row * cols..(out_row + 1) * cols])
            .assign(&src.slice(ndarray::s![idx * cols..(idx + 1) * cols]));
    }
    let requires_grad = tracks(&[table]);

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(GatherBackward {
            table: table.clone(),
            indices: indices.to_vec(),
            cols,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct GatherBackward {
    table: Tensor,
    indices: Vec<usize>,
    cols: usize,
    result_grad: GradCell,
}

impl BackwardOp for GatherBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.table.requires_grad() {
                let mut grad_table = Array1::<f32>::zeros(self.table.len());
                let cols = self.cols;
                for (out_row, &idx) in self.indices.iter().enumerate() {
                    let mut dst = grad_table.slice_mut(ndarray::s![idx * cols..(idx + 1) * cols]);
                    dst += &grad.slice(ndarray::s![out_row * cols..(out_row + 1) * cols]);
                }
                self.table.accumulate_grad(grad_table);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.table]
    }
}
