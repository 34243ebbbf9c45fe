//! Tape-based autograd engine
//!
//! Provides automatic differentiation using a computational graph recorded
//! while the forward pass runs. Every op that produces a tensor requiring
//! gradients attaches a [`BackwardOp`]; [`backward`] then replays those ops
//! once each, in reverse topological order.
//!
//! ```
//! use impago::autograd::{backward, matmul, Tensor};
//!
//! let a = Tensor::from_vec(vec![1.0, 2.0], true);
//! let b = Tensor::from_vec(vec![3.0, 4.0], true);
//! let mut c = matmul(&a, &b, 1, 2, 1);
//! backward(&mut c, None);
//! assert_eq!(a.grad().unwrap().to_vec(), vec![3.0, 4.0]);
//! ```

mod backward;
mod context;
mod ops;
mod tensor;

#[cfg(test)]
mod tests;

pub use backward::BackwardOp;
pub use context::{is_grad_enabled, no_grad, Context};
pub use ops::*;
pub use tensor::{GradCell, Tensor};

use ndarray::Array1;
use std::collections::HashSet;
use std::rc::Rc;

/// Perform backward pass on a tensor
///
/// Seeds the gradient of `tensor` with `grad_output` (ones when `None`, the
/// usual case for a scalar loss) and runs every recorded op reachable from it.
pub fn backward(tensor: &mut Tensor, grad_output: Option<Array1<f32>>) {
    let seed = grad_output.unwrap_or_else(|| Array1::ones(tensor.len()));
    tensor.set_grad(seed);

    for op in topological_ops(tensor).iter().rev() {
        op.backward();
    }
}

/// Ops reachable from `root`, each listed after every op that feeds it.
///
/// Iterative post-order DFS; a node is identified by its gradient cell so
/// clones of the same tensor collapse to one node.
fn topological_ops(root: &Tensor) -> Vec<Rc<dyn BackwardOp>> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        let Some(op) = node.backward_op() else {
            continue;
        };
        if expanded {
            order.push(op);
            continue;
        }
        if !visited.insert(node.node_id()) {
            continue;
        }
        stack.push((node.clone(), true));
        for input in op.inputs() {
            if input.backward_op().is_some() && !visited.contains(&input.node_id()) {
                stack.push((input.clone(), false));
            }
        }
    }

    order
}
