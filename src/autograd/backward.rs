//! Backward operation trait

use super::Tensor;

/// A recorded operation that can push its output gradient to its inputs.
///
/// Implementations read the gradient of their result from the shared cell
/// they captured at construction and accumulate into their inputs. They do
/// not recurse: [`crate::autograd::backward`] schedules every op once, in
/// reverse topological order.
pub trait BackwardOp {
    /// Propagate the result gradient into the inputs
    fn backward(&self);

    /// Input tensors of this op, used to order the backward pass
    fn inputs(&self) -> Vec<&Tensor>;
}
