//! Autograd operations with backward passes
//!
//! This module provides differentiable operations for automatic differentiation.

mod activations;
mod attention;
mod basic;
mod gather;
mod loss;
mod matmul;
mod normalize;

use super::{is_grad_enabled, Tensor};

// Re-export all public operations
pub use activations::{dropout, gelu, relu, softmax_rows, tanh};
pub use attention::{multi_head_attention, AttentionShape};
pub use basic::{add, add_bias, scale};
pub use gather::gather_rows;
pub use loss::cross_entropy;
pub use matmul::{matmul, matmul_compute, transpose};
pub use normalize::layer_norm;

/// Whether an op over `inputs` should record a backward op
fn tracks(inputs: &[&Tensor]) -> bool {
    is_grad_enabled() && inputs.iter().any(|t| t.requires_grad())
}
