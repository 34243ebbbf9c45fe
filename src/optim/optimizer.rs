//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms
///
/// Parameters are borrowed from the model for each step, in the same order
/// every time, so per-parameter state can be kept by position.
pub trait Optimizer {
    /// Perform a single optimization step on the given parameters
    fn step_refs(&mut self, params: &mut [&mut Tensor]);

    /// Zero gradients on referenced parameters
    fn zero_grad_refs(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}
