//! Execution context: training mode, dropout randomness and grad recording

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::Cell;

thread_local! {
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Whether ops currently record backward operations
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(Cell::get)
}

/// Run `f` without recording the tape. The previous setting is restored afterwards.
pub fn no_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = GRAD_ENABLED.with(|flag| flag.replace(false));
    let result = f();
    GRAD_ENABLED.with(|flag| flag.set(previous));
    result
}

/// Forward-pass context
///
/// Carries the training flag (dropout is active only while training) and the
/// seeded generator that draws dropout masks.
pub struct Context {
    training: bool,
    rng: StdRng,
}

impl Context {
    /// Create a new context in training mode
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    /// Create a training-mode context with a fixed dropout seed
    pub fn with_seed(seed: u64) -> Self {
        Self { training: true, rng: StdRng::seed_from_u64(seed) }
    }

    /// Set training mode
    pub fn train(&mut self) {
        self.training = true;
    }

    /// Set evaluation mode
    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Check if in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Generator for dropout masks
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
