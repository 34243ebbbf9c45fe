//! Optimizers for training neural networks

mod adamw;
mod optimizer;

pub use adamw::AdamW;
pub use optimizer::Optimizer;
