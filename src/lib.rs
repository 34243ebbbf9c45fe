//! # impago
//!
//! Fine-tunes a pretrained transformer encoder (DistilBERT or BERT family,
//! including TinyBERT) for binary loan-default text classification.
//!
//! The crate carries everything the training loop needs on the CPU:
//!
//! - [`autograd`]: tape-style reverse-mode autodiff over flat `f32` buffers
//! - [`transformer`]: encoder layers and SafeTensors weight loading
//! - [`tokenizer`]: WordPiece tokenization for BERT vocabularies
//! - [`hub`]: local or Hugging Face Hub model resolution
//! - [`data`]: dataset loading, stratified split and batching
//! - [`eval`]: confusion matrix, precision/recall/F1 and reports
//! - [`optim`]: AdamW
//! - [`finetune`]: the sequence classifier, epoch loop and checkpoints
//! - [`config`] and [`cli`]: YAML/CLI configuration and command handlers
//!
//! ## Example
//!
//! ```ignore
//! use impago::config::TrainSpec;
//! use impago::finetune::run_training;
//! use impago::cli::LogLevel;
//!
//! let spec = TrainSpec::default();
//! let result = run_training(&spec, LogLevel::Normal)?;
//! println!("best F1 {:.4} at epoch {:?}", result.best_f1, result.best_epoch);
//! ```

pub mod autograd;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod finetune;
pub mod hub;
pub mod optim;
pub mod tokenizer;
pub mod transformer;

pub use autograd::Tensor;
pub use error::{Error, Result};
