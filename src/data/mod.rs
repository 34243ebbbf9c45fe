//! Loan dataset: loading, stratified splitting and batching
//!
//! Records are JSON objects with a `text` description and a binary `label`
//! (1 = defaulted), stored as a JSON array or as JSON Lines.

mod dataset;
mod loader;
mod split;

pub use dataset::{label_distribution, load_dataset, parse_dataset, LoanSample, LABEL_NAMES};
pub use loader::{create_dataloaders, Batch, DataLoader, TextDataset};
pub use split::split_dataset;
