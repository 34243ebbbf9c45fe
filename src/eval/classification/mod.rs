//! Classification metrics for model evaluation
//!
//! Provides classification metrics including:
//! - Confusion matrix computation
//! - Per-class precision, recall, F1
//! - Macro, micro, and weighted averaging
//! - sklearn-style classification reports

mod average;
mod confusion;
mod metrics;
mod report;

#[cfg(test)]
mod tests;

pub use average::Average;
pub use confusion::ConfusionMatrix;
pub(crate) use metrics::f1_score;
pub use metrics::MultiClassMetrics;
pub use report::{classification_report, confusion_matrix};
