//! Model evaluation metrics
//!
//! - `classification`: confusion matrix, per-class metrics, averaged scores,
//!   sklearn-style reports
//! - `binary`: precision/recall/F1 of the positive class and the guarded
//!   [`EvalMetrics`] computed after every evaluation pass
//!
//! ## Example
//!
//! ```
//! use impago::eval::{classification_report, compute_metrics};
//!
//! let y_true = vec![0, 1, 1, 0];
//! let y_pred = vec![0, 1, 0, 0];
//! let (metrics, error) = compute_metrics(&y_true, &y_pred);
//! assert!(error.is_none());
//! assert_eq!(metrics.precision, 1.0);
//! println!("{}", classification_report(&y_pred, &y_true, &["Not Defaulted", "Defaulted"]));
//! ```

pub mod binary;
pub mod classification;

pub use binary::{
    accuracy, compute_metrics, precision_recall_f1_binary, BinaryScores, EvalMetrics, MetricError,
    POSITIVE_LABEL,
};
pub use classification::{
    classification_report, confusion_matrix, Average, ConfusionMatrix, MultiClassMetrics,
};
