//! Binary metrics for the positive (defaulted) class, with a fallback guard

use super::classification::f1_score;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Label treated as the positive class
pub const POSITIVE_LABEL: usize = 1;

/// Why binary metrics could not be computed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("no samples to score")]
    Empty,

    #[error("y_true has {y_true} labels but y_pred has {y_pred}")]
    LengthMismatch { y_true: usize, y_pred: usize },

    #[error("label {0} is not binary (expected 0 or 1)")]
    NonBinaryLabel(usize),
}

/// Precision, recall and F1 of the positive class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn check(y_true: &[usize], y_pred: &[usize]) -> Result<(), MetricError> {
    if y_true.len() != y_pred.len() {
        return Err(MetricError::LengthMismatch { y_true: y_true.len(), y_pred: y_pred.len() });
    }
    if y_true.is_empty() {
        return Err(MetricError::Empty);
    }
    Ok(())
}

/// Fraction of predictions equal to the truth
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> Result<f64, MetricError> {
    check(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Binary precision, recall and F1 for label 1; zero division yields 0
pub fn precision_recall_f1_binary(
    y_true: &[usize],
    y_pred: &[usize],
) -> Result<BinaryScores, MetricError> {
    check(y_true, y_pred)?;
    if let Some(&bad) = y_true.iter().chain(y_pred).find(|&&l| l > 1) {
        return Err(MetricError::NonBinaryLabel(bad));
    }

    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == POSITIVE_LABEL, p == POSITIVE_LABEL) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
    let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
    Ok(BinaryScores { precision, recall, f1: f1_score(precision, recall) })
}

/// Metrics reported after each evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl fmt::Display for EvalMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy: {:.4}, precision: {:.4}, recall: {:.4}, f1: {:.4}",
            self.accuracy, self.precision, self.recall, self.f1
        )
    }
}

/// Compute [`EvalMetrics`], falling back to fixed values when the binary
/// scores cannot be computed
///
/// On failure, if exactly one class was predicted the scores are all 1.0
/// when it equals the smallest true label and all 0.0 otherwise; with any
/// other prediction pattern they are 0.0. The error is returned alongside
/// so the caller can report it. Accuracy that cannot be computed is 0.0.
pub fn compute_metrics(y_true: &[usize], y_pred: &[usize]) -> (EvalMetrics, Option<MetricError>) {
    let accuracy = accuracy(y_true, y_pred).unwrap_or(0.0);
    match precision_recall_f1_binary(y_true, y_pred) {
        Ok(s) => {
            (EvalMetrics { accuracy, precision: s.precision, recall: s.recall, f1: s.f1 }, None)
        }
        Err(e) => {
            let predicted: BTreeSet<usize> = y_pred.iter().copied().collect();
            let first_true = y_true.iter().min();
            let score = match (predicted.len(), predicted.first(), first_true) {
                (1, Some(p), Some(t)) if p == t => 1.0,
                _ => 0.0,
            };
            (EvalMetrics { accuracy, precision: score, recall: score, f1: score }, Some(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn test_binary_scores() {
        let s = precision_recall_f1_binary(&[1, 1, 0, 0, 1], &[1, 0, 1, 0, 1]).unwrap();
        assert_abs_diff_eq!(s.precision, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.recall, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.f1, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_no_positive_predictions_score_zero() {
        let s = precision_recall_f1_binary(&[1, 0, 1], &[0, 0, 0]).unwrap();
        assert_eq!((s.precision, s.recall, s.f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_errors() {
        assert_eq!(precision_recall_f1_binary(&[], &[]), Err(MetricError::Empty));
        assert_eq!(
            precision_recall_f1_binary(&[0, 1], &[0]),
            Err(MetricError::LengthMismatch { y_true: 2, y_pred: 1 })
        );
        assert_eq!(precision_recall_f1_binary(&[0, 2], &[0, 1]), Err(MetricError::NonBinaryLabel(2)));
        assert!(accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_compute_metrics_success() {
        let (m, err) = compute_metrics(&[0, 1, 1, 0], &[0, 1, 0, 0]);
        assert!(err.is_none());
        assert_abs_diff_eq!(m.accuracy, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(m.precision, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.recall, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_guard_single_predicted_class_matching_truth() {
        // Label 2 makes the binary computation fail
        let (m, err) = compute_metrics(&[0, 2, 0], &[0, 0, 0]);
        assert_eq!(err, Some(MetricError::NonBinaryLabel(2)));
        assert_eq!((m.precision, m.recall, m.f1), (1.0, 1.0, 1.0));
        assert_abs_diff_eq!(m.accuracy, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_guard_single_predicted_class_not_matching() {
        let (m, err) = compute_metrics(&[0, 2], &[2, 2]);
        assert!(err.is_some());
        assert_eq!((m.precision, m.recall, m.f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_guard_many_predicted_classes() {
        let (m, _) = compute_metrics(&[0, 1, 2], &[0, 1, 2]);
        assert_eq!(m.f1, 0.0);
        let (m, err) = compute_metrics(&[], &[]);
        assert_eq!(err, Some(MetricError::Empty));
        assert_eq!(m, EvalMetrics::default());
    }

    #[test]
    fn test_metrics_serialize() {
        let m = EvalMetrics { accuracy: 0.5, precision: 0.25, recall: 1.0, f1: 0.4 };
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json["f1"], serde_json::json!(0.4));
        assert_eq!(m.to_string(), "accuracy: 0.5000, precision: 0.2500, recall: 1.0000, f1: 0.4000");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_scores_are_bounded(pairs in proptest::collection::vec((0usize..2, 0usize..2), 1..60)) {
            let (y_true, y_pred): (Vec<usize>, Vec<usize>) = pairs.into_iter().unzip();
            let s = precision_recall_f1_binary(&y_true, &y_pred).unwrap();
            for v in [s.precision, s.recall, s.f1] {
                prop_assert!((0.0..=1.0).contains(&v));
            }
            prop_assert!(s.f1 <= s.precision.max(s.recall) + 1e-12);
            prop_assert!(s.f1 >= s.precision.min(s.recall) - 1e-12);
        }

        #[test]
        fn prop_accuracy_matches_confusion_matrix(pairs in proptest::collection::vec((0usize..2, 0usize..2), 1..60)) {
            let (y_true, y_pred): (Vec<usize>, Vec<usize>) = pairs.into_iter().unzip();
            let cm = crate::eval::confusion_matrix(&y_pred, &y_true);
            prop_assert!((accuracy(&y_true, &y_pred).unwrap() - cm.accuracy()).abs() < 1e-12);
        }
    }
}
