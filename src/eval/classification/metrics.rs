//! Per-class precision, recall and F1

use super::average::Average;
use super::confusion::ConfusionMatrix;

/// Multi-class classification metrics
///
/// A class with no predictions (or no true instances) scores 0 precision
/// (or recall) rather than NaN.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiClassMetrics {
    /// Per-class precision
    pub precision: Vec<f64>,
    /// Per-class recall
    pub recall: Vec<f64>,
    /// Per-class F1 score
    pub f1: Vec<f64>,
    /// Per-class support (count)
    pub support: Vec<usize>,
    /// Number of classes
    pub n_classes: usize,
    true_positives: usize,
    total: usize,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Harmonic mean of precision and recall, 0 when both are 0
pub(crate) fn f1_score(p: f64, r: f64) -> f64 {
    ratio(2.0 * p * r, p + r)
}

impl MultiClassMetrics {
    /// Compute metrics from confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix) -> Self {
        let n_classes = cm.n_classes();
        let mut precision = Vec::with_capacity(n_classes);
        let mut recall = Vec::with_capacity(n_classes);
        let mut f1 = Vec::with_capacity(n_classes);
        let mut support = Vec::with_capacity(n_classes);

        for class in 0..n_classes {
            let tp = cm.true_positives(class) as f64;
            let p = ratio(tp, cm.predicted(class) as f64);
            let r = ratio(tp, cm.support(class) as f64);
            precision.push(p);
            recall.push(r);
            f1.push(f1_score(p, r));
            support.push(cm.support(class));
        }

        Self {
            precision,
            recall,
            f1,
            support,
            n_classes,
            true_positives: (0..n_classes).map(|c| cm.true_positives(c)).sum(),
            total: cm.total(),
        }
    }

    /// Compute from predictions and ground truth
    pub fn from_predictions(y_pred: &[usize], y_true: &[usize]) -> Self {
        Self::from_confusion_matrix(&ConfusionMatrix::from_predictions(y_pred, y_true))
    }

    pub fn precision_avg(&self, average: Average) -> f64 {
        self.average_metric(&self.precision, average)
    }

    pub fn recall_avg(&self, average: Average) -> f64 {
        self.average_metric(&self.recall, average)
    }

    pub fn f1_avg(&self, average: Average) -> f64 {
        self.average_metric(&self.f1, average)
    }

    fn average_metric(&self, values: &[f64], average: Average) -> f64 {
        match average {
            Average::Macro => ratio(values.iter().sum(), values.len() as f64),
            // Single-label: every sample is predicted once, so micro P = R = F1 = accuracy
            Average::Micro => ratio(self.true_positives as f64, self.total as f64),
            Average::Weighted => {
                let total_support: usize = self.support.iter().sum();
                let weighted: f64 =
                    values.iter().zip(&self.support).map(|(&v, &s)| v * s as f64).sum();
                ratio(weighted, total_support as f64)
            }
        }
    }
}
