//! Classification report functions

use super::average::Average;
use super::confusion::ConfusionMatrix;
use super::metrics::MultiClassMetrics;

/// Compute confusion matrix from predictions and ground truth
///
/// # Example
/// ```
/// use impago::eval::confusion_matrix;
///
/// let y_pred = vec![0, 1, 1, 0, 0];
/// let y_true = vec![0, 1, 0, 1, 1];
/// let cm = confusion_matrix(&y_pred, &y_true);
///
/// assert_eq!(cm.get(0, 0), 1); // True 0, predicted 0
/// assert_eq!(cm.get(1, 0), 2); // True 1, predicted 0
/// ```
pub fn confusion_matrix(y_pred: &[usize], y_true: &[usize]) -> ConfusionMatrix {
    ConfusionMatrix::from_predictions(y_pred, y_true)
}

/// Generate sklearn-style classification report
///
/// Rows are labelled with `target_names` (one per class, classes that never
/// occur included) or `Class {i}` when no names are given.
pub fn classification_report(y_pred: &[usize], y_true: &[usize], target_names: &[&str]) -> String {
    let cm = ConfusionMatrix::with_classes(y_pred, y_true, target_names.len());
    let metrics = MultiClassMetrics::from_confusion_matrix(&cm);

    let names: Vec<String> = (0..metrics.n_classes)
        .map(|c| target_names.get(c).map_or_else(|| format!("Class {c}"), |n| (*n).to_string()))
        .collect();
    let width = names.iter().map(String::len).max().unwrap_or(0).max("weighted avg".len());
    let total_support: usize = metrics.support.iter().sum();

    let mut report = format!(
        "{:>width$} {:>10} {:>10} {:>10} {:>10}\n\n",
        "", "precision", "recall", "f1-score", "support"
    );

    for (class, name) in names.iter().enumerate() {
        report.push_str(&format!(
            "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
            name,
            metrics.precision[class],
            metrics.recall[class],
            metrics.f1[class],
            metrics.support[class]
        ));
    }
    report.push('\n');

    report.push_str(&format!(
        "{:>width$} {:>10} {:>10} {:>10.2} {:>10}\n",
        "accuracy",
        "",
        "",
        cm.accuracy(),
        total_support
    ));
    for (label, average) in [("macro avg", Average::Macro), ("weighted avg", Average::Weighted)] {
        report.push_str(&format!(
            "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
            label,
            metrics.precision_avg(average),
            metrics.recall_avg(average),
            metrics.f1_avg(average),
            total_support
        ));
    }

    report
}
