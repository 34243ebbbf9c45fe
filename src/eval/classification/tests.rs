//! Tests for classification metrics

use super::*;
use approx::assert_abs_diff_eq;

#[test]
fn test_confusion_matrix_basic() {
    let y_pred = vec![0, 1, 1, 2, 0, 1];
    let y_true = vec![0, 1, 0, 2, 0, 2];
    let cm = confusion_matrix(&y_pred, &y_true);

    assert_eq!(cm.n_classes(), 3);
    assert_eq!(cm.get(0, 0), 2); // True 0, predicted 0
    assert_eq!(cm.get(0, 1), 1); // True 0, predicted 1
    assert_eq!(cm.get(2, 1), 1); // True 2, predicted 1
    assert_eq!(cm.total(), 6);
}

#[test]
fn test_confusion_matrix_tp_fp_fn() {
    let y_pred = vec![1, 1, 0, 1];
    let y_true = vec![1, 0, 0, 1];
    let cm = confusion_matrix(&y_pred, &y_true);

    assert_eq!(cm.true_positives(1), 2);
    assert_eq!(cm.false_positives(1), 1);
    assert_eq!(cm.false_negatives(1), 0);
    assert_eq!(cm.true_negatives(1), 1);
    assert_eq!(cm.predicted(1), 3);
    assert_eq!(cm.support(0), 2);
}

#[test]
fn test_with_classes_keeps_absent_classes() {
    let cm = ConfusionMatrix::with_classes(&[0, 0, 0], &[0, 0, 0], 2);
    assert_eq!(cm.n_classes(), 2);
    assert_eq!(cm.matrix(), &[vec![3, 0], vec![0, 0]]);
    assert_eq!(ConfusionMatrix::from_predictions(&[0, 0], &[0, 0]).n_classes(), 1);
}

#[test]
fn test_display_lists_every_cell() {
    let cm = confusion_matrix(&[0, 1, 1], &[0, 1, 0]);
    let text = cm.to_string();
    assert!(text.contains("Pred 0 Pred 1"));
    assert!(text.contains("True 0     1      1"));
}

#[test]
fn test_per_class_metrics() {
    // class 1: tp 2, fp 1, fn 1
    let m = MultiClassMetrics::from_predictions(&[1, 1, 1, 0, 0], &[1, 1, 0, 1, 0]);
    assert_abs_diff_eq!(m.precision[1], 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m.recall[1], 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m.f1[1], 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m.precision[0], 0.5, epsilon = 1e-12);
    assert_eq!(m.support, vec![2, 3]);
}

#[test]
fn test_zero_division_is_zero() {
    let m = MultiClassMetrics::from_confusion_matrix(&ConfusionMatrix::with_classes(
        &[0, 0],
        &[0, 1],
        2,
    ));
    assert_eq!(m.precision[1], 0.0);
    assert_eq!(m.recall[1], 0.0);
    assert_eq!(m.f1[1], 0.0);
}

#[test]
fn test_averages() {
    let m = MultiClassMetrics::from_predictions(&[0, 0, 1, 1], &[0, 1, 1, 1]);
    // class 0: p 0.5 r 1.0; class 1: p 1.0 r 2/3
    assert_abs_diff_eq!(m.precision_avg(Average::Macro), 0.75, epsilon = 1e-12);
    assert_abs_diff_eq!(m.recall_avg(Average::Weighted), 0.75, epsilon = 1e-12);
    assert_abs_diff_eq!(m.f1_avg(Average::Micro), 0.75, epsilon = 1e-12);
}

#[test]
fn test_report_uses_target_names() {
    let report =
        classification_report(&[0, 1, 1, 0], &[0, 1, 0, 0], &["Not Defaulted", "Defaulted"]);
    assert!(report.contains("Not Defaulted"));
    assert!(report.contains("    Defaulted"));
    assert!(report.contains("macro avg"));
    assert!(report.contains("weighted avg"));
    assert!(report.contains("accuracy"));
    assert!(report.contains("0.75"));
}

#[test]
fn test_report_with_single_class_present() {
    let report = classification_report(&[0, 0], &[0, 0], &["Not Defaulted", "Defaulted"]);
    let defaulted = report.lines().find(|l| l.trim_start().starts_with("Defaulted")).unwrap();
    assert!(defaulted.ends_with(" 0"));
}

#[test]
fn test_report_without_names() {
    let report = classification_report(&[0, 2], &[0, 1], &[]);
    assert!(report.contains("Class 2"));
}
