//! Confusion matrix for classification

use std::fmt;

/// Confusion matrix
///
/// Element [i][j] represents count of samples with true label i predicted as j
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// The matrix data: matrix[true_label][predicted_label] = count
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

impl ConfusionMatrix {
    /// Create an empty matrix with given number of classes
    pub fn new(n_classes: usize) -> Self {
        Self { matrix: vec![vec![0; n_classes]; n_classes], n_classes }
    }

    /// Create from predictions and ground truth, sized to the largest label seen
    pub fn from_predictions(y_pred: &[usize], y_true: &[usize]) -> Self {
        let n_classes = y_pred.iter().chain(y_true).max().map_or(0, |&m| m + 1);
        Self::with_classes(y_pred, y_true, n_classes)
    }

    /// Create with a fixed number of classes
    ///
    /// The matrix is at least `n_classes` wide even if some classes never
    /// occur; it grows if a larger label shows up. Extra entries of the longer
    /// slice are ignored.
    pub fn with_classes(y_pred: &[usize], y_true: &[usize], n_classes: usize) -> Self {
        let seen = y_pred.iter().chain(y_true).max().map_or(0, |&m| m + 1);
        let mut cm = Self::new(n_classes.max(seen));
        for (&pred, &true_label) in y_pred.iter().zip(y_true) {
            cm.matrix[true_label][pred] += 1;
        }
        cm
    }

    /// Get the raw matrix
    pub fn matrix(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Get number of classes
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Get element at [true_label][predicted_label]
    pub fn get(&self, true_label: usize, predicted_label: usize) -> usize {
        self.matrix[true_label][predicted_label]
    }

    pub fn true_positives(&self, class: usize) -> usize {
        self.matrix[class][class]
    }

    /// Predicted as `class` but wasn't
    pub fn false_positives(&self, class: usize) -> usize {
        (0..self.n_classes).filter(|&i| i != class).map(|i| self.matrix[i][class]).sum()
    }

    /// Was `class` but predicted differently
    pub fn false_negatives(&self, class: usize) -> usize {
        (0..self.n_classes).filter(|&j| j != class).map(|j| self.matrix[class][j]).sum()
    }

    pub fn true_negatives(&self, class: usize) -> usize {
        self.total()
            - self.true_positives(class)
            - self.false_positives(class)
            - self.false_negatives(class)
    }

    /// Total true instances of a class
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    /// Total predictions of a class
    pub fn predicted(&self, class: usize) -> usize {
        self.matrix.iter().map(|row| row[class]).sum()
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        correct as f64 / total as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "      ")?;
        for j in 0..self.n_classes {
            write!(f, "Pred {j} ")?;
        }
        writeln!(f)?;

        for i in 0..self.n_classes {
            write!(f, "True {i}")?;
            for j in 0..self.n_classes {
                write!(f, "{:>6} ", self.matrix[i][j])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
