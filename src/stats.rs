//! Statistics engine: label sequences in, confusion matrix and per-class scores out.

use nalgebra::DMatrix;
use serde::Serialize;
use crate::internal::sklearn::{confusion_matrix, precision_recall_fscore_support};
use crate::Result;

/// Confusion matrix and per-label scores over a fixed label ordering.
///
/// Every vector is aligned with `labels`, and `matrix` is
/// `labels.len() x labels.len()` with rows = observed, columns = predicted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationStats {
    pub labels: Vec<usize>,
    pub matrix: DMatrix<usize>,
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub f1: Vec<f64>,
    pub support: Vec<usize>,
}

impl ClassificationStats {
    /// Position of `label_id` in the label ordering.
    pub fn position(&self, label_id: usize) -> Option<usize> {
        self.labels.iter().position(|&l| l == label_id)
    }

    /// Total number of counted samples.
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }
}

/// Computes a confusion matrix and precision / recall / F1 from label pairs.
pub trait StatsEngine: Send + Sync {
    /// # Arguments
    /// * `y_true` - Observed label ids
    /// * `y_pred` - Predicted label ids, same length as `y_true`
    /// * `labels` - Label ordering of the output
    fn compute_confusion_and_prf(
        &self,
        y_true: &[usize],
        y_pred: &[usize],
        labels: &[usize],
    ) -> Result<ClassificationStats>;
}

/// Default engine following scikit-learn's `confusion_matrix` and
/// `precision_recall_fscore_support(average=None)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SklearnStats;

impl StatsEngine for SklearnStats {
    fn compute_confusion_and_prf(
        &self,
        y_true: &[usize],
        y_pred: &[usize],
        labels: &[usize],
    ) -> Result<ClassificationStats> {
        let matrix = confusion_matrix(y_true, y_pred, labels)?;
        let prfs = precision_recall_fscore_support(y_true, y_pred, labels)?;

        Ok(ClassificationStats {
            labels: labels.to_vec(),
            matrix,
            precision: prfs.precision,
            recall: prfs.recall,
            f1: prfs.f1,
            support: prfs.support,
        })
    }
}
