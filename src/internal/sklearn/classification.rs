//! Confusion matrix and per-label precision / recall / F1 / support.

use std::collections::HashMap;
use nalgebra::DMatrix;
use crate::{Error, Result};

/// Per-label scores, aligned with the `labels` argument they were computed for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecisionRecallFscoreSupport {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub f1: Vec<f64>,
    pub support: Vec<usize>,
}

fn check_lengths(y_true: &[usize], y_pred: &[usize]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(Error::Inconsistent {
            targets: y_true.len(),
            predictions: y_pred.len(),
        });
    }
    Ok(())
}

fn label_positions(labels: &[usize]) -> HashMap<usize, usize> {
    labels.iter().enumerate().map(|(pos, &label)| (label, pos)).collect()
}

/// Compute the confusion matrix over the given label ordering.
///
/// Entry (i, j) counts samples with true label `labels[i]` predicted as
/// `labels[j]`. Samples whose true or predicted label is not in `labels`
/// are ignored.
pub fn confusion_matrix(
    y_true: &[usize],
    y_pred: &[usize],
    labels: &[usize],
) -> Result<DMatrix<usize>> {
    check_lengths(y_true, y_pred)?;

    let n = labels.len();
    let positions = label_positions(labels);
    let mut matrix = DMatrix::<usize>::zeros(n, n);

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        if let (Some(&i), Some(&j)) = (positions.get(t), positions.get(p)) {
            matrix[(i, j)] += 1;
        }
    }

    Ok(matrix)
}

fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Compute precision, recall, F1 and support for each label (no averaging).
///
/// Zero divisions yield 0.0, matching scikit-learn's `zero_division="warn"`
/// result values.
pub fn precision_recall_fscore_support(
    y_true: &[usize],
    y_pred: &[usize],
    labels: &[usize],
) -> Result<PrecisionRecallFscoreSupport> {
    check_lengths(y_true, y_pred)?;

    let n = labels.len();
    let positions = label_positions(labels);
    let mut tp_sum = vec![0usize; n];
    let mut pred_sum = vec![0usize; n];
    let mut true_sum = vec![0usize; n];

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        if let Some(&i) = positions.get(t) {
            true_sum[i] += 1;
            if t == p {
                tp_sum[i] += 1;
            }
        }
        if let Some(&j) = positions.get(p) {
            pred_sum[j] += 1;
        }
    }

    let mut result = PrecisionRecallFscoreSupport {
        precision: Vec::with_capacity(n),
        recall: Vec::with_capacity(n),
        f1: Vec::with_capacity(n),
        support: true_sum.clone(),
    };

    for i in 0..n {
        let precision = safe_divide(tp_sum[i] as f64, pred_sum[i] as f64);
        let recall = safe_divide(tp_sum[i] as f64, true_sum[i] as f64);
        let f1 = safe_divide(2.0 * precision * recall, precision + recall);
        result.precision.push(precision);
        result.recall.push(recall);
        result.f1.push(f1);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ===== Confusion Matrix =====

    #[test]
    fn test_confusion_matrix_basic() {
        // sklearn docs example
        let y_true = [2, 0, 2, 2, 0, 1];
        let y_pred = [0, 0, 2, 2, 0, 2];
        let cm = confusion_matrix(&y_true, &y_pred, &[0, 1, 2]).unwrap();

        let expected = DMatrix::from_row_slice(3, 3, &[
            2, 0, 0,
            0, 0, 1,
            1, 0, 2,
        ]);
        assert_eq!(cm, expected);
    }

    #[test]
    fn test_confusion_matrix_label_order() {
        let y_true = [0, 1, 1];
        let y_pred = [0, 1, 0];
        let cm = confusion_matrix(&y_true, &y_pred, &[1, 0]).unwrap();

        let expected = DMatrix::from_row_slice(2, 2, &[
            1, 1,
            0, 1,
        ]);
        assert_eq!(cm, expected);
    }

    #[test]
    fn test_confusion_matrix_ignores_unknown_labels() {
        let cm = confusion_matrix(&[0, 5, 1], &[0, 1, 7], &[0, 1]).unwrap();
        assert_eq!(cm.iter().sum::<usize>(), 1);
    }

    #[test]
    fn test_confusion_matrix_empty() {
        let cm = confusion_matrix(&[], &[], &[0, 1, 2]).unwrap();
        assert_eq!(cm.shape(), (3, 3));
        assert!(cm.iter().all(|&v| v == 0));

        let cm = confusion_matrix(&[], &[], &[]).unwrap();
        assert_eq!(cm.shape(), (0, 0));
    }

    #[test]
    fn test_length_mismatch() {
        let result = confusion_matrix(&[0, 1], &[0], &[0, 1]);
        assert!(matches!(result, Err(Error::Inconsistent { targets: 2, predictions: 1 })));
    }

    // ===== Precision / Recall / F1 =====

    #[test]
    fn test_prfs_values() {
        let y_true = [2, 0, 2, 2, 0, 1];
        let y_pred = [0, 0, 2, 2, 0, 2];
        let prfs = precision_recall_fscore_support(&y_true, &y_pred, &[0, 1, 2]).unwrap();

        assert_relative_eq!(prfs.precision[0], 2.0 / 3.0, epsilon = 1e-10);
        assert_relative_eq!(prfs.precision[1], 0.0, epsilon = 1e-10);
        assert_relative_eq!(prfs.precision[2], 2.0 / 3.0, epsilon = 1e-10);

        assert_relative_eq!(prfs.recall[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(prfs.recall[1], 0.0, epsilon = 1e-10);
        assert_relative_eq!(prfs.recall[2], 2.0 / 3.0, epsilon = 1e-10);

        assert_relative_eq!(prfs.f1[0], 0.8, epsilon = 1e-10);
        assert_relative_eq!(prfs.f1[1], 0.0, epsilon = 1e-10);
        assert_relative_eq!(prfs.f1[2], 2.0 / 3.0, epsilon = 1e-10);

        assert_eq!(prfs.support, vec![2, 1, 3]);
    }

    #[test]
    fn test_prfs_empty_input_is_zero() {
        let prfs = precision_recall_fscore_support(&[], &[], &[0, 1, 2]).unwrap();
        assert_eq!(prfs.precision, vec![0.0; 3]);
        assert_eq!(prfs.recall, vec![0.0; 3]);
        assert_eq!(prfs.f1, vec![0.0; 3]);
        assert_eq!(prfs.support, vec![0; 3]);
    }
}
