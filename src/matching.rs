//! Ground-truth to prediction matching by IoU.

use crate::internal::torchvision::box_iou;
use crate::{BBox, DetectionRecord, Error, Result};

/// A single ground-truth box.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetItem {
    /// Position of the box in its ground-truth record.
    pub index: usize,
    pub bbox: BBox,
    pub label_id: usize,
}

/// A predicted box that overlaps a ground-truth box enough to be a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionItem {
    /// Position of the box in its predicted record.
    pub index: usize,
    pub bbox: BBox,
    pub label_id: usize,
    pub score: f64,
    /// IoU with the ground-truth box this item is a candidate for.
    pub iou: f64,
}

/// One ground-truth box together with its candidate predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub target: TargetItem,
    /// Candidates in prediction order. Empty if nothing reached the threshold.
    pub candidates: Vec<PredictionItem>,
}

impl Match {
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }
}

/// Validate an IoU threshold (finite, within [0, 1]).
pub fn validate_iou_threshold(iou_threshold: f64) -> Result<()> {
    if !iou_threshold.is_finite() || !(0.0..=1.0).contains(&iou_threshold) {
        return Err(Error::InvalidConfig(format!(
            "iou_threshold must be within [0, 1], got {}",
            iou_threshold
        )));
    }
    Ok(())
}

/// Match the boxes of one image.
///
/// # Arguments
/// * `target` - Ground-truth record
/// * `prediction` - Predicted record for the same image
/// * `iou_threshold` - Minimum IoU (inclusive) for a prediction to be a candidate
///
/// # Returns
/// One `Match` per ground-truth box, in ground-truth order. Predictions that
/// overlap no ground-truth box by at least the threshold are left out.
pub fn match_records(
    target: &DetectionRecord,
    prediction: &DetectionRecord,
    iou_threshold: f64,
) -> Result<Vec<Match>> {
    validate_iou_threshold(iou_threshold)?;

    // (n_pred x n_target)
    let iou_table = box_iou(&prediction.boxes_matrix(), &target.boxes_matrix());

    let matches = target
        .bboxes
        .iter()
        .zip(target.label_ids.iter())
        .enumerate()
        .map(|(target_idx, (&bbox, &label_id))| {
            let candidates = (0..prediction.len())
                .filter(|&pred_idx| iou_table[(pred_idx, target_idx)] >= iou_threshold)
                .map(|pred_idx| PredictionItem {
                    index: pred_idx,
                    bbox: prediction.bboxes[pred_idx],
                    label_id: prediction.label_ids[pred_idx],
                    score: prediction.score(pred_idx),
                    iou: iou_table[(pred_idx, target_idx)],
                })
                .collect();

            Match {
                target: TargetItem {
                    index: target_idx,
                    bbox,
                    label_id,
                },
                candidates,
            }
        })
        .collect();

    Ok(matches)
}
