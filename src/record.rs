//! Per-image detection records.

use std::sync::Arc;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use crate::{ClassMap, Error, Result};

/// Axis-aligned bounding box in `[xmin, ymin, xmax, ymax]` form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBox {
    /// Create a box from corner coordinates.
    ///
    /// # Errors
    /// Returns `Error::InvalidDetection` if a coordinate is not finite or the
    /// box has negative width or height.
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self> {
        if ![xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidDetection(format!(
                "non-finite box coordinates [{}, {}, {}, {}]",
                xmin, ymin, xmax, ymax
            )));
        }
        if xmax < xmin || ymax < ymin {
            return Err(Error::InvalidDetection(format!(
                "degenerate box [{}, {}, {}, {}]: max corner lies before min corner",
                xmin, ymin, xmax, ymax
            )));
        }
        Ok(Self { xmin, ymin, xmax, ymax })
    }

    /// Create a box from its top-left corner and size.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    pub fn xyxy(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Boxes, labels and (for predictions) scores belonging to one image.
#[derive(Debug, Clone)]
pub struct DetectionRecord {
    /// Optional image identifier, only used for diagnostics.
    pub record_id: Option<u64>,

    /// Bounding boxes, one per detection.
    pub bboxes: Vec<BBox>,

    /// Label id per detection, indexing into `class_map`.
    pub label_ids: Vec<usize>,

    /// Confidence per detection. `None` for ground truth.
    pub scores: Option<Vec<f64>>,

    /// Class vocabulary shared across the evaluation run.
    pub class_map: Arc<ClassMap>,
}

impl DetectionRecord {
    /// Create a ground-truth record (no scores).
    pub fn ground_truth(
        bboxes: Vec<BBox>,
        label_ids: Vec<usize>,
        class_map: Arc<ClassMap>,
    ) -> Result<Self> {
        Self::with_config(bboxes, label_ids, None, class_map)
    }

    /// Create a predicted record with one confidence score per box.
    pub fn predicted(
        bboxes: Vec<BBox>,
        label_ids: Vec<usize>,
        scores: Vec<f64>,
        class_map: Arc<ClassMap>,
    ) -> Result<Self> {
        Self::with_config(bboxes, label_ids, Some(scores), class_map)
    }

    /// Create a record without any detections.
    pub fn empty(class_map: Arc<ClassMap>) -> Self {
        Self {
            record_id: None,
            bboxes: Vec::new(),
            label_ids: Vec::new(),
            scores: None,
            class_map,
        }
    }

    /// Create a record, validating that boxes, labels and scores line up.
    pub fn with_config(
        bboxes: Vec<BBox>,
        label_ids: Vec<usize>,
        scores: Option<Vec<f64>>,
        class_map: Arc<ClassMap>,
    ) -> Result<Self> {
        if bboxes.len() != label_ids.len() {
            return Err(Error::InvalidDetection(format!(
                "{} boxes but {} labels",
                bboxes.len(),
                label_ids.len()
            )));
        }

        if let Some(ref s) = scores {
            if s.len() != label_ids.len() {
                return Err(Error::InvalidDetection(format!(
                    "Scores length {} doesn't match {} detections",
                    s.len(),
                    label_ids.len()
                )));
            }
            if let Some((i, score)) = s.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(Error::InvalidDetection(format!(
                    "Score {} of detection {} is not finite",
                    score, i
                )));
            }
        }

        Ok(Self {
            record_id: None,
            bboxes,
            label_ids,
            scores,
            class_map,
        })
    }

    /// Attach an image identifier.
    pub fn with_record_id(mut self, record_id: u64) -> Self {
        self.record_id = Some(record_id);
        self
    }

    /// Number of detections in this record.
    pub fn len(&self) -> usize {
        self.label_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label_ids.is_empty()
    }

    /// Confidence of detection `index`. Records without scores count as fully confident.
    pub fn score(&self, index: usize) -> f64 {
        self.scores
            .as_ref()
            .and_then(|s| s.get(index).copied())
            .unwrap_or(1.0)
    }

    /// Boxes as an (n, 4) matrix in `[x1, y1, x2, y2]` row format.
    pub fn boxes_matrix(&self) -> DMatrix<f64> {
        let flat: Vec<f64> = self.bboxes.iter().flat_map(|b| b.xyxy()).collect();
        DMatrix::from_row_slice(self.bboxes.len(), 4, &flat)
    }
}

/// Ground truth and prediction for the same image.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub ground_truth: DetectionRecord,
    pub pred: DetectionRecord,
}

impl Prediction {
    pub fn new(ground_truth: DetectionRecord, pred: DetectionRecord) -> Self {
        Self { ground_truth, pred }
    }
}
