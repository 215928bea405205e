//! # Detection Confusion - Confusion matrix metric for object detection
//!
//! Turns per-image detection results into confusion-matrix statistics.
//!
//! Every ground-truth box is matched against the predicted boxes of the same
//! image by Intersection over Union (IoU). One candidate per ground-truth box
//! is selected by a [`MatchingPolicy`], and the resulting
//! `(target_label, predicted_label)` pairs are accumulated across a whole
//! evaluation run. On finalize, the accumulated pairs are turned into a
//! confusion matrix and per-class precision / recall / F1.
//!
//! ## Features
//!
//! - Pairwise IoU matching with an inclusive threshold
//! - Best-score candidate selection
//! - Background false positives for images without ground truth
//! - Pluggable statistics engine (scikit-learn semantics by default)
//! - Matrix normalization and a plain-text renderer
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use detection_confusion::{BBox, ClassMap, DetectionRecord, Prediction, SimpleConfusionMatrix};
//!
//! let class_map = Arc::new(ClassMap::new(["Infra", "Vessel"], Some("background"))?);
//! let gt = DetectionRecord::ground_truth(
//!     vec![BBox::from_xyxy(0.0, 0.0, 10.0, 10.0)?], vec![1], class_map.clone())?;
//! let pred = DetectionRecord::predicted(
//!     vec![BBox::from_xyxy(0.0, 0.0, 10.0, 9.0)?], vec![1], vec![0.9], class_map)?;
//!
//! let mut metric = SimpleConfusionMatrix::default();
//! metric.accumulate(&[Prediction::new(gt, pred)])?;
//! let report = metric.finalize()?;
//! ```

// Internal modules (ports of torchvision and scikit-learn helpers)
pub(crate) mod internal;

// Public modules
pub mod class_map;
pub mod record;
pub mod matching;
pub mod policy;
pub mod stats;
pub mod confusion_matrix;
pub mod display;

// Re-exports for convenience
pub use class_map::ClassMap;
pub use record::{BBox, DetectionRecord, Prediction};
pub use matching::{match_records, Match, PredictionItem, TargetItem};
pub use policy::{select_prediction, MatchingPolicy, UnmatchedTargetPolicy};
pub use stats::{ClassificationStats, SklearnStats, StatsEngine};
pub use confusion_matrix::{
    ClassMetrics, ConfusionMatrixConfig, ConfusionMatrixReport, Metric, ReportedClass,
    SimpleConfusionMatrix,
};
pub use display::{
    normalize_matrix, ConfusionMatrixView, LogMetricLogger, MetricLogger, Normalize, PlotOptions,
    Renderer, TextRenderer,
};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while matching, accumulating or reporting.
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Not implemented: {0}")]
        NotImplemented(String),

        #[error("Label sequences out of sync: {targets} target labels vs {predictions} predicted labels")]
        Inconsistent { targets: usize, predictions: usize },

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Invalid detection: {0}")]
        InvalidDetection(String),

        #[error("Label id {label_id} is not part of the class map ({num_classes} classes)")]
        InvalidLabel { label_id: usize, num_classes: usize },

        #[error("Confusion matrix has not been finalized yet")]
        NotFinalized,

        #[error("Render error: {0}")]
        Render(String),
    }

    impl From<std::fmt::Error> for Error {
        fn from(err: std::fmt::Error) -> Self {
            Error::Render(err.to_string())
        }
    }

    /// Result type for confusion matrix operations
    pub type Result<T> = std::result::Result<T, Error>;
}
