//! Confusion matrix metric accumulated over an evaluation run.

use std::sync::Arc;
use log::{debug, info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::display::{ConfusionMatrixView, MetricLogger, PlotOptions, Renderer, TextRenderer};
use crate::matching::{match_records, validate_iou_threshold};
use crate::policy::{select_prediction, MatchingPolicy, UnmatchedTargetPolicy};
use crate::stats::{ClassificationStats, SklearnStats, StatsEngine};
use crate::{ClassMap, Error, Prediction, Result};

/// A class whose scores are reported by `finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedClass {
    pub id: usize,
    pub name: String,
}

impl ReportedClass {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// Configuration for the confusion matrix metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfusionMatrixConfig {
    /// Minimum IoU (inclusive) for a prediction to match a ground-truth box.
    pub iou_threshold: f64,

    /// How to pick one prediction among several candidates.
    pub policy: MatchingPolicy,

    /// What to record for ground-truth boxes without any candidate.
    pub unmatched_targets: UnmatchedTargetPolicy,

    /// Log the confusion matrix on every finalize.
    pub print_summary: bool,

    /// Classes whose precision / recall / F1 are returned by finalize.
    pub reported_classes: Vec<ReportedClass>,
}

impl Default for ConfusionMatrixConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            policy: MatchingPolicy::BestScore,
            unmatched_targets: UnmatchedTargetPolicy::Drop,
            print_summary: false,
            reported_classes: vec![ReportedClass::new(1, "Infra"), ReportedClass::new(2, "Vessel")],
        }
    }
}

impl ConfusionMatrixConfig {
    /// Create a configuration with the given threshold and policy.
    ///
    /// # Arguments
    /// * `iou_threshold` - Minimum IoU for a match
    /// * `policy` - Candidate selection policy
    pub fn new(iou_threshold: f64, policy: MatchingPolicy) -> Self {
        Self {
            iou_threshold,
            policy,
            ..Self::default()
        }
    }

    /// Create configuration from a policy name such as `"best_score"`.
    pub fn from_policy_name(iou_threshold: f64, policy: &str) -> Result<Self> {
        Ok(Self::new(iou_threshold, policy.parse()?))
    }

    pub fn validate(&self) -> Result<()> {
        validate_iou_threshold(self.iou_threshold)
    }
}

/// Scores of one reported class, rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub id: usize,
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Result of `SimpleConfusionMatrix::finalize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrixReport {
    pub classes: Vec<ClassMetrics>,
    /// Label ordering of `matrix`.
    pub labels: Vec<usize>,
    pub matrix: DMatrix<usize>,
}

/// Round to 3 decimals, ties to even.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}

impl ConfusionMatrixReport {
    /// Pick the reported classes out of the full statistics.
    ///
    /// Classes missing from the label ordering report zeros.
    pub fn from_stats(stats: &ClassificationStats, reported: &[ReportedClass]) -> Self {
        let classes = reported
            .iter()
            .map(|class| {
                let (precision, recall, f1, support) = match stats.position(class.id) {
                    Some(pos) => (
                        stats.precision[pos],
                        stats.recall[pos],
                        stats.f1[pos],
                        stats.support[pos],
                    ),
                    None => (0.0, 0.0, 0.0, 0),
                };
                ClassMetrics {
                    id: class.id,
                    name: class.name.clone(),
                    precision: round3(precision),
                    recall: round3(recall),
                    f1: round3(f1),
                    support,
                }
            })
            .collect();

        Self {
            classes,
            labels: stats.labels.clone(),
            matrix: stats.matrix.clone(),
        }
    }

    /// Scores of the class with id `id`, if it is reported.
    pub fn class(&self, id: usize) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Flat `(key, value)` list: all precisions (`"<name> P"`), then all
    /// recalls (`"<name> Recall"`), then all F1 scores (`"<name> f1"`).
    pub fn to_named_values(&self) -> Vec<(String, f64)> {
        let precision = self.classes.iter().map(|c| (format!("{} P", c.name), c.precision));
        let recall = self.classes.iter().map(|c| (format!("{} Recall", c.name), c.recall));
        let f1 = self.classes.iter().map(|c| (format!("{} f1", c.name), c.f1));
        precision.chain(recall).chain(f1).collect()
    }
}

/// Evaluation metric lifecycle: accumulate batches, then finalize once per run.
pub trait Metric {
    type Output;

    fn name(&self) -> &str;

    fn accumulate(&mut self, preds: &[Prediction]) -> Result<()>;

    fn finalize(&mut self) -> Result<Self::Output>;

    /// Hand the latest finalized result to a logger. No-op if nothing is finalized.
    fn log(&self, logger: &mut dyn MetricLogger) -> Result<()>;
}

/// Confusion matrix over matched detections.
///
/// For every image, each ground-truth box is matched to the predicted boxes
/// that overlap it by at least `iou_threshold`; one of them is chosen by the
/// matching policy and the pair `(ground-truth label, predicted label)` is
/// recorded. Predictions on images without any ground truth are recorded as
/// false positives against background. `finalize` turns the recorded pairs
/// into a confusion matrix and per-class scores and clears them.
///
/// Not synchronized: use one instance per thread and [`merge`](Self::merge).
pub struct SimpleConfusionMatrix {
    config: ConfusionMatrixConfig,
    target_labels: Vec<usize>,
    predicted_labels: Vec<usize>,
    class_map: Option<Arc<ClassMap>>,
    confusion_matrix: Option<DMatrix<usize>>,
    stats_engine: Box<dyn StatsEngine>,
}

impl Default for SimpleConfusionMatrix {
    fn default() -> Self {
        Self {
            config: ConfusionMatrixConfig::default(),
            target_labels: Vec::new(),
            predicted_labels: Vec::new(),
            class_map: None,
            confusion_matrix: None,
            stats_engine: Box::new(SklearnStats),
        }
    }
}

impl SimpleConfusionMatrix {
    /// Create a new metric.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if the IoU threshold is outside [0, 1].
    pub fn new(config: ConfusionMatrixConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Replace the statistics engine used by `finalize`.
    pub fn with_stats_engine(mut self, engine: impl StatsEngine + 'static) -> Self {
        self.stats_engine = Box::new(engine);
        self
    }

    pub fn config(&self) -> &ConfusionMatrixConfig {
        &self.config
    }

    /// Observed labels recorded since the last finalize.
    pub fn target_labels(&self) -> &[usize] {
        &self.target_labels
    }

    /// Predicted labels recorded since the last finalize.
    pub fn predicted_labels(&self) -> &[usize] {
        &self.predicted_labels
    }

    /// Class map of the current run, once an image has been accumulated.
    pub fn class_map(&self) -> Option<&Arc<ClassMap>> {
        self.class_map.as_ref()
    }

    /// Matrix computed by the last finalize.
    pub fn confusion_matrix(&self) -> Option<&DMatrix<usize>> {
        self.confusion_matrix.as_ref()
    }

    /// Clear the recorded label pairs.
    pub fn reset(&mut self) {
        self.target_labels.clear();
        self.predicted_labels.clear();
    }

    /// Record the label pairs of a batch of images.
    ///
    /// Each image is processed atomically: if it fails, none of its pairs are
    /// recorded, but images before it in the batch stay recorded.
    pub fn accumulate(&mut self, preds: &[Prediction]) -> Result<()> {
        self.config.policy.ensure_implemented()?;

        for pred in preds {
            let class_map = &pred.ground_truth.class_map;

            let (target_labels, predicted_labels) = self.image_label_pairs(pred)?;
            self.check_labels(class_map, &target_labels)?;
            self.check_labels(class_map, &predicted_labels)?;

            if target_labels.len() != predicted_labels.len() {
                return Err(Error::Inconsistent {
                    targets: target_labels.len(),
                    predictions: predicted_labels.len(),
                });
            }

            self.resolve_class_map(class_map);
            self.target_labels.extend(target_labels);
            self.predicted_labels.extend(predicted_labels);
        }

        debug!(
            "accumulated {} images, {} label pairs pending",
            preds.len(),
            self.target_labels.len()
        );
        Ok(())
    }

    fn resolve_class_map(&mut self, class_map: &Arc<ClassMap>) {
        if let Some(current) = &self.class_map {
            if !Arc::ptr_eq(current, class_map) && **current != **class_map {
                warn!(
                    "class map changed during evaluation run ({} -> {} classes)",
                    current.num_classes(),
                    class_map.num_classes()
                );
            }
        }
        self.class_map = Some(Arc::clone(class_map));
    }

    /// `(target_labels, predicted_labels)` contributed by one image.
    fn image_label_pairs(&self, pred: &Prediction) -> Result<(Vec<usize>, Vec<usize>)> {
        let ground_truth = &pred.ground_truth;
        let prediction = &pred.pred;

        // Nothing to match against: every prediction is a background false positive
        if ground_truth.is_empty() && !prediction.is_empty() {
            let background = background_id(&ground_truth.class_map)?;
            return Ok((vec![background; prediction.len()], prediction.label_ids.clone()));
        }

        let matches = match_records(ground_truth, prediction, self.config.iou_threshold)?;

        let mut target_labels = Vec::with_capacity(matches.len());
        let mut predicted_labels = Vec::with_capacity(matches.len());

        for m in &matches {
            match select_prediction(self.config.policy, &m.candidates)? {
                Some(item) => {
                    target_labels.push(m.target.label_id);
                    predicted_labels.push(item.label_id);
                }
                None => match self.config.unmatched_targets {
                    UnmatchedTargetPolicy::Drop => {}
                    UnmatchedTargetPolicy::Background => {
                        target_labels.push(m.target.label_id);
                        predicted_labels.push(background_id(&ground_truth.class_map)?);
                    }
                },
            }
        }

        Ok((target_labels, predicted_labels))
    }

    fn check_labels(&self, class_map: &ClassMap, labels: &[usize]) -> Result<()> {
        match labels.iter().find(|&&id| !class_map.contains_id(id)) {
            Some(&label_id) => Err(Error::InvalidLabel {
                label_id,
                num_classes: class_map.num_classes(),
            }),
            None => Ok(()),
        }
    }

    /// Compute the confusion matrix and per-class scores, then clear the
    /// recorded pairs. The matrix is kept for `plot` and `log`.
    pub fn finalize(&mut self) -> Result<ConfusionMatrixReport> {
        if self.target_labels.len() != self.predicted_labels.len() {
            return Err(Error::Inconsistent {
                targets: self.target_labels.len(),
                predictions: self.predicted_labels.len(),
            });
        }

        let labels = self
            .class_map
            .as_ref()
            .map(|map| map.label_ids())
            .unwrap_or_default();

        let stats = self.stats_engine.compute_confusion_and_prf(
            &self.target_labels,
            &self.predicted_labels,
            &labels,
        )?;

        if stats.matrix.shape() != (labels.len(), labels.len()) {
            return Err(Error::InvalidConfig(format!(
                "stats engine returned a {:?} matrix for {} labels",
                stats.matrix.shape(),
                labels.len()
            )));
        }

        self.confusion_matrix = Some(stats.matrix.clone());

        if self.config.print_summary {
            let text = self.plot(&PlotOptions::default(), &TextRenderer)?;
            info!("{}", text);
        }

        self.reset();
        Ok(ConfusionMatrixReport::from_stats(&stats, &self.config.reported_classes))
    }

    /// Move the pending label pairs of `other` into this metric.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if both metrics saw different class maps.
    pub fn merge(&mut self, other: SimpleConfusionMatrix) -> Result<()> {
        if let (Some(mine), Some(theirs)) = (&self.class_map, &other.class_map) {
            if **mine != **theirs {
                return Err(Error::InvalidConfig(
                    "cannot merge confusion matrices over different class maps".to_string(),
                ));
            }
        }

        if self.class_map.is_none() {
            self.class_map = other.class_map;
        }
        self.target_labels.extend(other.target_labels);
        self.predicted_labels.extend(other.predicted_labels);
        Ok(())
    }

    /// Display names for `n` rows, falling back to the id.
    fn class_names(&self, n: usize) -> Vec<String> {
        (0..n)
            .map(|id| {
                self.class_map
                    .as_ref()
                    .and_then(|map| map.get_by_id(id))
                    .map(str::to_string)
                    .unwrap_or_else(|| id.to_string())
            })
            .collect()
    }

    /// Render the last finalized matrix.
    ///
    /// # Errors
    /// Returns `Error::NotFinalized` before the first finalize.
    pub fn plot<R: Renderer>(&self, options: &PlotOptions, renderer: &R) -> Result<R::Output> {
        let matrix = self.confusion_matrix.as_ref().ok_or(Error::NotFinalized)?;
        let view = ConfusionMatrixView::new(matrix, self.class_names(matrix.nrows()), options);
        renderer.render(&view)
    }
}

/// Background id of `class_map`, required whenever a background pair is recorded.
fn background_id(class_map: &ClassMap) -> Result<usize> {
    class_map.background_id().ok_or_else(|| {
        Error::InvalidConfig(
            "class map has no background class to record false positives and misses against"
                .to_string(),
        )
    })
}

impl Metric for SimpleConfusionMatrix {
    type Output = ConfusionMatrixReport;

    fn name(&self) -> &str {
        "confusion_matrix"
    }

    fn accumulate(&mut self, preds: &[Prediction]) -> Result<()> {
        SimpleConfusionMatrix::accumulate(self, preds)
    }

    fn finalize(&mut self) -> Result<ConfusionMatrixReport> {
        SimpleConfusionMatrix::finalize(self)
    }

    fn log(&self, logger: &mut dyn MetricLogger) -> Result<()> {
        if self.confusion_matrix.is_none() {
            return Ok(());
        }
        let text = self.plot(&PlotOptions::default(), &TextRenderer)?;
        logger.log_confusion_matrix("Confusion Matrix", &text)
    }
}
