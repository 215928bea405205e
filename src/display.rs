//! Presentation of a finalized confusion matrix.
//!
//! Nothing in here touches accumulator state: renderers and loggers only see
//! a [`ConfusionMatrixView`] built from the finalized matrix.

use std::fmt::Write;
use std::str::FromStr;
use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use crate::{Error, Result};

const NORMALIZE_CHOICES: &str = "{'true', 'pred', 'all', None}";

/// Normalization applied to the matrix before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalize {
    /// Divide each row by its sum (observed labels).
    True,
    /// Divide each column by its sum (predicted labels).
    Pred,
    /// Divide by the total count.
    All,
}

impl Normalize {
    /// Parse an optional mode, `None` meaning raw counts.
    pub fn parse(mode: Option<&str>) -> Result<Option<Normalize>> {
        mode.map(str::parse::<Normalize>).transpose()
    }
}

impl FromStr for Normalize {
    type Err = Error;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "true" => Ok(Normalize::True),
            "pred" => Ok(Normalize::Pred),
            "all" => Ok(Normalize::All),
            _ => Err(Error::InvalidArgument(format!(
                "normalize must be one of {}, got '{}'",
                NORMALIZE_CHOICES, mode
            ))),
        }
    }
}

fn nan_to_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Convert counts to floats, normalizing if requested.
///
/// Rows, columns or totals that sum to zero produce zeros instead of NaN.
pub fn normalize_matrix(cm: &DMatrix<usize>, mode: Option<Normalize>) -> DMatrix<f64> {
    let counts = cm.map(|v| v as f64);

    let normalized = match mode {
        None => counts,
        Some(Normalize::True) => {
            let row_sums: Vec<f64> = counts.row_iter().map(|r| r.sum()).collect();
            DMatrix::from_fn(counts.nrows(), counts.ncols(), |i, j| counts[(i, j)] / row_sums[i])
        }
        Some(Normalize::Pred) => {
            let col_sums: Vec<f64> = counts.column_iter().map(|c| c.sum()).collect();
            DMatrix::from_fn(counts.nrows(), counts.ncols(), |i, j| counts[(i, j)] / col_sums[j])
        }
        Some(Normalize::All) => {
            let total = counts.sum();
            counts / total
        }
    };

    normalized.map(nan_to_zero)
}

/// Rendering options. Graphical renderers use all of them, the text renderer
/// only `normalize` and `values_format`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    pub normalize: Option<Normalize>,
    /// `"d"` for integers or `".Nf"` for N decimals. Defaults by normalization.
    pub values_format: Option<String>,
    pub values_size: u32,
    pub cmap: String,
    pub figsize: u32,
    pub xticks_rotation: String,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            normalize: None,
            values_format: None,
            values_size: 12,
            cmap: "PuBu".to_string(),
            figsize: 11,
            xticks_rotation: "vertical".to_string(),
        }
    }
}

impl PlotOptions {
    /// Options with a normalization mode given by name.
    pub fn with_normalize(mode: Option<&str>) -> Result<Self> {
        Ok(Self {
            normalize: Normalize::parse(mode)?,
            ..Self::default()
        })
    }

    /// Value format in effect: explicit, else `.2f` when normalized and `d` otherwise.
    pub fn effective_values_format(&self) -> &str {
        match (&self.values_format, self.normalize) {
            (Some(format), _) => format,
            (None, Some(_)) => ".2f",
            (None, None) => "d",
        }
    }
}

/// Everything a renderer needs to draw a confusion matrix.
#[derive(Debug, Clone)]
pub struct ConfusionMatrixView<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Display name per row/column.
    pub class_names: Vec<String>,
    /// Possibly normalized values, rows = observed, columns = predicted.
    pub values: DMatrix<f64>,
    pub options: &'a PlotOptions,
}

impl<'a> ConfusionMatrixView<'a> {
    pub fn new(matrix: &DMatrix<usize>, class_names: Vec<String>, options: &'a PlotOptions) -> Self {
        Self {
            title: "Confusion Matrix",
            x_label: "Predicted labels",
            y_label: "Observed labels",
            class_names,
            values: normalize_matrix(matrix, options.normalize),
            options,
        }
    }
}

/// Turns a view into an artifact (text, image, ...).
pub trait Renderer: Send + Sync {
    type Output;

    fn render(&self, view: &ConfusionMatrixView<'_>) -> Result<Self::Output>;
}

/// Renders a confusion matrix as an aligned plain-text table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

#[derive(Clone, Copy)]
enum ValueFormat {
    Integer,
    Fixed(usize),
}

fn parse_values_format(format: &str) -> Result<ValueFormat> {
    if format == "d" {
        return Ok(ValueFormat::Integer);
    }
    format
        .strip_prefix('.')
        .and_then(|rest| rest.strip_suffix('f'))
        .and_then(|digits| digits.parse::<usize>().ok())
        .map(ValueFormat::Fixed)
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "values_format must be 'd' or '.Nf', got '{}'",
                format
            ))
        })
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, view: &ConfusionMatrixView<'_>) -> Result<String> {
        let format = parse_values_format(view.options.effective_values_format())?;
        let cell = |v: f64| match format {
            ValueFormat::Integer => format!("{}", v.round() as i64),
            ValueFormat::Fixed(precision) => format!("{:.*}", precision, v),
        };

        let cells: Vec<Vec<String>> = view
            .values
            .row_iter()
            .map(|row| row.iter().map(|&v| cell(v)).collect())
            .collect();

        let name_width = view.class_names.iter().map(String::len).max().unwrap_or(0);
        let cell_width = cells
            .iter()
            .flatten()
            .map(String::len)
            .chain(view.class_names.iter().map(String::len))
            .max()
            .unwrap_or(1);

        let mut out = String::new();
        writeln!(out, "{}", view.title)?;
        writeln!(out, "rows: {} / columns: {}", view.y_label, view.x_label)?;

        write!(out, "{:name_width$}", "")?;
        for name in &view.class_names {
            write!(out, " {:>cell_width$}", name)?;
        }
        writeln!(out)?;

        for (i, row) in cells.iter().enumerate() {
            let name = view.class_names.get(i).map(String::as_str).unwrap_or("");
            write!(out, "{:<name_width$}", name)?;
            for value in row {
                write!(out, " {:>cell_width$}", value)?;
            }
            writeln!(out)?;
        }

        Ok(out)
    }
}

/// Receives rendered confusion matrices, e.g. for an experiment tracker.
pub trait MetricLogger {
    fn log_confusion_matrix(&mut self, name: &str, rendered: &str) -> Result<()>;
}

/// Logger that forwards to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMetricLogger;

impl MetricLogger for LogMetricLogger {
    fn log_confusion_matrix(&mut self, name: &str, rendered: &str) -> Result<()> {
        info!("{}\n{}", name, rendered);
        Ok(())
    }
}
