//! Internal modules ported from external libraries.
//!
//! These modules contain code adapted from:
//! - torchvision: Pairwise box IoU
//! - scikit-learn: Confusion matrix and precision/recall/F1

pub mod torchvision;
pub mod sklearn;
