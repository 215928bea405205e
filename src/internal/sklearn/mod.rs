//! Classification metrics port.
//!
//! Ported from sklearn.metrics

mod classification;

pub use classification::*;
