//! Box operations port.
//!
//! Ported from torchvision.ops

mod boxes;

pub use boxes::*;
