//! Assay analysis module
//!
//! Parses plate readings and computes standard-curve fit quality (R²) and
//! replicate precision (CV%).

pub mod metrics;
pub mod parse;

pub use metrics::{compute, MetricsResult};
