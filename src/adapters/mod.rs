//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifacts`: model directory loader with manifest and signature checks
//! - `classifiers`: the five estimator families
//! - `sanitize`: clinical value filtering for logs

pub mod artifacts;
pub mod classifiers;
pub mod sanitize;

pub use artifacts::ArtifactError;
