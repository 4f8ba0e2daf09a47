//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the concrete model families and artifact
//! storage.

mod artifacts;
mod classifier;

pub use artifacts::{ArtifactSource, ModelEntry, MODEL_REGISTRY};
pub use classifier::{Classifier, ModelError};
