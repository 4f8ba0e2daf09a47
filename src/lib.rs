//! # Heartcheck
//!
//! Heart disease risk screening from eleven clinical attributes.
//!
//! A patient record is encoded into a fixed feature vector, the continuous
//! columns are scaled with the training-time scalers, and five pre-trained
//! classifiers each return a binary verdict.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Attributes, encoding, scaling, verdicts
//! - `ports`: Classifier and artifact source traits
//! - `adapters`: Estimator families, filesystem artifact store, log sanitizing
//! - `application`: Inference use case over the registered models
//! - `tui`: Terminal form and results screen

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{encode, FeatureVector, PredictionReport, RawInput, Verdict};

/// Result type for Heartcheck operations
pub type Result<T> = std::result::Result<T, HeartcheckError>;

/// Main error type for Heartcheck
#[derive(Debug, thiserror::Error)]
pub enum HeartcheckError {
    #[error("Encoding failed: {0}")]
    Encoding(#[from] domain::EncodingError),

    #[error("Scaling failed: {0}")]
    Scaler(#[from] domain::ScalerError),

    #[error("Prediction failed for {model}: {source}")]
    Model {
        model: String,
        #[source]
        source: ports::ModelError,
    },

    #[error("Artifact loading failed: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Invalid patient data: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
