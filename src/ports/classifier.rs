//! Classifier port: the single capability every loaded model exposes.

use crate::domain::{FeatureVector, ModelFamily, Verdict};

/// Errors raised by classifiers, either while validating exported
/// parameters or while predicting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Model expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid model parameters: {0}")]
    InvalidParameters(String),

    #[error("Model produced unexpected class label {0}")]
    UnexpectedLabel(i64),
}

/// A pre-trained binary classifier.
///
/// Implementations are immutable after construction and deterministic:
/// the same scaled vector always yields the same verdict.
pub trait Classifier: Send + Sync {
    /// Estimator family, used for display and logging.
    fn family(&self) -> ModelFamily;

    /// Predict the verdict for an already scaled feature vector.
    ///
    /// # Errors
    /// Returns `ModelError::UnexpectedLabel` if the exported class labels
    /// are not the binary 0/1 pair.
    fn predict(&self, features: &FeatureVector) -> Result<Verdict, ModelError>;

    /// Positive-class probability, for families that estimate one.
    fn predict_proba(&self, _features: &FeatureVector) -> Option<f64> {
        None
    }
}
