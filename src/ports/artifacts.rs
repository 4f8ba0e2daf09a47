//! Artifact port: where the scaler set and the classifiers come from.

use crate::domain::ScalerSet;

use super::Classifier;

/// One entry of the model registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEntry {
    /// Name shown next to the verdict
    pub name: &'static str,
    /// Artifact file name without extension
    pub file_stem: &'static str,
}

/// Models run for every request, in display order.
pub const MODEL_REGISTRY: [ModelEntry; 5] = [
    ModelEntry {
        name: "Logistic Regression",
        file_stem: "trained_model_logistic_regression",
    },
    ModelEntry {
        name: "SVM",
        file_stem: "trained_model_svm",
    },
    ModelEntry {
        name: "Decision Tree",
        file_stem: "trained_model_decision_tree",
    },
    ModelEntry {
        name: "Random Forest",
        file_stem: "trained_model_random_forest",
    },
    ModelEntry {
        name: "KNN",
        file_stem: "trained_model_knn",
    },
];

/// Trait for loading persisted preprocessing and model artifacts.
///
/// Called once at startup. Any error is fatal.
pub trait ArtifactSource {
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Load the scalers for every scaled attribute.
    ///
    /// # Errors
    /// Returns error if the artifact is missing, unreadable, tampered with,
    /// or lacks a required scaler.
    fn load_scalers(&self) -> Result<ScalerSet, Self::Error>;

    /// Load the classifier registered under `entry`.
    ///
    /// # Errors
    /// Returns error if the artifact is missing, unreadable, tampered with,
    /// or has inconsistent parameters.
    fn load_model(&self, entry: &ModelEntry) -> Result<Box<dyn Classifier>, Self::Error>;
}
