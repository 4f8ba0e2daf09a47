//! Classifier adapters: one implementation per estimator family.
//!
//! Models are exported from the training pipeline as JSON parameter
//! containers. Every container carries the common header fields
//! (`n_features`, `classes`) and a `family` tag selecting the parameter
//! layout:
//!
//! ```json
//! { "family": "logistic_regression", "n_features": 11, "classes": [0, 1],
//!   "coefficients": [...], "intercept": -0.3 }
//! ```

mod knn;
mod linear;
mod svm;
mod tree;

use serde::{Deserialize, Serialize};

use crate::domain::{Verdict, FEATURE_COUNT};
use crate::ports::{Classifier, ModelError};

pub use knn::{KNearestNeighbors, KnnParams, Weighting};
pub use linear::{LogisticRegression, LogisticRegressionParams};
pub use svm::{Kernel, SupportVectorMachine, SvmParams};
pub use tree::{DecisionTree, RandomForest, RandomForestParams, TreeParams};

fn default_classes() -> [i64; 2] {
    [0, 1]
}

/// A model as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedModel {
    /// Width of the input the model was fitted on
    pub n_features: usize,

    /// Class labels in estimator order
    #[serde(default = "default_classes")]
    pub classes: [i64; 2],

    #[serde(flatten)]
    pub params: ModelParams,
}

/// Family-specific parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelParams {
    LogisticRegression(LogisticRegressionParams),
    Svm(SvmParams),
    DecisionTree(TreeParams),
    RandomForest(RandomForestParams),
    Knn(KnnParams),
}

impl ExportedModel {
    /// Validate the parameters and build the classifier.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if the model was not fitted on
    /// the feature vector width, or `ModelError::InvalidParameters` if the
    /// family parameters are inconsistent.
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, ModelError> {
        if self.n_features != FEATURE_COUNT {
            return Err(ModelError::DimensionMismatch {
                expected: FEATURE_COUNT,
                actual: self.n_features,
            });
        }

        let classes = self.classes;
        let classifier: Box<dyn Classifier> = match self.params {
            ModelParams::LogisticRegression(p) => Box::new(LogisticRegression::new(p, classes)?),
            ModelParams::Svm(p) => Box::new(SupportVectorMachine::new(p, classes)?),
            ModelParams::DecisionTree(p) => Box::new(DecisionTree::new(p, classes)?),
            ModelParams::RandomForest(p) => Box::new(RandomForest::new(p, classes)?),
            ModelParams::Knn(p) => Box::new(KNearestNeighbors::new(p, classes)?),
        };
        Ok(classifier)
    }
}

/// Map an estimator class index to a verdict.
fn verdict_for(classes: &[i64; 2], index: usize) -> Result<Verdict, ModelError> {
    let label = classes[index];
    Verdict::from_class_label(label).ok_or(ModelError::UnexpectedLabel(label))
}

/// Index of the larger of two scores; the first wins on ties.
fn argmax(scores: [f64; 2]) -> usize {
    if scores[1] > scores[0] {
        1
    } else {
        0
    }
}

fn check_width(name: &str, len: usize) -> Result<(), ModelError> {
    if len == FEATURE_COUNT {
        Ok(())
    } else {
        Err(ModelError::InvalidParameters(format!(
            "{name} has {len} entries, expected {FEATURE_COUNT}"
        )))
    }
}

fn check_finite(name: &str, values: &[f64]) -> Result<(), ModelError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ModelError::InvalidParameters(format!(
            "{name} contains non-finite values"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureVector, ModelFamily};

    #[test]
    fn test_parse_logistic_regression_container() {
        let json = r#"{
            "family": "logistic_regression",
            "n_features": 11,
            "coefficients": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.1],
            "intercept": -0.5
        }"#;
        let exported: ExportedModel = serde_json::from_str(json).expect("Should parse");
        assert_eq!(exported.classes, [0, 1]);

        let model = exported.into_classifier().expect("Should build");
        assert_eq!(model.family(), ModelFamily::LogisticRegression);

        let v = FeatureVector::new([1.0; FEATURE_COUNT]);
        assert_eq!(model.predict(&v), Ok(Verdict::HeartDiseaseDetected));
    }

    #[test]
    fn test_rejects_wrong_feature_count() {
        let json = r#"{
            "family": "logistic_regression",
            "n_features": 9,
            "coefficients": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9],
            "intercept": 0.0
        }"#;
        let exported: ExportedModel = serde_json::from_str(json).expect("Should parse");
        assert!(matches!(
            exported.into_classifier(),
            Err(ModelError::DimensionMismatch { expected: 11, actual: 9 })
        ));
    }

    #[test]
    fn test_rejects_unknown_family() {
        let json = r#"{ "family": "naive_bayes", "n_features": 11 }"#;
        assert!(serde_json::from_str::<ExportedModel>(json).is_err());
    }

    #[test]
    fn test_non_binary_labels_fail_at_prediction() {
        assert_eq!(verdict_for(&[0, 1], 1), Ok(Verdict::HeartDiseaseDetected));
        assert_eq!(verdict_for(&[1, 2], 1), Err(ModelError::UnexpectedLabel(2)));
    }

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax([0.5, 0.5]), 0);
        assert_eq!(argmax([0.4, 0.6]), 1);
    }
}
