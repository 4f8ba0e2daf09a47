//! Prediction result types.
//!
//! Each model's verdict is reported on its own. There is no voting between
//! models.

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

/// Estimator family of a loaded classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LogisticRegression,
    Svm,
    DecisionTree,
    RandomForest,
    Knn,
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LogisticRegression => write!(f, "logistic regression"),
            Self::Svm => write!(f, "support vector machine"),
            Self::DecisionTree => write!(f, "decision tree"),
            Self::RandomForest => write!(f, "random forest"),
            Self::Knn => write!(f, "k-nearest neighbors"),
        }
    }
}

/// Binary verdict of a single model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Class label 0
    NoHeartDisease,
    /// Class label 1
    HeartDiseaseDetected,
}

impl Verdict {
    /// Map a predicted class label to a verdict. Only 0 and 1 are valid.
    #[must_use]
    pub fn from_class_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Self::NoHeartDisease),
            1 => Some(Self::HeartDiseaseDetected),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_positive(self) -> bool {
        matches!(self, Self::HeartDiseaseDetected)
    }

    /// The text shown to the user.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::NoHeartDisease => "No Heart Disease Detected",
            Self::HeartDiseaseDetected => "Heart Disease Detected",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Output of one model for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    /// Registry name, e.g. "Logistic Regression"
    pub model: String,

    pub family: ModelFamily,

    pub verdict: Verdict,

    /// Positive-class probability, when the family provides one
    pub probability: Option<f64>,
}

/// Everything produced for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Encoded vector before scaling
    pub raw: FeatureVector,

    /// Vector handed to every model
    pub scaled: FeatureVector,

    /// One entry per model, in registry order
    pub predictions: Vec<ModelPrediction>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PredictionReport {
    #[must_use]
    pub fn new(
        raw: FeatureVector,
        scaled: FeatureVector,
        predictions: Vec<ModelPrediction>,
    ) -> Self {
        Self {
            raw,
            scaled,
            predictions,
            created_at: chrono::Utc::now(),
        }
    }

    /// `"<model>: <verdict>"` for each model.
    #[must_use]
    pub fn verdict_lines(&self) -> Vec<String> {
        self.predictions
            .iter()
            .map(|p| format!("{}: {}", p.model, p.verdict))
            .collect()
    }
}
