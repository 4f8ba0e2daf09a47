//! Logistic regression.

use serde::{Deserialize, Serialize};

use super::{check_finite, check_width, verdict_for};
use crate::domain::{FeatureVector, ModelFamily, Verdict};
use crate::ports::{Classifier, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Binary logistic regression: class 1 iff `w·x + b > 0`.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    classes: [i64; 2],
}

impl LogisticRegression {
    /// # Errors
    /// Returns `ModelError::InvalidParameters` for a coefficient vector of the
    /// wrong width or non-finite parameters.
    pub fn new(params: LogisticRegressionParams, classes: [i64; 2]) -> Result<Self, ModelError> {
        check_width("coefficients", params.coefficients.len())?;
        check_finite("coefficients", &params.coefficients)?;
        check_finite("intercept", &[params.intercept])?;

        Ok(Self {
            coefficients: params.coefficients,
            intercept: params.intercept,
            classes,
        })
    }

    fn decision_function(&self, x: &FeatureVector) -> f64 {
        self.coefficients
            .iter()
            .zip(x.as_slice())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept
    }
}

impl Classifier for LogisticRegression {
    fn family(&self) -> ModelFamily {
        ModelFamily::LogisticRegression
    }

    fn predict(&self, features: &FeatureVector) -> Result<Verdict, ModelError> {
        let index = usize::from(self.decision_function(features) > 0.0);
        verdict_for(&self.classes, index)
    }

    fn predict_proba(&self, features: &FeatureVector) -> Option<f64> {
        let z = self.decision_function(features);
        Some(1.0 / (1.0 + (-z).exp()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(intercept: f64) -> LogisticRegression {
        let mut coefficients = vec![0.0; 11];
        coefficients[0] = 2.0;
        coefficients[1] = -1.0;
        LogisticRegression::new(
            LogisticRegressionParams {
                coefficients,
                intercept,
            },
            [0, 1],
        )
        .expect("Should build")
    }

    #[test]
    fn test_decision_boundary() {
        let m = model(0.0);
        let mut slots = [0.0; 11];
        slots[0] = 1.0;
        slots[1] = 1.0;
        let x = FeatureVector::new(slots);
        assert_eq!(m.predict(&x), Ok(Verdict::HeartDiseaseDetected));

        slots[1] = 2.0;
        let x = FeatureVector::new(slots);
        // z == 0 is not positive
        assert_eq!(m.predict(&x), Ok(Verdict::NoHeartDisease));
        assert!((m.predict_proba(&x).expect("proba") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_probability_follows_intercept() {
        let x = FeatureVector::new([0.0; 11]);
        let p = model(3.0).predict_proba(&x).expect("proba");
        assert!(p > 0.95 && p < 1.0);
        assert_eq!(model(3.0).predict(&x), Ok(Verdict::HeartDiseaseDetected));
        assert_eq!(model(-3.0).predict(&x), Ok(Verdict::NoHeartDisease));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let short = LogisticRegressionParams {
            coefficients: vec![1.0; 5],
            intercept: 0.0,
        };
        assert!(LogisticRegression::new(short, [0, 1]).is_err());

        let nan = LogisticRegressionParams {
            coefficients: vec![1.0; 11],
            intercept: f64::NAN,
        };
        assert!(LogisticRegression::new(nan, [0, 1]).is_err());
    }
}
