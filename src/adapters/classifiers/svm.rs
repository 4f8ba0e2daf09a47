//! Support vector classifier.
//!
//! Decision function: f(x) = Σ(αᵢ·K(svᵢ, x)) + b, class 1 iff f(x) > 0.
//! `dual_coef` and `intercept` are the estimator's public attributes, whose
//! sign convention already maps a positive decision to the second class.

use serde::{Deserialize, Serialize};

use super::{check_finite, check_width, verdict_for};
use crate::domain::{FeatureVector, ModelFamily, Verdict};
use crate::ports::{Classifier, ModelError};

/// Kernel with its resolved hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Poly { gamma: f64, coef0: f64, degree: u32 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn apply(&self, a: &[f64], b: &[f64]) -> f64 {
        match *self {
            Self::Linear => dot(a, b),
            Self::Poly { gamma, coef0, degree } => {
                (gamma * dot(a, b) + coef0).powi(degree as i32)
            }
            Self::Rbf { gamma } => {
                let sq_dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * sq_dist).exp()
            }
            Self::Sigmoid { gamma, coef0 } => (gamma * dot(a, b) + coef0).tanh(),
        }
    }

    fn hyperparameters(&self) -> Vec<f64> {
        match *self {
            Self::Linear => Vec::new(),
            Self::Poly { gamma, coef0, .. } | Self::Sigmoid { gamma, coef0 } => vec![gamma, coef0],
            Self::Rbf { gamma } => vec![gamma],
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmParams {
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone)]
pub struct SupportVectorMachine {
    kernel: Kernel,
    support_vectors: Vec<Vec<f64>>,
    dual_coef: Vec<f64>,
    intercept: f64,
    classes: [i64; 2],
}

impl SupportVectorMachine {
    /// # Errors
    /// Returns `ModelError::InvalidParameters` if there are no support
    /// vectors, the coefficient count does not match, a vector has the wrong
    /// width, or any parameter is non-finite.
    pub fn new(params: SvmParams, classes: [i64; 2]) -> Result<Self, ModelError> {
        if params.support_vectors.is_empty() {
            return Err(ModelError::InvalidParameters(
                "SVM has no support vectors".into(),
            ));
        }
        if params.dual_coef.len() != params.support_vectors.len() {
            return Err(ModelError::InvalidParameters(format!(
                "dual_coef has {} entries for {} support vectors",
                params.dual_coef.len(),
                params.support_vectors.len()
            )));
        }
        for sv in &params.support_vectors {
            check_width("support vector", sv.len())?;
            check_finite("support vector", sv)?;
        }
        check_finite("dual_coef", &params.dual_coef)?;
        check_finite("intercept", &[params.intercept])?;
        check_finite("kernel", &params.kernel.hyperparameters())?;

        Ok(Self {
            kernel: params.kernel,
            support_vectors: params.support_vectors,
            dual_coef: params.dual_coef,
            intercept: params.intercept,
            classes,
        })
    }

    fn decision_function(&self, x: &FeatureVector) -> f64 {
        let x = x.as_slice();
        self.support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, alpha)| alpha * self.kernel.apply(sv, x))
            .sum::<f64>()
            + self.intercept
    }
}

impl Classifier for SupportVectorMachine {
    fn family(&self) -> ModelFamily {
        ModelFamily::Svm
    }

    fn predict(&self, features: &FeatureVector) -> Result<Verdict, ModelError> {
        let index = usize::from(self.decision_function(features) > 0.0);
        verdict_for(&self.classes, index)
    }
}
