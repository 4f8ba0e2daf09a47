//! k-nearest neighbors over the stored (already scaled) training set.

use serde::{Deserialize, Serialize};

use super::{argmax, check_finite, check_width, verdict_for};
use crate::domain::{FeatureVector, ModelFamily, Verdict};
use crate::ports::{Classifier, ModelError};

/// How neighbour votes are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Uniform,
    /// Inverse distance; exact matches take all the weight.
    Distance,
}

fn default_p() -> f64 {
    2.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnParams {
    pub n_neighbors: usize,
    /// Minkowski exponent
    #[serde(default = "default_p")]
    pub p: f64,
    #[serde(default)]
    pub weights: Weighting,
    /// Training points
    pub points: Vec<Vec<f64>>,
    /// Class index (0 or 1) of each training point
    pub labels: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct KNearestNeighbors {
    k: usize,
    p: f64,
    weights: Weighting,
    points: Vec<Vec<f64>>,
    labels: Vec<usize>,
    classes: [i64; 2],
}

impl KNearestNeighbors {
    /// # Errors
    /// Returns `ModelError::InvalidParameters` if `k` is zero or exceeds the
    /// training set, `p < 1`, the labels do not line up with the points, or a
    /// point has the wrong width.
    pub fn new(params: KnnParams, classes: [i64; 2]) -> Result<Self, ModelError> {
        if params.n_neighbors == 0 || params.n_neighbors > params.points.len() {
            return Err(ModelError::InvalidParameters(format!(
                "n_neighbors {} invalid for {} training points",
                params.n_neighbors,
                params.points.len()
            )));
        }
        if !params.p.is_finite() || params.p < 1.0 {
            return Err(ModelError::InvalidParameters(format!(
                "Minkowski p must be a finite value >= 1, got {}",
                params.p
            )));
        }
        if params.labels.len() != params.points.len() {
            return Err(ModelError::InvalidParameters(
                "labels and points have different lengths".into(),
            ));
        }
        if let Some(bad) = params.labels.iter().find(|l| **l > 1) {
            return Err(ModelError::InvalidParameters(format!(
                "label index {bad} is not binary"
            )));
        }
        for point in &params.points {
            check_width("training point", point.len())?;
            check_finite("training point", point)?;
        }

        Ok(Self {
            k: params.n_neighbors,
            p: params.p,
            weights: params.weights,
            points: params.points,
            labels: params.labels,
            classes,
        })
    }

    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        if self.p == 1.0 {
            a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
        } else if self.p == 2.0 {
            a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
        } else {
            a.iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs().powf(self.p))
                .sum::<f64>()
                .powf(1.0 / self.p)
        }
    }

    /// Vote weight per class, normalized to sum to 1.
    fn votes(&self, x: &FeatureVector) -> [f64; 2] {
        let x = x.as_slice();
        let mut neighbours: Vec<(f64, usize)> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, point)| (self.distance(point, x), i))
            .collect();
        // Equal distances fall back to training order.
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        neighbours.truncate(self.k);

        let exact_match = neighbours.iter().any(|(d, _)| *d == 0.0);
        let mut votes = [0.0; 2];
        for (d, i) in neighbours {
            let weight = match self.weights {
                Weighting::Uniform => 1.0,
                Weighting::Distance if exact_match => {
                    if d == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
                Weighting::Distance => 1.0 / d,
            };
            votes[self.labels[i]] += weight;
        }

        let total = votes[0] + votes[1];
        [votes[0] / total, votes[1] / total]
    }
}

impl Classifier for KNearestNeighbors {
    fn family(&self) -> ModelFamily {
        ModelFamily::Knn
    }

    fn predict(&self, features: &FeatureVector) -> Result<Verdict, ModelError> {
        verdict_for(&self.classes, argmax(self.votes(features)))
    }

    fn predict_proba(&self, features: &FeatureVector) -> Option<f64> {
        Some(self.votes(features)[1])
    }
}
