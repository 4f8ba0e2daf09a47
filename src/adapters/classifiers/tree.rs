//! Decision tree and random forest.
//!
//! Trees use the flat array layout of the training library: node `i` is a
//! leaf when `children_left[i] == -1`; otherwise a sample goes left iff
//! `x[feature[i]] <= threshold[i]`. `value[i]` holds the per-class weight of
//! the training samples that reached node `i`.

use serde::{Deserialize, Serialize};

use super::{argmax, check_finite, verdict_for};
use crate::domain::{FeatureVector, ModelFamily, Verdict, FEATURE_COUNT};
use crate::ports::{Classifier, ModelError};

const LEAF: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub trees: Vec<TreeParams>,
}

#[derive(Debug, Clone)]
struct Node {
    /// Child indices, `None` for leaves
    children: Option<(usize, usize)>,
    feature: usize,
    threshold: f64,
    /// Normalized class distribution
    distribution: [f64; 2],
}

/// Validated tree shared by both families.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn new(params: TreeParams) -> Result<Self, ModelError> {
        let n = params.children_left.len();
        if n == 0 {
            return Err(ModelError::InvalidParameters("tree has no nodes".into()));
        }
        if params.children_right.len() != n
            || params.feature.len() != n
            || params.threshold.len() != n
            || params.value.len() != n
        {
            return Err(ModelError::InvalidParameters(
                "tree arrays have different lengths".into(),
            ));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (params.children_left[i], params.children_right[i]);
            let value = params.value[i];
            check_finite("value", &value)?;

            let children = if left == LEAF && right == LEAF {
                None
            } else {
                // Children are stored after their parent, which also rules out cycles.
                let in_range = |c: i64| c > i as i64 && (c as usize) < n;
                if !in_range(left) || !in_range(right) {
                    return Err(ModelError::InvalidParameters(format!(
                        "node {i} has invalid children ({left}, {right})"
                    )));
                }
                let feature = params.feature[i];
                if feature < 0 || feature as usize >= FEATURE_COUNT {
                    return Err(ModelError::InvalidParameters(format!(
                        "node {i} splits on feature {feature}"
                    )));
                }
                check_finite("threshold", &[params.threshold[i]])?;
                Some((left as usize, right as usize))
            };

            let total = value[0] + value[1];
            if children.is_none() && (total <= 0.0 || value.iter().any(|v| *v < 0.0)) {
                return Err(ModelError::InvalidParameters(format!(
                    "leaf {i} has no class weight"
                )));
            }
            let distribution = if total > 0.0 {
                [value[0] / total, value[1] / total]
            } else {
                [0.0, 0.0]
            };

            nodes.push(Node {
                children,
                feature: params.feature[i].max(0) as usize,
                threshold: params.threshold[i],
                distribution,
            });
        }

        Ok(Self { nodes })
    }

    /// Class distribution of the leaf reached by `x`.
    fn leaf_distribution(&self, x: &FeatureVector) -> [f64; 2] {
        let x = x.as_slice();
        let mut node = &self.nodes[0];
        while let Some((left, right)) = node.children {
            node = if x[node.feature] <= node.threshold {
                &self.nodes[left]
            } else {
                &self.nodes[right]
            };
        }
        node.distribution
    }
}

/// Single decision tree classifier.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    tree: Tree,
    classes: [i64; 2],
}

impl DecisionTree {
    /// # Errors
    /// Returns `ModelError::InvalidParameters` for malformed tree arrays.
    pub fn new(params: TreeParams, classes: [i64; 2]) -> Result<Self, ModelError> {
        Ok(Self {
            tree: Tree::new(params)?,
            classes,
        })
    }
}

impl Classifier for DecisionTree {
    fn family(&self) -> ModelFamily {
        ModelFamily::DecisionTree
    }

    fn predict(&self, features: &FeatureVector) -> Result<Verdict, ModelError> {
        verdict_for(&self.classes, argmax(self.tree.leaf_distribution(features)))
    }

    fn predict_proba(&self, features: &FeatureVector) -> Option<f64> {
        Some(self.tree.leaf_distribution(features)[1])
    }
}

/// Forest of trees whose leaf distributions are averaged.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Tree>,
    classes: [i64; 2],
}

impl RandomForest {
    /// # Errors
    /// Returns `ModelError::InvalidParameters` for an empty forest or any
    /// malformed tree.
    pub fn new(params: RandomForestParams, classes: [i64; 2]) -> Result<Self, ModelError> {
        if params.trees.is_empty() {
            return Err(ModelError::InvalidParameters("forest has no trees".into()));
        }
        let trees = params
            .trees
            .into_iter()
            .map(Tree::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { trees, classes })
    }

    fn mean_distribution(&self, x: &FeatureVector) -> [f64; 2] {
        let mut sum = [0.0; 2];
        for tree in &self.trees {
            let d = tree.leaf_distribution(x);
            sum[0] += d[0];
            sum[1] += d[1];
        }
        let n = self.trees.len() as f64;
        [sum[0] / n, sum[1] / n]
    }
}

impl Classifier for RandomForest {
    fn family(&self) -> ModelFamily {
        ModelFamily::RandomForest
    }

    fn predict(&self, features: &FeatureVector) -> Result<Verdict, ModelError> {
        verdict_for(&self.classes, argmax(self.mean_distribution(features)))
    }

    fn predict_proba(&self, features: &FeatureVector) -> Option<f64> {
        Some(self.mean_distribution(features)[1])
    }
}
