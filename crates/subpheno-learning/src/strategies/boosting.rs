//! Gradient-boosted regression trees on the logistic loss.

use super::{ClassifierStrategy, FittedModel, check_target, hyperparameter_map, normalize};
use crate::design::{DesignMatrix, EncodedTarget, TargetEncoding};
use crate::error::Result;
use crate::types::StrategyKind;
use ndarray::{ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use std::collections::BTreeMap;
use subpheno_processing::trees::{RegressionTree, TreeParams};

/// Boosted trees in the XGBoost style: each round fits a depth-limited tree
/// to the logistic-loss gradient, then replaces its leaf values with the
/// Newton step `Σg / (Σh + λ)`.
///
/// The score models log-odds of `Class = 1`, so this strategy takes the
/// numeric 0/1 target.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostingStrategy {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub learning_rate: f64,
    /// L2 penalty on leaf values
    pub lambda: f64,
}

impl Default for GradientBoostingStrategy {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            max_depth: 6,
            min_samples_leaf: 10,
            learning_rate: 0.01,
            lambda: 1.0,
        }
    }
}

impl ClassifierStrategy for GradientBoostingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GradientBoostedTrees
    }

    fn target_encoding(&self) -> TargetEncoding {
        TargetEncoding::Numeric
    }

    fn hyperparameters(&self) -> BTreeMap<String, serde_json::Value> {
        hyperparameter_map([
            ("n_estimators", json!(self.n_estimators)),
            ("max_depth", json!(self.max_depth)),
            ("min_samples_leaf", json!(self.min_samples_leaf)),
            ("learning_rate", json!(self.learning_rate)),
            ("lambda", json!(self.lambda)),
            ("objective", json!("binary:logistic")),
        ])
    }

    fn fit(&self, train: &DesignMatrix, target: &EncodedTarget, seed: u64) -> Result<Box<dyn FittedModel>> {
        let y = target.as_numeric()?;
        let (n0, n1) = check_target(train, target)?;

        let x = train.features();
        let n = x.nrows();
        let rows: Vec<usize> = (0..n).collect();
        let params = TreeParams {
            max_depth: Some(self.max_depth),
            min_samples_split: 2 * self.min_samples_leaf,
            min_samples_leaf: self.min_samples_leaf,
            max_features: None,
        };
        let mut rng = StdRng::seed_from_u64(seed);

        let base_score = (n1 as f64 / n0 as f64).ln();
        let mut scores = vec![base_score; n];
        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut importance = vec![0.0; x.ncols()];

        for _ in 0..self.n_estimators {
            let probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
            let residuals: Vec<f64> = y.iter().zip(&probs).map(|(yi, p)| yi - p).collect();

            let mut tree = RegressionTree::fit(x, &residuals, &rows, &params, &mut rng);

            let leaves: Vec<usize> = x.rows().into_iter().map(|row| tree.leaf_index(row)).collect();
            let mut grad = vec![0.0; tree.nodes().len()];
            let mut hess = vec![0.0; tree.nodes().len()];
            for ((&leaf, &r), &p) in leaves.iter().zip(&residuals).zip(&probs) {
                grad[leaf] += r;
                hess[leaf] += p * (1.0 - p);
            }
            let steps: Vec<f64> = grad
                .iter()
                .zip(&hess)
                .map(|(g, h)| g / (h + self.lambda))
                .collect();
            // split ids are ignored by set_leaf_value
            for (id, &step) in steps.iter().enumerate() {
                tree.set_leaf_value(id, step);
            }

            for (score, &leaf) in scores.iter_mut().zip(&leaves) {
                *score += self.learning_rate * steps[leaf];
            }
            for (total, gain) in importance.iter_mut().zip(tree.importance()) {
                *total += gain;
            }
            trees.push(tree);
        }

        Ok(Box::new(BoostedModel {
            base_score,
            learning_rate: self.learning_rate,
            trees,
            importance: normalize(importance),
        }))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

struct BoostedModel {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    importance: Vec<f64>,
}

impl BoostedModel {
    fn score(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.base_score
            + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}

impl FittedModel for BoostedModel {
    fn prob_class0(&self, features: ArrayView2<'_, f64>) -> Vec<f64> {
        features
            .rows()
            .into_iter()
            .map(|row| 1.0 - sigmoid(self.score(row)))
            .collect()
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        Some(self.importance.clone())
    }
}
