//! Random forest regressor built from [`RegressionTree`]s.

use super::tree::{RegressionTree, TreeParams};
use crate::error::{ProcessingError, Result};
use crate::utils::derive_seed;
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Candidate features per split (`None` tries all of them)
    pub max_features: Option<usize>,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum depth of each tree
    pub max_depth: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_features: None,
            min_samples_leaf: 1,
            max_depth: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// An averaged ensemble of regression trees.
///
/// Fitted on a 0/1 target the prediction is the mean of the leaf class
/// frequencies, i.e. a probability forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    feature_importance: Vec<f64>,
}

impl RandomForestRegressor {
    /// Fit a forest on `rows` of `x` against targets `y` (indexed like `x`).
    ///
    /// Trees are grown in parallel; tree `i` draws everything from
    /// `derive_seed(params.seed, i)`, so the result does not depend on the
    /// thread count.
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], rows: &[usize], params: &ForestParams) -> Result<Self> {
        if params.n_trees == 0 {
            return Err(ProcessingError::InvalidConfig(
                "forest needs at least one tree".to_string(),
            ));
        }
        if rows.is_empty() {
            return Err(ProcessingError::InvalidConfig(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }
        if y.len() != x.nrows() {
            return Err(ProcessingError::Internal(format!(
                "target length {} does not match {} feature rows",
                y.len(),
                x.nrows()
            )));
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: 2,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features,
        };

        let trees: Vec<RegressionTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(derive_seed(params.seed, i as u64));
                if params.bootstrap {
                    let sample: Vec<usize> = (0..rows.len())
                        .map(|_| rows[rng.gen_range(0..rows.len())])
                        .collect();
                    RegressionTree::fit(x, y, &sample, &tree_params, &mut rng)
                } else {
                    RegressionTree::fit(x, y, rows, &tree_params, &mut rng)
                }
            })
            .collect();

        // Aggregate feature importances
        let mut feature_importance = vec![0.0; x.ncols()];
        for tree in &trees {
            for (total, imp) in feature_importance.iter_mut().zip(tree.importance()) {
                *total += imp;
            }
        }

        // Normalize
        let sum: f64 = feature_importance.iter().sum();
        if sum > 0.0 {
            for imp in &mut feature_importance {
                *imp /= sum;
            }
        }

        Ok(Self {
            trees,
            feature_importance,
        })
    }

    /// Mean prediction over all trees.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        (0..x.nrows())
            .into_par_iter()
            .map(|i| self.predict_row(x.row(i)))
            .collect()
    }

    /// Impurity-decrease importance per feature, summing to 1 (all zeros if
    /// no tree ever split).
    pub fn feature_importance(&self) -> &[f64] {
        &self.feature_importance
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn linear_data(n: usize) -> (Array2<f64>, Vec<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64 / 10.0,
            1 => ((i * 13) % 7) as f64,
            _ => ((i * 5) % 11) as f64,
        });
        let y = (0..n).map(|i| 2.0 * (i as f64 / 10.0) + 1.0).collect();
        (x, y)
    }

    #[test]
    fn test_forest_fits_signal_feature() {
        let (x, y) = linear_data(120);
        let rows: Vec<usize> = (0..120).collect();
        let params = ForestParams {
            n_trees: 25,
            max_features: Some(2),
            ..ForestParams::default()
        };
        let forest = RandomForestRegressor::fit(x.view(), &y, &rows, &params).unwrap();

        assert_eq!(forest.n_trees(), 25);
        let importance = forest.feature_importance();
        assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importance[0] > importance[1]);
        assert!(importance[0] > importance[2]);

        let predictions = forest.predict(x.view());
        let mse: f64 = predictions
            .iter()
            .zip(&y)
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1.0, "mse = {mse}");
    }

    #[test]
    fn test_forest_is_deterministic() {
        let (x, y) = linear_data(60);
        let rows: Vec<usize> = (0..60).step_by(2).collect();
        let params = ForestParams {
            n_trees: 10,
            seed: 7,
            ..ForestParams::default()
        };
        let a = RandomForestRegressor::fit(x.view(), &y, &rows, &params).unwrap();
        let b = RandomForestRegressor::fit(x.view(), &y, &rows, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_forest_rejects_empty_input() {
        let (x, y) = linear_data(5);
        let err = RandomForestRegressor::fit(x.view(), &y, &[], &ForestParams::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let params = ForestParams {
            n_trees: 0,
            ..ForestParams::default()
        };
        assert!(RandomForestRegressor::fit(x.view(), &y, &[0, 1], &params).is_err());
    }
}
