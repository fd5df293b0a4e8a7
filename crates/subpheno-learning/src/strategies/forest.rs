//! Probability random forest.

use super::{ClassifierStrategy, FittedModel, check_target, hyperparameter_map, is_class0};
use crate::design::{DesignMatrix, EncodedTarget, TargetEncoding};
use crate::error::Result;
use crate::types::StrategyKind;
use ndarray::ArrayView2;
use serde_json::json;
use std::collections::BTreeMap;
use subpheno_processing::trees::{ForestParams, RandomForestRegressor};

/// Random forest grown on the class-0 indicator.
///
/// Each leaf holds the class-0 frequency of its bootstrap rows, so the forest
/// average is P(class 0). Squared-error decrease on a 0/1 target is the Gini
/// decrease, which gives the impurity importance.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestStrategy {
    pub n_trees: usize,
    /// Candidate features per split; `None` means `floor(sqrt(p))`
    pub max_features: Option<usize>,
    pub min_samples_leaf: usize,
}

impl Default for RandomForestStrategy {
    fn default() -> Self {
        Self {
            n_trees: 1000,
            max_features: None,
            min_samples_leaf: 1,
        }
    }
}

impl RandomForestStrategy {
    fn mtry(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features.max(1))
    }
}

impl ClassifierStrategy for RandomForestStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RandomForest
    }

    fn target_encoding(&self) -> TargetEncoding {
        TargetEncoding::Factor
    }

    fn hyperparameters(&self) -> BTreeMap<String, serde_json::Value> {
        hyperparameter_map([
            ("n_trees", json!(self.n_trees)),
            (
                "mtry",
                self.max_features
                    .map_or_else(|| json!("floor(sqrt(p))"), |m| json!(m)),
            ),
            ("min_samples_leaf", json!(self.min_samples_leaf)),
            ("bootstrap", json!(true)),
        ])
    }

    fn fit(&self, train: &DesignMatrix, target: &EncodedTarget, seed: u64) -> Result<Box<dyn FittedModel>> {
        let labels = target.as_factor()?;
        check_target(train, target)?;

        let y: Vec<f64> = labels
            .iter()
            .map(|c| if is_class0(c) { 1.0 } else { 0.0 })
            .collect();
        let rows: Vec<usize> = (0..train.n_rows()).collect();
        let params = ForestParams {
            n_trees: self.n_trees,
            max_features: Some(self.mtry(train.n_features())),
            min_samples_leaf: self.min_samples_leaf,
            max_depth: None,
            bootstrap: true,
            seed,
        };
        let forest = RandomForestRegressor::fit(train.features(), &y, &rows, &params)?;

        Ok(Box::new(ForestModel { forest }))
    }
}

struct ForestModel {
    forest: RandomForestRegressor,
}

impl FittedModel for ForestModel {
    fn prob_class0(&self, features: ArrayView2<'_, f64>) -> Vec<f64> {
        self.forest.predict(features)
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        Some(self.forest.feature_importance().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{pair_accuracy, two_blobs};
    use super::super::{fit_strategy, predict_proba};
    use super::*;

    fn small() -> RandomForestStrategy {
        RandomForestStrategy {
            n_trees: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_mtry_default() {
        let strategy = RandomForestStrategy::default();
        assert_eq!(strategy.mtry(30), 5);
        assert_eq!(strategy.mtry(2), 1);
        assert_eq!(strategy.mtry(1), 1);
    }

    #[test]
    fn test_separates_blobs_with_importance() {
        let train = two_blobs(30, 4.0, 11);
        let test = two_blobs(15, 4.0, 12);
        let model = fit_strategy(&small(), &train, 3).unwrap();

        let records = predict_proba(model.as_ref(), &test);
        assert!(pair_accuracy(&records) > 0.95);

        let importance = model.feature_importance().unwrap();
        assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importance[0] > importance[1]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let train = two_blobs(20, 1.0, 4);
        let a = fit_strategy(&small(), &train, 9).unwrap();
        let b = fit_strategy(&small(), &train, 9).unwrap();
        assert_eq!(
            a.prob_class0(train.features()),
            b.prob_class0(train.features())
        );
    }
}
