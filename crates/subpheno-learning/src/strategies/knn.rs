//! k-nearest neighbors on standardized features.

use super::scaling::Standardizer;
use super::{ClassifierStrategy, FittedModel, check_target, hyperparameter_map, is_class0};
use crate::design::{DesignMatrix, EncodedTarget, TargetEncoding};
use crate::error::Result;
use crate::types::StrategyKind;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct KnnStrategy {
    pub k: usize,
}

impl Default for KnnStrategy {
    fn default() -> Self {
        Self { k: 5 }
    }
}

impl ClassifierStrategy for KnnStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Knn
    }

    fn target_encoding(&self) -> TargetEncoding {
        TargetEncoding::Factor
    }

    fn hyperparameters(&self) -> BTreeMap<String, serde_json::Value> {
        hyperparameter_map([
            ("k", json!(self.k)),
            ("distance", json!("euclidean")),
            ("scaled", json!(true)),
        ])
    }

    fn fit(&self, train: &DesignMatrix, target: &EncodedTarget, _seed: u64) -> Result<Box<dyn FittedModel>> {
        let labels = target.as_factor()?;
        check_target(train, target)?;

        let scaler = Standardizer::fit(train.features());
        let x = scaler.transform(train.features());
        Ok(Box::new(KnnModel {
            k: self.k.clamp(1, x.nrows()),
            scaler,
            x,
            class0: labels.iter().map(is_class0).collect(),
        }))
    }
}

struct KnnModel {
    k: usize,
    scaler: Standardizer,
    x: Array2<f64>,
    class0: Vec<bool>,
}

impl KnnModel {
    fn score(&self, query: ArrayView1<'_, f64>) -> f64 {
        let mut distances: Vec<(f64, usize)> = self
            .x
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let d: f64 = row.iter().zip(query.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                (d, i)
            })
            .collect();
        // equal distances resolve to the earlier training row
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let votes = distances[..self.k]
            .iter()
            .filter(|(_, i)| self.class0[*i])
            .count();
        votes as f64 / self.k as f64
    }
}

impl FittedModel for KnnModel {
    fn prob_class0(&self, features: ArrayView2<'_, f64>) -> Vec<f64> {
        let queries = self.scaler.transform(features);
        queries.rows().into_iter().map(|q| self.score(q)).collect()
    }
}
