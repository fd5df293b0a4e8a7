//! Classifier strategies compared by the pipeline.
//!
//! Every model family sits behind [`ClassifierStrategy`]: it declares the
//! target encoding its algorithm expects, reports its fixed hyperparameters,
//! and fits a [`FittedModel`] that scores rows with P(`Class` = 0).
//!
//! | Strategy | Target | Probability |
//! |---|---|---|
//! | [`SvmStrategy`] | factor | Platt-scaled linear decision value |
//! | [`KnnStrategy`] | factor | class-0 share of the 5 nearest rows |
//! | [`GradientBoostingStrategy`] | numeric | logistic of the boosted score |
//! | [`RandomForestStrategy`] | factor | mean leaf class-0 frequency |
//! | [`NaiveBayesStrategy`] | factor | kernel-density posterior |

mod boosting;
mod forest;
mod knn;
mod naive_bayes;
mod scaling;
mod svm;

pub use boosting::GradientBoostingStrategy;
pub use forest::RandomForestStrategy;
pub use knn::KnnStrategy;
pub use naive_bayes::NaiveBayesStrategy;
pub use scaling::Standardizer;
pub use svm::SvmStrategy;

use crate::design::{DesignMatrix, EncodedTarget, TargetEncoding};
use crate::error::{LearningError, Result};
use crate::types::{PredictionRecord, StrategyKind};
use ndarray::ArrayView2;
use std::collections::BTreeMap;
use subpheno_processing::Subphenotype;

/// A classifier family with fixed hyperparameters.
///
/// Fitting is stateless: the strategy itself is never mutated, so one
/// instance can fit every cross-validation fold in parallel.
pub trait ClassifierStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Target representation [`fit`](Self::fit) expects.
    fn target_encoding(&self) -> TargetEncoding;

    /// Fixed hyperparameters, for the run report.
    fn hyperparameters(&self) -> BTreeMap<String, serde_json::Value>;

    /// Fit on `train` against `target`, which must be encoded with
    /// [`target_encoding`](Self::target_encoding).
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidData`] if the target has the wrong encoding or
    /// length, or if `train` does not contain both classes.
    fn fit(&self, train: &DesignMatrix, target: &EncodedTarget, seed: u64) -> Result<Box<dyn FittedModel>>;
}

/// A fitted model.
pub trait FittedModel: Send + Sync {
    /// P(`Class` = 0) for every row of `features`, each in `[0, 1]`.
    fn prob_class0(&self, features: ArrayView2<'_, f64>) -> Vec<f64>;

    /// Importance per feature column, normalized to sum 1, for models that
    /// track it.
    fn feature_importance(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Strategy instance for `kind`, with its fixed configuration.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn ClassifierStrategy> {
    match kind {
        StrategyKind::Svm => Box::new(SvmStrategy::default()),
        StrategyKind::Knn => Box::new(KnnStrategy::default()),
        StrategyKind::GradientBoostedTrees => Box::new(GradientBoostingStrategy::default()),
        StrategyKind::RandomForest => Box::new(RandomForestStrategy::default()),
        StrategyKind::NaiveBayes => Box::new(NaiveBayesStrategy::default()),
    }
}

/// Encode the outcomes of `train` the way `strategy` expects and fit it.
pub fn fit_strategy(
    strategy: &dyn ClassifierStrategy,
    train: &DesignMatrix,
    seed: u64,
) -> Result<Box<dyn FittedModel>> {
    let target = train.encode_target(strategy.target_encoding());
    strategy.fit(train, &target, seed)
}

/// Score every row of `data`.
///
/// Records come back in row order, carrying the row id and observed class.
pub fn predict_proba(model: &dyn FittedModel, data: &DesignMatrix) -> Vec<PredictionRecord> {
    let probs = model.prob_class0(data.features());
    data.row_ids()
        .iter()
        .zip(data.outcomes())
        .zip(probs)
        .map(|((&row_id, &truth), p)| PredictionRecord {
            row_id,
            truth,
            prob_class0: p.clamp(0.0, 1.0),
        })
        .collect()
}

/// Check a target against the training rows; returns the class counts.
pub(crate) fn check_target(train: &DesignMatrix, target: &EncodedTarget) -> Result<(usize, usize)> {
    if target.len() != train.n_rows() {
        return Err(LearningError::InvalidData(format!(
            "target has {} values for {} training rows",
            target.len(),
            train.n_rows()
        )));
    }
    let counts = train.class_counts();
    if counts.0 == 0 || counts.1 == 0 {
        return Err(LearningError::InvalidData(format!(
            "training rows hold a single class ({} class 0, {} class 1)",
            counts.0, counts.1
        )));
    }
    Ok(counts)
}

/// `true` for rows of class 0, the event class the models score.
pub(crate) fn is_class0(label: &Subphenotype) -> bool {
    *label == Subphenotype::Hypoinflammatory
}

/// Normalize non-negative weights to sum 1; all-zero stays all-zero.
pub(crate) fn normalize(mut weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    }
    weights
}

pub(crate) fn hyperparameter_map<const N: usize>(
    entries: [(&str, serde_json::Value); N],
) -> BTreeMap<String, serde_json::Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_strategy_for_matches_kind() {
        for kind in StrategyKind::all() {
            let strategy = strategy_for(kind);
            assert_eq!(strategy.kind(), kind);
            assert!(!strategy.hyperparameters().is_empty());
        }
    }

    #[test]
    fn test_declared_encodings() {
        assert_eq!(
            strategy_for(StrategyKind::GradientBoostedTrees).target_encoding(),
            TargetEncoding::Numeric
        );
        for kind in [
            StrategyKind::Svm,
            StrategyKind::Knn,
            StrategyKind::RandomForest,
            StrategyKind::NaiveBayes,
        ] {
            assert_eq!(strategy_for(kind).target_encoding(), TargetEncoding::Factor);
        }
    }

    #[test]
    fn test_wrong_encoding_is_invalid_data() {
        let data = two_blobs(10, 4.0, 1);
        for kind in StrategyKind::all() {
            let strategy = strategy_for(kind);
            let wrong = match strategy.target_encoding() {
                TargetEncoding::Factor => TargetEncoding::Numeric,
                TargetEncoding::Numeric => TargetEncoding::Factor,
            };
            let target = data.encode_target(wrong);
            let err = strategy.fit(&data, &target, 1).err().unwrap();
            assert!(matches!(err, LearningError::InvalidData(_)), "{kind}");
        }
    }

    #[test]
    fn test_single_class_training_is_rejected() {
        let data = two_blobs(10, 4.0, 1);
        let class0: Vec<usize> = (0..data.n_rows()).step_by(2).collect();
        let only_class0 = data.subset(&class0);
        let err = fit_strategy(&SvmStrategy::default(), &only_class0, 1).err().unwrap();
        assert!(err.to_string().contains("single class"));
    }

    #[test]
    fn test_predict_proba_keeps_row_ids_and_truth() {
        let data = two_blobs(15, 4.0, 3);
        let model = fit_strategy(&KnnStrategy::default(), &data, 3).unwrap();
        let held_out = data.subset(&[7, 2, 11]);
        let records = predict_proba(model.as_ref(), &held_out);

        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().map(|r| r.row_id).collect::<Vec<_>>(),
            vec![7, 2, 11]
        );
        assert_eq!(records[1].truth, data.outcomes()[2]);
        assert!(records.iter().all(|r| (0.0..=1.0).contains(&r.prob_class0)));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(vec![1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
