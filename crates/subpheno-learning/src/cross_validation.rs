//! Out-of-fold cross-validation of a classifier strategy.

use crate::design::DesignMatrix;
use crate::error::{LearningError, Result};
use crate::evaluation::{ConfusionSummary, RocCurve, compute_auc, compute_roc};
use crate::folds::FoldAssignment;
use crate::strategies::{ClassifierStrategy, fit_strategy, predict_proba};
use crate::types::{CrossValidationMetrics, PredictionRecord};
use rayon::prelude::*;
use subpheno_processing::utils::derive_seed;
use tracing::{debug, warn};

/// Pooled out-of-fold predictions and per-fold AUCs of one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationResult {
    /// One record per training row, sorted by row id
    pub predictions: Vec<PredictionRecord>,
    /// AUC of each fold, `None` where the fold held a single class
    pub fold_auc: Vec<Option<f64>>,
    pub mean_fold_auc: Option<f64>,
    pub std_fold_auc: Option<f64>,
    pub pooled_auc: f64,
    pub roc: RocCurve,
    pub confusion: ConfusionSummary,
}

impl CrossValidationResult {
    /// Metrics for the run report, without the raw predictions.
    pub fn metrics(&self) -> CrossValidationMetrics {
        CrossValidationMetrics {
            fold_auc: self.fold_auc.clone(),
            mean_fold_auc: self.mean_fold_auc,
            std_fold_auc: self.std_fold_auc,
            pooled_auc: self.pooled_auc,
            roc: self.roc.clone(),
            confusion: self.confusion,
        }
    }
}

/// Runs k-fold cross-validation over a fixed fold assignment.
///
/// The same runner (and so the same folds) is shared by every strategy of a
/// comparison.
#[derive(Debug, Clone, Copy)]
pub struct CrossValidationRunner<'a> {
    folds: &'a FoldAssignment,
}

impl<'a> CrossValidationRunner<'a> {
    pub fn new(folds: &'a FoldAssignment) -> Self {
        Self { folds }
    }

    pub fn folds(&self) -> &FoldAssignment {
        self.folds
    }

    /// Fit `strategy` on every fold's complement and score the fold.
    ///
    /// Folds are fitted in parallel; fold `i` uses `derive_seed(seed, i)`, and
    /// results are reassembled in fold order.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidData`] if the fold assignment does not match
    ///   `data`, or a strategy rejects a fold
    /// - [`LearningError::UndefinedMetric`] if `data` holds a single class
    pub fn run(
        &self,
        strategy: &dyn ClassifierStrategy,
        data: &DesignMatrix,
        seed: u64,
    ) -> Result<CrossValidationResult> {
        if self.folds.len() != data.n_rows() {
            return Err(LearningError::InvalidData(format!(
                "fold assignment covers {} rows but the training cohort has {}",
                self.folds.len(),
                data.n_rows()
            )));
        }

        let per_fold: Vec<Vec<PredictionRecord>> = (0..self.folds.k())
            .into_par_iter()
            .map(|fold| -> Result<Vec<PredictionRecord>> {
                let train = data.subset(&self.folds.train_positions(fold));
                let test = data.subset(&self.folds.test_positions(fold));
                let model = fit_strategy(strategy, &train, derive_seed(seed, fold as u64))?;
                Ok(predict_proba(model.as_ref(), &test))
            })
            .collect::<Result<_>>()?;

        let fold_auc: Vec<Option<f64>> = per_fold
            .iter()
            .enumerate()
            .map(|(fold, preds)| match compute_auc(preds) {
                Ok(auc) => {
                    debug!(model = strategy.kind().slug(), fold, auc, "Fold scored");
                    Some(auc)
                }
                Err(e) => {
                    warn!(model = strategy.kind().slug(), fold, "Fold AUC undefined: {}", e);
                    None
                }
            })
            .collect();
        let (mean_fold_auc, std_fold_auc) = mean_and_std(&fold_auc);

        let mut predictions: Vec<PredictionRecord> = per_fold.into_iter().flatten().collect();
        predictions.sort_by_key(|p| p.row_id);

        let roc = compute_roc(&predictions)?;
        let pooled_auc = roc.area().clamp(0.0, 1.0);

        Ok(CrossValidationResult {
            confusion: ConfusionSummary::at_threshold(&predictions, 0.5),
            predictions,
            fold_auc,
            mean_fold_auc,
            std_fold_auc,
            pooled_auc,
            roc,
        })
    }
}

/// Mean and sample standard deviation of the defined values.
fn mean_and_std(values: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    let defined: Vec<f64> = values.iter().flatten().copied().collect();
    if defined.is_empty() {
        return (None, None);
    }
    let n = defined.len() as f64;
    let mean = defined.iter().sum::<f64>() / n;
    let std = (defined.len() > 1).then(|| {
        (defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    });
    (Some(mean), std)
}
