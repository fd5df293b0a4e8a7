//! Common types used throughout the subpheno-learning crate.
//!
//! # Overview
//!
//! - [`StrategyKind`]: the five classifier families being compared
//! - [`PredictionRecord`]: one scored row
//! - [`ModelComparison`]: cross-validation and validation results of one strategy
//! - [`ComparisonResult`]: everything a pipeline run produced

use crate::evaluation::{ConfusionSummary, RocCurve};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use subpheno_processing::{ImputationSummary, Subphenotype};

/// The classifier families compared by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Linear support vector machine with Platt-scaled probabilities
    Svm,
    /// k-nearest neighbors on standardized features
    Knn,
    /// Gradient-boosted regression trees on the logistic loss
    #[serde(rename = "gbt")]
    GradientBoostedTrees,
    /// Probability random forest
    RandomForest,
    /// Kernel-density naive Bayes
    NaiveBayes,
}

impl StrategyKind {
    /// All strategies, in evaluation and plotting order.
    pub fn all() -> [StrategyKind; 5] {
        [
            StrategyKind::Svm,
            StrategyKind::Knn,
            StrategyKind::GradientBoostedTrees,
            StrategyKind::RandomForest,
            StrategyKind::NaiveBayes,
        ]
    }

    /// Stable identifier used on the command line and in file names.
    #[must_use]
    pub fn slug(&self) -> &'static str {
        match self {
            StrategyKind::Svm => "svm",
            StrategyKind::Knn => "knn",
            StrategyKind::GradientBoostedTrees => "gbt",
            StrategyKind::RandomForest => "random_forest",
            StrategyKind::NaiveBayes => "naive_bayes",
        }
    }

    /// Name shown in plot legends and the printed summary.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            StrategyKind::Svm => "SVM",
            StrategyKind::Knn => "KNN",
            StrategyKind::GradientBoostedTrees => "XGBoost-style GBT",
            StrategyKind::RandomForest => "Random Forest",
            StrategyKind::NaiveBayes => "Naive Bayes",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error type for parsing a [`StrategyKind`] from a slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrategyKindError {
    invalid_value: String,
}

impl ParseStrategyKindError {
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl fmt::Display for ParseStrategyKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown model '{}'. Valid values are: svm, knn, gbt, random_forest, naive_bayes",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseStrategyKindError {}

impl FromStr for StrategyKind {
    type Err = ParseStrategyKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        StrategyKind::all()
            .into_iter()
            .find(|k| k.slug() == wanted)
            .ok_or(ParseStrategyKindError {
                invalid_value: s.to_string(),
            })
    }
}

/// A scored row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Position of the row in the cohort it was scored from
    pub row_id: usize,
    /// Observed outcome
    pub truth: Subphenotype,
    /// Predicted probability of `Class = 0` (hypoinflammatory)
    pub prob_class0: f64,
}

/// Cross-validation metrics of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationMetrics {
    /// AUC of each fold; `None` where a fold held a single class
    pub fold_auc: Vec<Option<f64>>,
    /// Mean of the defined fold AUCs
    pub mean_fold_auc: Option<f64>,
    /// Sample standard deviation of the defined fold AUCs
    pub std_fold_auc: Option<f64>,
    /// AUC of the pooled out-of-fold predictions
    pub pooled_auc: f64,
    pub roc: RocCurve,
    pub confusion: ConfusionSummary,
}

/// Held-out validation metrics of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub auc: f64,
    pub roc: RocCurve,
    pub confusion: ConfusionSummary,
}

/// Comparison data for a single strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub kind: StrategyKind,
    /// Display name (e.g. "Random Forest")
    pub name: String,
    pub cross_validation: CrossValidationMetrics,
    pub validation: ValidationMetrics,
    /// Fixed hyperparameters of the strategy
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
    /// (feature, importance) sorted by importance, for models that track it
    pub feature_importance: Option<Vec<(String, f64)>>,
    /// Wall-clock seconds spent on this strategy
    pub elapsed_seconds: f64,
}

/// Size and imputation bookkeeping of one cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub path: PathBuf,
    pub rows: usize,
    /// Rows removed at load time for a missing outcome
    pub dropped_rows: usize,
    /// Rows per class: (class 0, class 1)
    pub class_counts: (usize, usize),
    pub imputation: ImputationSummary,
}

/// Result of a comparison pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub training: CohortSummary,
    pub validation: CohortSummary,
    /// One entry per strategy, in the configured order
    pub models: Vec<ModelComparison>,
    /// Files written by the run (plots and report)
    pub outputs: Vec<PathBuf>,
    pub elapsed_seconds: f64,
}

impl ComparisonResult {
    /// Strategy with the highest validation AUC.
    pub fn best_validation_model(&self) -> Option<&ModelComparison> {
        self.models
            .iter()
            .max_by(|a, b| a.validation.auc.total_cmp(&b.validation.auc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_order_and_slugs() {
        let slugs: Vec<&str> = StrategyKind::all().iter().map(|k| k.slug()).collect();
        assert_eq!(slugs, vec!["svm", "knn", "gbt", "random_forest", "naive_bayes"]);
    }

    #[test]
    fn test_strategy_from_str() {
        for kind in StrategyKind::all() {
            assert_eq!(kind.slug().parse::<StrategyKind>(), Ok(kind));
        }
        assert_eq!(" KNN ".parse::<StrategyKind>(), Ok(StrategyKind::Knn));

        let err = "xgboost".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err.invalid_value(), "xgboost");
        assert!(err.to_string().contains("random_forest"));
    }

    #[test]
    fn test_strategy_serializes_as_slug() {
        for kind in StrategyKind::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.slug()));
        }
    }

    #[test]
    fn test_display_uses_display_name() {
        assert_eq!(StrategyKind::GradientBoostedTrees.to_string(), "XGBoost-style GBT");
        assert_eq!(StrategyKind::Svm.to_string(), "SVM");
    }
}
