//! Discrimination metrics and held-out evaluation.
//!
//! The event class throughout is `Class = 0`: a [`PredictionRecord`] carries
//! P(class 0), so sensitivity is the hit rate on hypoinflammatory rows.

use crate::design::DesignMatrix;
use crate::error::{LearningError, Result};
use crate::strategies::{ClassifierStrategy, fit_strategy, predict_proba};
use crate::types::PredictionRecord;
use serde::{Deserialize, Serialize};
use subpheno_processing::Subphenotype;
use tracing::debug;

/// One operating point: (1 − specificity, sensitivity).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    /// Lowest score classified as class 0 at this point; `None` at the origin
    pub threshold: Option<f64>,
}

/// Empirical ROC curve from (0, 0) to (1, 1), both coordinates non-decreasing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Trapezoidal area under the curve.
    pub fn area(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[0].tpr + w[1].tpr) / 2.0)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn class_totals(predictions: &[PredictionRecord]) -> (usize, usize) {
    let positives = predictions
        .iter()
        .filter(|p| p.truth == Subphenotype::Hypoinflammatory)
        .count();
    (positives, predictions.len() - positives)
}

/// ROC curve of P(class 0) scores.
///
/// Records are sorted by score, descending; tied scores form one group and
/// add one point.
///
/// # Errors
///
/// [`LearningError::UndefinedMetric`] if the records lack either class.
pub fn compute_roc(predictions: &[PredictionRecord]) -> Result<RocCurve> {
    let (positives, negatives) = class_totals(predictions);
    if positives == 0 || negatives == 0 {
        return Err(LearningError::UndefinedMetric(format!(
            "ROC needs both classes, got {positives} class-0 and {negatives} class-1 records"
        )));
    }

    let mut sorted: Vec<&PredictionRecord> = predictions.iter().collect();
    sorted.sort_by(|a, b| b.prob_class0.total_cmp(&a.prob_class0));

    let mut points = Vec::with_capacity(sorted.len() + 1);
    points.push(RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: None,
    });

    let (mut tp, mut fp) = (0usize, 0usize);
    for (i, record) in sorted.iter().enumerate() {
        if record.truth == Subphenotype::Hypoinflammatory {
            tp += 1;
        } else {
            fp += 1;
        }
        let group_ends = sorted
            .get(i + 1)
            .is_none_or(|next| next.prob_class0 != record.prob_class0);
        if group_ends {
            points.push(RocPoint {
                fpr: fp as f64 / negatives as f64,
                tpr: tp as f64 / positives as f64,
                threshold: Some(record.prob_class0),
            });
        }
    }

    Ok(RocCurve { points })
}

/// Area under the ROC curve, in `[0, 1]`.
///
/// Perfect separation gives 1.0 and all-tied scores give 0.5.
///
/// # Errors
///
/// [`LearningError::UndefinedMetric`] if the records lack either class.
pub fn compute_auc(predictions: &[PredictionRecord]) -> Result<f64> {
    Ok(compute_roc(predictions)?.area().clamp(0.0, 1.0))
}

/// Confusion counts with class 0 as the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfusionSummary {
    pub threshold: f64,
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
    pub accuracy: Option<f64>,
    pub sensitivity: Option<f64>,
    pub specificity: Option<f64>,
}

impl ConfusionSummary {
    /// Classify a record as class 0 when `prob_class0 >= threshold`.
    pub fn at_threshold(predictions: &[PredictionRecord], threshold: f64) -> Self {
        let (mut tp, mut fp, mut tn, mut fn_) = (0, 0, 0, 0);
        for p in predictions {
            let predicted0 = p.prob_class0 >= threshold;
            match (p.truth == Subphenotype::Hypoinflammatory, predicted0) {
                (true, true) => tp += 1,
                (true, false) => fn_ += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
            }
        }
        let ratio = |num: usize, den: usize| (den > 0).then(|| num as f64 / den as f64);
        Self {
            threshold,
            true_positive: tp,
            false_positive: fp,
            true_negative: tn,
            false_negative: fn_,
            accuracy: ratio(tp + tn, predictions.len()),
            sensitivity: ratio(tp, tp + fn_),
            specificity: ratio(tn, tn + fp),
        }
    }
}

/// Pair feature names with importances, most important first.
pub fn named_importance(names: &[String], importance: &[f64]) -> Vec<(String, f64)> {
    let mut named: Vec<(String, f64)> = names.iter().cloned().zip(importance.iter().copied()).collect();
    named.sort_by(|a, b| b.1.total_cmp(&a.1));
    named
}

/// Outcome of fitting on the training cohort and scoring the validation cohort.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutResult {
    pub predictions: Vec<PredictionRecord>,
    pub auc: f64,
    pub roc: RocCurve,
    pub confusion: ConfusionSummary,
    pub feature_importance: Option<Vec<(String, f64)>>,
}

/// Fits a strategy once on the full training cohort and scores the
/// validation cohort with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldoutEvaluator;

impl HoldoutEvaluator {
    pub fn evaluate(
        strategy: &dyn ClassifierStrategy,
        train: &DesignMatrix,
        validation: &DesignMatrix,
        seed: u64,
    ) -> Result<HoldoutResult> {
        let model = fit_strategy(strategy, train, seed)?;
        let predictions = predict_proba(model.as_ref(), validation);
        let roc = compute_roc(&predictions)?;
        let auc = roc.area().clamp(0.0, 1.0);
        debug!(
            model = strategy.kind().slug(),
            rows = predictions.len(),
            auc,
            "Scored validation cohort"
        );

        Ok(HoldoutResult {
            confusion: ConfusionSummary::at_threshold(&predictions, 0.5),
            feature_importance: model
                .feature_importance()
                .map(|w| named_importance(train.feature_names(), &w)),
            predictions,
            auc,
            roc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use subpheno_processing::Subphenotype::{Hyperinflammatory as Hyper, Hypoinflammatory as Hypo};

    fn records(scored: &[(Subphenotype, f64)]) -> Vec<PredictionRecord> {
        scored
            .iter()
            .enumerate()
            .map(|(row_id, &(truth, prob_class0))| PredictionRecord {
                row_id,
                truth,
                prob_class0,
            })
            .collect()
    }

    #[test]
    fn test_perfect_separation_auc_one() {
        let preds = records(&[(Hypo, 0.9), (Hypo, 0.8), (Hyper, 0.3), (Hyper, 0.1)]);
        assert_eq!(compute_auc(&preds).unwrap(), 1.0);
    }

    #[test]
    fn test_inverted_scores_auc_zero() {
        let preds = records(&[(Hypo, 0.1), (Hyper, 0.9)]);
        assert_eq!(compute_auc(&preds).unwrap(), 0.0);
    }

    #[test]
    fn test_all_tied_auc_half() {
        let preds = records(&[(Hypo, 0.5), (Hyper, 0.5), (Hypo, 0.5), (Hyper, 0.5), (Hyper, 0.5)]);
        assert_eq!(compute_auc(&preds).unwrap(), 0.5);
        let roc = compute_roc(&preds).unwrap();
        assert_eq!(roc.len(), 2);
    }

    #[test]
    fn test_auc_matches_pair_count() {
        // 3 class-0 x 2 class-1 rows = 6 pairs, one of them tied
        let preds = records(&[(Hypo, 0.9), (Hyper, 0.7), (Hypo, 0.6), (Hypo, 0.4), (Hyper, 0.4)]);
        let auc = compute_auc(&preds).unwrap();
        // (0.9 > both) 2 + (0.6 > 0.4) 1 + tie 0.5 = 3.5 of 6
        assert!((auc - 3.5 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_roc_endpoints_and_order() {
        let preds = records(&[(Hypo, 0.9), (Hyper, 0.7), (Hypo, 0.6), (Hyper, 0.2)]);
        let roc = compute_roc(&preds).unwrap();
        let first = roc.points.first().unwrap();
        let last = roc.points.last().unwrap();
        assert_eq!((first.fpr, first.tpr, first.threshold), (0.0, 0.0, None));
        assert_eq!((last.fpr, last.tpr), (1.0, 1.0));
        for w in roc.points.windows(2) {
            assert!(w[1].fpr >= w[0].fpr && w[1].tpr >= w[0].tpr);
        }
    }

    #[test]
    fn test_single_class_is_undefined() {
        let preds = records(&[(Hypo, 0.9), (Hypo, 0.1)]);
        assert!(matches!(
            compute_auc(&preds),
            Err(LearningError::UndefinedMetric(_))
        ));
        assert!(compute_roc(&[]).is_err());
    }

    #[test]
    fn test_confusion_at_half() {
        let preds = records(&[(Hypo, 0.9), (Hypo, 0.4), (Hyper, 0.5), (Hyper, 0.1)]);
        let c = ConfusionSummary::at_threshold(&preds, 0.5);
        assert_eq!(
            (c.true_positive, c.false_negative, c.false_positive, c.true_negative),
            (1, 1, 1, 1)
        );
        assert_eq!(c.accuracy, Some(0.5));
        assert_eq!(c.sensitivity, Some(0.5));
        assert_eq!(c.specificity, Some(0.5));

        let empty = ConfusionSummary::at_threshold(&[], 0.5);
        assert_eq!(empty.accuracy, None);
    }

    #[test]
    fn test_holdout_scores_every_validation_row() {
        use crate::strategies::RandomForestStrategy;
        use crate::strategies::test_support::two_blobs;

        let train = two_blobs(25, 4.0, 5);
        let validation = two_blobs(10, 4.0, 6);
        let strategy = RandomForestStrategy {
            n_trees: 30,
            ..Default::default()
        };
        let result = HoldoutEvaluator::evaluate(&strategy, &train, &validation, 42).unwrap();

        assert_eq!(result.predictions.len(), validation.n_rows());
        assert!(result.auc > 0.9);
        assert_eq!(result.auc, compute_auc(&result.predictions).unwrap());
        let importance = result.feature_importance.unwrap();
        assert_eq!(importance[0].0, "signal");
    }

    #[test]
    fn test_named_importance_sorted() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let named = named_importance(&names, &[0.2, 0.5, 0.3]);
        assert_eq!(
            named,
            vec![
                ("b".to_string(), 0.5),
                ("c".to_string(), 0.3),
                ("a".to_string(), 0.2)
            ]
        );
    }
}
