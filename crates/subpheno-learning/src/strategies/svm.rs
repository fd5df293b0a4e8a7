//! Linear support vector machine with Platt-scaled probabilities.

use super::scaling::Standardizer;
use super::{ClassifierStrategy, FittedModel, check_target, hyperparameter_map, is_class0};
use crate::design::{DesignMatrix, EncodedTarget, TargetEncoding};
use crate::error::Result;
use crate::types::StrategyKind;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::json;
use std::collections::BTreeMap;

/// Linear SVM trained by stochastic subgradient descent on the hinge loss.
///
/// Features are standardized with training statistics. The decision value is
/// positive for class 0; a sigmoid fitted to the training decision values
/// (Platt scaling) turns it into P(class 0).
#[derive(Debug, Clone, PartialEq)]
pub struct SvmStrategy {
    /// Cost of margin violations
    pub c: f64,
    pub learning_rate: f64,
    pub max_epochs: usize,
    /// Stop when the parameter change over an epoch falls below this
    pub tolerance: f64,
}

impl Default for SvmStrategy {
    fn default() -> Self {
        Self {
            c: 1.0,
            learning_rate: 0.01,
            max_epochs: 1000,
            tolerance: 1e-4,
        }
    }
}

impl ClassifierStrategy for SvmStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Svm
    }

    fn target_encoding(&self) -> TargetEncoding {
        TargetEncoding::Factor
    }

    fn hyperparameters(&self) -> BTreeMap<String, serde_json::Value> {
        hyperparameter_map([
            ("kernel", json!("linear")),
            ("cost", json!(self.c)),
            ("learning_rate", json!(self.learning_rate)),
            ("max_epochs", json!(self.max_epochs)),
            ("tolerance", json!(self.tolerance)),
            ("scaled", json!(true)),
            ("probability", json!("platt")),
        ])
    }

    fn fit(&self, train: &DesignMatrix, target: &EncodedTarget, seed: u64) -> Result<Box<dyn FittedModel>> {
        let labels = target.as_factor()?;
        check_target(train, target)?;

        let scaler = Standardizer::fit(train.features());
        let x = scaler.transform(train.features());
        let y: Vec<f64> = labels
            .iter()
            .map(|c| if is_class0(c) { 1.0 } else { -1.0 })
            .collect();

        let n_samples = x.nrows();
        let lambda = 1.0 / (2.0 * n_samples as f64 * self.c);
        let mut w = Array1::<f64>::zeros(x.ncols());
        let mut b = 0.0;
        let mut order: Vec<usize> = (0..n_samples).collect();
        let mut rng = StdRng::seed_from_u64(seed);

        for epoch in 0..self.max_epochs {
            let eta = self.learning_rate / (1.0 + epoch as f64 * 0.01);
            let prev_w = w.clone();
            let prev_b = b;
            order.shuffle(&mut rng);

            for &i in &order {
                let row = x.row(i);
                let margin = y[i] * (w.dot(&row) + b);
                w *= 1.0 - 2.0 * eta * lambda;
                if margin < 1.0 {
                    w.scaled_add(eta * y[i], &row);
                    b += eta * y[i];
                }
            }

            let change = ((&w - &prev_w).mapv(|d| d * d).sum() + (b - prev_b).powi(2)).sqrt();
            if change < self.tolerance {
                break;
            }
        }

        let decisions: Vec<f64> = x.rows().into_iter().map(|row| w.dot(&row) + b).collect();
        let positives: Vec<bool> = y.iter().map(|&v| v > 0.0).collect();
        let platt = PlattScaling::fit(&decisions, &positives);

        Ok(Box::new(SvmModel {
            scaler,
            weights: w,
            bias: b,
            platt,
        }))
    }
}

struct SvmModel {
    scaler: Standardizer,
    weights: Array1<f64>,
    bias: f64,
    platt: PlattScaling,
}

impl SvmModel {
    fn decision(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.weights.dot(&row) + self.bias
    }
}

impl FittedModel for SvmModel {
    fn prob_class0(&self, features: ArrayView2<'_, f64>) -> Vec<f64> {
        let x = self.scaler.transform(features);
        x.rows()
            .into_iter()
            .map(|row| self.platt.probability(self.decision(row)))
            .collect()
    }
}

/// Sigmoid `1 / (1 + exp(a·f + b))` fitted by Newton's method with
/// backtracking on regularized targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlattScaling {
    a: f64,
    b: f64,
}

impl PlattScaling {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    pub(crate) fn fit(decisions: &[f64], positive: &[bool]) -> Self {
        let n_pos = positive.iter().filter(|p| **p).count() as f64;
        let n_neg = positive.len() as f64 - n_pos;
        let hi = (n_pos + 1.0) / (n_pos + 2.0);
        let lo = 1.0 / (n_neg + 2.0);
        let t: Vec<f64> = positive.iter().map(|&p| if p { hi } else { lo }).collect();

        let objective = |a: f64, b: f64| -> f64 {
            decisions
                .iter()
                .zip(&t)
                .map(|(&f, &ti)| {
                    let z = f * a + b;
                    if z >= 0.0 {
                        ti * z + (-z).exp().ln_1p()
                    } else {
                        (ti - 1.0) * z + z.exp().ln_1p()
                    }
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((n_neg + 1.0) / (n_pos + 1.0)).ln();
        let mut fval = objective(a, b);

        for _ in 0..Self::MAX_ITER {
            let (mut h11, mut h22, mut h21) = (Self::SIGMA, Self::SIGMA, 0.0);
            let (mut g1, mut g2) = (0.0, 0.0);
            for (&f, &ti) in decisions.iter().zip(&t) {
                let z = f * a + b;
                let (p, q) = if z >= 0.0 {
                    let e = (-z).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = z.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = ti - p;
                g1 += f * d1;
                g2 += d1;
            }
            if g1.abs() < Self::EPS && g2.abs() < Self::EPS {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= Self::MIN_STEP {
                let (na, nb) = (a + step * da, b + step * db);
                let nf = objective(na, nb);
                if nf < fval + 1e-4 * step * gd {
                    a = na;
                    b = nb;
                    fval = nf;
                    break;
                }
                step /= 2.0;
            }
            if step < Self::MIN_STEP {
                break;
            }
        }

        Self { a, b }
    }

    pub(crate) fn probability(&self, decision: f64) -> f64 {
        let z = decision * self.a + self.b;
        if z >= 0.0 {
            let e = (-z).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + z.exp())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{pair_accuracy, two_blobs};
    use super::super::{fit_strategy, predict_proba};
    use super::*;

    #[test]
    fn test_separates_blobs() {
        let train = two_blobs(30, 4.0, 7);
        let test = two_blobs(20, 4.0, 8);
        let model = fit_strategy(&SvmStrategy::default(), &train, 7).unwrap();
        let records = predict_proba(model.as_ref(), &test);

        assert!(pair_accuracy(&records) > 0.95);
        // class-0 rows get P(class 0) above one half on average
        let mean_class0: f64 = records
            .iter()
            .filter(|r| is_class0(&r.truth))
            .map(|r| r.prob_class0)
            .sum::<f64>()
            / 20.0;
        assert!(mean_class0 > 0.5);
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let train = two_blobs(20, 2.0, 3);
        let a = fit_strategy(&SvmStrategy::default(), &train, 5).unwrap();
        let b = fit_strategy(&SvmStrategy::default(), &train, 5).unwrap();
        assert_eq!(
            a.prob_class0(train.features()),
            b.prob_class0(train.features())
        );
        assert!(a.feature_importance().is_none());
    }

    #[test]
    fn test_platt_scaling_is_monotone_increasing_for_positive_scores() {
        let decisions = [-2.0, -1.5, -1.0, -0.2, 0.3, 1.0, 1.4, 2.2];
        let positive = [false, false, false, true, false, true, true, true];
        let platt = PlattScaling::fit(&decisions, &positive);

        assert!(platt.probability(2.0) > platt.probability(0.0));
        assert!(platt.probability(0.0) > platt.probability(-2.0));
        for d in decisions {
            let p = platt.probability(d);
            assert!(p > 0.0 && p < 1.0);
        }
    }
}
