//! Naive Bayes with per-class Gaussian kernel density estimates.

use super::{ClassifierStrategy, FittedModel, check_target, hyperparameter_map, is_class0};
use crate::design::{DesignMatrix, EncodedTarget, TargetEncoding};
use crate::error::Result;
use crate::types::StrategyKind;
use ndarray::{ArrayView1, ArrayView2};
use serde_json::json;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Naive Bayes whose class-conditional feature densities are kernel density
/// estimates rather than fitted normals.
///
/// Bandwidths follow Silverman's rule of thumb. Densities are evaluated on
/// the log scale, so a value far from every training row still gets a finite
/// log-likelihood whatever the units of its feature.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NaiveBayesStrategy;

impl ClassifierStrategy for NaiveBayesStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NaiveBayes
    }

    fn target_encoding(&self) -> TargetEncoding {
        TargetEncoding::Factor
    }

    fn hyperparameters(&self) -> BTreeMap<String, serde_json::Value> {
        hyperparameter_map([
            ("kernel", json!("gaussian")),
            ("bandwidth", json!("silverman")),
            ("density", json!("log_sum_exp")),
            ("priors", json!("class_frequency")),
        ])
    }

    fn fit(&self, train: &DesignMatrix, target: &EncodedTarget, _seed: u64) -> Result<Box<dyn FittedModel>> {
        let labels = target.as_factor()?;
        let (n0, n1) = check_target(train, target)?;
        let n = (n0 + n1) as f64;

        let x = train.features();
        let class0: Vec<bool> = labels.iter().map(is_class0).collect();
        let densities = |want_class0: bool| -> Vec<KernelDensity> {
            x.columns()
                .into_iter()
                .map(|column| {
                    let values: Vec<f64> = column
                        .iter()
                        .zip(&class0)
                        .filter(|(_, c)| **c == want_class0)
                        .map(|(v, _)| *v)
                        .collect();
                    KernelDensity::fit(values)
                })
                .collect()
        };

        Ok(Box::new(NaiveBayesModel {
            log_prior: [(n0 as f64 / n).ln(), (n1 as f64 / n).ln()],
            densities: [densities(true), densities(false)],
        }))
    }
}

/// One-dimensional Gaussian KDE.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KernelDensity {
    values: Vec<f64>,
    bandwidth: f64,
}

impl KernelDensity {
    pub(crate) fn fit(values: Vec<f64>) -> Self {
        let bandwidth = silverman_bandwidth(&values);
        Self { values, bandwidth }
    }

    /// `ln f(x)`, summed with log-sum-exp so distant points do not underflow.
    pub(crate) fn log_density(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let log_norm = -((2.0 * PI).sqrt() * h * self.values.len() as f64).ln();
        let exponents: Vec<f64> = self
            .values
            .iter()
            .map(|v| {
                let z = (x - v) / h;
                -0.5 * z * z
            })
            .collect();
        let max = exponents.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return f64::NEG_INFINITY;
        }
        log_norm + max + exponents.iter().map(|e| (e - max).exp()).sum::<f64>().ln()
    }

    pub(crate) fn density(&self, x: f64) -> f64 {
        self.log_density(x).exp()
    }

    pub(crate) fn bandwidth(&self) -> f64 {
        self.bandwidth
    }
}

/// `0.9 · min(sd, IQR / 1.34) · n^(-1/5)`.
///
/// Falls back to the standard deviation, then `|x[0]|`, then 1 when the
/// spread measures are zero.
pub(crate) fn silverman_bandwidth(values: &[f64]) -> f64 {
    let n = values.len();
    let sd = if n > 1 {
        let mean = values.iter().sum::<f64>() / n as f64;
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);

    let mut spread = sd.min(iqr / 1.34);
    if spread <= 0.0 {
        spread = sd;
    }
    if spread <= 0.0 {
        spread = values.first().map_or(0.0, |v| v.abs());
    }
    if spread <= 0.0 {
        spread = 1.0;
    }
    0.9 * spread * (n.max(1) as f64).powf(-0.2)
}

/// Linear-interpolation quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

struct NaiveBayesModel {
    /// Indexed `[class 0, class 1]`
    log_prior: [f64; 2],
    densities: [Vec<KernelDensity>; 2],
}

impl NaiveBayesModel {
    fn log_joint(&self, class: usize, row: ArrayView1<'_, f64>) -> f64 {
        self.log_prior[class]
            + self.densities[class]
                .iter()
                .zip(row.iter())
                .map(|(kde, &v)| kde.log_density(v))
                .sum::<f64>()
    }
}

impl FittedModel for NaiveBayesModel {
    fn prob_class0(&self, features: ArrayView2<'_, f64>) -> Vec<f64> {
        features
            .rows()
            .into_iter()
            .map(|row| {
                let l0 = self.log_joint(0, row);
                let l1 = self.log_joint(1, row);
                let max = l0.max(l1);
                let lse = max + ((l0 - max).exp() + (l1 - max).exp()).ln();
                (l0 - lse).exp()
            })
            .collect()
    }
}
