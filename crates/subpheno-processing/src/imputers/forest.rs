//! Iterative random-forest imputation.
//!
//! Every incomplete feature column is regressed on all other feature columns
//! with a random forest, sweeping over the columns until the estimates stop
//! improving. The outcome column is never used as a predictor.

use super::ImputedCohort;
use super::initial::initial_value;
use crate::config::ImputerConfig;
use crate::dataset::Cohort;
use crate::error::{ProcessingError, Result};
use crate::trees::{ForestParams, RandomForestRegressor};
use crate::types::{ColumnImputation, ImputationSummary, StopReason};
use crate::utils::{column_to_f64, derive_seed, is_binary};
use ndarray::{Array2, Axis};
use polars::prelude::*;
use tracing::{debug, info};

/// State of one feature column during imputation.
struct ColumnState {
    name: String,
    binary: bool,
    missing_rows: Vec<usize>,
    observed_rows: Vec<usize>,
}

/// missForest-style imputer for cohort feature columns.
///
/// # Example
///
/// ```rust,ignore
/// let imputer = IterativeForestImputer::new(ImputerConfig::default());
/// let imputed = imputer.impute(&cohort, 42)?;
/// println!("{} cells imputed", imputed.summary().imputed_cells());
/// ```
#[derive(Debug, Clone, Default)]
pub struct IterativeForestImputer {
    config: ImputerConfig,
}

impl IterativeForestImputer {
    pub fn new(config: ImputerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    /// Impute every missing feature value of `cohort`.
    ///
    /// Observed cells and the outcome column are returned unchanged. The
    /// result depends only on the cohort, the configuration and `seed`.
    ///
    /// # Errors
    ///
    /// [`ProcessingError::ImputationFailed`] if a feature column has no
    /// observed value at all, [`ProcessingError::InvalidConfig`] for an
    /// invalid configuration.
    pub fn impute(&self, cohort: &Cohort, seed: u64) -> Result<ImputedCohort> {
        self.config
            .validate()
            .map_err(|e| ProcessingError::InvalidConfig(e.to_string()))?;

        let features = cohort.schema().feature_columns();
        let n_rows = cohort.height();
        let n_features = features.len();

        let mut raw: Vec<Vec<Option<f64>>> = Vec::with_capacity(n_features);
        for name in &features {
            raw.push(column_to_f64(cohort.df(), name)?);
        }

        let mut columns = Vec::with_capacity(n_features);
        let mut x = Array2::<f64>::zeros((n_rows, n_features));
        for (j, (name, values)) in features.iter().zip(&raw).enumerate() {
            let binary = is_binary(values);
            let fill = initial_value(values, binary).ok_or_else(|| ProcessingError::ImputationFailed {
                column: name.clone(),
                reason: "column has no observed values".to_string(),
            })?;

            let mut missing_rows = Vec::new();
            let mut observed_rows = Vec::with_capacity(n_rows);
            for (i, v) in values.iter().enumerate() {
                match v {
                    Some(v) => {
                        x[[i, j]] = *v;
                        observed_rows.push(i);
                    }
                    None => {
                        x[[i, j]] = fill;
                        missing_rows.push(i);
                    }
                }
            }
            columns.push(ColumnState {
                name: name.clone(),
                binary,
                missing_rows,
                observed_rows,
            });
        }

        // Fewest missing values first
        let mut order: Vec<usize> = (0..n_features)
            .filter(|&j| !columns[j].missing_rows.is_empty())
            .collect();
        order.sort_by_key(|&j| (columns[j].missing_rows.len(), j));

        let column_summaries: Vec<ColumnImputation> = order
            .iter()
            .map(|&j| ColumnImputation {
                column: columns[j].name.clone(),
                imputed_cells: columns[j].missing_rows.len(),
                binary: columns[j].binary,
            })
            .collect();

        if order.is_empty() {
            info!(cohort = %cohort.kind(), "No missing feature values, skipping imputation");
            return Ok(ImputedCohort::new(
                cohort.clone(),
                ImputationSummary {
                    cohort: cohort.kind(),
                    rows: n_rows,
                    iterations: 0,
                    stop_reason: StopReason::NothingToImpute,
                    final_change: 0.0,
                    seed,
                    columns: column_summaries,
                },
            ));
        }

        info!(
            cohort = %cohort.kind(),
            columns = order.len(),
            cells = column_summaries.iter().map(|c| c.imputed_cells).sum::<usize>(),
            "Starting iterative forest imputation"
        );

        let mtry = self.config.mtry(n_features);
        let mut rule = StopRule::new(self.config.tolerance);
        let mut iterations = 0;
        let mut stop_reason = StopReason::IterationCap;
        let mut final_change = 0.0;

        for sweep in 0..self.config.max_iterations {
            let before = x.clone();
            let sweep_seed = derive_seed(seed, sweep as u64);

            for &j in &order {
                let column = &columns[j];
                let others: Vec<usize> = (0..n_features).filter(|&k| k != j).collect();
                let predictors = x.select(Axis(1), &others);
                let target: Vec<f64> = x.column(j).to_vec();

                let params = ForestParams {
                    n_trees: self.config.n_trees,
                    max_features: Some(mtry),
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_depth: None,
                    bootstrap: true,
                    seed: derive_seed(sweep_seed, j as u64),
                };
                let forest = RandomForestRegressor::fit(
                    predictors.view(),
                    &target,
                    &column.observed_rows,
                    &params,
                )
                .map_err(|e| ProcessingError::ImputationFailed {
                    column: column.name.clone(),
                    reason: e.to_string(),
                })?;

                for &i in &column.missing_rows {
                    let estimate = forest.predict_row(predictors.row(i));
                    x[[i, j]] = if column.binary {
                        estimate.round().clamp(0.0, 1.0)
                    } else {
                        estimate
                    };
                }
                debug!(column = %column.name, sweep, cells = column.missing_rows.len(), "Imputed column");
            }

            iterations = sweep + 1;
            let change = normalized_change(&before, &x, &columns, &order);
            debug!(sweep, change, "Imputation sweep finished");

            match rule.observe(change) {
                SweepVerdict::Continue => final_change = change,
                SweepVerdict::Converged => {
                    final_change = change;
                    stop_reason = StopReason::Converged;
                    break;
                }
                SweepVerdict::Diverged { kept_change } => {
                    // Keep the estimates from before this sweep
                    x = before;
                    final_change = kept_change;
                    stop_reason = StopReason::Diverged;
                    break;
                }
            }
        }

        let mut df = cohort.df().clone();
        for &j in &order {
            let values: Vec<f64> = x.column(j).to_vec();
            df.replace(&columns[j].name, Series::new(columns[j].name.as_str().into(), values))?;
        }

        info!(
            cohort = %cohort.kind(),
            iterations,
            stop_reason = ?stop_reason,
            final_change,
            "Imputation finished"
        );

        Ok(ImputedCohort::new(
            cohort.with_frame(df),
            ImputationSummary {
                cohort: cohort.kind(),
                rows: n_rows,
                iterations,
                stop_reason,
                final_change,
                seed,
                columns: column_summaries,
            },
        ))
    }
}

/// Outcome of one sweep as judged by [`StopRule`].
#[derive(Debug, Clone, Copy, PartialEq)]
enum SweepVerdict {
    Continue,
    Converged,
    /// The change grew; the estimates from the previous sweep win.
    Diverged { kept_change: f64 },
}

/// Decides after each sweep whether iteration stops.
///
/// The first increase of the change over the previous sweep counts as
/// divergence and takes precedence over the tolerance check.
#[derive(Debug, Clone)]
struct StopRule {
    tolerance: f64,
    previous: Option<f64>,
}

impl StopRule {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            previous: None,
        }
    }

    fn observe(&mut self, change: f64) -> SweepVerdict {
        if let Some(prev) = self.previous
            && change > prev
        {
            return SweepVerdict::Diverged { kept_change: prev };
        }
        self.previous = Some(change);
        if change <= self.tolerance {
            SweepVerdict::Converged
        } else {
            SweepVerdict::Continue
        }
    }
}

/// `Σ(new − old)² / Σ new²` over the imputed cells.
fn normalized_change(
    before: &Array2<f64>,
    after: &Array2<f64>,
    columns: &[ColumnState],
    order: &[usize],
) -> f64 {
    let mut diff = 0.0;
    let mut norm = 0.0;
    for &j in order {
        for &i in &columns[j].missing_rows {
            let new = after[[i, j]];
            diff += (new - before[[i, j]]).powi(2);
            norm += new * new;
        }
    }
    if norm > 0.0 { diff / norm } else { 0.0 }
}
