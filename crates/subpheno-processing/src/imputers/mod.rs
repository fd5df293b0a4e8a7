//! Imputation module for handling missing values.
//!
//! Cohorts are imputed with [`IterativeForestImputer`], an iterative
//! random-forest scheme. Training and validation cohorts are imputed by
//! separate calls and never share state.

mod forest;
mod initial;

pub use forest::IterativeForestImputer;

use crate::dataset::Cohort;
use crate::types::ImputationSummary;

/// A cohort with every feature value present.
///
/// Same rows, columns and outcomes as the cohort it was imputed from.
#[derive(Debug, Clone)]
pub struct ImputedCohort {
    cohort: Cohort,
    summary: ImputationSummary,
}

impl ImputedCohort {
    pub(crate) fn new(cohort: Cohort, summary: ImputationSummary) -> Self {
        Self { cohort, summary }
    }

    pub fn cohort(&self) -> &Cohort {
        &self.cohort
    }

    pub fn summary(&self) -> &ImputationSummary {
        &self.summary
    }

    pub fn into_parts(self) -> (Cohort, ImputationSummary) {
        (self.cohort, self.summary)
    }
}
