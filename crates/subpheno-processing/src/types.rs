//! Core types shared by the loader, the imputer and downstream consumers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary inflammatory subphenotype, the prediction target.
///
/// Stored in cohort tables as the integer code of the `Class` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subphenotype {
    /// `Class = 0`
    Hypoinflammatory,
    /// `Class = 1`
    Hyperinflammatory,
}

impl Subphenotype {
    /// Integer code used in the `Class` column.
    #[inline]
    pub fn code(self) -> i32 {
        match self {
            Self::Hypoinflammatory => 0,
            Self::Hyperinflammatory => 1,
        }
    }

    /// Parse an integer class code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Hypoinflammatory),
            1 => Some(Self::Hyperinflammatory),
            _ => None,
        }
    }

    /// Both classes, in code order.
    pub fn all() -> [Self; 2] {
        [Self::Hypoinflammatory, Self::Hyperinflammatory]
    }
}

impl fmt::Display for Subphenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hypoinflammatory => write!(f, "hypoinflammatory"),
            Self::Hyperinflammatory => write!(f, "hyperinflammatory"),
        }
    }
}

/// Which cohort a table was loaded as.
///
/// The two cohorts follow different drop rules for missing outcomes, see
/// [`crate::dataset::load_cohort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortKind {
    Training,
    Validation,
}

impl CohortKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Validation => "validation",
        }
    }

    /// Whether rows with a missing outcome are dropped at load time.
    pub fn drops_missing_outcome(&self) -> bool {
        matches!(self, Self::Validation)
    }
}

impl fmt::Display for CohortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the iterative imputer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The cohort had no missing feature values.
    NothingToImpute,
    /// The normalized change dropped below the configured tolerance.
    Converged,
    /// The change grew for the first time; the previous sweep was kept.
    Diverged,
    /// The sweep cap was reached.
    IterationCap,
}

/// Per-column imputation bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnImputation {
    /// Column name
    pub column: String,
    /// Number of cells that were missing and have been estimated
    pub imputed_cells: usize,
    /// Whether the column was treated as binary (estimates rounded to 0/1)
    pub binary: bool,
}

/// Summary of one imputation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationSummary {
    /// Cohort the summary belongs to
    pub cohort: CohortKind,
    /// Number of rows in the imputed table
    pub rows: usize,
    /// Number of full sweeps over the incomplete columns
    pub iterations: usize,
    /// Reason the iteration stopped
    pub stop_reason: StopReason,
    /// Normalized change of the last accepted sweep (0.0 if none ran)
    pub final_change: f64,
    /// Seed the run was derived from
    pub seed: u64,
    /// Columns that had missing cells, in the order they were visited
    pub columns: Vec<ColumnImputation>,
}

impl ImputationSummary {
    /// Total number of estimated cells.
    pub fn imputed_cells(&self) -> usize {
        self.columns.iter().map(|c| c.imputed_cells).sum()
    }

    /// Whether the imputer stopped on its own rather than at the sweep cap.
    pub fn converged(&self) -> bool {
        self.stop_reason != StopReason::IterationCap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subphenotype_codes_round_trip() {
        for class in Subphenotype::all() {
            assert_eq!(Subphenotype::from_code(class.code() as i64), Some(class));
        }
        assert_eq!(Subphenotype::from_code(2), None);
        assert_eq!(Subphenotype::from_code(-1), None);
    }

    #[test]
    fn test_only_validation_drops_missing_outcome() {
        assert!(CohortKind::Validation.drops_missing_outcome());
        assert!(!CohortKind::Training.drops_missing_outcome());
    }

    #[test]
    fn test_summary_counts_cells() {
        let summary = ImputationSummary {
            cohort: CohortKind::Training,
            rows: 10,
            iterations: 2,
            stop_reason: StopReason::Diverged,
            final_change: 0.01,
            seed: 7,
            columns: vec![
                ColumnImputation {
                    column: "ALT_max".to_string(),
                    imputed_cells: 3,
                    binary: false,
                },
                ColumnImputation {
                    column: "Sex".to_string(),
                    imputed_cells: 1,
                    binary: true,
                },
            ],
        };
        assert_eq!(summary.imputed_cells(), 4);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"stop_reason\":\"diverged\""));
    }
}
