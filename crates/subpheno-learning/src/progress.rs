//! Progress reporting types for the comparison pipeline.
//!
//! This module defines [`PipelineStage`], [`ProgressUpdate`] and the
//! [`ProgressCallback`] type alias.
//!
//! # Example
//!
//! ```rust,ignore
//! use subpheno_learning::{Pipeline, PipelineConfig, ProgressUpdate};
//!
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update: ProgressUpdate| {
//!         println!(
//!             "[{}] {:.0}% - {}",
//!             update.stage.as_str(),
//!             update.progress * 100.0,
//!             update.message
//!         );
//!     })
//!     .build()?;
//! ```

use std::str::FromStr;
use std::sync::Arc;

/// The current stage of the comparison pipeline.
///
/// Stages run in declaration order. Terminal states are
/// [`Complete`](Self::Complete) and [`Failed`](Self::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PipelineStage {
    /// Validating configuration.
    #[default]
    Initializing,

    /// Reading and typing the training and validation cohorts.
    Loading,

    /// Imputing missing feature values in each cohort.
    Imputing,

    /// Cross-validating each strategy on the training cohort.
    CrossValidation,

    /// Fitting each strategy on the full training cohort and scoring the
    /// validation cohort.
    Validation,

    /// Rendering plots and writing the run report.
    Reporting,

    /// The run finished successfully.
    Complete,

    /// The run stopped on an error.
    Failed,
}

impl PipelineStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Initializing => "initializing",
            PipelineStage::Loading => "loading",
            PipelineStage::Imputing => "imputing",
            PipelineStage::CrossValidation => "cross_validation",
            PipelineStage::Validation => "validation",
            PipelineStage::Reporting => "reporting",
            PipelineStage::Complete => "complete",
            PipelineStage::Failed => "failed",
        }
    }

    /// Returns `true` if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Complete | PipelineStage::Failed)
    }
}

/// Error type for parsing a [`PipelineStage`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePipelineStageError {
    invalid_value: String,
}

impl ParsePipelineStageError {
    /// Returns the invalid value that caused the parse error.
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl std::fmt::Display for ParsePipelineStageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid pipeline stage: '{}'. Valid values are: initializing, loading, imputing, \
             cross_validation, validation, reporting, complete, failed",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParsePipelineStageError {}

impl FromStr for PipelineStage {
    type Err = ParsePipelineStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(PipelineStage::Initializing),
            "loading" => Ok(PipelineStage::Loading),
            "imputing" => Ok(PipelineStage::Imputing),
            "cross_validation" => Ok(PipelineStage::CrossValidation),
            "validation" => Ok(PipelineStage::Validation),
            "reporting" => Ok(PipelineStage::Reporting),
            "complete" => Ok(PipelineStage::Complete),
            "failed" => Ok(PipelineStage::Failed),
            _ => Err(ParsePipelineStageError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// A progress update from the comparison pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    /// The current stage.
    pub stage: PipelineStage,

    /// Overall progress from 0.0 to 1.0, non-decreasing within a run.
    pub progress: f64,

    /// Human-readable status message.
    pub message: String,

    /// Display name of the strategy being evaluated, if any.
    pub current_model: Option<String>,

    /// Number of strategy evaluations completed and total: `(completed, total)`.
    ///
    /// Each strategy is evaluated twice (cross-validation, then validation).
    pub models_completed: Option<(u32, u32)>,
}

/// Type alias for a progress callback function.
///
/// Callbacks must be thread-safe (`Send + Sync`).
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
