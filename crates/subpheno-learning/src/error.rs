//! Error types for the subpheno-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! # Error Handling
//!
//! Errors are designed to be:
//! - **Descriptive**: Each variant includes context about what went wrong
//! - **Fatal**: A run stops at the first error; there are no partial results
//! - **Layered**: Loading and imputation failures keep their
//!   [`ProcessingError`] so file and column names are not lost
//!
//! # Example
//!
//! ```rust,ignore
//! use subpheno_learning::{LearningError, PipelineConfig};
//!
//! fn configure() -> Result<PipelineConfig, LearningError> {
//!     let config = PipelineConfig::builder()
//!         .train_path("train.csv")
//!         .validation_path("validation.csv")
//!         .folds(10)
//!         .build()?;
//!     Ok(config)
//! }
//! ```

use serde::Serialize;
use serde::ser::SerializeStruct;
use subpheno_processing::ProcessingError;
use thiserror::Error;

/// The main error type for subpheno-learning operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the pipeline.
    ///
    /// Check the error message for which value is invalid and what values
    /// are accepted (e.g. fold count, model slugs).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data handed to a strategy or evaluator.
    ///
    /// Common causes:
    /// - The design matrix contains non-finite values
    /// - A target was encoded for a different strategy
    /// - Too few rows of one class to fit a model
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A metric is undefined for the given predictions.
    ///
    /// AUC and the ROC curve need at least one record of each class.
    #[error("Undefined metric: {0}")]
    UndefinedMetric(String),

    /// Loading, cleaning or imputation failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// I/O error while writing plots or the report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run report could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LearningError {
    /// Get a stable error code for report consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::UndefinedMetric(_) => "UNDEFINED_METRIC",
            Self::Processing(e) => e.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

impl From<polars::error::PolarsError> for LearningError {
    fn from(err: polars::error::PolarsError) -> Self {
        LearningError::Processing(ProcessingError::Polars(err))
    }
}

impl From<subpheno_processing::ConfigValidationError> for LearningError {
    fn from(err: subpheno_processing::ConfigValidationError) -> Self {
        LearningError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;
    use subpheno_processing::SchemaErrorKind;

    #[test]
    fn test_processing_error_keeps_code() {
        let err: LearningError = ProcessingError::schema("train.csv", SchemaErrorKind::Empty).into();
        assert_eq!(err.error_code(), "SCHEMA_ERROR");
        assert!(err.to_string().contains("train.csv"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LearningError::InvalidConfig("k".into()).error_code(), "INVALID_CONFIG");
        assert_eq!(
            LearningError::UndefinedMetric("one class".into()).error_code(),
            "UNDEFINED_METRIC"
        );
    }

    #[test]
    fn test_error_serialization() {
        let err = LearningError::InvalidData("wrong target encoding".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("INVALID_DATA"));
        assert!(json.contains("wrong target encoding"));
    }
}
