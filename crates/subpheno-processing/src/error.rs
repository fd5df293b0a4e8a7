//! Custom error types for cohort loading and imputation.
//!
//! This module provides the error hierarchy used by every fallible operation
//! in the crate, built with `thiserror`.
//!
//! Every failure is fatal for a pipeline run: an unreadable file, a cohort
//! that does not match the expected schema, or a feature column that cannot
//! be imputed. Errors always name the offending file or column.
//!
//! Errors are serializable so they can be embedded in a JSON run report.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// Ways a cohort file can fail to match the expected schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// One or more required columns are absent from the header.
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The outcome column holds a value that is neither 0 nor 1.
    #[error("outcome value '{value}' on data row {row} is not 0 or 1")]
    InvalidOutcome { row: usize, value: String },

    /// Missing outcomes in a cohort that is required to be outcome-complete.
    #[error("{rows} row(s) have a missing outcome in an outcome-complete cohort")]
    MissingOutcome { rows: usize },

    /// The cohort has no usable rows.
    #[error("cohort contains no rows")]
    Empty,
}

/// The main error type for cohort processing.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The input file could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file does not match the expected cohort schema.
    #[error("Schema error in '{}': {kind}", .path.display())]
    Schema { path: PathBuf, kind: SchemaErrorKind },

    /// A feature column could not be imputed.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (e.g., inconsistent matrix shape).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a schema error for `path`.
    pub fn schema(path: impl Into<PathBuf>, kind: SchemaErrorKind) -> Self {
        ProcessingError::Schema {
            path: path.into(),
            kind,
        }
    }

    /// Get a stable error code for report consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO_ERROR",
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::ImputationFailed { .. } => "IMPUTATION_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The schema problem behind this error, looking through context layers.
    pub fn schema_kind(&self) -> Option<&SchemaErrorKind> {
        match self {
            Self::Schema { kind, .. } => Some(kind),
            Self::WithContext { source, .. } => source.schema_kind(),
            _ => None,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = ProcessingError::schema("train.csv", SchemaErrorKind::Empty);
        assert_eq!(err.error_code(), "SCHEMA_ERROR");
        assert_eq!(
            ProcessingError::ImputationFailed {
                column: "ALT_max".to_string(),
                reason: "no observed values".to_string(),
            }
            .error_code(),
            "IMPUTATION_ERROR"
        );
    }

    #[test]
    fn test_missing_columns_message_names_every_column() {
        let err = ProcessingError::schema(
            "validation.csv",
            SchemaErrorKind::MissingColumns(vec!["ALC_min".to_string(), "Class".to_string()]),
        );
        let message = err.to_string();
        assert!(message.contains("validation.csv"));
        assert!(message.contains("ALC_min"));
        assert!(message.contains("Class"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ProcessingError::Io {
            path: PathBuf::from("/nowhere/train.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/nowhere/train.csv"));
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_error_serialization() {
        let error = ProcessingError::InvalidConfig("n_trees must be positive".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("INVALID_CONFIG"));
        assert!(json.contains("n_trees"));
    }

    #[test]
    fn test_with_context_preserves_code_and_kind() {
        let error = ProcessingError::schema("t.csv", SchemaErrorKind::MissingOutcome { rows: 2 })
            .with_context("Loading training cohort");
        assert!(error.to_string().contains("Loading training cohort"));
        assert_eq!(error.error_code(), "SCHEMA_ERROR");
        assert_eq!(
            error.schema_kind(),
            Some(&SchemaErrorKind::MissingOutcome { rows: 2 })
        );
    }
}
