//! Configuration types for the comparison pipeline.
//!
//! This module provides [`PipelineConfig`] and its builder.
//!
//! # Example
//!
//! ```
//! use subpheno_learning::{PipelineConfig, StrategyKind};
//!
//! let config = PipelineConfig::builder()
//!     .train_path("train.csv")
//!     .validation_path("validation.csv")
//!     .folds(5)
//!     .models(vec![StrategyKind::RandomForest, StrategyKind::Knn])
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.folds, 5);
//! ```

use crate::error::LearningError;
use crate::types::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use subpheno_processing::{CohortSchema, ImputerConfig};

/// Configuration for a comparison run.
///
/// Use [`PipelineConfig::builder()`] to construct a configuration.
///
/// # Validation
///
/// [`build()`](PipelineConfigBuilder::build) checks that:
/// - both input paths are set
/// - `folds` is at least 2
/// - at least one model is selected, with no duplicates
/// - the imputer configuration is valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Training cohort CSV.
    pub train_path: PathBuf,

    /// Held-out validation cohort CSV.
    pub validation_path: PathBuf,

    /// Directory receiving the plots and the report (default: `./outputs`).
    ///
    /// Created if it does not exist.
    pub output_dir: PathBuf,

    /// Number of cross-validation folds (default: 10).
    pub folds: usize,

    /// Global seed for imputation, fold assignment and model fitting (default: 42).
    pub seed: u64,

    /// Strategies to compare, evaluated in this order (default: all five).
    pub models: Vec<StrategyKind>,

    /// Iterative imputation settings, applied to each cohort separately.
    pub imputer: ImputerConfig,

    /// Columns of the cohort files.
    pub schema: CohortSchema,

    /// Whether to write plots and the report (default: true).
    ///
    /// When disabled the run only returns its [`ComparisonResult`](crate::ComparisonResult).
    pub write_outputs: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::new(),
            validation_path: PathBuf::new(),
            output_dir: PathBuf::from("./outputs"),
            folds: 10,
            seed: 42,
            models: StrategyKind::all().to_vec(),
            imputer: ImputerConfig::default(),
            schema: CohortSchema::default(),
            write_outputs: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for [`PipelineConfig`].
///
/// Created via [`PipelineConfig::builder()`]. All setters return `self` to
/// allow method chaining.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn train_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.train_path = path.into();
        self
    }

    #[must_use]
    pub fn validation_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.validation_path = path.into();
        self
    }

    /// Set the output directory (default: `./outputs`).
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set the number of cross-validation folds (default: 10).
    ///
    /// [`build()`](Self::build) returns an error if `folds < 2`. Folds larger
    /// than the training cohort are rejected when the folds are assigned.
    #[must_use]
    pub fn folds(mut self, folds: usize) -> Self {
        self.config.folds = folds;
        self
    }

    /// Set the global seed (default: 42).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Restrict the comparison to the given strategies.
    #[must_use]
    pub fn models(mut self, models: Vec<StrategyKind>) -> Self {
        self.config.models = models;
        self
    }

    #[must_use]
    pub fn imputer(mut self, imputer: ImputerConfig) -> Self {
        self.config.imputer = imputer;
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: CohortSchema) -> Self {
        self.config.schema = schema;
        self
    }

    /// Enable or disable writing plots and the report (default: true).
    #[must_use]
    pub fn write_outputs(mut self, write: bool) -> Self {
        self.config.write_outputs = write;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any check listed on
    /// [`PipelineConfig`] fails.
    pub fn build(self) -> Result<PipelineConfig, LearningError> {
        let config = self.config;

        if config.train_path.as_os_str().is_empty() {
            return Err(LearningError::InvalidConfig(
                "train_path must be set".to_string(),
            ));
        }
        if config.validation_path.as_os_str().is_empty() {
            return Err(LearningError::InvalidConfig(
                "validation_path must be set".to_string(),
            ));
        }

        if config.folds < 2 {
            return Err(LearningError::InvalidConfig(
                "folds must be at least 2".to_string(),
            ));
        }

        if config.models.is_empty() {
            return Err(LearningError::InvalidConfig(
                "at least one model must be selected".to_string(),
            ));
        }
        for (i, kind) in config.models.iter().enumerate() {
            if config.models[..i].contains(kind) {
                return Err(LearningError::InvalidConfig(format!(
                    "model '{}' selected more than once",
                    kind.slug()
                )));
            }
        }

        config.imputer.validate()?;

        Ok(config)
    }
}
