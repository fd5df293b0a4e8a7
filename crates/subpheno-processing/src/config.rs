//! Configuration types for cohort loading and imputation.
//!
//! [`CohortSchema`] names the columns a cohort file must provide, and
//! [`ImputerConfig`] tunes the iterative forest imputer. The imputer
//! configuration is built through a validating builder.

use serde::{Deserialize, Serialize};

/// Laboratory and vital-sign measurements recorded as a min/max pair.
const PAIRED_MEASUREMENTS: [&str; 14] = [
    "ALC",
    "ALT",
    "AST",
    "Platelets",
    "WBC",
    "Hemoglobin",
    "Sodium",
    "Albumin",
    "Creatinine",
    "CRP",
    "Ferritin",
    "SBP",
    "DBP",
    "SpO2",
];

/// Column layout of a cohort file.
///
/// Feature order is significant: it is the column order of every design
/// matrix built from the cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortSchema {
    /// Binary outcome column (0/1)
    pub outcome: String,
    /// Sex column, encoded M -> 0, F -> 1. `None` if the schema has no sex column.
    pub sex: Option<String>,
    /// Numeric feature columns, in order
    pub numeric: Vec<String>,
}

impl Default for CohortSchema {
    /// The clinical schema: `Sex`, `Age` and the min/max of 14 measurements.
    fn default() -> Self {
        let mut numeric = vec!["Age".to_string()];
        for name in PAIRED_MEASUREMENTS {
            numeric.push(format!("{name}_min"));
            numeric.push(format!("{name}_max"));
        }
        Self {
            outcome: "Class".to_string(),
            sex: Some("Sex".to_string()),
            numeric,
        }
    }
}

impl CohortSchema {
    /// A schema with the given outcome and numeric columns and no sex column.
    pub fn new(outcome: impl Into<String>, numeric: Vec<String>) -> Self {
        Self {
            outcome: outcome.into(),
            sex: None,
            numeric,
        }
    }

    /// Set the sex column.
    pub fn with_sex(mut self, column: impl Into<String>) -> Self {
        self.sex = Some(column.into());
        self
    }

    /// All feature columns in design-matrix order: sex first, then numeric.
    pub fn feature_columns(&self) -> Vec<String> {
        self.sex
            .iter()
            .cloned()
            .chain(self.numeric.iter().cloned())
            .collect()
    }

    /// Every column a cohort file must contain.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns = self.feature_columns();
        columns.push(self.outcome.clone());
        columns
    }

    pub fn n_features(&self) -> usize {
        self.numeric.len() + usize::from(self.sex.is_some())
    }
}

/// Configuration for [`crate::imputers::IterativeForestImputer`].
///
/// Use [`ImputerConfig::builder()`] for a validated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputerConfig {
    /// Maximum number of sweeps over the incomplete columns.
    /// Default: 10
    pub max_iterations: usize,

    /// Trees per column forest.
    /// Default: 100
    pub n_trees: usize,

    /// Minimum number of rows in a leaf.
    /// Default: 5
    pub min_samples_leaf: usize,

    /// Candidate features per split. `None` means `floor(sqrt(p - 1))`.
    /// Default: None
    pub max_features: Option<usize>,

    /// Convergence threshold on the normalized change between sweeps.
    /// Default: 0.0 (stop on the first increase or at the cap)
    pub tolerance: f64,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            n_trees: 100,
            min_samples_leaf: 5,
            max_features: None,
            tolerance: 0.0,
        }
    }
}

impl ImputerConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = ImputerConfig::builder()
    ///     .n_trees(50)
    ///     .max_iterations(5)
    ///     .build()?;
    /// ```
    pub fn builder() -> ImputerConfigBuilder {
        ImputerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_iterations == 0 {
            return Err(ConfigValidationError::ZeroValue("max_iterations"));
        }
        if self.n_trees == 0 {
            return Err(ConfigValidationError::ZeroValue("n_trees"));
        }
        if self.min_samples_leaf == 0 {
            return Err(ConfigValidationError::ZeroValue("min_samples_leaf"));
        }
        if self.max_features == Some(0) {
            return Err(ConfigValidationError::ZeroValue("max_features"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigValidationError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }

    /// Candidate features per split for a cohort with `n_features` columns.
    pub fn mtry(&self, n_features: usize) -> usize {
        let predictors = n_features.saturating_sub(1).max(1);
        match self.max_features {
            Some(m) => m.min(predictors),
            None => ((predictors as f64).sqrt().floor() as usize).max(1),
        }
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroValue(&'static str),

    #[error("Invalid tolerance: {0} (must be finite and non-negative)")]
    InvalidTolerance(f64),
}

/// Builder for [`ImputerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputerConfigBuilder {
    max_iterations: Option<usize>,
    n_trees: Option<usize>,
    min_samples_leaf: Option<usize>,
    max_features: Option<usize>,
    tolerance: Option<f64>,
}

impl ImputerConfigBuilder {
    /// Set the sweep cap.
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Set the number of trees per column forest.
    pub fn n_trees(mut self, n: usize) -> Self {
        self.n_trees = Some(n);
        self
    }

    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = Some(n);
        self
    }

    /// Fix the number of candidate features per split.
    pub fn max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n);
        self
    }

    /// Set the convergence threshold on the normalized sweep change.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ImputerConfig, ConfigValidationError> {
        let defaults = ImputerConfig::default();
        let config = ImputerConfig {
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            n_trees: self.n_trees.unwrap_or(defaults.n_trees),
            min_samples_leaf: self.min_samples_leaf.unwrap_or(defaults.min_samples_leaf),
            max_features: self.max_features.or(defaults.max_features),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
        };

        config.validate()?;
        Ok(config)
    }
}
