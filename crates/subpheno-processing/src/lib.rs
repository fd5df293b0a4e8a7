//! Cohort processing for inflammatory subphenotype modelling.
//!
//! # Overview
//!
//! This library turns raw cohort CSV files into complete, typed tables:
//!
//! - **Loading**: schema validation, sex encoding, numeric coercion and the
//!   per-cohort missing-outcome rule ([`load_cohort`])
//! - **Imputation**: iterative random-forest imputation of missing feature
//!   values ([`IterativeForestImputer`])
//! - **Tree ensembles**: the CART and random forest engine shared with the
//!   downstream classifiers ([`trees`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use subpheno_processing::{
//!     load_cohort, CohortKind, CohortSchema, ImputerConfig, IterativeForestImputer,
//! };
//!
//! let schema = CohortSchema::default();
//! let train = load_cohort("train.csv", CohortKind::Training, &schema)?;
//! let validation = load_cohort("validation.csv", CohortKind::Validation, &schema)?;
//!
//! let imputer = IterativeForestImputer::new(ImputerConfig::default());
//! let train = imputer.impute(&train, 42)?;
//! let validation = imputer.impute(&validation, 42)?;
//!
//! println!("{} training cells imputed", train.summary().imputed_cells());
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ProcessingError>`](ProcessingError).
//! Each error carries a stable code from [`ProcessingError::error_code`].

mod cleaner;
pub mod config;
pub mod dataset;
pub mod error;
pub mod imputers;
pub mod trees;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use config::{CohortSchema, ConfigValidationError, ImputerConfig, ImputerConfigBuilder};
pub use dataset::{Cohort, load_cohort};
pub use error::{ProcessingError, Result, ResultExt, SchemaErrorKind};
pub use imputers::{ImputedCohort, IterativeForestImputer};
pub use types::{CohortKind, ColumnImputation, ImputationSummary, StopReason, Subphenotype};

// Compile-time assertions for thread safety
static_assertions::assert_impl_all!(Cohort: Send, Sync);
static_assertions::assert_impl_all!(ImputedCohort: Send, Sync);
static_assertions::assert_impl_all!(IterativeForestImputer: Send, Sync);
static_assertions::assert_impl_all!(trees::RandomForestRegressor: Send, Sync);
