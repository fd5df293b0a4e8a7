//! subpheno-learning: cross-validated comparison of classifier families for
//! inflammatory subphenotype prediction.
//!
//! The crate takes the imputed cohorts produced by `subpheno-processing`,
//! fits five classifier strategies (linear SVM, k-nearest neighbors,
//! gradient-boosted trees, random forest, kernel naive Bayes), and compares
//! them by ROC/AUC on out-of-fold training predictions and on a held-out
//! validation cohort.
//!
//! # Features
//!
//! - **One strategy interface**: every model family implements
//!   [`ClassifierStrategy`] with fixed hyperparameters
//! - **Shared folds**: one stratified [`FoldAssignment`] per run, used by all
//!   strategies
//! - **Parallel fitting**: folds and forest trees are fitted with rayon;
//!   results never depend on the thread count
//! - **Outputs**: two SVG ROC overlays and a JSON run report
//! - **Progress Reporting**: stage callbacks via [`ProgressUpdate`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use subpheno_learning::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .train_path("train.csv")
//!     .validation_path("validation.csv")
//!     .output_dir("outputs")
//!     .build()?;
//!
//! let result = Pipeline::builder().config(config).build()?.run()?;
//! if let Some(best) = result.best_validation_model() {
//!     println!("Best on validation: {} ({:.3})", best.name, best.validation.auc);
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! CSV ──► load_cohort ──► IterativeForestImputer ──► DesignMatrix
//!                                                        │
//!                         FoldAssignment ◄───────────────┤
//!                               │                        │
//!          CrossValidationRunner (per strategy)   HoldoutEvaluator
//!                               │                        │
//!                               └──► RocPlot, ReportWriter ◄┘
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`](LearningError):
//!
//! - [`LearningError::InvalidConfig`] - Invalid pipeline or fold configuration
//! - [`LearningError::InvalidData`] - Design matrix or target problems
//! - [`LearningError::UndefinedMetric`] - AUC on a single class
//! - [`LearningError::Processing`] - Loading or imputation failures

pub mod cross_validation;
pub mod design;
pub mod evaluation;
pub mod folds;
pub mod plot;
pub mod report;
pub mod strategies;

mod config;
mod error;
mod pipeline;
mod progress;
mod types;

// Re-export public API
//
// Configuration types
pub use config::{PipelineConfig, PipelineConfigBuilder};
// Error types
pub use error::{LearningError, Result};
// Pipeline types
pub use pipeline::{CV_PLOT_FILE, Pipeline, PipelineBuilder, VALIDATION_PLOT_FILE};
// Progress reporting types
pub use progress::{ParsePipelineStageError, PipelineStage, ProgressCallback, ProgressUpdate};
// Result types
pub use types::{
    CohortSummary, ComparisonResult, CrossValidationMetrics, ModelComparison, ParseStrategyKindError,
    PredictionRecord, StrategyKind, ValidationMetrics,
};
// Building blocks
pub use cross_validation::{CrossValidationResult, CrossValidationRunner};
pub use design::{DesignMatrix, EncodedTarget, TargetEncoding};
pub use evaluation::{
    ConfusionSummary, HoldoutEvaluator, HoldoutResult, RocCurve, RocPoint, compute_auc, compute_roc,
};
pub use folds::FoldAssignment;
pub use report::{REPORT_FILE, ReportWriter, RunReport};
pub use strategies::{ClassifierStrategy, FittedModel, predict_proba, strategy_for};

// Compile-time assertions for thread safety
static_assertions::assert_impl_all!(Pipeline: Send, Sync);
static_assertions::assert_impl_all!(PipelineConfig: Send, Sync);
static_assertions::assert_impl_all!(DesignMatrix: Send, Sync);
static_assertions::assert_impl_all!(FoldAssignment: Send, Sync);
static_assertions::assert_impl_all!(strategies::SvmStrategy: Send, Sync);
static_assertions::assert_impl_all!(strategies::RandomForestStrategy: Send, Sync);
static_assertions::assert_impl_all!(LearningError: Send, Sync);
