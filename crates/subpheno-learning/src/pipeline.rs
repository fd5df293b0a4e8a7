//! Comparison pipeline implementation.
//!
//! This module provides the [`Pipeline`] struct and its builder. A run
//! executes these stages in order:
//!
//! 1. **Loading** - Read and type the training and validation cohorts
//! 2. **Imputing** - Fill missing feature values, each cohort on its own
//! 3. **Cross-validation** - Out-of-fold predictions on the training cohort,
//!    one shared fold assignment for every strategy
//! 4. **Validation** - Fit on the full training cohort, score the validation cohort
//! 5. **Reporting** - ROC plots and the JSON run report
//!
//! # Example
//!
//! ```rust,ignore
//! use subpheno_learning::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .train_path("train.csv")
//!     .validation_path("validation.csv")
//!     .build()?;
//!
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{}] {:.0}% - {}", update.stage.as_str(), update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//!
//! let result = pipeline.run()?;
//! for model in &result.models {
//!     println!("{}: validation AUC {:.3}", model.name, model.validation.auc);
//! }
//! ```

use crate::config::PipelineConfig;
use crate::cross_validation::CrossValidationRunner;
use crate::design::DesignMatrix;
use crate::error::{LearningError, Result};
use crate::evaluation::HoldoutEvaluator;
use crate::folds::FoldAssignment;
use crate::plot::RocPlot;
use crate::progress::{PipelineStage, ProgressCallback, ProgressUpdate};
use crate::report::{ReportWriter, RunReport};
use crate::strategies::strategy_for;
use crate::types::{CohortSummary, ComparisonResult, ModelComparison, ValidationMetrics};
use std::cell::Cell;
use std::path::Path;
use std::time::Instant;
use subpheno_processing::utils::derive_seed;
use subpheno_processing::{Cohort, CohortKind, ImputedCohort, IterativeForestImputer, load_cohort};
use tracing::{debug, info};

pub const CV_PLOT_FILE: &str = "cv_roc_curves.svg";
pub const VALIDATION_PLOT_FILE: &str = "validation_roc_curves.svg";

/// Progress share reached when model evaluation starts and ends.
const MODELS_START: f64 = 0.15;
const MODELS_END: f64 = 0.9;

/// The classifier comparison pipeline.
///
/// Use [`Pipeline::builder()`] to construct a pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

/// Emits progress updates, keeping progress non-decreasing within a run.
struct Reporter<'a> {
    callback: Option<&'a ProgressCallback>,
    last: Cell<f64>,
}

impl<'a> Reporter<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            last: Cell::new(0.0),
        }
    }

    fn emit(&self, stage: PipelineStage, progress: f64, message: impl Into<String>) {
        self.emit_model(stage, progress, message, None, None);
    }

    fn emit_model(
        &self,
        stage: PipelineStage,
        progress: f64,
        message: impl Into<String>,
        current_model: Option<String>,
        models_completed: Option<(u32, u32)>,
    ) {
        let progress = progress.clamp(self.last.get(), 1.0);
        self.last.set(progress);
        if let Some(callback) = self.callback {
            callback(ProgressUpdate {
                stage,
                progress,
                message: message.into(),
                current_model,
                models_completed,
            });
        }
    }
}

impl Pipeline {
    /// Create a new builder for `Pipeline`.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load both cohorts from the configured paths and run the comparison.
    ///
    /// # Errors
    ///
    /// Any load, imputation, fitting or output failure stops the run; there
    /// are no partial results.
    pub fn run(&self) -> Result<ComparisonResult> {
        let reporter = Reporter::new(self.progress_callback.as_ref());
        let outcome = self.load_and_compare(&reporter);
        self.finish(&reporter, outcome)
    }

    /// Run the comparison on cohorts that are already loaded.
    pub fn run_cohorts(&self, train: &Cohort, validation: &Cohort) -> Result<ComparisonResult> {
        let reporter = Reporter::new(self.progress_callback.as_ref());
        let outcome = self.compare(train, validation, &reporter, Instant::now());
        self.finish(&reporter, outcome)
    }

    fn finish(&self, reporter: &Reporter<'_>, outcome: Result<ComparisonResult>) -> Result<ComparisonResult> {
        match &outcome {
            Ok(result) => {
                info!("Comparison completed in {:.1}s", result.elapsed_seconds);
                reporter.emit(PipelineStage::Complete, 1.0, "Comparison complete");
            }
            Err(e) => {
                reporter.emit(PipelineStage::Failed, 0.0, e.to_string());
            }
        }
        outcome
    }

    fn load_and_compare(&self, reporter: &Reporter<'_>) -> Result<ComparisonResult> {
        let start = Instant::now();
        let config = &self.config;

        info!("Step 1: Loading cohorts...");
        reporter.emit(PipelineStage::Initializing, 0.0, "Starting comparison");
        reporter.emit(PipelineStage::Loading, 0.01, "Loading training cohort");
        let train = load_cohort(&config.train_path, CohortKind::Training, &config.schema)?;
        reporter.emit(PipelineStage::Loading, 0.03, "Loading validation cohort");
        let validation = load_cohort(&config.validation_path, CohortKind::Validation, &config.schema)?;

        self.compare(&train, &validation, reporter, start)
    }

    fn compare(
        &self,
        train: &Cohort,
        validation: &Cohort,
        reporter: &Reporter<'_>,
        start: Instant,
    ) -> Result<ComparisonResult> {
        let config = &self.config;
        if train.kind() != CohortKind::Training || validation.kind() != CohortKind::Validation {
            return Err(LearningError::InvalidData(
                "expected a training cohort and a validation cohort".to_string(),
            ));
        }

        info!("Step 2: Imputing missing values...");
        let imputer = IterativeForestImputer::new(config.imputer.clone());
        reporter.emit(PipelineStage::Imputing, 0.05, "Imputing training cohort");
        let train_imputed =
            imputer.impute(train, imputation_seed(config.seed, CohortKind::Training))?;
        reporter.emit(PipelineStage::Imputing, 0.10, "Imputing validation cohort");
        let validation_imputed =
            imputer.impute(validation, imputation_seed(config.seed, CohortKind::Validation))?;

        let train_x = DesignMatrix::from_imputed(&train_imputed)?;
        let validation_x = DesignMatrix::from_imputed(&validation_imputed)?;
        let folds = FoldAssignment::stratified(train_x.outcomes(), config.folds, config.seed)?;
        debug!("Fold sizes: {:?}", folds.fold_sizes());
        let runner = CrossValidationRunner::new(&folds);

        info!(
            "Step 3: Evaluating {} models ({}-fold cross-validation, then validation)...",
            config.models.len(),
            config.folds
        );
        let total = 2 * config.models.len() as u32;
        let step = (MODELS_END - MODELS_START) / f64::from(total);
        let mut completed = 0u32;
        let mut models = Vec::with_capacity(config.models.len());

        for &kind in &config.models {
            let strategy = strategy_for(kind);
            let name = kind.display_name().to_string();
            let model_start = Instant::now();

            reporter.emit_model(
                PipelineStage::CrossValidation,
                MODELS_START + step * f64::from(completed),
                format!("Cross-validating {name}"),
                Some(name.clone()),
                Some((completed, total)),
            );
            let cv = runner.run(strategy.as_ref(), &train_x, config.seed)?;
            completed += 1;
            info!(
                "{}: cross-validated AUC {:.3} (fold mean {})",
                name,
                cv.pooled_auc,
                cv.mean_fold_auc
                    .map_or_else(|| "undefined".to_string(), |m| format!("{m:.3}"))
            );

            reporter.emit_model(
                PipelineStage::Validation,
                MODELS_START + step * f64::from(completed),
                format!("Validating {name}"),
                Some(name.clone()),
                Some((completed, total)),
            );
            let holdout = HoldoutEvaluator::evaluate(strategy.as_ref(), &train_x, &validation_x, config.seed)?;
            completed += 1;
            info!("{}: validation AUC {:.3}", name, holdout.auc);

            models.push(ModelComparison {
                kind,
                name,
                cross_validation: cv.metrics(),
                validation: ValidationMetrics {
                    auc: holdout.auc,
                    roc: holdout.roc,
                    confusion: holdout.confusion,
                },
                hyperparameters: strategy.hyperparameters(),
                feature_importance: holdout.feature_importance,
                elapsed_seconds: model_start.elapsed().as_secs_f64(),
            });
        }

        let mut result = ComparisonResult {
            training: cohort_summary(train, &train_imputed, &train_x, &config.train_path),
            validation: cohort_summary(validation, &validation_imputed, &validation_x, &config.validation_path),
            models,
            outputs: Vec::new(),
            elapsed_seconds: 0.0,
        };

        if config.write_outputs {
            info!("Step 4: Writing plots and report...");
            reporter.emit(PipelineStage::Reporting, MODELS_END, "Writing plots and report");
            self.write_outputs(&mut result, start)?;
        }
        result.elapsed_seconds = start.elapsed().as_secs_f64();

        Ok(result)
    }

    /// Write both plots and the report, recording the paths in `result.outputs`.
    fn write_outputs(&self, result: &mut ComparisonResult, start: Instant) -> Result<()> {
        let dir = &self.config.output_dir;
        std::fs::create_dir_all(dir)?;

        let mut cv_plot = RocPlot::new("ROC curves, cross-validation (training cohort)");
        let mut validation_plot = RocPlot::new("ROC curves, validation cohort");
        for model in &result.models {
            cv_plot.add_curve(
                &model.name,
                &model.cross_validation.roc,
                model.cross_validation.pooled_auc,
            );
            validation_plot.add_curve(&model.name, &model.validation.roc, model.validation.auc);
        }

        let cv_path = dir.join(CV_PLOT_FILE);
        let validation_path = dir.join(VALIDATION_PLOT_FILE);
        cv_plot.write(&cv_path)?;
        validation_plot.write(&validation_path)?;

        let writer = ReportWriter::new(dir);
        result.outputs = vec![cv_path, validation_path, writer.path()];
        result.elapsed_seconds = start.elapsed().as_secs_f64();
        writer.write(&RunReport::new(&self.config, result))?;

        Ok(())
    }
}

/// Imputation seed for one cohort. Each cohort draws from its own stream of
/// the run seed.
fn imputation_seed(seed: u64, kind: CohortKind) -> u64 {
    match kind {
        CohortKind::Training => derive_seed(seed, 0),
        CohortKind::Validation => derive_seed(seed, 1),
    }
}

fn cohort_summary(
    cohort: &Cohort,
    imputed: &ImputedCohort,
    design: &DesignMatrix,
    configured_path: &Path,
) -> CohortSummary {
    CohortSummary {
        path: cohort
            .source()
            .map_or_else(|| configured_path.to_path_buf(), Path::to_path_buf),
        rows: cohort.height(),
        dropped_rows: cohort.dropped_rows(),
        class_counts: design.class_counts(),
        imputation: imputed.summary().clone(),
    }
}

/// Builder for [`Pipeline`].
///
/// # Required Configuration
///
/// - [`config()`](Self::config): Pipeline configuration
///
/// # Optional Configuration
///
/// - [`on_progress()`](Self::on_progress): Progress callback for monitoring
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PipelineBuilder {
    /// Set the pipeline configuration (required).
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the progress callback (optional).
    ///
    /// The callback is invoked synchronously from the pipeline thread and
    /// should return quickly.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(std::sync::Arc::new(callback));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if no configuration was provided.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.ok_or_else(|| {
            LearningError::InvalidConfig("Pipeline config is required".to_string())
        })?;

        Ok(Pipeline {
            config,
            progress_callback: self.progress_callback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_builder_requires_config() {
        let err = Pipeline::builder().build().unwrap_err();
        assert!(matches!(err, LearningError::InvalidConfig(_)));
        assert!(err.to_string().contains("config is required"));
    }

    #[test]
    fn test_builder_debug_hides_callback() {
        let builder = Pipeline::builder().on_progress(|_| {});
        let debug = format!("{builder:?}");
        assert!(debug.contains("<callback>"));
    }

    #[test]
    fn test_reporter_keeps_progress_monotone() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |u: ProgressUpdate| {
            sink.lock().unwrap().push((u.stage, u.progress));
        });
        let reporter = Reporter::new(Some(&callback));
        reporter.emit(PipelineStage::Loading, 0.3, "a");
        reporter.emit(PipelineStage::Failed, 0.0, "b");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(PipelineStage::Loading, 0.3), (PipelineStage::Failed, 0.3)]);
    }

    #[test]
    fn test_cohorts_get_distinct_imputation_seeds() {
        let train = imputation_seed(42, CohortKind::Training);
        let validation = imputation_seed(42, CohortKind::Validation);
        assert_ne!(train, validation);
        assert_ne!(train, 42);
        assert_eq!(train, imputation_seed(42, CohortKind::Training));
        assert_ne!(train, imputation_seed(43, CohortKind::Training));
    }

    #[test]
    fn test_missing_training_file_fails_with_io() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .train_path(dir.path().join("absent.csv"))
            .validation_path(dir.path().join("also_absent.csv"))
            .output_dir(dir.path().join("out"))
            .build()
            .unwrap();
        let pipeline = Pipeline::builder().config(config).build().unwrap();

        let err = pipeline.run().unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.to_string().contains("absent.csv"));
        assert!(!dir.path().join("out").exists());
    }
}
