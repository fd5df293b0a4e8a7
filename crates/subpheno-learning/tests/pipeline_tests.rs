//! End-to-end tests for the comparison pipeline.
//!
//! Cohort files use a reduced schema (sex plus four measurements) and a small
//! imputer so the full five-model run stays affordable in debug builds.

use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::{Arc, Mutex};
use subpheno_learning::{
    CV_PLOT_FILE, ComparisonResult, LearningError, Pipeline, PipelineConfig, PipelineStage,
    ProgressUpdate, REPORT_FILE, RunReport, StrategyKind, VALIDATION_PLOT_FILE,
};
use subpheno_processing::utils::derive_seed;
use subpheno_processing::{CohortSchema, ImputerConfig};
use tempfile::{NamedTempFile, TempDir};

// ============================================================================
// Helper Functions
// ============================================================================

const MEASUREMENTS: [&str; 4] = ["Age", "CRP_max", "Ferritin_max", "Platelets_min"];

fn schema() -> CohortSchema {
    CohortSchema::new("Class", MEASUREMENTS.iter().map(|s| s.to_string()).collect()).with_sex("Sex")
}

/// Render a cohort as CSV text.
///
/// Class 1 rows are shifted upwards on CRP and Ferritin and downwards on
/// Platelets. Every tenth measurement cell is `NA`; rows listed in
/// `blank_outcomes` have an empty outcome.
fn cohort_csv(n_rows: usize, offset: usize, blank_outcomes: &[usize]) -> String {
    let mut out = String::from("PatientID,Sex,Age,CRP_max,Ferritin_max,Platelets_min,Class\n");
    let mut cell = 0usize;
    for i in 0..n_rows {
        let class = i % 2;
        let shift = if class == 1 { 1.0 } else { 0.0 };
        let noise = |j: usize| (((i + offset) * 37 + j * 11) % 17) as f64 * 0.4;
        let values = [
            45.0 + ((i + offset) % 30) as f64,
            20.0 + 6.0 * shift + noise(1),
            300.0 + 8.0 * shift + noise(2),
            250.0 - 5.0 * shift + noise(3),
        ];

        let mut fields = vec![format!("P{:04}", i + offset)];
        fields.push(if (i + offset) % 3 == 0 { "F" } else { "M" }.to_string());
        for value in values {
            cell += 1;
            fields.push(if cell % 10 == 0 {
                "NA".to_string()
            } else {
                format!("{value:.1}")
            });
        }
        fields.push(if blank_outcomes.contains(&i) {
            String::new()
        } else {
            class.to_string()
        });
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

struct Fixture {
    train: NamedTempFile,
    validation: NamedTempFile,
    output: TempDir,
}

impl Fixture {
    fn new(validation_blanks: &[usize]) -> Self {
        Self {
            train: write_temp(&cohort_csv(100, 0, &[])),
            validation: write_temp(&cohort_csv(42, 500, validation_blanks)),
            output: tempfile::tempdir().expect("create output dir"),
        }
    }

    fn config(&self, models: Vec<StrategyKind>, write_outputs: bool) -> PipelineConfig {
        PipelineConfig::builder()
            .train_path(self.train.path())
            .validation_path(self.validation.path())
            .output_dir(self.output.path().join("outputs"))
            .schema(schema())
            .imputer(
                ImputerConfig::builder()
                    .n_trees(10)
                    .max_iterations(3)
                    .build()
                    .unwrap(),
            )
            .models(models)
            .write_outputs(write_outputs)
            .build()
            .unwrap()
    }
}

fn cheap_models() -> Vec<StrategyKind> {
    vec![StrategyKind::Svm, StrategyKind::Knn, StrategyKind::NaiveBayes]
}

fn run_recording(config: PipelineConfig) -> (Result<ComparisonResult, LearningError>, Vec<ProgressUpdate>) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap();
    let result = pipeline.run();
    let updates = updates.lock().unwrap().clone();
    (result, updates)
}

fn assert_auc(value: f64) {
    assert!(value.is_finite(), "AUC {value} is not finite");
    assert!((0.0..=1.0).contains(&value), "AUC {value} outside [0, 1]");
}

// ============================================================================
// End-to-end Tests
// ============================================================================

#[test]
fn test_full_comparison_writes_plots_and_report() {
    let fixture = Fixture::new(&[]);
    let (result, updates) = run_recording(fixture.config(StrategyKind::all().to_vec(), true));
    let result = result.unwrap();

    assert_eq!(result.models.len(), 5);
    let kinds: Vec<StrategyKind> = result.models.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, StrategyKind::all().to_vec());
    for model in &result.models {
        assert_eq!(model.cross_validation.fold_auc.len(), 10);
        assert_auc(model.cross_validation.pooled_auc);
        assert_auc(model.validation.auc);
        assert!(!model.cross_validation.roc.is_empty());
        assert!(!model.validation.roc.is_empty());
        assert!(!model.hyperparameters.is_empty());
    }
    assert!(result.models.iter().any(|m| m.validation.auc > 0.7));

    assert_eq!(result.training.rows, 100);
    assert_eq!(result.training.class_counts, (50, 50));
    assert_eq!(result.validation.rows, 42);

    let out_dir = fixture.output.path().join("outputs");
    assert_eq!(
        result.outputs,
        vec![
            out_dir.join(CV_PLOT_FILE),
            out_dir.join(VALIDATION_PLOT_FILE),
            out_dir.join(REPORT_FILE),
        ]
    );
    for path in &result.outputs {
        assert!(path.exists(), "{} was not written", path.display());
    }

    let cv_svg = std::fs::read_to_string(out_dir.join(CV_PLOT_FILE)).unwrap();
    assert_eq!(cv_svg.matches("<polyline").count(), 5);
    for kind in StrategyKind::all() {
        assert!(cv_svg.contains(kind.display_name()));
    }

    let report: RunReport =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join(REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(report.result.models.len(), 5);
    assert_eq!(report.config.folds, 10);

    assert_eq!(updates.first().map(|u| u.stage), Some(PipelineStage::Initializing));
    assert_eq!(updates.last().map(|u| u.stage), Some(PipelineStage::Complete));
    assert_eq!(updates.last().map(|u| u.progress), Some(1.0));
    assert!(updates.windows(2).all(|w| w[0].progress <= w[1].progress));
    assert!(updates.iter().any(|u| u.stage == PipelineStage::Reporting));
}

#[test]
fn test_repeated_runs_are_identical() {
    let fixture = Fixture::new(&[]);
    let config = fixture.config(cheap_models(), false);
    let seed = config.seed;

    let first = Pipeline::builder().config(config.clone()).build().unwrap().run().unwrap();
    let second = Pipeline::builder().config(config).build().unwrap().run().unwrap();

    for (a, b) in first.models.iter().zip(&second.models) {
        assert_eq!(a.cross_validation, b.cross_validation);
        assert_eq!(a.validation, b.validation);
    }
    assert_eq!(first.training.imputation, second.training.imputation);
    assert_eq!(first.validation.imputation, second.validation.imputation);

    // Each cohort is imputed from its own stream of the run seed
    assert_eq!(first.training.imputation.seed, derive_seed(seed, 0));
    assert_eq!(first.validation.imputation.seed, derive_seed(seed, 1));
    assert_ne!(first.training.imputation.seed, first.validation.imputation.seed);
    assert!(first.outputs.is_empty());
    assert!(!fixture.output.path().join("outputs").exists());
}

#[test]
fn test_validation_rows_without_outcome_are_dropped() {
    let fixture = Fixture::new(&[3, 8]);
    let result = Pipeline::builder()
        .config(fixture.config(vec![StrategyKind::NaiveBayes], false))
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.validation.rows, 40);
    assert_eq!(result.validation.dropped_rows, 2);
    assert_eq!(result.training.dropped_rows, 0);
    assert_auc(result.models[0].validation.auc);
}

#[test]
fn test_missing_column_reports_failed_stage() {
    let fixture = Fixture::new(&[]);
    let broken = write_temp(&cohort_csv(100, 0, &[]).replacen("CRP_max", "CRP_peak", 1));
    let mut config = fixture.config(cheap_models(), true);
    config.train_path = broken.path().to_path_buf();

    let (result, updates) = run_recording(config);
    let err = result.unwrap_err();

    assert_eq!(err.error_code(), "SCHEMA_ERROR");
    assert!(err.to_string().contains("CRP_max"));
    assert_eq!(updates.last().map(|u| u.stage), Some(PipelineStage::Failed));
    assert!(!fixture.output.path().join("outputs").exists());
}

#[test]
fn test_more_folds_than_rows_is_rejected() {
    let fixture = Fixture::new(&[]);
    let mut config = fixture.config(cheap_models(), false);
    config.folds = 101;

    let err = Pipeline::builder().config(config).build().unwrap().run().unwrap_err();
    assert!(matches!(err, LearningError::InvalidConfig(_)));
}

#[test]
fn test_cli_model_list_parses() {
    let kinds: Vec<StrategyKind> = "svm, KNN ,gbt"
        .split(',')
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![StrategyKind::Svm, StrategyKind::Knn, StrategyKind::GradientBoostedTrees]
    );
    assert!("rf".parse::<StrategyKind>().is_err());
}
