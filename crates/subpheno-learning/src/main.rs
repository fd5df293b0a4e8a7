//! CLI entry point for the subphenotype model comparison.

use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;
use subpheno_learning::{ComparisonResult, Pipeline, PipelineConfig, RunReport, StrategyKind};
use subpheno_processing::ImputerConfig;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Compare five classifier families for inflammatory subphenotype prediction",
    long_about = "Imputes a training and a validation cohort, then compares SVM, KNN, \
                  gradient-boosted trees, random forest and naive Bayes by 10-fold \
                  cross-validated and held-out ROC AUC.\n\n\
                  EXAMPLES:\n  \
                  # Full comparison with default settings\n  \
                  subpheno -t train.csv -v validation.csv\n\n  \
                  # Two models, five folds, JSON report on stdout\n  \
                  subpheno -t train.csv -v validation.csv --models svm,random_forest --folds 5 --json"
)]
struct Args {
    /// Training cohort CSV
    #[arg(short, long)]
    train: PathBuf,

    /// Validation cohort CSV
    #[arg(short, long)]
    validation: PathBuf,

    /// Output directory for ROC plots and the JSON report
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// Number of cross-validation folds
    #[arg(long, default_value = "10")]
    folds: usize,

    /// Base seed for folds, imputation and stochastic models
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Comma-separated models to compare (svm, knn, gbt, random_forest, naive_bayes)
    ///
    /// Defaults to all five
    #[arg(long, value_delimiter = ',')]
    models: Vec<StrategyKind>,

    /// Trees per column forest in the imputer
    #[arg(long, default_value = "100")]
    imputer_trees: usize,

    /// Maximum imputation sweeps
    #[arg(long, default_value = "10")]
    imputer_iterations: usize,

    /// Skip writing plots and the report
    #[arg(long)]
    no_outputs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the JSON run report to stdout instead of the summary table
    ///
    /// Disables all logs so stdout holds only JSON.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// With `json_output` no subscriber is installed.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let imputer = ImputerConfig::builder()
        .n_trees(args.imputer_trees)
        .max_iterations(args.imputer_iterations)
        .build()?;

    let mut config_builder = PipelineConfig::builder()
        .train_path(&args.train)
        .validation_path(&args.validation)
        .output_dir(&args.output)
        .folds(args.folds)
        .seed(args.seed)
        .imputer(imputer)
        .write_outputs(!args.no_outputs);

    if !args.models.is_empty() {
        config_builder = config_builder.models(args.models.clone());
    }

    let config = config_builder.build()?;
    let pipeline = build_pipeline(&args, config)?;

    info!("{}", "=".repeat(80));
    info!("Starting subphenotype model comparison...");
    info!("{}", "=".repeat(80));

    let result = pipeline.run().map_err(|e| {
        error!("Comparison failed: {}", e);
        anyhow!("Comparison failed [{}]: {}", e.error_code(), e)
    })?;

    if args.json {
        println!("{}", RunReport::new(pipeline.config(), &result).to_json()?);
        return Ok(());
    }

    print_summary(&result);
    Ok(())
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.as_str(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

fn format_auc(auc: Option<f64>) -> String {
    auc.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

/// Print the comparison table.
///
/// Uses `println!` on purpose: this is the command's output, not a log line.
fn print_summary(result: &ComparisonResult) {
    println!();
    println!("{}", "=".repeat(80));
    println!("MODEL COMPARISON COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    for (label, cohort) in [("Training", &result.training), ("Validation", &result.validation)] {
        println!(
            "{label:<11} {} ({} rows, {} dropped, class 0/1 = {}/{}, {} imputation sweeps)",
            cohort.path.display(),
            cohort.rows,
            cohort.dropped_rows,
            cohort.class_counts.0,
            cohort.class_counts.1,
            cohort.imputation.iterations
        );
    }
    println!();

    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10} {:>9}",
        "Model", "CV pooled", "CV mean", "CV sd", "Validation", "Time (s)"
    );
    println!("{}", "-".repeat(74));
    for model in &result.models {
        println!(
            "{:<20} {:>10.3} {:>10} {:>10} {:>10.3} {:>9.1}",
            model.name,
            model.cross_validation.pooled_auc,
            format_auc(model.cross_validation.mean_fold_auc),
            format_auc(model.cross_validation.std_fold_auc),
            model.validation.auc,
            model.elapsed_seconds
        );
    }
    println!();

    if let Some(best) = result.best_validation_model() {
        println!("Best on validation: {} (AUC = {:.3})", best.name, best.validation.auc);
    }

    if !result.outputs.is_empty() {
        println!();
        println!("Outputs:");
        for path in &result.outputs {
            println!("  - {}", path.display());
        }
    }
    println!();
    println!("Total time: {:.1}s", result.elapsed_seconds);
}
