//! Cohort loading.
//!
//! [`load_cohort`] reads a CSV file into a typed [`Cohort`]: every schema
//! column present, features as `Float64` (missing values as nulls) and the
//! outcome as `Int32` class codes.
//!
//! Training and validation cohorts follow different rules for a missing
//! outcome. A validation row without an outcome cannot be scored and is
//! dropped. The training cohort is expected to be outcome-complete, so a
//! missing outcome there fails the load instead of shrinking the cohort.

use crate::cleaner::CohortCleaner;
use crate::config::CohortSchema;
use crate::error::{ProcessingError, Result, ResultExt, SchemaErrorKind};
use crate::types::{CohortKind, Subphenotype};
use crate::utils::strip_bom;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A typed patient cohort.
#[derive(Debug, Clone)]
pub struct Cohort {
    df: DataFrame,
    kind: CohortKind,
    schema: CohortSchema,
    source: Option<PathBuf>,
    source_rows: Vec<usize>,
    dropped_rows: usize,
}

impl Cohort {
    /// Build a cohort from an in-memory table.
    ///
    /// Schema columns are cast to their cohort types and the outcome must be
    /// 0/1. Missing outcomes follow the same per-kind rule as [`load_cohort`].
    pub fn from_dataframe(df: DataFrame, kind: CohortKind, schema: &CohortSchema) -> Result<Self> {
        let missing: Vec<String> = schema
            .required_columns()
            .into_iter()
            .filter(|c| df.column(c).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(ProcessingError::schema(
                "<memory>",
                SchemaErrorKind::MissingColumns(missing),
            ));
        }

        let mut columns: Vec<Column> = Vec::with_capacity(schema.n_features() + 1);
        for name in schema.feature_columns() {
            columns.push(df.column(&name)?.cast(&DataType::Float64)?);
        }
        let outcome = df.column(&schema.outcome)?.cast(&DataType::Int32)?;
        let outcome_ca = outcome.i32()?;
        if outcome_ca.null_count() > 0 && !kind.drops_missing_outcome() {
            return Err(ProcessingError::schema(
                "<memory>",
                SchemaErrorKind::MissingOutcome {
                    rows: outcome_ca.null_count(),
                },
            ));
        }
        if let Some((row, value)) = outcome_ca
            .into_iter()
            .enumerate()
            .find_map(|(i, v)| v.filter(|c| Subphenotype::from_code(*c as i64).is_none()).map(|c| (i, c)))
        {
            return Err(ProcessingError::schema(
                "<memory>",
                SchemaErrorKind::InvalidOutcome {
                    row,
                    value: value.to_string(),
                },
            ));
        }
        columns.push(outcome.clone());

        let mut df = DataFrame::new(columns)?;
        let null_mask = df.column(&schema.outcome)?.is_null();
        let source_rows: Vec<usize> = (&null_mask)
            .into_iter()
            .enumerate()
            .filter(|(_, is_null)| !is_null.unwrap_or(false))
            .map(|(i, _)| i)
            .collect();
        let dropped_rows = df.height() - source_rows.len();
        if dropped_rows > 0 {
            df = df.filter(&!null_mask)?;
        }
        if df.height() == 0 {
            return Err(ProcessingError::schema("<memory>", SchemaErrorKind::Empty));
        }

        Ok(Self {
            df,
            kind,
            schema: schema.clone(),
            source: None,
            source_rows,
            dropped_rows,
        })
    }

    /// The typed table: feature columns then the outcome column.
    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn kind(&self) -> CohortKind {
        self.kind
    }

    pub fn schema(&self) -> &CohortSchema {
        &self.schema
    }

    /// File the cohort was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 0-based raw data-row index of every retained row.
    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    /// Rows removed at load time because their outcome was missing.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Number of missing feature cells.
    pub fn missing_cells(&self) -> usize {
        self.schema
            .feature_columns()
            .iter()
            .filter_map(|c| self.df.column(c).ok())
            .map(|c| c.null_count())
            .sum()
    }

    /// The outcome of every row, in row order.
    pub fn outcomes(&self) -> Result<Vec<Subphenotype>> {
        self.df
            .column(&self.schema.outcome)?
            .i32()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.and_then(|c| Subphenotype::from_code(c as i64)).ok_or_else(|| {
                    ProcessingError::Internal(format!("row {row} has no valid outcome"))
                })
            })
            .collect()
    }

    /// Replace the table, keeping the row bookkeeping.
    pub(crate) fn with_frame(&self, df: DataFrame) -> Self {
        Self {
            df,
            kind: self.kind,
            schema: self.schema.clone(),
            source: self.source.clone(),
            source_rows: self.source_rows.clone(),
            dropped_rows: self.dropped_rows,
        }
    }
}

/// Load a cohort CSV file.
///
/// # Errors
///
/// - [`ProcessingError::Io`] if the file cannot be read
/// - [`ProcessingError::Schema`] if a column is absent, an outcome is not
///   0/1, a training outcome is missing, or no rows remain
pub fn load_cohort(path: impl AsRef<Path>, kind: CohortKind, schema: &CohortSchema) -> Result<Cohort> {
    let path = path.as_ref();
    info!(cohort = %kind, path = %path.display(), "Loading cohort");

    let bytes = std::fs::read(path).map_err(|source| ProcessingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bytes = strip_bom(&bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ProcessingError::schema(path, SchemaErrorKind::Empty));
    }

    let mut raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .context(format!("Parsing '{}'", path.display()))?;

    let trimmed: Vec<String> = raw
        .get_column_names_str()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    raw.set_column_names(trimmed.iter().map(String::as_str))?;

    let missing: Vec<String> = schema
        .required_columns()
        .into_iter()
        .filter(|c| !trimmed.contains(c))
        .collect();
    if !missing.is_empty() {
        return Err(ProcessingError::schema(
            path,
            SchemaErrorKind::MissingColumns(missing),
        ));
    }

    let required = schema.required_columns();
    let extra: Vec<&String> = trimmed.iter().filter(|c| !required.contains(c)).collect();
    if !extra.is_empty() {
        debug!(columns = ?extra, "Ignoring columns outside the cohort schema");
    }

    let table = CohortCleaner::new(schema, kind).clean(&raw, path)?;
    if table.df.height() == 0 {
        return Err(ProcessingError::schema(path, SchemaErrorKind::Empty));
    }

    let cohort = Cohort {
        df: table.df,
        kind,
        schema: schema.clone(),
        source: Some(path.to_path_buf()),
        source_rows: table.source_rows,
        dropped_rows: table.dropped_rows,
    };
    info!(
        cohort = %kind,
        rows = cohort.height(),
        dropped = cohort.dropped_rows,
        missing_cells = cohort.missing_cells(),
        "Cohort loaded"
    );
    Ok(cohort)
}
