//! Cohort cleaning: typing and encoding of raw text columns.
//!
//! This module provides functionality for:
//! - Coercing lab/vital columns to `Float64`
//! - Encoding the sex column as 0/1
//! - Parsing the outcome column into class codes
//! - Applying the cohort's missing-outcome rule

mod converters;

use crate::config::CohortSchema;
use crate::error::{ProcessingError, Result, SchemaErrorKind};
use crate::types::CohortKind;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// A typed cohort table together with its row bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct CleanedTable {
    pub df: DataFrame,
    /// 0-based raw data-row index of every retained row
    pub source_rows: Vec<usize>,
    pub dropped_rows: usize,
}

/// Converts an all-text cohort table into typed schema columns.
pub(crate) struct CohortCleaner<'a> {
    schema: &'a CohortSchema,
    kind: CohortKind,
}

impl<'a> CohortCleaner<'a> {
    pub fn new(schema: &'a CohortSchema, kind: CohortKind) -> Self {
        Self { schema, kind }
    }

    /// Type every schema column and apply the missing-outcome rule.
    ///
    /// `raw` must contain every schema column as text; columns outside the
    /// schema are discarded. `path` is only used in error messages.
    pub fn clean(&self, raw: &DataFrame, path: &Path) -> Result<CleanedTable> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.schema.n_features() + 1);

        if let Some(sex) = &self.schema.sex {
            let series = raw.column(sex)?.as_materialized_series();
            let encoded = converters::encode_sex(series)?;
            debug!(column = %sex, nulls = encoded.null_count(), "Encoded sex column");
            columns.push(encoded.into());
        }

        for name in &self.schema.numeric {
            let series = raw.column(name)?.as_materialized_series();
            let typed = converters::string_to_f64(series)?;
            let lost = typed.null_count().saturating_sub(series.null_count());
            if lost > 0 {
                debug!(column = %name, cells = lost, "Unparseable values treated as missing");
            }
            columns.push(typed.into());
        }

        let outcome_series = raw.column(&self.schema.outcome)?.as_materialized_series();
        let outcome = converters::parse_outcome(outcome_series)
            .map_err(|kind| ProcessingError::schema(path, kind))?;
        let missing: Vec<bool> = outcome.iter().map(Option::is_none).collect();
        let n_missing = missing.iter().filter(|&&m| m).count();
        columns.push(Series::new(self.schema.outcome.as_str().into(), outcome).into());

        let df = DataFrame::new(columns)?;

        if n_missing == 0 {
            let source_rows = (0..df.height()).collect();
            return Ok(CleanedTable {
                df,
                source_rows,
                dropped_rows: 0,
            });
        }

        if !self.kind.drops_missing_outcome() {
            return Err(ProcessingError::schema(
                path,
                SchemaErrorKind::MissingOutcome { rows: n_missing },
            ));
        }

        warn!(
            cohort = %self.kind,
            rows = n_missing,
            "Dropping rows with a missing {}",
            self.schema.outcome
        );
        let keep = BooleanChunked::from_iter_values(
            "keep".into(),
            missing.iter().map(|&m| !m),
        );
        let df = df.filter(&keep)?;
        let source_rows = missing
            .iter()
            .enumerate()
            .filter(|(_, m)| !**m)
            .map(|(i, _)| i)
            .collect();

        Ok(CleanedTable {
            df,
            source_rows,
            dropped_rows: n_missing,
        })
    }
}
