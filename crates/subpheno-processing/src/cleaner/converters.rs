//! Text-to-typed conversions for cohort columns.
//!
//! Cohort files are read with every column as text. These converters turn
//! the raw text into typed series, mapping unparseable cells to nulls. Only
//! the outcome column treats a malformed value as an error.

use crate::error::SchemaErrorKind;
use crate::types::Subphenotype;
use crate::utils::{is_missing_token, parse_numeric_string};
use polars::prelude::*;

/// Convert a text series to `Float64`.
///
/// Blank cells, missing markers and non-numeric tokens become null.
pub(crate) fn string_to_f64(series: &Series) -> PolarsResult<Series> {
    let values: Vec<Option<f64>> = series
        .str()?
        .into_iter()
        .map(|opt| opt.and_then(parse_numeric_string))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Encode a text sex column as `Float64`: male -> 0, female -> 1.
///
/// Matching is trimmed and case-insensitive; anything else is null.
pub(crate) fn encode_sex(series: &Series) -> PolarsResult<Series> {
    let values: Vec<Option<f64>> = series
        .str()?
        .into_iter()
        .map(|opt| opt.and_then(sex_code))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

fn sex_code(raw: &str) -> Option<f64> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "m" | "male" => Some(0.0),
        "f" | "female" => Some(1.0),
        _ => None,
    }
}

/// Parse the outcome column into class codes.
///
/// Blank cells and missing markers become null. Any other token that is not
/// numerically 0 or 1 is reported with its 0-based data-row index.
pub(crate) fn parse_outcome(series: &Series) -> Result<Vec<Option<i32>>, SchemaErrorKind> {
    let text = series.str().map_err(|_| SchemaErrorKind::InvalidOutcome {
        row: 0,
        value: format!("<{} column>", series.dtype()),
    })?;

    text.into_iter()
        .enumerate()
        .map(|(row, opt)| match opt {
            None => Ok(None),
            Some(raw) if is_missing_token(raw) => Ok(None),
            Some(raw) => parse_numeric_string(raw)
                .filter(|v| v.fract() == 0.0)
                .and_then(|v| Subphenotype::from_code(v as i64))
                .map(|class| Some(class.code()))
                .ok_or_else(|| SchemaErrorKind::InvalidOutcome {
                    row,
                    value: raw.trim().to_string(),
                }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_values(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    // ========================================================================
    // string_to_f64() tests
    // ========================================================================

    #[test]
    fn test_string_to_f64_basic() {
        let series = Series::new("ALT_max".into(), &["12.5", "40", " 7 "]);
        let result = string_to_f64(&series).unwrap();
        assert_eq!(result.dtype(), &DataType::Float64);
        assert_eq!(f64_values(&result), vec![Some(12.5), Some(40.0), Some(7.0)]);
    }

    #[test]
    fn test_string_to_f64_bad_tokens_become_null() {
        let series = Series::new(
            "CRP_max".into(),
            &[Some("NA"), Some(""), Some("hemolyzed"), None, Some("1,200")],
        );
        let result = string_to_f64(&series).unwrap();
        assert_eq!(
            f64_values(&result),
            vec![None, None, None, None, Some(1200.0)]
        );
    }

    // ========================================================================
    // encode_sex() tests
    // ========================================================================

    #[test]
    fn test_encode_sex() {
        let series = Series::new(
            "Sex".into(),
            &[Some("M"), Some("f"), Some(" Female "), Some("male"), Some("U"), Some("NA"), None],
        );
        let result = encode_sex(&series).unwrap();
        assert_eq!(
            f64_values(&result),
            vec![Some(0.0), Some(1.0), Some(1.0), Some(0.0), None, None, None]
        );
    }

    // ========================================================================
    // parse_outcome() tests
    // ========================================================================

    #[test]
    fn test_parse_outcome_valid() {
        let series = Series::new("Class".into(), &[Some("0"), Some("1"), Some("1.0"), Some(""), None]);
        assert_eq!(
            parse_outcome(&series).unwrap(),
            vec![Some(0), Some(1), Some(1), None, None]
        );
    }

    #[test]
    fn test_parse_outcome_rejects_other_values() {
        let series = Series::new("Class".into(), &["0", "1", "2"]);
        assert_eq!(
            parse_outcome(&series).unwrap_err(),
            SchemaErrorKind::InvalidOutcome {
                row: 2,
                value: "2".to_string()
            }
        );

        let series = Series::new("Class".into(), &["hyper"]);
        assert!(matches!(
            parse_outcome(&series).unwrap_err(),
            SchemaErrorKind::InvalidOutcome { row: 0, .. }
        ));
    }
}
