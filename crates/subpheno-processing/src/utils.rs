//! Cell parsing, seeding and column helpers shared by the loader, the
//! imputer and the learning crate.

use polars::prelude::*;

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Formatting characters stripped before a lab value is parsed.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Tokens read as a missing measurement (compared lowercase).
pub const ERROR_MARKERS: [&str; 10] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a", ".",
];

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Trim a cell and drop thousands separators, units and currency marks.
///
/// # Example
///
/// ```rust,ignore
/// use subpheno_processing::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("1,234.56"), "1234.56");
/// assert_eq!(clean_numeric_string("  42%  "), "42");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !NUMERIC_FORMAT_CHARS.contains(c))
        .collect()
}

/// `true` for NA-style tokens such as `N/A`, `NaN` or `missing`.
pub fn is_error_marker(s: &str) -> bool {
    let token = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.contains(&token.as_str())
}

/// Check if a cell is blank or holds a missing marker.
#[inline]
pub fn is_missing_token(s: &str) -> bool {
    s.trim().is_empty() || is_error_marker(s)
}

/// Try to parse a string as a finite numeric value (f64).
///
/// Handles common formatting like percentages and thousands separators.
/// Missing markers, non-numeric text and non-finite values yield `None`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    if is_error_marker(s) {
        return None;
    }
    match clean_numeric_string(s) {
        cleaned if cleaned.is_empty() => None,
        cleaned => cleaned.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

/// Remove a leading UTF-8 byte-order mark, if present.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

// =============================================================================
// Seeding Utilities
// =============================================================================

/// Derive an independent seed for sub-stream `stream` of `base`.
///
/// Used to give every forest, tree and fold its own reproducible RNG.
#[inline]
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    // splitmix64 finalizer over a Weyl step
    let mut z = base.wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Read a numeric column as `Vec<Option<f64>>`.
pub fn column_to_f64(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Check whether every observed value is 0 or 1.
pub fn is_binary(values: &[Option<f64>]) -> bool {
    let mut observed = values.iter().flatten().peekable();
    observed.peek().is_some() && observed.all(|&v| v == 0.0 || v == 1.0)
}
