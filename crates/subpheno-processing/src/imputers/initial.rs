//! Starting values for iterative imputation.

/// Mean of the observed values, `None` if nothing is observed.
pub(crate) fn observed_mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Most frequent of 0/1 among the observed values; ties go to 0.
pub(crate) fn observed_majority(values: &[Option<f64>]) -> Option<f64> {
    let (zeros, ones) = values.iter().flatten().fold((0usize, 0usize), |(z, o), &v| {
        if v == 1.0 { (z, o + 1) } else { (z + 1, o) }
    });
    match (zeros, ones) {
        (0, 0) => None,
        (z, o) if o > z => Some(1.0),
        _ => Some(0.0),
    }
}

/// Fill value for a column: majority for binary columns, mean otherwise.
pub(crate) fn initial_value(values: &[Option<f64>], binary: bool) -> Option<f64> {
    if binary {
        observed_majority(values)
    } else {
        observed_mean(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_mean() {
        assert_eq!(observed_mean(&[Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(observed_mean(&[None, None]), None);
    }

    #[test]
    fn test_observed_majority() {
        assert_eq!(observed_majority(&[Some(1.0), Some(1.0), Some(0.0), None]), Some(1.0));
        assert_eq!(observed_majority(&[Some(1.0), Some(0.0)]), Some(0.0));
        assert_eq!(observed_majority(&[None]), None);
    }

    #[test]
    fn test_initial_value_by_kind() {
        let values = [Some(0.0), Some(1.0), Some(1.0)];
        assert_eq!(initial_value(&values, true), Some(1.0));
        let mean = initial_value(&values, false).unwrap();
        assert!((mean - 2.0 / 3.0).abs() < 1e-12);
    }
}
