//! Design matrices and target encodings handed to classifier strategies.

use crate::error::{LearningError, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use subpheno_processing::{Cohort, ImputedCohort, Subphenotype};

/// Target representation a strategy's algorithm expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEncoding {
    /// Class labels (`Subphenotype`)
    Factor,
    /// Numeric 0/1 codes (`Class` value as `f64`)
    Numeric,
}

/// Outcomes converted to the encoding a strategy declared.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedTarget {
    Factor(Vec<Subphenotype>),
    Numeric(Vec<f64>),
}

impl EncodedTarget {
    pub fn encode(outcomes: &[Subphenotype], encoding: TargetEncoding) -> Self {
        match encoding {
            TargetEncoding::Factor => EncodedTarget::Factor(outcomes.to_vec()),
            TargetEncoding::Numeric => {
                EncodedTarget::Numeric(outcomes.iter().map(|c| f64::from(c.code())).collect())
            }
        }
    }

    pub fn encoding(&self) -> TargetEncoding {
        match self {
            EncodedTarget::Factor(_) => TargetEncoding::Factor,
            EncodedTarget::Numeric(_) => TargetEncoding::Numeric,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EncodedTarget::Factor(v) => v.len(),
            EncodedTarget::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class labels, or `InvalidData` if the target was numerically encoded.
    pub fn as_factor(&self) -> Result<&[Subphenotype]> {
        match self {
            EncodedTarget::Factor(v) => Ok(v),
            EncodedTarget::Numeric(_) => Err(LearningError::InvalidData(
                "expected a class-label target, got a numeric 0/1 target".to_string(),
            )),
        }
    }

    /// Numeric 0/1 codes, or `InvalidData` if the target holds class labels.
    pub fn as_numeric(&self) -> Result<&[f64]> {
        match self {
            EncodedTarget::Numeric(v) => Ok(v),
            EncodedTarget::Factor(_) => Err(LearningError::InvalidData(
                "expected a numeric 0/1 target, got class labels".to_string(),
            )),
        }
    }
}

/// Features, outcomes and row ids of one cohort, ready for fitting.
///
/// `row_ids[i]` is the position of row `i` in the cohort it was built from;
/// subsets keep the original ids.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    features: Array2<f64>,
    outcomes: Vec<Subphenotype>,
    row_ids: Vec<usize>,
    feature_names: Vec<String>,
}

impl DesignMatrix {
    /// Assemble a design matrix, checking shapes and finiteness.
    pub fn new(
        features: Array2<f64>,
        outcomes: Vec<Subphenotype>,
        row_ids: Vec<usize>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if features.nrows() != outcomes.len() || features.nrows() != row_ids.len() {
            return Err(LearningError::InvalidData(format!(
                "{} feature rows, {} outcomes and {} row ids do not line up",
                features.nrows(),
                outcomes.len(),
                row_ids.len()
            )));
        }
        if features.ncols() != feature_names.len() {
            return Err(LearningError::InvalidData(format!(
                "{} feature columns but {} feature names",
                features.ncols(),
                feature_names.len()
            )));
        }
        if let Some(((row, col), _)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(LearningError::InvalidData(format!(
                "non-finite value in column '{}' at row {row}",
                feature_names[col]
            )));
        }
        Ok(Self {
            features,
            outcomes,
            row_ids,
            feature_names,
        })
    }

    /// Build from a cohort without missing feature values.
    pub fn from_cohort(cohort: &Cohort) -> Result<Self> {
        let names = cohort.schema().feature_columns();
        let n_rows = cohort.height();
        let mut features = Array2::<f64>::zeros((n_rows, names.len()));

        for (j, name) in names.iter().enumerate() {
            let column = cohort.df().column(name)?.f64()?;
            for (i, value) in column.into_iter().enumerate() {
                features[[i, j]] = value.ok_or_else(|| {
                    LearningError::InvalidData(format!(
                        "column '{name}' has missing values; impute the cohort first"
                    ))
                })?;
            }
        }

        let outcomes = cohort.outcomes()?;
        Self::new(features, outcomes, (0..n_rows).collect(), names)
    }

    pub fn from_imputed(imputed: &ImputedCohort) -> Result<Self> {
        Self::from_cohort(imputed.cohort())
    }

    /// Rows at the given positions, keeping their row ids.
    pub fn subset(&self, positions: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), positions),
            outcomes: positions.iter().map(|&i| self.outcomes[i]).collect(),
            row_ids: positions.iter().map(|&i| self.row_ids[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn outcomes(&self) -> &[Subphenotype] {
        &self.outcomes
    }

    pub fn row_ids(&self) -> &[usize] {
        &self.row_ids
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Row counts of (class 0, class 1).
    pub fn class_counts(&self) -> (usize, usize) {
        let ones = self
            .outcomes
            .iter()
            .filter(|c| **c == Subphenotype::Hyperinflammatory)
            .count();
        (self.outcomes.len() - ones, ones)
    }

    /// Encode the outcomes for a strategy.
    pub fn encode_target(&self, encoding: TargetEncoding) -> EncodedTarget {
        EncodedTarget::encode(&self.outcomes, encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use polars::prelude::*;
    use subpheno_processing::{CohortKind, CohortSchema};

    use subpheno_processing::Subphenotype::{Hyperinflammatory as Hyper, Hypoinflammatory as Hypo};

    fn matrix() -> DesignMatrix {
        DesignMatrix::new(
            array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
            vec![Hypo, Hyper, Hypo],
            vec![0, 1, 2],
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_subset_keeps_row_ids() {
        let sub = matrix().subset(&[2, 0]);
        assert_eq!(sub.row_ids(), &[2, 0]);
        assert_eq!(sub.outcomes(), &[Hypo, Hypo]);
        assert_eq!(sub.features(), array![[5.0, 6.0], [1.0, 2.0]].view());
    }

    #[test]
    fn test_new_rejects_mismatch_and_nan() {
        let err = DesignMatrix::new(array![[1.0]], vec![], vec![], vec!["a".to_string()]).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(_)));

        let err = DesignMatrix::new(
            array![[f64::NAN]],
            vec![Hypo],
            vec![0],
            vec!["a".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_target_encodings() {
        let m = matrix();
        let numeric = m.encode_target(TargetEncoding::Numeric);
        assert_eq!(numeric.as_numeric().unwrap(), &[0.0, 1.0, 0.0]);
        assert!(numeric.as_factor().is_err());

        let factor = m.encode_target(TargetEncoding::Factor);
        assert_eq!(factor.encoding(), TargetEncoding::Factor);
        assert!(matches!(
            factor.as_numeric().unwrap_err(),
            LearningError::InvalidData(_)
        ));
        assert_eq!(m.class_counts(), (2, 1));
    }

    #[test]
    fn test_from_cohort_requires_complete_features() {
        let schema = CohortSchema::new("Class", vec!["x".to_string()]);
        let df = df!["x" => [Some(1.0), None], "Class" => [0i32, 1]].unwrap();
        let cohort = Cohort::from_dataframe(df, CohortKind::Training, &schema).unwrap();
        assert!(DesignMatrix::from_cohort(&cohort).is_err());

        let df = df!["x" => [1.0, 2.0], "Class" => [0i32, 1]].unwrap();
        let cohort = Cohort::from_dataframe(df, CohortKind::Training, &schema).unwrap();
        let m = DesignMatrix::from_cohort(&cohort).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.outcomes(), &[Hypo, Hyper]);
    }
}
