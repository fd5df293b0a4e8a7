//! Stratified k-fold assignment of training rows.

use crate::error::{LearningError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use subpheno_processing::Subphenotype;

/// A partition of `n` rows into `k` disjoint folds.
///
/// Rows of each class are shuffled and dealt round-robin over the folds, the
/// second class continuing where the first left off. Fold sizes therefore
/// differ by at most one, and every fold sees both classes whenever each
/// class has at least `k` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldAssignment {
    k: usize,
    fold_of: Vec<usize>,
}

impl FoldAssignment {
    /// Assign rows with the given outcomes to `k` stratified folds.
    ///
    /// The same outcomes and seed always give the same partition.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidConfig`] unless `2 <= k <= outcomes.len()`.
    pub fn stratified(outcomes: &[Subphenotype], k: usize, seed: u64) -> Result<Self> {
        let n = outcomes.len();
        if k < 2 {
            return Err(LearningError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {k}"
            )));
        }
        if k > n {
            return Err(LearningError::InvalidConfig(format!(
                "cannot split {n} rows into {k} folds"
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut fold_of = vec![0; n];
        let mut dealt = 0usize;
        for class in Subphenotype::all() {
            let mut positions: Vec<usize> = (0..n).filter(|&i| outcomes[i] == class).collect();
            positions.shuffle(&mut rng);
            for pos in positions {
                fold_of[pos] = dealt % k;
                dealt += 1;
            }
        }

        Ok(Self { k, fold_of })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of rows partitioned.
    pub fn len(&self) -> usize {
        self.fold_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fold_of.is_empty()
    }

    /// Fold holding row `position`.
    pub fn fold_of(&self, position: usize) -> usize {
        self.fold_of[position]
    }

    /// Rows held out in fold `fold`, ascending.
    pub fn test_positions(&self, fold: usize) -> Vec<usize> {
        self.positions(|f| f == fold)
    }

    /// Rows used for fitting when fold `fold` is held out, ascending.
    pub fn train_positions(&self, fold: usize) -> Vec<usize> {
        self.positions(|f| f != fold)
    }

    pub fn fold_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &f in &self.fold_of {
            sizes[f] += 1;
        }
        sizes
    }

    fn positions(&self, keep: impl Fn(usize) -> bool) -> Vec<usize> {
        self.fold_of
            .iter()
            .enumerate()
            .filter(|&(_, &f)| keep(f))
            .map(|(i, _)| i)
            .collect()
    }
}
