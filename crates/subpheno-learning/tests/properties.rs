//! Property tests for ROC/AUC and stratified fold assignment.

use proptest::prelude::*;
use subpheno_learning::{FoldAssignment, PredictionRecord, compute_auc, compute_roc};
use subpheno_processing::Subphenotype;

fn subphenotype(class0: bool) -> Subphenotype {
    if class0 {
        Subphenotype::Hypoinflammatory
    } else {
        Subphenotype::Hyperinflammatory
    }
}

/// Scores on a 1/20 grid so that ties are common. The first two records are
/// forced to opposite classes.
fn records(raw: &[(bool, u32)]) -> Vec<PredictionRecord> {
    raw.iter()
        .enumerate()
        .map(|(i, &(class0, bucket))| PredictionRecord {
            row_id: i,
            truth: subphenotype(match i {
                0 => true,
                1 => false,
                _ => class0,
            }),
            prob_class0: f64::from(bucket) / 20.0,
        })
        .collect()
}

/// Probability that a random class-0 record outscores a random class-1
/// record, counting ties as one half.
fn pairwise_auc(records: &[PredictionRecord]) -> f64 {
    let (pos, neg): (Vec<&PredictionRecord>, Vec<&PredictionRecord>) = records
        .iter()
        .partition(|r| r.truth == Subphenotype::Hypoinflammatory);
    let mut wins = 0.0;
    for p in &pos {
        for n in &neg {
            if p.prob_class0 > n.prob_class0 {
                wins += 1.0;
            } else if p.prob_class0 == n.prob_class0 {
                wins += 0.5;
            }
        }
    }
    wins / (pos.len() * neg.len()) as f64
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_roc_is_monotone_unit_path(raw in prop::collection::vec((any::<bool>(), 0..=20u32), 2..80)) {
        let records = records(&raw);
        let roc = compute_roc(&records).unwrap();

        let first = roc.points.first().unwrap();
        let last = roc.points.last().unwrap();
        prop_assert_eq!((first.fpr, first.tpr), (0.0, 0.0));
        prop_assert!((last.fpr - 1.0).abs() < 1e-12 && (last.tpr - 1.0).abs() < 1e-12);
        for w in roc.points.windows(2) {
            prop_assert!(w[0].fpr <= w[1].fpr);
            prop_assert!(w[0].tpr <= w[1].tpr);
        }

        let auc = compute_auc(&records).unwrap();
        prop_assert!((0.0..=1.0).contains(&auc));
    }

    #[test]
    fn prop_auc_matches_pairwise_ranking(raw in prop::collection::vec((any::<bool>(), 0..=20u32), 2..80)) {
        let records = records(&raw);
        let auc = compute_auc(&records).unwrap();
        prop_assert!((auc - pairwise_auc(&records)).abs() < 1e-9);
    }

    #[test]
    fn prop_reversed_scores_complement_auc(raw in prop::collection::vec((any::<bool>(), 0..=20u32), 2..80)) {
        let records = records(&raw);
        let reversed: Vec<PredictionRecord> = records
            .iter()
            .map(|r| PredictionRecord { prob_class0: 1.0 - r.prob_class0, ..*r })
            .collect();
        let sum = compute_auc(&records).unwrap() + compute_auc(&reversed).unwrap();
        prop_assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_folds_partition_and_stratify(
        classes in prop::collection::vec(any::<bool>(), 10..120),
        k in 2..=10usize,
        seed in 0..1000u64,
    ) {
        let outcomes: Vec<Subphenotype> = classes.iter().map(|&c| subphenotype(c)).collect();
        let folds = FoldAssignment::stratified(&outcomes, k, seed).unwrap();

        prop_assert_eq!(folds.len(), outcomes.len());
        let mut seen = vec![0usize; outcomes.len()];
        for fold in 0..k {
            for position in folds.test_positions(fold) {
                seen[position] += 1;
                prop_assert_eq!(folds.fold_of(position), fold);
            }
            prop_assert_eq!(
                folds.train_positions(fold).len() + folds.test_positions(fold).len(),
                outcomes.len()
            );
        }
        prop_assert!(seen.iter().all(|&n| n == 1));

        for class in [Subphenotype::Hypoinflammatory, Subphenotype::Hyperinflammatory] {
            let per_fold: Vec<usize> = (0..k)
                .map(|fold| {
                    folds
                        .test_positions(fold)
                        .into_iter()
                        .filter(|&p| outcomes[p] == class)
                        .count()
                })
                .collect();
            let max = per_fold.iter().max().copied().unwrap_or(0);
            let min = per_fold.iter().min().copied().unwrap_or(0);
            prop_assert!(max - min <= 1, "class {:?} spread {:?}", class, per_fold);
        }

        let again = FoldAssignment::stratified(&outcomes, k, seed).unwrap();
        prop_assert_eq!(folds, again);
    }
}
