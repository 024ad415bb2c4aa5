//! Fold assignment for train/test split, k-fold cross-validation and
//! leave-one-out.
use rand::Rng;
use serde::Serialize;

use crate::config::SplitPolicy;
use crate::error::{EvalError, Result};

/// Fold number of every instance of a store.
///
/// For `TrainTest` the held-out fold is 1 and training instances sit in fold 0.
/// For the other policies folds are numbered `1..=num_folds`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldAssignment {
    policy: SplitPolicy,
    folds: Vec<usize>,
    num_folds: usize,
}

impl FoldAssignment {
    pub fn create<R: Rng + ?Sized>(policy: SplitPolicy, n: usize, rng: &mut R) -> Result<Self> {
        policy.validate()?;
        if n == 0 {
            return Err(EvalError::configuration("cannot split an empty store"));
        }

        let (folds, num_folds) = match policy {
            SplitPolicy::TrainTest { test_fraction } => {
                (train_test(n, test_fraction, rng)?, 1)
            }
            SplitPolicy::CrossValidation { folds: k } => {
                if k > n {
                    return Err(EvalError::configuration(format!(
                        "{} folds requested for {} instances",
                        k, n
                    )));
                }
                (cross_validation(n, k, rng), k)
            }
            SplitPolicy::LeaveOneOut => ((1..=n).collect(), n),
        };

        let assignment = Self {
            policy,
            folds,
            num_folds,
        };
        log::debug!(
            "Split {} instances with {:?}: fold sizes {:?}",
            n,
            policy,
            assignment.fold_sizes()
        );
        Ok(assignment)
    }

    pub fn policy(&self) -> SplitPolicy {
        self.policy
    }

    /// Number of test folds (1 for train/test).
    pub fn num_folds(&self) -> usize {
        self.num_folds
    }

    pub fn len(&self) -> usize {
        self.folds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Fold of instance `i`, `None` past the end of the store.
    pub fn fold(&self, i: usize) -> Option<usize> {
        self.folds.get(i).copied()
    }

    pub fn folds(&self) -> &[usize] {
        &self.folds
    }

    /// Positions held out in fold `f`.
    pub fn test_indices(&self, f: usize) -> Vec<usize> {
        (0..self.folds.len()).filter(|&i| self.folds[i] == f).collect()
    }

    /// Positions used for training when fold `f` is held out.
    pub fn train_indices(&self, f: usize) -> Vec<usize> {
        (0..self.folds.len()).filter(|&i| self.folds[i] != f).collect()
    }

    /// Instance count per fold number, indexed `0..=num_folds`.
    pub fn fold_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.num_folds + 1];
        for &f in &self.folds {
            sizes[f] += 1;
        }
        sizes
    }
}

/// Random placement with collision retry.
fn train_test<R: Rng + ?Sized>(n: usize, test_fraction: f64, rng: &mut R) -> Result<Vec<usize>> {
    let test_count = (test_fraction * n as f64).round() as usize;
    if test_count == 0 || test_count >= n {
        return Err(EvalError::configuration(format!(
            "test fraction {} leaves an empty train or test set for {} instances",
            test_fraction, n
        )));
    }

    let mut folds = vec![0; n];
    let mut placed = 0;
    while placed < test_count {
        let pos = rng.gen_range(0..n);
        if folds[pos] == 0 {
            folds[pos] = 1;
            placed += 1;
        }
    }
    Ok(folds)
}

/// floor(n/k) instances per fold drawn without replacement; the remainder
/// lands in fold k.
fn cross_validation<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Vec<usize> {
    let per_fold = n / k;
    let mut folds = vec![k; n];
    let mut unplaced: Vec<usize> = (0..n).collect();
    for fold in 1..k {
        for _ in 0..per_fold {
            let pick = rng.gen_range(0..unplaced.len());
            let pos = unplaced.swap_remove(pick);
            folds[pos] = fold;
        }
    }
    folds
}
