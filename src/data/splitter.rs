// ============================================================
// Layer 4 — K-Fold Splitter
// ============================================================
// Shuffles the item indices once with a seeded RNG, then cuts
// them into K consecutive holdout slices. Each fold trains on
// the complement of its holdout slice.
//
//   n = 10, k = 3  →  holdout sizes 4, 3, 3
//
// The first n % k folds take one extra item. The same seed
// always produces the same partition.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("at least 2 folds are required, got {0}")]
    TooFewFolds(usize),

    #[error("cannot split {n_items} items into {num_folds} folds")]
    TooFewItems { n_items: usize, num_folds: usize },

    #[error("fold index {fold} is out of range for {num_folds} folds (valid: 0..{num_folds})")]
    FoldOutOfRange { fold: usize, num_folds: usize },

    #[error("no fold selected for training")]
    NoFoldSelected,
}

/// One fold of the partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub index:   usize,
    pub train:   Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Check requested fold indices against the fold count.
pub fn check_folds(fold_index: &[usize], num_folds: usize) -> Result<(), SplitError> {
    if num_folds < 2 {
        return Err(SplitError::TooFewFolds(num_folds));
    }
    if fold_index.is_empty() {
        return Err(SplitError::NoFoldSelected);
    }
    match fold_index.iter().find(|&&f| f >= num_folds) {
        Some(&fold) => Err(SplitError::FoldOutOfRange { fold, num_folds }),
        None => Ok(()),
    }
}

#[derive(Clone, Debug)]
pub struct KFold {
    num_folds: usize,
    seed:      u64,
}

impl KFold {
    pub fn new(num_folds: usize) -> Self {
        Self { num_folds, seed: 42 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Every fold of the partition, in fold order.
    pub fn split(&self, n_items: usize) -> Result<Vec<Fold>, SplitError> {
        if self.num_folds < 2 {
            return Err(SplitError::TooFewFolds(self.num_folds));
        }
        if n_items < self.num_folds {
            return Err(SplitError::TooFewItems { n_items, num_folds: self.num_folds });
        }

        let mut indices: Vec<usize> = (0..n_items).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let fold_size = n_items / self.num_folds;
        let remainder = n_items % self.num_folds;

        let mut folds = Vec::with_capacity(self.num_folds);
        let mut start = 0;
        for index in 0..self.num_folds {
            let end = start + fold_size + usize::from(index < remainder);
            let holdout = indices[start..end].to_vec();
            let train = indices[..start]
                .iter()
                .chain(indices[end..].iter())
                .copied()
                .collect();
            folds.push(Fold { index, train, holdout });
            start = end;
        }

        tracing::debug!("Split {} items into {} folds", n_items, self.num_folds);
        Ok(folds)
    }

    /// The folds named in `fold_index`, in the requested order.
    pub fn select(&self, n_items: usize, fold_index: &[usize]) -> Result<Vec<Fold>, SplitError> {
        check_folds(fold_index, self.num_folds)?;
        let folds = self.split(n_items)?;
        Ok(fold_index.iter().map(|&f| folds[f].clone()).collect())
    }
}
