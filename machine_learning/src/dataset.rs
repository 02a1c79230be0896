use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{MlErr, Result};

/// The row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Randomly partitions `0..len` into a training and a held-out set.
///
/// The indices are shuffled with a generator seeded by `seed`, the first
/// `ceil(len * test_fraction)` of them are held out and the rest are used for training.
///
/// # Arguments
/// * `len` - The amount of rows to split.
/// * `test_fraction` - The proportion of rows to hold out, in the open interval (0, 1).
/// * `seed` - The seed of the shuffle.
///
/// # Returns
/// The partition or an `InvalidSplit` error if either side would end up empty.
pub fn train_test_split(len: usize, test_fraction: f64, seed: u64) -> Result<Split> {
    let invalid = MlErr::InvalidSplit { test_fraction, len };
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(invalid);
    }

    let ntest = (len as f64 * test_fraction).ceil() as usize;
    if ntest == 0 || ntest >= len {
        return Err(invalid);
    }

    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(ntest);
    Ok(Split {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_a_seeded_partition() {
        let split = train_test_split(1000, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 200);
        assert_eq!(split.train.len(), 800);

        let mut all: Vec<_> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());

        assert_eq!(split, train_test_split(1000, 0.2, 42).unwrap());
        assert_ne!(split, train_test_split(1000, 0.2, 7).unwrap());
    }

    #[test]
    fn split_rounds_the_held_out_side_up() {
        let split = train_test_split(11, 0.2, 0).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn split_rejects_degenerate_fractions() {
        assert!(train_test_split(10, 0.0, 0).is_err());
        assert!(train_test_split(10, 1.0, 0).is_err());
        assert!(train_test_split(1, 0.5, 0).is_err());
    }
}
