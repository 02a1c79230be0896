use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    Model, RegressionTree, TreeParams,
    model::{check_fit_input, check_restored, check_width},
};
use crate::{MlErr, Result};

/// A bagged ensemble of regression trees whose prediction is the mean of its trees.
///
/// Every tree draws its bootstrap sample from its own generator, seeded with `seed + i`, so the
/// fitted forest is the same no matter how the trees get scheduled across threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_trees: usize,
    seed: u64,
    params: TreeParams,
    trees: Vec<RegressionTree>,
    width: usize,
}

impl RandomForest {
    /// Creates a new unfitted `RandomForest`.
    ///
    /// # Arguments
    /// * `n_trees` - The amount of trees in the ensemble.
    /// * `seed` - The base seed of the bootstrap samples.
    /// * `params` - The growth limits of every tree.
    pub fn new(n_trees: usize, seed: u64, params: TreeParams) -> Self {
        Self {
            n_trees,
            seed,
            params,
            trees: Vec::new(),
            width: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }
}

impl Model for RandomForest {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.n_trees == 0 {
            return Err(MlErr::SizeMismatch {
                what: "forest trees",
                got: 0,
                expected: 1,
            });
        }

        let n = x.nrows();
        let trees = (0..self.n_trees)
            .into_par_iter()
            .map(|i| -> Result<RegressionTree> {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let samples = (0..n).map(|_| rng.random_range(0..n)).collect();

                let mut tree = RegressionTree::new(self.params);
                tree.fit_samples(x, y, samples)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(trees = trees.len(), rows = n; "fitted random forest");
        self.trees = trees;
        self.width = x.ncols();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(MlErr::NotFitted {
                what: "random forest",
            });
        }

        check_width(x, self.width)?;
        let mut out = Array1::<f64>::zeros(x.nrows());
        Zip::from(&mut out)
            .and(x.rows())
            .par_for_each(|o, row| *o = self.predict_row(row));

        Ok(out)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn validate(&self, width: usize) -> Result<()> {
        check_restored("random forest", self.is_fitted(), self.width, width)?;
        self.trees.iter().try_for_each(|tree| tree.validate(width))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    fn noisy_line(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| 3.0 * v + if v as usize % 2 == 0 { 1.0 } else { -1.0 });
        (x, y)
    }

    #[test]
    fn fitting_is_reproducible() {
        let (x, y) = noisy_line(50);

        let mut a = RandomForest::new(8, 42, TreeParams::default());
        let mut b = RandomForest::new(8, 42, TreeParams::default());
        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.trees().len(), 8);
    }

    #[test]
    fn different_seeds_draw_different_samples() {
        let (x, y) = noisy_line(50);

        let mut a = RandomForest::new(4, 1, TreeParams::default());
        let mut b = RandomForest::new(4, 2, TreeParams::default());
        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn prediction_is_the_mean_of_the_trees() {
        let (x, y) = noisy_line(30);
        let mut forest = RandomForest::new(5, 7, TreeParams::default());
        forest.fit(x.view(), y.view()).unwrap();

        let point = array![[12.3]];
        let expected = forest
            .trees()
            .iter()
            .map(|t| t.predict(point.view()).unwrap()[0])
            .sum::<f64>()
            / 5.0;

        let got = forest.predict(point.view()).unwrap()[0];
        assert!((got - expected).abs() < 1e-12);
        assert!((got - 3.0 * 12.3).abs() < 10.0);
    }

    #[test]
    fn zero_trees_cannot_be_fitted() {
        let (x, y) = noisy_line(4);
        let mut forest = RandomForest::new(0, 0, TreeParams::default());
        assert!(forest.fit(x.view(), y.view()).is_err());
    }
}
