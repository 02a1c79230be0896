use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::{MlErr, Result};

pub trait Model {
    /// Fits the model's parameters to the given data.
    ///
    /// # Arguments
    /// * `x` - The design matrix, one row per sample.
    /// * `y` - The target of each sample.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()>;

    /// Predicts a target for every row of `x`.
    ///
    /// # Returns
    /// The predictions, or an error if the model isn't fitted or `x` has the wrong width.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>>;

    /// Returns whether `fit` already succeeded.
    fn is_fitted(&self) -> bool;

    /// Checks that a fitted model is internally consistent and takes `width` features.
    ///
    /// Fitting always yields a valid model, this guards models restored from elsewhere.
    fn validate(&self, width: usize) -> Result<()>;
}

/// Checks the shared preconditions of every `Model::fit` implementation.
pub(super) fn check_fit_input(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(MlErr::EmptyDataset);
    }

    if x.nrows() != y.len() {
        return Err(MlErr::SizeMismatch {
            what: "targets",
            got: y.len(),
            expected: x.nrows(),
        });
    }

    Ok(())
}

/// Fails with `NotFitted` unless `fitted`, then with `SizeMismatch` unless `got == expected`.
pub(super) fn check_restored(
    what: &'static str,
    fitted: bool,
    got: usize,
    expected: usize,
) -> Result<()> {
    if !fitted {
        return Err(MlErr::NotFitted { what });
    }

    if got != expected {
        return Err(MlErr::SizeMismatch {
            what: "features",
            got,
            expected,
        });
    }

    Ok(())
}

/// Checks that `x` has as many columns as the model was fitted on.
pub(super) fn check_width(x: ArrayView2<f64>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(MlErr::SizeMismatch {
            what: "features",
            got: x.ncols(),
            expected,
        });
    }

    Ok(())
}
