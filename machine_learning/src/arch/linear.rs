use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::{
    Model,
    model::{check_fit_input, check_restored, check_width},
};
use crate::{MlErr, Result};

const PIVOT_EPS: f64 = 1e-10;

/// Ordinary least squares linear regression with an intercept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    fitted: bool,
}

impl LinearRegression {
    /// Creates a new unfitted `LinearRegression`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Model for LinearRegression {
    /// Solves the normal equations over the centered data.
    ///
    /// Centering removes the intercept from the system, it's recovered afterwards from the
    /// column means. Collinear columns get a coefficient of zero.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        check_fit_input(x, y)?;

        let x_mean = x.mean_axis(Axis(0)).ok_or(MlErr::EmptyDataset)?;
        let y_mean = y.mean().ok_or(MlErr::EmptyDataset)?;

        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        let gram = xc.t().dot(&xc);
        let moments = xc.t().dot(&yc);
        let coefficients = solve(gram, moments);

        self.intercept = y_mean - x_mean.dot(&coefficients);
        self.coefficients = coefficients.to_vec();
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(MlErr::NotFitted {
                what: "linear regression",
            });
        }

        check_width(x, self.coefficients.len())?;
        let w = ArrayView1::from(&self.coefficients);
        Ok(x.dot(&w) + self.intercept)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn validate(&self, width: usize) -> Result<()> {
        check_restored("linear regression", self.fitted, self.coefficients.len(), width)?;

        let mut weights = self.coefficients.iter().chain([&self.intercept]);
        if weights.any(|w| !w.is_finite()) {
            return Err(MlErr::Malformed {
                what: "linear regression",
                reason: "non finite weight".into(),
            });
        }

        Ok(())
    }
}

/// Solves `a * w = b` for a symmetric positive semi-definite `a` through Gaussian elimination
/// with partial pivoting.
///
/// Whenever a pivot vanishes its column is dependent on the previous ones, so its unknown is
/// pinned to zero and the elimination moves on.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let scale = a.diag().iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    let mut pivoted = vec![false; n];

    for col in 0..n {
        let Some(pivot) = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
        else {
            break;
        };

        if a[[pivot, col]].abs() <= PIVOT_EPS * scale {
            continue;
        }

        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }

        pivoted[col] = true;
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }

            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut w = Array1::zeros(n);
    for row in (0..n).rev() {
        if !pivoted[row] {
            continue;
        }

        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * w[k]).sum();
        w[row] = (b[row] - tail) / a[[row, row]];
    }

    w
}
