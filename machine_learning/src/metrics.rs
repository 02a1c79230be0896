use ndarray::ArrayView1;

/// Mean squared error between the targets and the predictions.
pub fn mse(y: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
    (&y_pred - &y)
        .mapv(|x| x.powi(2))
        .mean()
        .unwrap_or_default()
}

/// Coefficient of determination of the predictions, 1 is a perfect fit.
///
/// A constant target has no variance to explain, in that case the score is 1 for a perfect fit
/// and 0 otherwise.
pub fn r2_score(y: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
    let mean = y.mean().unwrap_or_default();
    let ss_res: f64 = y.iter().zip(&y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn perfect_predictions() {
        let y = array![1.0, 2.0, 3.0];
        assert_eq!(r2_score(y.view(), y.view()), 1.0);
        assert_eq!(mse(y.view(), y.view()), 0.0);
    }

    #[test]
    fn predicting_the_mean_scores_zero() {
        let y = array![1.0, 2.0, 3.0];
        let mean = array![2.0, 2.0, 2.0];
        assert_eq!(r2_score(y.view(), mean.view()), 0.0);
        assert!((mse(y.view(), mean.view()) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn worse_than_the_mean_is_negative() {
        let y = array![1.0, 2.0, 3.0];
        let pred = array![3.0, 2.0, 1.0];
        assert_eq!(r2_score(y.view(), pred.view()), -3.0);
    }

    #[test]
    fn constant_target() {
        let y = array![5.0, 5.0];
        assert_eq!(r2_score(y.view(), array![5.0, 5.0].view()), 1.0);
        assert_eq!(r2_score(y.view(), array![4.0, 6.0].view()), 0.0);
    }
}
