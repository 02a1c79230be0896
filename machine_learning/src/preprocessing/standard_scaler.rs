use serde::{Deserialize, Serialize};

/// Standardizes a numeric column to zero mean and unit variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: f64,
    scale: f64,
}

impl StandardScaler {
    /// Learns the mean and the population standard deviation of a column.
    ///
    /// A constant column gets a scale of 1 so it maps to zeros instead of dividing by zero.
    ///
    /// # Arguments
    /// * `values` - Every value of the column, there must be at least one.
    pub fn fit(values: &[f64]) -> Self {
        let n = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();

        Self {
            mean,
            scale: if std > 0.0 { std } else { 1.0 },
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whether the parameters can transform a finite value into a finite value.
    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }

    #[inline]
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}
