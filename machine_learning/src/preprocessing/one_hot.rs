use ndarray::ArrayViewMut1;
use serde::{Deserialize, Serialize};

/// One-hot encodes a single categorical column, dropping its first category.
///
/// Categories are sorted, so the dropped reference category is the lexicographically smallest
/// one seen while fitting. Categories never seen while fitting encode as all zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<String>,
}

impl OneHotEncoder {
    /// Learns the categories of a column.
    ///
    /// # Arguments
    /// * `values` - Every value of the column.
    ///
    /// # Returns
    /// A fitted `OneHotEncoder`.
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut categories: Vec<String> = values.into_iter().map(str::to_owned).collect();
        categories.sort_unstable();
        categories.dedup();
        Self { categories }
    }

    /// All the categories learnt, including the dropped one.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Returns the amount of indicator columns this encoder produces.
    pub fn width(&self) -> usize {
        self.categories.len().saturating_sub(1)
    }

    /// Whether the categories are sorted without repetitions, as `fit` leaves them.
    pub fn is_valid(&self) -> bool {
        self.categories.windows(2).all(|w| w[0] < w[1])
    }

    /// The categories that get an indicator column.
    pub fn encoded_categories(&self) -> &[String] {
        self.categories.get(1..).unwrap_or_default()
    }

    /// Writes the indicators of `value` into `out`, which must be `width()` long and zeroed.
    pub fn encode_into(&self, value: &str, mut out: ArrayViewMut1<f64>) {
        if let Ok(idx) = self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            if idx > 0 {
                out[idx - 1] = 1.0;
            }
        }
    }
}
