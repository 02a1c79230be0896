use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    arch::{Model, Regressor},
    preprocessing::{ColumnLayout, ColumnTransformer, FeatureRow},
};

/// A column transformation followed by a regressor, applied the same way when fitting and when
/// predicting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    transformer: ColumnTransformer,
    regressor: Regressor,
}

impl Pipeline {
    /// Fits a new `Pipeline`.
    ///
    /// # Arguments
    /// * `layout` - The columns of the raw records.
    /// * `regressor` - An unfitted regressor.
    /// * `rows` - The training records.
    /// * `y` - The target of every record.
    ///
    /// # Returns
    /// The fitted pipeline or an error if either stage failed to fit.
    pub fn fit(
        layout: ColumnLayout,
        mut regressor: Regressor,
        rows: &[FeatureRow],
        y: ArrayView1<f64>,
    ) -> Result<Self> {
        let transformer = ColumnTransformer::fit(layout, rows)?;
        let x = transformer.transform(rows)?;
        regressor.fit(x.view(), y)?;

        Ok(Self {
            transformer,
            regressor,
        })
    }

    /// Transforms the records and predicts their targets.
    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Array1<f64>> {
        let x = self.transformer.transform(rows)?;
        self.regressor.predict(x.view())
    }

    /// Checks that both stages are consistent and fit together, as they are after `fit`.
    pub fn validate(&self) -> Result<()> {
        self.transformer.validate()?;
        self.regressor.validate(self.transformer.width())
    }

    pub fn transformer(&self) -> &ColumnTransformer {
        &self.transformer
    }

    pub fn regressor(&self) -> &Regressor {
        &self.regressor
    }
}
