use ndarray::{Array2, s};
use serde::{Deserialize, Serialize};

use super::{OneHotEncoder, StandardScaler};
use crate::{MlErr, Result};

/// The names of the raw columns, split by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub categorical: Vec<String>,
    pub numeric: Vec<String>,
}

impl ColumnLayout {
    pub fn new<C, N>(categorical: C, numeric: N) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            categorical: categorical.into_iter().map(Into::into).collect(),
            numeric: numeric.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single raw record, its values ordered as the columns of a `ColumnLayout`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub categorical: Vec<String>,
    pub numeric: Vec<f64>,
}

/// Turns raw records into a numeric design matrix.
///
/// Categorical columns are one-hot encoded and numeric columns are standardized. The output
/// holds every indicator block first, in column order, followed by the scaled numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    layout: ColumnLayout,
    encoders: Vec<OneHotEncoder>,
    scalers: Vec<StandardScaler>,
}

impl ColumnTransformer {
    /// Fits an encoder per categorical column and a scaler per numeric column.
    ///
    /// # Arguments
    /// * `layout` - The columns the rows follow.
    /// * `rows` - The training records.
    ///
    /// # Returns
    /// The fitted transformer, or an error if there are no rows or a row doesn't follow `layout`.
    pub fn fit(layout: ColumnLayout, rows: &[FeatureRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        for row in rows {
            check_arity(&layout, row)?;
            check_finite(&layout, row)?;
        }

        let encoders = (0..layout.categorical.len())
            .map(|col| OneHotEncoder::fit(rows.iter().map(|r| r.categorical[col].as_str())))
            .collect();

        let scalers = (0..layout.numeric.len())
            .map(|col| {
                let values: Vec<f64> = rows.iter().map(|r| r.numeric[col]).collect();
                StandardScaler::fit(&values)
            })
            .collect();

        Ok(Self {
            layout,
            encoders,
            scalers,
        })
    }

    /// Checks that there's a valid encoder per categorical column and a valid scaler per
    /// numeric column.
    pub fn validate(&self) -> Result<()> {
        let malformed = |reason: &str| MlErr::Malformed {
            what: "column transformer",
            reason: reason.to_string(),
        };

        if self.encoders.len() != self.layout.categorical.len() {
            return Err(malformed("one encoder per categorical column is required"));
        }

        if self.scalers.len() != self.layout.numeric.len() {
            return Err(malformed("one scaler per numeric column is required"));
        }

        if !self.encoders.iter().all(OneHotEncoder::is_valid) {
            return Err(malformed("categories must be sorted and distinct"));
        }

        if !self.scalers.iter().all(StandardScaler::is_valid) {
            return Err(malformed("scalers must have a finite mean and a positive scale"));
        }

        Ok(())
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Returns the amount of columns `transform` outputs.
    pub fn width(&self) -> usize {
        self.encoders.iter().map(OneHotEncoder::width).sum::<usize>() + self.scalers.len()
    }

    /// The names of the output columns, indicators are named `<column>_<category>`.
    pub fn feature_names(&self) -> Vec<String> {
        let indicators = self
            .layout
            .categorical
            .iter()
            .zip(&self.encoders)
            .flat_map(|(name, enc)| {
                enc.encoded_categories()
                    .iter()
                    .map(move |cat| format!("{name}_{cat}"))
            });

        indicators.chain(self.layout.numeric.iter().cloned()).collect()
    }

    /// Transforms raw records into a design matrix.
    ///
    /// # Arguments
    /// * `rows` - The records to transform.
    ///
    /// # Returns
    /// A `(rows.len(), width())` matrix, or an error if a row doesn't follow the layout or holds
    /// a non finite number.
    pub fn transform(&self, rows: &[FeatureRow]) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((rows.len(), self.width()));

        for (i, row) in rows.iter().enumerate() {
            check_arity(&self.layout, row)?;
            check_finite(&self.layout, row)?;

            let mut offset = 0;
            for (encoder, value) in self.encoders.iter().zip(&row.categorical) {
                let width = encoder.width();
                encoder.encode_into(value, out.slice_mut(s![i, offset..offset + width]));
                offset += width;
            }

            for (scaler, &value) in self.scalers.iter().zip(&row.numeric) {
                out[[i, offset]] = scaler.transform(value);
                offset += 1;
            }
        }

        Ok(out)
    }
}

fn check_arity(layout: &ColumnLayout, row: &FeatureRow) -> Result<()> {
    if row.categorical.len() != layout.categorical.len() {
        return Err(MlErr::SizeMismatch {
            what: "categorical columns",
            got: row.categorical.len(),
            expected: layout.categorical.len(),
        });
    }

    if row.numeric.len() != layout.numeric.len() {
        return Err(MlErr::SizeMismatch {
            what: "numeric columns",
            got: row.numeric.len(),
            expected: layout.numeric.len(),
        });
    }

    Ok(())
}

fn check_finite(layout: &ColumnLayout, row: &FeatureRow) -> Result<()> {
    match row.numeric.iter().position(|v| !v.is_finite()) {
        Some(col) => Err(MlErr::NonFinite {
            column: layout.numeric[col].clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn row(soil: &str, crop: &str, temp: f64, ph: f64) -> FeatureRow {
        FeatureRow {
            categorical: vec![soil.into(), crop.into()],
            numeric: vec![temp, ph],
        }
    }

    fn fitted() -> ColumnTransformer {
        let layout = ColumnLayout::new(["Soil_Type", "Crop"], ["Temperature", "PH"]);
        let rows = [
            row("Clay", "Rice", 20.0, 6.0),
            row("Loamy", "Wheat", 30.0, 6.0),
            row("Sandy", "Rice", 25.0, 6.0),
        ];
        ColumnTransformer::fit(layout, &rows).unwrap()
    }

    #[test]
    fn indicators_come_before_scaled_numbers() {
        let ct = fitted();
        assert_eq!(ct.width(), 5);
        assert_eq!(
            ct.feature_names(),
            ["Soil_Type_Loamy", "Soil_Type_Sandy", "Crop_Wheat", "Temperature", "PH"]
        );

        let x = ct.transform(&[row("Sandy", "Wheat", 25.0, 6.0)]).unwrap();
        assert_eq!(x, array![[0.0, 1.0, 1.0, 0.0, 0.0]]);
    }

    #[test]
    fn unseen_categories_do_not_fail() {
        let ct = fitted();
        let x = ct.transform(&[row("Volcanic", "Quinoa", 25.0, 6.0)]).unwrap();
        assert_eq!(x.row(0).slice(s![..3]), array![0.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_rows_with_the_wrong_arity() {
        let ct = fitted();
        let bad = FeatureRow {
            categorical: vec!["Clay".into()],
            numeric: vec![25.0, 6.0],
        };
        assert!(matches!(
            ct.transform(&[bad]),
            Err(MlErr::SizeMismatch { got: 1, expected: 2, .. })
        ));
    }

    #[test]
    fn rejects_non_finite_numbers() {
        let ct = fitted();
        let err = ct.transform(&[row("Clay", "Rice", f64::NAN, 6.0)]).unwrap_err();
        assert_eq!(
            err,
            MlErr::NonFinite {
                column: "Temperature".into()
            }
        );
    }

    #[test]
    fn fit_needs_rows() {
        let layout = ColumnLayout::new(["Crop"], ["PH"]);
        assert_eq!(
            ColumnTransformer::fit(layout, &[]).unwrap_err(),
            MlErr::EmptyDataset
        );
    }
}
