use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{LinearRegression, Model, RandomForest};
use crate::Result;

/// The closed set of regressors a `Pipeline` can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearRegression),
    Forest(RandomForest),
}

impl Regressor {
    fn inner(&self) -> &dyn Model {
        match self {
            Regressor::Linear(m) => m,
            Regressor::Forest(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Model {
        match self {
            Regressor::Linear(m) => m,
            Regressor::Forest(m) => m,
        }
    }
}

impl Model for Regressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn validate(&self, width: usize) -> Result<()> {
        self.inner().validate(width)
    }
}

impl From<LinearRegression> for Regressor {
    fn from(value: LinearRegression) -> Self {
        Self::Linear(value)
    }
}

impl From<RandomForest> for Regressor {
    fn from(value: RandomForest) -> Self {
        Self::Forest(value)
    }
}
