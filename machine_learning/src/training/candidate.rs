use serde::{Deserialize, Serialize};

use crate::arch::{LinearRegression, RandomForest, Regressor, TreeParams};

/// Describes a regressor competing for selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSpec {
    LinearRegression,
    RandomForest {
        n_trees: usize,
        seed: u64,
        max_depth: Option<usize>,
    },
}

impl CandidateSpec {
    /// The human readable name reported for this candidate.
    pub fn name(&self) -> &'static str {
        match self {
            CandidateSpec::LinearRegression => "Linear Regression",
            CandidateSpec::RandomForest { .. } => "Random Forest",
        }
    }

    /// Builds the unfitted regressor described.
    pub fn resolve(&self) -> Regressor {
        match *self {
            CandidateSpec::LinearRegression => LinearRegression::new().into(),
            CandidateSpec::RandomForest {
                n_trees,
                seed,
                max_depth,
            } => {
                let params = TreeParams {
                    max_depth,
                    ..TreeParams::default()
                };
                RandomForest::new(n_trees, seed, params).into()
            }
        }
    }
}
