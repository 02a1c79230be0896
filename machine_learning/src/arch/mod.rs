mod forest;
mod linear;
mod model;
mod regressor;
mod tree;

pub use forest::RandomForest;
pub use linear::LinearRegression;
pub use model::Model;
pub use regressor::Regressor;
pub use tree::{RegressionTree, TreeParams};
