mod column_transformer;
mod one_hot;
mod standard_scaler;

pub use column_transformer::{ColumnLayout, ColumnTransformer, FeatureRow};
pub use one_hot::OneHotEncoder;
pub use standard_scaler::StandardScaler;
