pub mod arch;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod preprocessing;
pub mod training;

pub use error::{MlErr, Result};
pub use pipeline::Pipeline;
