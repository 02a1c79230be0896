pub mod config;
pub mod error;
pub mod http;
pub mod schema;
pub mod service;
pub mod store;
pub mod synth;

pub use config::ServiceConfig;
pub use error::{Result, ServiceErr};
pub use store::ModelStore;
