pub mod category;
pub mod config;
pub mod error;
pub mod predict;
pub mod routes;
pub mod schema;
pub mod store;

pub use config::ServiceConfig;
pub use error::{ConfigError, LoadError, PredictError};
pub use predict::{PredictionRequest, PredictionResponse};
pub use schema::{ColumnIndex, FeatureSchema};
pub use store::{ModelState, ModelStore};
