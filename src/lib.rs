//! HTTP inference endpoint for vehicle regression predictions.
//!
//! A request's categorical fields are encoded with the tables of the configured
//! [`schema::SchemaVersion`], assembled into a fixed-order feature vector,
//! standardized by the trained scaler and fed to the trained linear model.

pub mod config;
pub mod error;
pub mod features;
pub mod handler;
pub mod model;
pub mod schema;
pub mod types;

pub use config::ServerConfig;
pub use error::{ComputationError, PredictError, StartupError};
pub use handler::{router, AppState};
pub use model::{FeatureScaler, LinearModel, Pipeline, Regressor, StandardScaler};
pub use schema::SchemaVersion;
