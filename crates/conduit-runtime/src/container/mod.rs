//! # Substrate Container
//!
//! Configuration and construction of the shared services.

pub mod config;
pub mod substrate;

pub use config::{ConfigError, MetricsConfig, RuntimeConfig, CONFIG_PATH_VAR};
pub use substrate::SubstrateContainer;
