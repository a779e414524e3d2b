//! Parsing and validation of `tdm.toml` optimizer configuration files.
//!
//! This crate reads the flow configuration and produces a strongly-typed
//! [`FlowConfig`] covering the solving methods, thread count, iteration
//! budget, channel capacity and the delay model coefficients. Every field has
//! a default, so an empty file is a valid configuration.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config};
pub use types::*;
