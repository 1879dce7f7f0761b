//! Service Configuration Module
//!
//! Provides the service configuration loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `VALVE_CONFIG` environment variable (path to TOML file)
//! 2. `valve_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded [`ServiceConfig`] is passed explicitly to whoever needs it;
//! there is no process-wide config global.

mod service_config;

pub use service_config::*;
