//! Sensor data acquisition module
//!
//! Loads recorded hydraulic test-rig cycles from tab-separated files.

pub mod loader;

pub use loader::{load_profile, load_sensor, load_sensors, parse_table, LoadError, SensorChannel};
