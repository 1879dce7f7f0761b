//! Service Configuration - operator-tunable TOML values
//!
//! Every struct implements `Default`, so an empty or absent config file
//! yields a working setup for the hydraulic test-rig dataset layout.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::ConditionCode;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "VALVE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "valve_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `ServiceConfig::load()` which searches:
/// 1. `$VALVE_CONFIG` env var
/// 2. `./valve_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Recorded sensor data layout
    #[serde(default)]
    pub data: DataConfig,

    /// Model training and artifact location
    #[serde(default)]
    pub model: ModelConfig,

    /// Explanation and normal-range settings
    #[serde(default)]
    pub explain: ExplainConfig,
}

impl ServiceConfig {
    /// Load configuration using the standard search order:
    /// 1. `$VALVE_CONFIG` environment variable
    /// 2. `./valve_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {CONFIG_ENV}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings, collecting every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.data.sensors.is_empty() {
            errors.push("data.sensors: at least one sensor is required".to_string());
        }
        if self.data.sensors.iter().any(|s| s.trim().is_empty() || s.contains('_')) {
            errors.push("data.sensors: ids must be non-empty and contain no underscore".to_string());
        }
        let mut seen = HashSet::new();
        let duplicates: Vec<&str> = self
            .data
            .sensors
            .iter()
            .filter(|s| !seen.insert(s.as_str()))
            .map(String::as_str)
            .collect();
        if !duplicates.is_empty() {
            errors.push(format!(
                "data.sensors: duplicate ids {}",
                duplicates.join(", ")
            ));
        }

        let m = &self.model;
        if !(m.test_fraction > 0.0 && m.test_fraction < 1.0) {
            errors.push(format!(
                "model.test_fraction: must be in (0, 1) (got {})",
                m.test_fraction
            ));
        }
        if m.epochs == 0 {
            errors.push("model.epochs: must be > 0".to_string());
        }
        if !(m.learning_rate.is_finite() && m.learning_rate > 0.0) {
            errors.push(format!(
                "model.learning_rate: must be positive (got {})",
                m.learning_rate
            ));
        }
        if !(m.l2.is_finite() && m.l2 >= 0.0) {
            errors.push(format!("model.l2: must be >= 0 (got {})", m.l2));
        }

        let e = &self.explain;
        if e.top_k == 0 {
            errors.push("explain.top_k: must be > 0".to_string());
        }
        let pct_ok = |p: f64| p.is_finite() && (0.0..=100.0).contains(&p);
        if !pct_ok(e.lower_percentile) || !pct_ok(e.upper_percentile) {
            errors.push(format!(
                "explain: percentiles must be within 0-100 (got lower={}, upper={})",
                e.lower_percentile, e.upper_percentile
            ));
        } else if e.lower_percentile > e.upper_percentile {
            errors.push(format!(
                "explain: lower_percentile ({}) must be <= upper_percentile ({})",
                e.lower_percentile, e.upper_percentile
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address. Overridden by the `--addr` CLI flag.
    pub addr: String,

    /// Origins allowed to call the API from a browser. `"*"` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `<SENSOR>.txt` files and the profile file.
    pub dir: PathBuf,

    /// Profile file name, relative to `dir`.
    pub profile_file: String,

    /// Sensor channels to extract features from, in feature order.
    pub sensors: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
            profile_file: "profile.txt".to_string(),
            sensors: ["PS1", "PS2", "PS3", "TS1", "TS2", "VS1"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl DataConfig {
    pub fn profile_path(&self) -> PathBuf {
        self.dir.join(&self.profile_file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Where the trained model artifact is written and read.
    pub artifact_path: PathBuf,

    /// Share of cycles held out for evaluation.
    pub test_fraction: f64,

    /// Seed for the train/test split.
    pub seed: u64,

    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("hydraulic_model.json"),
            test_fraction: 0.2,
            seed: 42,
            epochs: 500,
            learning_rate: 0.1,
            l2: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    /// Number of explanations per prediction.
    pub top_k: usize,

    /// Condition whose cycles define the normal ranges.
    pub nominal_code: ConditionCode,

    pub lower_percentile: f64,
    pub upper_percentile: f64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            nominal_code: ConditionCode::OPTIMAL,
            lower_percentile: 5.0,
            upper_percentile: 95.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
