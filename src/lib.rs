//! Valve Sentinel: hydraulic valve condition prediction
//!
//! Diagnoses the condition of a hydraulic test rig's switching valve from
//! per-cycle sensor statistics and explains each diagnosis in terms of the
//! most influential features.
//!
//! ## Architecture
//!
//! - **Acquisition**: raw tab-separated sensor and profile files
//! - **Processing**: per-cycle mean/std/min/max features
//! - **Baseline**: normal operating ranges from nominal cycles
//! - **Model**: `Classifier`/`Attributor` seams plus a softmax reference model
//! - **Explain**: ranked attributions rendered as maintenance text
//! - **Service / API**: request validation, diagnosis, HTTP endpoints
//! - **Pipeline**: offline training to a model artifact

pub mod acquisition;
pub mod api;
pub mod baseline;
pub mod config;
pub mod explain;
pub mod model;
pub mod pipeline;
pub mod processing;
pub mod service;
pub mod types;

// Re-export configuration
pub use config::ServiceConfig;

// Re-export commonly used types
pub use types::{
    describe, ConditionCode, ConditionDescriptor, FeatureSchema, FeatureTable, NormalRange,
    RangeTable, Severity,
};

// Re-export model seams
pub use model::{Attributor, Classifier, ModelArtifact, ModelError};

// Re-export the service
pub use service::{PredictionResponse, PredictionService, ServiceError};
