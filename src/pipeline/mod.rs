//! Training Pipeline Module
//!
//! ```text
//! profile.txt + <SENSOR>.txt
//!   → per-cycle features (mean/std/min/max per sensor)
//!   → stratified train/test split
//!   → softmax classifier fit + held-out evaluation
//!   → normal ranges over nominal cycles
//!   → ModelArtifact (JSON)
//! ```

mod training;

pub use training::{Dataset, TrainingOutcome, TrainingPipeline};

use thiserror::Error;

use crate::acquisition::LoadError;
use crate::baseline::BaselineError;
use crate::model::{ArtifactError, ModelError};
use crate::processing::ProcessingError;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Features(#[from] ProcessingError),

    #[error(transparent)]
    Ranges(#[from] BaselineError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Sensor data has {cycles} cycles but the profile has {profile} rows")]
    ProfileMismatch { cycles: usize, profile: usize },
}
