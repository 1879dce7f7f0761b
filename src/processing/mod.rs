//! Signal processing module - per-cycle feature extraction

mod features;

pub use features::{extract_channel, extract_features, feature_name, CycleStatistic};

use thiserror::Error;

use crate::types::RaggedRowError;

/// Errors in feature extraction
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("No sensor channels to extract features from")]
    NoChannels,

    #[error("Sensor channel {0} appears more than once")]
    DuplicateChannel(String),

    #[error("Cycle count mismatch: {reference} has {expected} cycles but {sensor} has {found}")]
    CycleCountMismatch {
        reference: String,
        expected: usize,
        sensor: String,
        found: usize,
    },

    #[error("Insufficient data in {sensor} cycle {cycle}: need {needed} readings, have {available}")]
    InsufficientData {
        sensor: String,
        cycle: usize,
        needed: usize,
        available: usize,
    },

    #[error(transparent)]
    Table(#[from] RaggedRowError),
}
