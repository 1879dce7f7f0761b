//! Trained model artifact.
//!
//! Bundles everything the prediction service needs at startup:
//! - the fitted classifier
//! - the feature schema it was trained on (canonical input order)
//! - the normal range table derived from nominal cycles
//!
//! Saved as JSON with an atomic write (temp file, then rename).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::softmax::SoftmaxClassifier;
use super::{Classifier, ModelError};
use crate::types::{FeatureSchema, RangeTable};

/// Current artifact format version.
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to access model artifact {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Invalid model artifact {0}: {1}")]
    Format(PathBuf, #[source] serde_json::Error),

    #[error("Artifact version mismatch: file has v{0}, expected v{1}")]
    VersionMismatch(u32, u32),

    #[error("Schema has {schema} features but classifier expects {classifier}")]
    SchemaMismatch { schema: usize, classifier: usize },

    #[error("Schema lists feature {0} more than once")]
    DuplicateFeature(String),

    #[error("Invalid classifier in artifact: {0}")]
    Classifier(#[source] ModelError),

    #[error("Invalid normal range for {feature}: {lower} - {upper}")]
    InvalidRange { feature: String, lower: f64, upper: f64 },
}

/// Provenance of a trained artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub trained_at: DateTime<Utc>,
    /// Sensor channels that contributed features.
    pub sensors: Vec<String>,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Accuracy on the held-out split.
    pub test_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub metadata: ArtifactMetadata,
    pub schema: FeatureSchema,
    pub classifier: SoftmaxClassifier,
    pub ranges: RangeTable,
}

impl ModelArtifact {
    pub fn new(
        metadata: ArtifactMetadata,
        schema: FeatureSchema,
        classifier: SoftmaxClassifier,
        ranges: RangeTable,
    ) -> Result<Self, ArtifactError> {
        let artifact = Self {
            version: ARTIFACT_VERSION,
            metadata,
            schema,
            classifier,
            ranges,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.version != ARTIFACT_VERSION {
            return Err(ArtifactError::VersionMismatch(self.version, ARTIFACT_VERSION));
        }
        self.classifier.check_shape().map_err(ArtifactError::Classifier)?;
        if self.schema.len() != self.classifier.n_features() {
            return Err(ArtifactError::SchemaMismatch {
                schema: self.schema.len(),
                classifier: self.classifier.n_features(),
            });
        }
        if let Some(name) = self.schema.first_duplicate() {
            return Err(ArtifactError::DuplicateFeature(name.to_string()));
        }
        if let Some((feature, r)) = self
            .ranges
            .iter()
            .find(|(_, r)| !(r.lower.is_finite() && r.upper.is_finite() && r.lower <= r.upper))
        {
            return Err(ArtifactError::InvalidRange {
                feature: feature.clone(),
                lower: r.lower,
                upper: r.upper,
            });
        }
        Ok(())
    }
}

/// Save an artifact to disk atomically (write temp file, then rename).
pub fn save_to_disk(artifact: &ModelArtifact, path: &Path) -> Result<(), ArtifactError> {
    let io_err = |e| ArtifactError::Io(path.to_path_buf(), e);
    let json = serde_json::to_vec_pretty(artifact)
        .map_err(|e| ArtifactError::Format(path.to_path_buf(), e))?;

    let tmp_path = path.with_extension("json.tmp");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(&tmp_path, &json).map_err(io_err)?;
    std::fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

/// Load and validate an artifact from disk.
pub fn load_from_disk(path: &Path) -> Result<ModelArtifact, ArtifactError> {
    let data = std::fs::read(path).map_err(|e| ArtifactError::Io(path.to_path_buf(), e))?;
    let artifact: ModelArtifact =
        serde_json::from_slice(&data).map_err(|e| ArtifactError::Format(path.to_path_buf(), e))?;
    artifact.validate()?;
    Ok(artifact)
}
