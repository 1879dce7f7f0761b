//! Classification and attribution
//!
//! The prediction service talks to its model only through the [`Classifier`]
//! and [`Attributor`] traits, so any model that can report class
//! probabilities and per-feature contributions can be plugged in.
//!
//! ## Architecture
//! - `softmax`: reference multinomial logistic regression with exact linear
//!   attributions
//! - `artifact`: JSON persistence of a trained model plus its feature schema
//!   and normal ranges
//! - `evaluation`: stratified train/test split and classification report

pub mod artifact;
pub mod evaluation;
pub mod softmax;

pub use artifact::{load_from_disk, save_to_disk, ArtifactError, ArtifactMetadata, ModelArtifact};
pub use evaluation::{stratified_split, ClassMetrics, ClassificationReport, SplitIndices};
pub use softmax::{SoftmaxClassifier, SoftmaxConfig, Standardizer};

use thiserror::Error;

use crate::types::ConditionCode;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Input feature {0} is not a finite number")]
    NonFiniteInput(usize),

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Training set has {rows} rows but {labels} labels")]
    LabelCountMismatch { rows: usize, labels: usize },

    #[error("Need at least two classes to train, found {0}")]
    TooFewClasses(usize),

    #[error("Class index {index} out of range for {n_classes} classes")]
    ClassIndexOutOfRange { index: usize, n_classes: usize },

    #[error("Model produced a non-finite output")]
    NonFiniteOutput,

    #[error("Malformed model parameters: {0}")]
    Malformed(String),
}

/// Maps a feature vector (in schema order) to a condition code and a
/// probability distribution over [`Classifier::classes`].
pub trait Classifier: Send + Sync {
    /// Classes in the order used by [`Classifier::predict_proba`].
    fn classes(&self) -> &[ConditionCode];

    /// Number of features the model expects.
    fn n_features(&self) -> usize;

    fn predict(&self, x: &[f64]) -> Result<ConditionCode, ModelError>;

    /// One probability per entry of [`Classifier::classes`].
    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Position of `code` within [`Classifier::classes`].
    fn class_index(&self, code: ConditionCode) -> Option<usize> {
        self.classes().iter().position(|&c| c == code)
    }
}

/// Signed per-feature contributions to one class's score.
pub trait Attributor: Send + Sync {
    /// One score per input feature, for the class at `class_index`.
    fn attribute(&self, x: &[f64], class_index: usize) -> Result<Vec<f64>, ModelError>;
}

/// Check that `x` has `expected` finite entries.
pub(crate) fn check_input(x: &[f64], expected: usize) -> Result<(), ModelError> {
    if x.len() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            got: x.len(),
        });
    }
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFiniteInput(i));
    }
    Ok(())
}
