//! Error types for ordinal-training crate.

use ordinal_dataset::DatasetError;
use ordinal_models::ModelError;
use ordinal_types::{OrdinalTypesError, ValidationError};
use thiserror::Error;

/// Errors that can occur during training and evaluation.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Invalid training configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Label outside the class range of its head.
    #[error("label {label} for head '{tag}' outside [0, {nr_classes})")]
    InvalidLabel {
        /// Head tag.
        tag: String,
        /// The offending label.
        label: usize,
        /// Class count of the head.
        nr_classes: usize,
    },

    /// Tensor shape does not match what the head or batch implies.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// What was measured (head tag, tensor name).
        what: String,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// Non-finite logits, posteriors or losses.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// Dataset error.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Model error.
    #[error("model error: {0}")]
    Model(String),

    /// Checkpoint error.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Metrics sink error.
    #[error("metrics sink error: {0}")]
    Sink(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TrainingError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates an invalid label error.
    #[must_use]
    pub fn invalid_label(tag: impl Into<String>, label: usize, nr_classes: usize) -> Self {
        Self::InvalidLabel {
            tag: tag.into(),
            label,
            nr_classes,
        }
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(
        what: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a numerical instability error.
    #[must_use]
    pub fn numerical_instability(reason: impl Into<String>) -> Self {
        Self::NumericalInstability(reason.into())
    }

    /// Creates a checkpoint error.
    #[must_use]
    pub fn checkpoint(reason: impl Into<String>) -> Self {
        Self::Checkpoint(reason.into())
    }

    /// Creates a metrics sink error.
    #[must_use]
    pub fn sink(reason: impl Into<String>) -> Self {
        Self::Sink(reason.into())
    }
}

impl From<std::io::Error> for TrainingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<DatasetError> for TrainingError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::LabelOutOfRange {
                tag,
                label,
                nr_classes,
                ..
            } => Self::InvalidLabel {
                tag,
                label,
                nr_classes,
            },
            other => Self::Dataset(other.to_string()),
        }
    }
}

impl From<ModelError> for TrainingError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::ShapeMismatch {
                tag,
                expected,
                actual,
            } => Self::ShapeMismatch {
                what: tag,
                expected,
                actual,
            },
            other => Self::Model(other.to_string()),
        }
    }
}

impl From<ValidationError> for TrainingError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl From<OrdinalTypesError> for TrainingError {
    fn from(err: OrdinalTypesError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;
