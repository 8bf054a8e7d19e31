//! Error types for ordinal-dataset crate.

use thiserror::Error;

/// Errors that can occur in ordinal-dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Dataset has no samples.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Batch size of zero.
    #[error("invalid batch size: {0} (must be positive)")]
    InvalidBatchSize(usize),

    /// Invalid partition ratio.
    #[error("invalid partition ratio: train={train}, validation={validation}")]
    InvalidPartitionRatio {
        /// Train proportion.
        train: f32,
        /// Validation proportion.
        validation: f32,
    },

    /// Feature vector length differs from the dataset's.
    #[error("sample {id} has {actual} features, expected {expected}")]
    FeatureMismatch {
        /// Sample ID.
        id: u64,
        /// Expected feature count.
        expected: usize,
        /// Actual feature count.
        actual: usize,
    },

    /// Sample has no label for a head.
    #[error("sample {id} has no label for head '{tag}'")]
    MissingLabel {
        /// Sample ID.
        id: u64,
        /// Head tag.
        tag: String,
    },

    /// Label outside `[0, nr_classes)`.
    #[error("sample {id}: label {label} for head '{tag}' outside [0, {nr_classes})")]
    LabelOutOfRange {
        /// Sample ID.
        id: u64,
        /// Head tag.
        tag: String,
        /// The offending label.
        label: usize,
        /// Class count of the head.
        nr_classes: usize,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),
}

impl DatasetError {
    /// Creates a feature mismatch error.
    #[must_use]
    pub const fn feature_mismatch(id: u64, expected: usize, actual: usize) -> Self {
        Self::FeatureMismatch {
            id,
            expected,
            actual,
        }
    }

    /// Creates a missing label error.
    #[must_use]
    pub fn missing_label(id: u64, tag: impl Into<String>) -> Self {
        Self::MissingLabel { id, tag: tag.into() }
    }

    /// Creates a label out of range error.
    #[must_use]
    pub fn label_out_of_range(id: u64, tag: impl Into<String>, label: usize, nr_classes: usize) -> Self {
        Self::LabelOutOfRange {
            id,
            tag: tag.into(),
            label,
            nr_classes,
        }
    }

    /// Creates an IO error.
    #[must_use]
    pub fn io(reason: impl Into<String>) -> Self {
        Self::Io(reason.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization(reason.into())
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for ordinal-dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
