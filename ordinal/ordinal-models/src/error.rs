//! Error types for ordinal-models crate.

use thiserror::Error;

/// Errors that can occur in ordinal-models operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Failed to load a record.
    #[error("failed to load record from {path}: {reason}")]
    LoadRecord {
        /// Path to the record file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to save a record.
    #[error("failed to save record to {path}: {reason}")]
    SaveRecord {
        /// Path to the record file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Record file not found.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// Unsupported record format.
    #[error("unsupported record format: {0}")]
    UnsupportedFormat(String),

    /// Invalid model configuration.
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    /// Logits of a head have an unexpected shape.
    #[error("shape mismatch for head '{tag}': expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Head tag.
        tag: String,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl ModelError {
    /// Creates a load record error.
    #[must_use]
    pub fn load_record(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a save record error.
    #[must_use]
    pub fn save_record(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SaveRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a record not found error.
    #[must_use]
    pub fn record_not_found(path: impl Into<String>) -> Self {
        Self::RecordNotFound(path.into())
    }

    /// Creates an unsupported format error.
    #[must_use]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Creates an invalid config error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(
        tag: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            tag: tag.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for ordinal-models operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_load_record() {
        let err = ModelError::load_record("model.bin", "file corrupted");
        assert!(err.to_string().contains("model.bin"));
        assert!(err.to_string().contains("file corrupted"));
    }

    #[test]
    fn error_save_record() {
        let err = ModelError::save_record("output.bin", "disk full");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn error_record_not_found() {
        let err = ModelError::record_not_found("/path/to/missing.bin");
        assert!(err.to_string().contains("/path/to/missing.bin"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = ModelError::shape_mismatch("grade", "[8, 4]", "[8, 5]");
        let msg = err.to_string();
        assert!(msg.contains("'grade'"));
        assert!(msg.contains("[8, 4]"));
        assert!(msg.contains("[8, 5]"));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: ModelError = io_err.into();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
