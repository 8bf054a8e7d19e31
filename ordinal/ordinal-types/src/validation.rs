//! Validation error types.

use thiserror::Error;

/// Validation errors for head and cost configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Missing required field.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Head weight is negative or not finite.
    #[error("invalid weight {weight} for head '{tag}'")]
    InvalidWeight {
        /// Head tag.
        tag: String,
        /// The offending weight.
        weight: f32,
    },

    /// Head has fewer than two classes.
    #[error("head '{tag}' needs at least 2 classes, got {nr_classes}")]
    TooFewClasses {
        /// Head tag.
        tag: String,
        /// Configured class count.
        nr_classes: usize,
    },

    /// Loss hyperparameter out of range.
    #[error("invalid hyperparameter {name}={value} for head '{tag}'")]
    InvalidHyperparameter {
        /// Head tag.
        tag: String,
        /// Hyperparameter name.
        name: String,
        /// The offending value.
        value: f32,
    },

    /// Two heads share a tag.
    #[error("duplicate head tag: {0}")]
    DuplicateTag(String),

    /// A length or size does not match what the configuration implies.
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was measured.
        what: String,
        /// Expected size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// Cost matrix entry is negative or not finite.
    #[error("invalid cost {value} at [{row}, {col}]")]
    InvalidCost {
        /// Row (true class).
        row: usize,
        /// Column (predicted class).
        col: usize,
        /// The offending entry.
        value: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::InvalidWeight {
            tag: "age".to_string(),
            weight: -1.0,
        };
        let msg = format!("{err}");
        assert!(msg.contains("invalid weight"));
        assert!(msg.contains("age"));

        let err = ValidationError::DuplicateTag("grade".to_string());
        assert!(format!("{err}").contains("grade"));
    }

    #[test]
    fn error_dimension_mismatch() {
        let err = ValidationError::DimensionMismatch {
            what: "cost matrix of head 'age'".to_string(),
            expected: 5,
            actual: 4,
        };
        let msg = format!("{err}");
        assert!(msg.contains("expected 5"));
        assert!(msg.contains("got 4"));
    }
}
