//! Error types for ordinal-types crate.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur in ordinal-types operations.
#[derive(Debug, Error)]
pub enum OrdinalTypesError {
    /// Cost matrix could not be built.
    #[error("invalid cost matrix: {0}")]
    InvalidCostMatrix(String),

    /// Partition id outside `0..=2`.
    #[error("invalid partition id {0}: expected 0 (train), 1 (validation) or 2 (test)")]
    InvalidPartition(u8),

    /// Configuration failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl OrdinalTypesError {
    /// Creates an invalid cost matrix error.
    #[must_use]
    pub fn invalid_cost_matrix(reason: impl Into<String>) -> Self {
        Self::InvalidCostMatrix(reason.into())
    }
}

/// Result type for ordinal-types operations.
pub type Result<T> = std::result::Result<T, OrdinalTypesError>;
