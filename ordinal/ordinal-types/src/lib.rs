//! Shared types for ordinal multi-head training.
//!
//! This crate provides the configuration vocabulary shared by the dataset,
//! model and training crates:
//!
//! # Head Configuration
//!
//! - [`HeadSpec`] - Tag, weight, class count and loss family of a head
//! - [`LossKind`] - Closed set of loss families with their hyperparameters
//!
//! # Decision Costs
//!
//! - [`CostMatrix`] - Cost of predicting class `j` when the truth is `i`
//! - [`CostMatrices`] - Cost matrices keyed by head tag
//!
//! # Dataset Partitions
//!
//! - [`Partition`] - Train (0), validation (1) or test (2)
//!
//! This crate has no tensor dependencies and can be used by config tools
//! and report readers without pulling in a backend.
//!
//! # Example
//!
//! ```
//! use ordinal_types::{CostMatrices, CostMatrix, HeadSpec, LossKind, MeanVarianceParams};
//!
//! let heads = vec![
//!     HeadSpec::new("grade", 5, LossKind::MeanVariance(MeanVarianceParams::default())),
//!     HeadSpec::new("grade_coral", 5, LossKind::RankConsistent).with_weight(0.5),
//! ];
//! let costs = CostMatrices::new()
//!     .with("grade", CostMatrix::absolute(5))
//!     .with("grade_coral", CostMatrix::absolute(5));
//!
//! assert!(costs.check_heads(&heads).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod cost;
mod error;
mod head;
mod partition;
mod validation;

// Re-export head configuration
pub use head::{
    ExtendedBinaryParams, GaussianKlParams, GaussianParams, HeadSpec, LabelDistance, LossKind,
    MeanVarianceParams, PosteriorExtendedBinaryParams, SoftLabelParams, UnimodalParams,
};

// Re-export cost types
pub use cost::{CostMatrices, CostMatrix};

// Re-export partitions
pub use partition::Partition;

// Re-export validation
pub use validation::ValidationError;

// Re-export error types
pub use error::{OrdinalTypesError, Result};

/// Checks a set of heads for individual validity and unique tags.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
///
/// # Example
///
/// ```
/// use ordinal_types::{HeadSpec, LossKind, validate_heads};
///
/// let heads = vec![
///     HeadSpec::new("age", 5, LossKind::CrossEntropy),
///     HeadSpec::new("age", 5, LossKind::RankConsistent),
/// ];
/// assert!(validate_heads(&heads).is_err());
/// ```
pub fn validate_heads(heads: &[HeadSpec]) -> std::result::Result<(), ValidationError> {
    if heads.is_empty() {
        return Err(ValidationError::MissingField("heads".to_string()));
    }
    let mut seen = std::collections::BTreeSet::new();
    for head in heads {
        head.validate()?;
        if !seen.insert(head.tag.as_str()) {
            return Err(ValidationError::DuplicateTag(head.tag.clone()));
        }
    }
    Ok(())
}
