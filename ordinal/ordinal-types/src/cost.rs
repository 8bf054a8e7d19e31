//! Misclassification cost matrices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OrdinalTypesError, Result};
use crate::head::HeadSpec;
use crate::validation::ValidationError;

/// Square table of misclassification costs.
///
/// Entry `[i][j]` is the cost of predicting class `j` when the true class is
/// `i`. Entries are non-negative; the diagonal is normally zero.
///
/// # Example
///
/// ```
/// use ordinal_types::CostMatrix;
///
/// let cost = CostMatrix::absolute(4);
/// assert_eq!(cost.nr_classes(), 4);
/// assert!((cost.get(0, 3) - 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f32>>", into = "Vec<Vec<f32>>")]
pub struct CostMatrix {
    nr_classes: usize,
    entries: Vec<f32>,
}

impl CostMatrix {
    /// Builds a matrix from `f(true, predicted)`.
    #[must_use]
    pub fn from_fn(nr_classes: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut entries = Vec::with_capacity(nr_classes * nr_classes);
        for i in 0..nr_classes {
            for j in 0..nr_classes {
                entries.push(f(i, j));
            }
        }
        Self {
            nr_classes,
            entries,
        }
    }

    /// 0/1 cost: every error costs one.
    #[must_use]
    pub fn zero_one(nr_classes: usize) -> Self {
        Self::from_fn(nr_classes, |i, j| if i == j { 0.0 } else { 1.0 })
    }

    /// Absolute class distance `|i - j|`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn absolute(nr_classes: usize) -> Self {
        Self::from_fn(nr_classes, |i, j| i.abs_diff(j) as f32)
    }

    /// Squared class distance `(i - j)^2`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn squared(nr_classes: usize) -> Self {
        Self::from_fn(nr_classes, |i, j| {
            let d = i.abs_diff(j) as f32;
            d * d
        })
    }

    /// Builds a matrix from rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows are empty, not square, or contain a
    /// negative or non-finite entry.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let nr_classes = rows.len();
        if nr_classes == 0 {
            return Err(OrdinalTypesError::invalid_cost_matrix("matrix is empty"));
        }

        let mut entries = Vec::with_capacity(nr_classes * nr_classes);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != nr_classes {
                return Err(OrdinalTypesError::invalid_cost_matrix(format!(
                    "row {i} has {} entries, expected {nr_classes}",
                    row.len()
                )));
            }
            entries.extend(row);
        }

        let matrix = Self {
            nr_classes,
            entries,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Number of classes (rows and columns).
    #[must_use]
    pub const fn nr_classes(&self) -> usize {
        self.nr_classes
    }

    /// Cost of predicting `predicted` when the truth is `truth`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn get(&self, truth: usize, predicted: usize) -> f32 {
        assert!(truth < self.nr_classes && predicted < self.nr_classes);
        self.entries[truth * self.nr_classes + predicted]
    }

    /// Row-major entries.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.entries
    }

    /// Returns the rows as nested vectors.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.entries
            .chunks(self.nr_classes.max(1))
            .map(<[f32]>::to_vec)
            .collect()
    }

    /// Returns `true` if every diagonal entry is zero.
    #[must_use]
    pub fn has_zero_diagonal(&self) -> bool {
        (0..self.nr_classes).all(|i| self.get(i, i) == 0.0)
    }

    /// Checks that all entries are finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCost`] for the first bad entry.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        match self
            .entries
            .iter()
            .position(|c| !c.is_finite() || *c < 0.0)
        {
            Some(index) => Err(ValidationError::InvalidCost {
                row: index / self.nr_classes,
                col: index % self.nr_classes,
                value: self.entries[index],
            }),
            None => Ok(()),
        }
    }
}

impl TryFrom<Vec<Vec<f32>>> for CostMatrix {
    type Error = OrdinalTypesError;

    fn try_from(rows: Vec<Vec<f32>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<CostMatrix> for Vec<Vec<f32>> {
    fn from(matrix: CostMatrix) -> Self {
        matrix.to_rows()
    }
}

/// Cost matrices keyed by head tag.
///
/// # Example
///
/// ```
/// use ordinal_types::{CostMatrices, CostMatrix, HeadSpec, LossKind};
///
/// let heads = vec![HeadSpec::new("age", 5, LossKind::CrossEntropy)];
/// let costs = CostMatrices::new().with("age", CostMatrix::absolute(5));
/// assert!(costs.check_heads(&heads).is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostMatrices {
    matrices: BTreeMap<String, CostMatrix>,
}

impl CostMatrices {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the matrix of a head.
    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, matrix: CostMatrix) -> Self {
        self.insert(tag, matrix);
        self
    }

    /// Adds or replaces the matrix of a head.
    pub fn insert(&mut self, tag: impl Into<String>, matrix: CostMatrix) {
        self.matrices.insert(tag.into(), matrix);
    }

    /// Matrix of a head.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&CostMatrix> {
        self.matrices.get(tag)
    }

    /// Number of matrices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    /// Returns `true` if no matrices are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Checks that every head has a valid matrix of matching size.
    ///
    /// # Errors
    ///
    /// Returns the first missing or mis-sized matrix.
    pub fn check_heads(&self, heads: &[HeadSpec]) -> std::result::Result<(), ValidationError> {
        for head in heads {
            let matrix = self
                .get(&head.tag)
                .ok_or_else(|| ValidationError::MissingField(format!("cost matrix for head '{}'", head.tag)))?;
            if matrix.nr_classes() != head.nr_classes {
                return Err(ValidationError::DimensionMismatch {
                    what: format!("cost matrix of head '{}'", head.tag),
                    expected: head.nr_classes,
                    actual: matrix.nr_classes(),
                });
            }
            matrix.validate()?;
        }
        Ok(())
    }
}
