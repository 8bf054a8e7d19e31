//! Dataset partitions.

use serde::{Deserialize, Serialize};

use crate::error::{OrdinalTypesError, Result};

/// Part of the dataset a sample belongs to.
///
/// Serialized as its numeric id (`0` train, `1` validation, `2` test).
///
/// # Example
///
/// ```
/// use ordinal_types::Partition;
///
/// assert_eq!(Partition::Validation.id(), 1);
/// assert_eq!(Partition::from_id(2).unwrap(), Partition::Test);
/// assert_eq!(Partition::Train.short_name(), "trn");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Partition {
    /// Training samples.
    Train,
    /// Validation samples (model selection, early stopping).
    Validation,
    /// Held-out test samples.
    Test,
}

impl Partition {
    /// All partitions in id order.
    pub const ALL: [Self; 3] = [Self::Train, Self::Validation, Self::Test];

    /// Numeric id.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Train => 0,
            Self::Validation => 1,
            Self::Test => 2,
        }
    }

    /// Parses a numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`OrdinalTypesError::InvalidPartition`] for ids above 2.
    pub const fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Train),
            1 => Ok(Self::Validation),
            2 => Ok(Self::Test),
            other => Err(OrdinalTypesError::InvalidPartition(other)),
        }
    }

    /// Three-letter name used as a metric prefix.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Train => "trn",
            Self::Validation => "val",
            Self::Test => "tst",
        }
    }
}

impl TryFrom<u8> for Partition {
    type Error = OrdinalTypesError;

    fn try_from(id: u8) -> Result<Self> {
        Self::from_id(id)
    }
}

impl From<Partition> for u8 {
    fn from(partition: Partition) -> Self {
        partition.id()
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
