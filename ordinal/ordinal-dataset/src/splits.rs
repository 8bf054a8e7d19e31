//! Train/validation/test partition assignment.

use std::collections::BTreeMap;

use ordinal_types::Partition;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::sample::OrdinalSample;

/// Proportions of the train and validation partitions.
///
/// The remainder goes to the test partition.
///
/// # Example
///
/// ```
/// use ordinal_dataset::PartitionRatio;
///
/// let ratio = PartitionRatio::new(0.7, 0.15).unwrap();
/// assert!((ratio.test_ratio() - 0.15).abs() < 1e-6);
/// assert_eq!(ratio.counts(100), [70, 15, 15]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionRatio {
    train: f32,
    validation: f32,
}

impl PartitionRatio {
    /// Common 70/15/15 split.
    pub const SEVENTY_FIFTEEN_FIFTEEN: Self = Self {
        train: 0.7,
        validation: 0.15,
    };

    /// Common 80/10/10 split.
    pub const EIGHTY_TEN_TEN: Self = Self {
        train: 0.8,
        validation: 0.1,
    };

    /// Creates a ratio.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidPartitionRatio`] unless `train` is in
    /// `(0, 1)`, `validation` in `[0, 1)` and their sum at most 1.
    pub fn new(train: f32, validation: f32) -> Result<Self> {
        let valid = train > 0.0
            && train < 1.0
            && (0.0..1.0).contains(&validation)
            && train + validation <= 1.0 + f32::EPSILON;
        if valid {
            Ok(Self { train, validation })
        } else {
            Err(DatasetError::InvalidPartitionRatio { train, validation })
        }
    }

    /// Training proportion.
    #[must_use]
    pub const fn train_ratio(&self) -> f32 {
        self.train
    }

    /// Validation proportion.
    #[must_use]
    pub const fn validation_ratio(&self) -> f32 {
        self.validation
    }

    /// Test proportion.
    #[must_use]
    pub fn test_ratio(&self) -> f32 {
        (1.0 - self.train - self.validation).max(0.0)
    }

    /// Number of train, validation and test samples for a dataset size.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn counts(&self, total: usize) -> [usize; 3] {
        let train = ((total as f32 * self.train).round() as usize).min(total);
        let validation = ((total as f32 * self.validation).round() as usize).min(total - train);
        [train, validation, total - train - validation]
    }
}

impl Default for PartitionRatio {
    fn default() -> Self {
        Self::SEVENTY_FIFTEEN_FIFTEEN
    }
}

fn rng_for(seed: Option<u64>) -> ChaCha8Rng {
    seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64)
}

fn assign_group(samples: &mut [OrdinalSample], group: &mut [usize], ratio: PartitionRatio, rng: &mut ChaCha8Rng) {
    group.shuffle(rng);
    let [train, validation, _] = ratio.counts(group.len());
    for (rank, &index) in group.iter().enumerate() {
        samples[index].partition = if rank < train {
            Partition::Train
        } else if rank < train + validation {
            Partition::Validation
        } else {
            Partition::Test
        };
    }
}

/// Assigns every sample a partition at random.
///
/// # Example
///
/// ```
/// use ordinal_dataset::{OrdinalSample, PartitionRatio, assign_partitions};
/// use ordinal_types::Partition;
///
/// let mut samples: Vec<_> = (0..20).map(|i| OrdinalSample::new(i, vec![])).collect();
/// assign_partitions(&mut samples, PartitionRatio::EIGHTY_TEN_TEN, Some(42));
///
/// let test = samples.iter().filter(|s| s.partition == Partition::Test).count();
/// assert_eq!(test, 2);
/// ```
pub fn assign_partitions(samples: &mut [OrdinalSample], ratio: PartitionRatio, seed: Option<u64>) {
    let mut indices: Vec<usize> = (0..samples.len()).collect();
    let mut rng = rng_for(seed);
    assign_group(samples, &mut indices, ratio, &mut rng);
    tracing::debug!(samples = samples.len(), ?seed, "assigned partitions");
}

/// Assigns partitions separately within each class of one head.
///
/// Every class is split with the same ratio, so rare grades reach the
/// validation and test partitions too. Samples without a label for `tag`
/// form their own group.
pub fn assign_partitions_stratified(
    samples: &mut [OrdinalSample],
    tag: &str,
    ratio: PartitionRatio,
    seed: Option<u64>,
) {
    let mut groups: BTreeMap<Option<usize>, Vec<usize>> = BTreeMap::new();
    for (index, sample) in samples.iter().enumerate() {
        groups
            .entry(sample.label(tag).map(|l| l.label))
            .or_default()
            .push(index);
    }

    let mut rng = rng_for(seed);
    for group in groups.values_mut() {
        assign_group(samples, group, ratio, &mut rng);
    }
    tracing::debug!(samples = samples.len(), tag, groups = groups.len(), "assigned stratified partitions");
}

/// Splits samples into `(train, validation, test)` by their partition.
#[must_use]
pub fn split_by_partition(
    samples: &[OrdinalSample],
) -> (Vec<OrdinalSample>, Vec<OrdinalSample>, Vec<OrdinalSample>) {
    let mut parts = (Vec::new(), Vec::new(), Vec::new());
    for sample in samples {
        match sample.partition {
            Partition::Train => parts.0.push(sample.clone()),
            Partition::Validation => parts.1.push(sample.clone()),
            Partition::Test => parts.2.push(sample.clone()),
        }
    }
    parts
}
