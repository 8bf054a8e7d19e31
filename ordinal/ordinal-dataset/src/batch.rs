//! Host-side batches and the batch source contract.

use std::collections::BTreeMap;

use ordinal_types::{HeadSpec, Partition};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::sample::OrdinalSample;

/// Targets of one head for every sample of a batch.
///
/// `means` and `sigmas` are present only when every sample of the batch
/// carries them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeadTargets {
    /// Nominal classes.
    pub labels: Vec<usize>,

    /// Per-sample target means.
    pub means: Option<Vec<f32>>,

    /// Per-sample target standard deviations.
    pub sigmas: Option<Vec<f32>>,
}

impl HeadTargets {
    /// Creates targets from nominal labels only.
    #[must_use]
    pub const fn from_labels(labels: Vec<usize>) -> Self {
        Self {
            labels,
            means: None,
            sigmas: None,
        }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A batch of samples in host memory.
///
/// Inputs are row-major `[len, nr_features]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostBatch {
    /// Flattened inputs.
    pub inputs: Vec<f32>,

    /// Features per sample.
    pub nr_features: usize,

    /// Targets keyed by head tag.
    pub targets: BTreeMap<String, HeadTargets>,

    /// Sample IDs in batch order.
    pub sample_ids: Vec<u64>,

    /// Partition of each sample.
    pub partitions: Vec<Partition>,
}

impl HostBatch {
    /// Assembles a batch from samples.
    ///
    /// # Errors
    ///
    /// Returns an error if a sample has the wrong feature count or lacks a
    /// label for one of `tags`.
    pub fn from_samples<'a, I>(samples: I, nr_features: usize, tags: &[String]) -> Result<Self>
    where
        I: IntoIterator<Item = &'a OrdinalSample>,
    {
        let mut batch = Self {
            nr_features,
            ..Self::default()
        };
        let mut means: BTreeMap<&str, Vec<Option<f32>>> = BTreeMap::new();
        let mut sigmas: BTreeMap<&str, Vec<Option<f32>>> = BTreeMap::new();

        for sample in samples {
            if sample.features.len() != nr_features {
                return Err(DatasetError::feature_mismatch(
                    sample.id,
                    nr_features,
                    sample.features.len(),
                ));
            }
            batch.inputs.extend_from_slice(&sample.features);
            batch.sample_ids.push(sample.id);
            batch.partitions.push(sample.partition);

            for tag in tags {
                let label = sample
                    .label(tag)
                    .ok_or_else(|| DatasetError::missing_label(sample.id, tag))?;
                batch
                    .targets
                    .entry(tag.clone())
                    .or_default()
                    .labels
                    .push(label.label);
                means.entry(tag).or_default().push(label.mean);
                sigmas.entry(tag).or_default().push(label.sigma);
            }
        }

        for (tag, targets) in &mut batch.targets {
            targets.means = means.remove(tag.as_str()).and_then(|m| m.into_iter().collect());
            targets.sigmas = sigmas.remove(tag.as_str()).and_then(|s| s.into_iter().collect());
        }
        Ok(batch)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    /// Returns `true` if the batch has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    /// Targets of a head.
    #[must_use]
    pub fn targets(&self, tag: &str) -> Option<&HeadTargets> {
        self.targets.get(tag)
    }
}

/// Source of batches for one pass over a dataset.
///
/// Each call to [`BatchSource::batches`] starts a fresh, finite pass. The
/// epoch number lets implementations reshuffle deterministically.
pub trait BatchSource {
    /// Returns the batches of one pass.
    fn batches(&self, epoch: usize) -> Box<dyn Iterator<Item = Result<HostBatch>> + '_>;

    /// Number of samples per pass.
    fn len(&self) -> usize;

    /// Returns `true` if a pass yields no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Batching options of an [`InMemoryDataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Samples per batch.
    pub batch_size: usize,

    /// Reshuffle sample order every epoch.
    pub shuffle: bool,

    /// Base seed of the per-epoch shuffle.
    pub seed: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: false,
            seed: 42,
        }
    }
}

impl LoaderConfig {
    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enables shuffling with the given seed.
    #[must_use]
    pub const fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }
}

/// Dataset held in memory, batched in order or shuffled per epoch.
///
/// # Example
///
/// ```
/// use ordinal_dataset::{BatchSource, HeadLabel, InMemoryDataset, LoaderConfig, OrdinalSample};
/// use ordinal_types::{HeadSpec, LossKind};
///
/// let heads = vec![HeadSpec::new("grade", 3, LossKind::CrossEntropy)];
/// let samples: Vec<_> = (0..5)
///     .map(|i| OrdinalSample::new(i, vec![0.0; 2]).with_label("grade", HeadLabel::new(1)))
///     .collect();
///
/// let dataset = InMemoryDataset::new(samples, &heads, LoaderConfig::default().with_batch_size(2))
///     .unwrap();
/// let sizes: Vec<usize> = dataset.batches(0).map(|b| b.unwrap().len()).collect();
/// assert_eq!(sizes, vec![2, 2, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    samples: Vec<OrdinalSample>,
    tags: Vec<String>,
    nr_features: usize,
    config: LoaderConfig,
}

impl InMemoryDataset {
    /// Creates a dataset after checking features and labels of every sample.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no samples, the batch size is zero,
    /// feature counts differ, or a label is missing or out of range.
    pub fn new(samples: Vec<OrdinalSample>, heads: &[HeadSpec], config: LoaderConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(DatasetError::InvalidBatchSize(0));
        }
        let nr_features = samples
            .first()
            .map(|s| s.features.len())
            .ok_or(DatasetError::EmptyDataset)?;

        for sample in &samples {
            if sample.features.len() != nr_features {
                return Err(DatasetError::feature_mismatch(
                    sample.id,
                    nr_features,
                    sample.features.len(),
                ));
            }
            sample.check_labels(heads)?;
        }

        tracing::debug!(
            samples = samples.len(),
            features = nr_features,
            heads = heads.len(),
            batch_size = config.batch_size,
            "created in-memory dataset"
        );

        Ok(Self {
            samples,
            tags: heads.iter().map(|h| h.tag.clone()).collect(),
            nr_features,
            config,
        })
    }

    /// Returns a dataset with only the samples of one partition.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::EmptyDataset`] if the partition has no samples.
    pub fn partition(&self, partition: Partition) -> Result<Self> {
        let samples: Vec<_> = self
            .samples
            .iter()
            .filter(|s| s.partition == partition)
            .cloned()
            .collect();
        if samples.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }
        Ok(Self {
            samples,
            tags: self.tags.clone(),
            nr_features: self.nr_features,
            config: self.config,
        })
    }

    /// Returns the same samples with different batching options.
    #[must_use]
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Features per sample.
    #[must_use]
    pub const fn nr_features(&self) -> usize {
        self.nr_features
    }

    /// All samples in storage order.
    #[must_use]
    pub fn samples(&self) -> &[OrdinalSample] {
        &self.samples
    }

    /// Batching options.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn order(&self, epoch: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.samples.len()).collect();
        if self.config.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(epoch as u64));
            indices.shuffle(&mut rng);
        }
        indices
    }
}

impl BatchSource for InMemoryDataset {
    fn batches(&self, epoch: usize) -> Box<dyn Iterator<Item = Result<HostBatch>> + '_> {
        let order = self.order(epoch);
        let batch_size = self.config.batch_size;
        let nr_batches = order.len().div_ceil(batch_size);

        Box::new((0..nr_batches).map(move |b| {
            let start = b * batch_size;
            let end = (start + batch_size).min(order.len());
            HostBatch::from_samples(
                order[start..end].iter().map(|&i| &self.samples[i]),
                self.nr_features,
                &self.tags,
            )
        }))
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
