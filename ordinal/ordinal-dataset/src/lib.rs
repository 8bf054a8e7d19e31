//! Dataset handling for ordinal training.
//!
//! This crate provides the data side of the training loop:
//!
//! # Samples
//!
//! - [`OrdinalSample`] - Feature vector, per-head labels and partition
//! - [`HeadLabel`] - Nominal class plus optional per-sample target distribution
//! - [`load_samples`] / [`save_samples`] - JSON-lines persistence
//!
//! # Batching
//!
//! - [`BatchSource`] - Contract of the dataloader consumed by the trainer
//! - [`HostBatch`] - Batch in host memory, targets keyed by head tag
//! - [`InMemoryDataset`] - Reference [`BatchSource`] with per-epoch shuffling
//!
//! # Partitions and Statistics
//!
//! - [`assign_partitions`] - Seeded train/validation/test assignment
//! - [`LabelSummary`] - Class frequencies and extended binary weights
//!
//! This crate has no tensor dependencies. Batches are turned into tensors
//! by the model and training crates.
//!
//! # Example
//!
//! ```
//! use ordinal_dataset::{
//!     BatchSource, HeadLabel, InMemoryDataset, LoaderConfig, OrdinalSample, PartitionRatio,
//!     assign_partitions,
//! };
//! use ordinal_types::{HeadSpec, LossKind, Partition};
//!
//! let heads = vec![HeadSpec::new("grade", 5, LossKind::RankConsistent)];
//! let mut samples: Vec<_> = (0..40)
//!     .map(|i| OrdinalSample::new(i, vec![0.1; 4]).with_label("grade", HeadLabel::new(i as usize % 5)))
//!     .collect();
//! assign_partitions(&mut samples, PartitionRatio::EIGHTY_TEN_TEN, Some(42));
//!
//! let dataset = InMemoryDataset::new(samples, &heads, LoaderConfig::default()).unwrap();
//! let train = dataset.partition(Partition::Train).unwrap();
//! assert_eq!(train.len(), 32);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod batch;
mod error;
mod sample;
mod splits;
mod summary;

// Re-export sample types
pub use sample::{HeadLabel, OrdinalSample, load_samples, save_samples};

// Re-export batching
pub use batch::{BatchSource, HeadTargets, HostBatch, InMemoryDataset, LoaderConfig};

// Re-export split utilities
pub use splits::{
    PartitionRatio, assign_partitions, assign_partitions_stratified, split_by_partition,
};

// Re-export summary types
pub use summary::LabelSummary;

// Re-export error types
pub use error::{DatasetError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        BatchSource, DatasetError, HeadLabel, HeadTargets, HostBatch, InMemoryDataset,
        LabelSummary, LoaderConfig, OrdinalSample, PartitionRatio, assign_partitions,
        assign_partitions_stratified, split_by_partition,
    };
}
