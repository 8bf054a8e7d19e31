//! Burn model contract, posterior transforms and record persistence for
//! ordinal multi-head training.
//!
//! # Model Contract
//!
//! - [`MultiHeadModel`] - Forward pass from a host batch to per-head logits
//! - [`HeadLogits`] - Logits keyed by head tag
//!
//! # Posteriors
//!
//! - [`head_posterior`] - `[batch, nr_classes]` class distribution of any head
//!
//! # Reference Model
//!
//! - [`MultiHeadClassifier`] - Shared hidden layer with one linear output per
//!   head, sized from the head configuration
//!
//! # Record Persistence
//!
//! Module and optimizer records are written with Burn's file recorders:
//! - Binary format (compact, fast)
//! - JSON format (human-readable, debuggable)
//!
//! # Backend Support
//!
//! Everything is generic over Burn backends. Tests use `burn-ndarray`.
//!
//! # Example
//!
//! ```
//! use burn::tensor::Tensor;
//! use burn_ndarray::NdArray;
//! use ordinal_models::{MultiHeadClassifier, MultiHeadClassifierConfig, head_posterior};
//! use ordinal_types::{HeadSpec, LossKind};
//!
//! let heads = vec![HeadSpec::new("grade", 5, LossKind::RankConsistent)];
//! let config = MultiHeadClassifierConfig::new(4).with_heads(&heads);
//! let device = Default::default();
//! let model = MultiHeadClassifier::<NdArray<f32>>::new(&config, &device).unwrap();
//!
//! let mut logits = model.forward_tensor(Tensor::zeros([2, 4], &device));
//! let posterior = head_posterior(&heads[0], logits.remove("grade").unwrap()).unwrap();
//! assert_eq!(posterior.dims(), [2, 5]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod classifier;
mod error;
mod model;
mod posterior;
mod record;

// Re-export model contract
pub use model::{HeadLogits, MultiHeadModel, batch_inputs, take_head_logits};

// Re-export model types
pub use classifier::{HeadOutput, MultiHeadClassifier, MultiHeadClassifierConfig};

// Re-export posterior transforms
pub use posterior::head_posterior;

// Re-export record utilities
pub use record::{RecordFormat, load_module, load_record, save_module, save_record};

// Re-export error types
pub use error::{ModelError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        HeadLogits, ModelError, MultiHeadClassifier, MultiHeadClassifierConfig, MultiHeadModel,
        RecordFormat, head_posterior, load_module, save_module,
    };
}
