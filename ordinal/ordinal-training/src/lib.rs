//! Ordinal-regression training for multi-head models.
//!
//! # Losses
//!
//! - [`head_loss`] - Dispatches on the head's [`LossKind`](ordinal_types::LossKind)
//! - [`cross_entropy`], [`mean_variance`], [`unimodal_concentrated`] - Softmax heads
//! - [`gaussian_label_distribution`], [`gaussian_kl`], [`noisy_gaussian_kl`],
//!   [`cumulative_jensen_shannon`], [`soft_labels`] - Label-distribution heads
//! - [`extended_binary`], [`rank_consistent`], [`posterior_extended_binary`] - Binary-indicator heads
//! - [`mean_absolute_error`] - Scalar regression head
//!
//! # Decisions
//!
//! - [`risk_decision`] - Class with minimum expected cost under a cost matrix
//! - [`batch_error`] - Mean cost of a batch of decisions
//!
//! # Training
//!
//! - [`TrainingConfig`] - Heads, cost matrices, optimizer and schedule
//! - [`Trainer`] - Epoch loop with checkpoints, early stopping and resume
//! - [`MetricsSink`] - Destination of per-epoch logs
//!
//! # Evaluation
//!
//! - [`evaluate`] - Posteriors, decisions and per-partition errors
//!
//! # Example
//!
//! ```
//! use burn::tensor::Tensor;
//! use burn_ndarray::NdArray;
//! use ordinal_training::{LossTargets, head_loss};
//! use ordinal_types::{HeadSpec, LossKind};
//!
//! let device = Default::default();
//! let head = HeadSpec::new("grade", 4, LossKind::RankConsistent);
//! let logits = Tensor::<NdArray<f32>, 2>::zeros([2, 3], &device);
//! let targets = LossTargets::from_labels(Tensor::from_ints([0, 3], &device));
//!
//! let loss = head_loss(&head, logits, &targets).unwrap();
//! assert!(loss.into_scalar() > 0.0);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod checkpoint;
mod config;
mod decision;
mod error;
mod evaluation;
mod loss;
mod metrics;
mod scaler;
mod sink;
mod trainer;

// Re-export configuration
pub use config::{
    CHECKPOINT_DIR, LearningRateSchedule, LossScaleConfig, OptimizerConfig, OptimizerType,
    TrainingConfig,
};

// Re-export loss functions
pub use loss::{
    LossTargets, cross_entropy, cumulative_jensen_shannon, extended_binary, gaussian_kl,
    gaussian_label_distribution, gaussian_target, head_loss, mean_absolute_error, mean_variance,
    noisy_gaussian_kl, nominal_gaussian_target, posterior_extended_binary, rank_consistent,
    soft_labels, unimodal_concentrated,
};

// Re-export decisions
pub use decision::{
    batch_error, cost_tensor, decisions_to_host, expected_costs, predict_labels, risk_decision,
};

// Re-export metrics
pub use metrics::{EpochLog, HeadMetrics, Phase, PhaseMetrics, PhaseSummary, RunningMean};

// Re-export loss scaling
pub use scaler::LossScaler;

// Re-export checkpoints
pub use checkpoint::{
    Checkpoint, CheckpointState, checkpoint_path, find_checkpoint, load_checkpoint, load_state,
    save_checkpoint,
};

// Re-export sinks
pub use sink::{JsonLinesSink, MemorySink, MetricsEntry, MetricsSink, TracingSink};

// Re-export trainer
pub use trainer::{StopReason, Trainer, TrainerPhase, TrainingOutcome, TrainingState};

// Re-export evaluation
pub use evaluation::{EvaluationReport, HeadEvaluation, PartitionErrors, evaluate};

// Re-export error types
pub use error::{Result, TrainingError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        EpochLog, EvaluationReport, LearningRateSchedule, LossScaleConfig, LossTargets,
        MemorySink, MetricsSink, OptimizerConfig, StopReason, Trainer, TrainingConfig,
        TrainingError, TrainingOutcome, batch_error, evaluate, head_loss, risk_decision,
    };
}
