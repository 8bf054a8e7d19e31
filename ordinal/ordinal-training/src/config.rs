//! Training configuration.

use std::path::{Path, PathBuf};

use burn::grad_clipping::GradientClippingConfig;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{AdamConfig, AdamWConfig, SgdConfig};
use ordinal_types::{CostMatrices, HeadSpec, validate_heads};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Name of the checkpoint directory under the output directory.
pub const CHECKPOINT_DIR: &str = "checkpoint";

/// Configuration for a training run.
///
/// # Example
///
/// ```
/// use ordinal_training::TrainingConfig;
/// use ordinal_types::{CostMatrices, CostMatrix, HeadSpec, LossKind};
///
/// let heads = vec![HeadSpec::new("grade", 5, LossKind::RankConsistent)];
/// let costs = CostMatrices::new().with("grade", CostMatrix::absolute(5));
/// let config = TrainingConfig::new(heads, costs)
///     .with_max_epochs(50)
///     .with_patience(5);
///
/// assert!(config.validate().is_ok());
/// assert!(config.checkpoint_dir().ends_with("checkpoint"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Heads to train, with their loss weights.
    pub heads: Vec<HeadSpec>,

    /// Decision cost matrix of every head.
    pub cost_matrices: CostMatrices,

    /// Maximum number of epochs.
    pub max_epochs: usize,

    /// Epochs without a new best validation error before stopping.
    pub patience: usize,

    /// Optimizer configuration.
    pub optimizer: OptimizerConfig,

    /// Learning rate schedule.
    pub lr_schedule: LearningRateSchedule,

    /// Loss scaling for reduced-precision backends.
    #[serde(default)]
    pub loss_scale: LossScaleConfig,

    /// Directory holding the checkpoint of the run.
    pub output_dir: PathBuf,

    /// Run name passed to the metrics sink.
    pub run_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(Vec::new(), CostMatrices::new())
    }
}

impl TrainingConfig {
    /// Creates a configuration for the given heads and cost matrices.
    #[must_use]
    pub fn new(heads: Vec<HeadSpec>, cost_matrices: CostMatrices) -> Self {
        Self {
            heads,
            cost_matrices,
            max_epochs: 100,
            patience: 10,
            optimizer: OptimizerConfig::adam(1e-3),
            lr_schedule: LearningRateSchedule::Constant,
            loss_scale: LossScaleConfig::default(),
            output_dir: PathBuf::from("runs"),
            run_name: "ordinal".to_string(),
        }
    }

    /// Sets the maximum number of epochs.
    #[must_use]
    pub const fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    /// Sets the early stopping patience.
    #[must_use]
    pub const fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    /// Sets the optimizer.
    #[must_use]
    pub const fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the learning rate schedule.
    #[must_use]
    pub const fn with_lr_schedule(mut self, schedule: LearningRateSchedule) -> Self {
        self.lr_schedule = schedule;
        self
    }

    /// Sets the loss scaling.
    #[must_use]
    pub const fn with_loss_scale(mut self, loss_scale: LossScaleConfig) -> Self {
        self.loss_scale = loss_scale;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl AsRef<Path>) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    /// Sets the run name.
    #[must_use]
    pub fn with_run_name(mut self, run_name: impl Into<String>) -> Self {
        self.run_name = run_name.into();
        self
    }

    /// Directory of the current checkpoint.
    #[must_use]
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.output_dir.join(CHECKPOINT_DIR)
    }

    /// Learning rate of an epoch.
    #[must_use]
    pub fn learning_rate(&self, epoch: usize) -> f64 {
        f64::from(
            self.lr_schedule
                .compute_lr(self.optimizer.learning_rate, epoch, self.max_epochs),
        )
    }

    /// Validates heads, cost matrices and hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] naming the first problem.
    pub fn validate(&self) -> Result<()> {
        validate_heads(&self.heads)?;
        self.cost_matrices.check_heads(&self.heads)?;

        if self.max_epochs == 0 {
            return Err(TrainingError::invalid_config("max_epochs must be positive"));
        }
        if !self.optimizer.is_valid() {
            return Err(TrainingError::invalid_config(format!(
                "optimizer: {:?}",
                self.optimizer
            )));
        }
        if !self.lr_schedule.is_valid() {
            return Err(TrainingError::invalid_config(format!(
                "learning rate schedule: {:?}",
                self.lr_schedule
            )));
        }
        if !self.loss_scale.is_valid() {
            return Err(TrainingError::invalid_config(format!(
                "loss scale: {:?}",
                self.loss_scale
            )));
        }
        if self.run_name.is_empty() {
            return Err(TrainingError::invalid_config("run_name must not be empty"));
        }
        Ok(())
    }
}

/// Optimizer configuration.
///
/// # Example
///
/// ```
/// use ordinal_training::OptimizerConfig;
///
/// let adam = OptimizerConfig::adam(1e-3);
/// assert_eq!(adam.learning_rate, 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Base learning rate.
    pub learning_rate: f32,

    /// Weight decay (L2 regularization, decoupled for `AdamW`).
    pub weight_decay: f32,

    /// Optimizer type.
    pub optimizer_type: OptimizerType,

    /// Momentum (for SGD).
    pub momentum: f32,

    /// Beta1 (for Adam).
    pub beta1: f32,

    /// Beta2 (for Adam).
    pub beta2: f32,

    /// Epsilon for numerical stability.
    pub epsilon: f32,

    /// Gradient norm clipping threshold (0.0 = disabled).
    #[serde(default)]
    pub gradient_clip: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam(1e-3)
    }
}

impl OptimizerConfig {
    /// Creates an Adam optimizer config.
    #[must_use]
    pub const fn adam(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            optimizer_type: OptimizerType::Adam,
            momentum: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            gradient_clip: 0.0,
        }
    }

    /// Creates an `AdamW` optimizer config.
    #[must_use]
    pub const fn adamw(learning_rate: f32, weight_decay: f32) -> Self {
        Self {
            weight_decay,
            optimizer_type: OptimizerType::AdamW,
            ..Self::adam(learning_rate)
        }
    }

    /// Creates an SGD optimizer config.
    #[must_use]
    pub const fn sgd(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            optimizer_type: OptimizerType::Sgd,
            momentum: 0.0,
            beta1: 0.0,
            beta2: 0.0,
            epsilon: 1e-8,
            gradient_clip: 0.0,
        }
    }

    /// Creates an SGD with momentum optimizer config.
    #[must_use]
    pub const fn sgd_momentum(learning_rate: f32, momentum: f32) -> Self {
        Self {
            momentum,
            ..Self::sgd(learning_rate)
        }
    }

    /// Sets weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Sets the gradient norm clipping threshold.
    #[must_use]
    pub const fn with_gradient_clip(mut self, gradient_clip: f32) -> Self {
        self.gradient_clip = gradient_clip;
        self
    }

    /// Validates the configuration.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.learning_rate > 0.0
            && self.weight_decay >= 0.0
            && self.momentum >= 0.0
            && self.momentum <= 1.0
            && self.beta1 >= 0.0
            && self.beta1 < 1.0
            && self.beta2 >= 0.0
            && self.beta2 < 1.0
            && self.epsilon > 0.0
            && self.gradient_clip >= 0.0
    }

    fn clipping(&self) -> Option<GradientClippingConfig> {
        (self.gradient_clip > 0.0).then_some(GradientClippingConfig::Norm(self.gradient_clip))
    }

    fn decay(&self) -> Option<WeightDecayConfig> {
        (self.weight_decay > 0.0).then(|| WeightDecayConfig::new(self.weight_decay))
    }

    /// Burn configuration of the Adam optimizer.
    #[must_use]
    pub fn adam_config(&self) -> AdamConfig {
        AdamConfig::new()
            .with_beta_1(self.beta1)
            .with_beta_2(self.beta2)
            .with_epsilon(self.epsilon)
            .with_weight_decay(self.decay())
            .with_grad_clipping(self.clipping())
    }

    /// Burn configuration of the `AdamW` optimizer.
    #[must_use]
    pub fn adamw_config(&self) -> AdamWConfig {
        AdamWConfig::new()
            .with_beta_1(self.beta1)
            .with_beta_2(self.beta2)
            .with_epsilon(self.epsilon)
            .with_weight_decay(self.weight_decay)
            .with_grad_clipping(self.clipping())
    }

    /// Burn configuration of the SGD optimizer.
    #[must_use]
    pub fn sgd_config(&self) -> SgdConfig {
        let momentum = (self.momentum > 0.0).then(|| {
            MomentumConfig::new()
                .with_momentum(f64::from(self.momentum))
                .with_dampening(0.0)
        });
        SgdConfig::new()
            .with_momentum(momentum)
            .with_weight_decay(self.decay())
            .with_gradient_clipping(self.clipping())
    }
}

/// Type of optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizerType {
    /// Stochastic Gradient Descent, with momentum when configured.
    Sgd,
    /// Adam optimizer.
    Adam,
    /// `AdamW` optimizer (Adam with decoupled weight decay).
    AdamW,
}

/// Learning rate schedule.
///
/// # Example
///
/// ```
/// use ordinal_training::LearningRateSchedule;
///
/// let schedule = LearningRateSchedule::step(0.1, 30);
/// assert!((schedule.compute_lr(1.0, 30, 100) - 0.1).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum LearningRateSchedule {
    /// Constant learning rate.
    #[default]
    Constant,

    /// Step decay: multiply by factor every `step_size` epochs.
    Step {
        /// Decay factor.
        factor: f32,
        /// Epochs between decays.
        step_size: usize,
    },

    /// Exponential decay: lr * gamma^epoch.
    Exponential {
        /// Decay rate per epoch.
        gamma: f32,
    },

    /// Cosine annealing to minimum.
    Cosine {
        /// Minimum learning rate.
        min_lr: f32,
    },

    /// Linear warmup followed by cosine decay.
    WarmupCosine {
        /// Warmup epochs.
        warmup_epochs: usize,
        /// Minimum learning rate.
        min_lr: f32,
    },
}

impl LearningRateSchedule {
    /// Creates a step decay schedule.
    #[must_use]
    pub const fn step(factor: f32, step_size: usize) -> Self {
        Self::Step { factor, step_size }
    }

    /// Creates an exponential decay schedule.
    #[must_use]
    pub const fn exponential(gamma: f32) -> Self {
        Self::Exponential { gamma }
    }

    /// Creates a cosine annealing schedule.
    #[must_use]
    pub const fn cosine(min_lr: f32) -> Self {
        Self::Cosine { min_lr }
    }

    /// Creates a warmup + cosine schedule.
    #[must_use]
    pub const fn warmup_cosine(warmup_epochs: usize, min_lr: f32) -> Self {
        Self::WarmupCosine {
            warmup_epochs,
            min_lr,
        }
    }

    /// Validates the schedule parameters.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Constant => true,
            Self::Step { factor, step_size } => factor > 0.0 && step_size > 0,
            Self::Exponential { gamma } => gamma > 0.0,
            Self::Cosine { min_lr } => min_lr >= 0.0,
            Self::WarmupCosine {
                warmup_epochs,
                min_lr,
            } => warmup_epochs > 0 && min_lr >= 0.0,
        }
    }

    /// Computes the learning rate for a given epoch.
    ///
    /// # Arguments
    ///
    /// - `base_lr`: The base learning rate
    /// - `epoch`: Current epoch (0-indexed)
    /// - `total_epochs`: Total number of epochs
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap
    )]
    pub fn compute_lr(&self, base_lr: f32, epoch: usize, total_epochs: usize) -> f32 {
        match self {
            Self::Constant => base_lr,

            Self::Step { factor, step_size } => {
                let decays = epoch / (*step_size).max(1);
                base_lr * factor.powi(decays as i32)
            }

            Self::Exponential { gamma } => base_lr * gamma.powi(epoch as i32),

            Self::Cosine { min_lr } => {
                let progress = epoch as f32 / total_epochs.max(1) as f32;
                let cosine = (std::f32::consts::PI * progress).cos();
                min_lr + (base_lr - min_lr) * (1.0 + cosine) / 2.0
            }

            Self::WarmupCosine {
                warmup_epochs,
                min_lr,
            } => {
                if epoch < *warmup_epochs {
                    // Linear warmup
                    base_lr * (epoch + 1) as f32 / *warmup_epochs as f32
                } else {
                    let remaining = total_epochs.saturating_sub(*warmup_epochs);
                    let progress = (epoch - warmup_epochs) as f32 / remaining.max(1) as f32;
                    let cosine = (std::f32::consts::PI * progress).cos();
                    min_lr + (base_lr - min_lr) * (1.0 + cosine) / 2.0
                }
            }
        }
    }
}

/// Dynamic loss scaling.
///
/// The loss is multiplied by a scale before the backward pass and the
/// gradients divided by it before the optimizer step. Steps with
/// non-finite gradients are skipped and the scale shrinks by
/// `backoff_factor`; after `growth_interval` finite steps it grows by
/// `growth_factor`. Disabled scaling is a pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossScaleConfig {
    /// Whether loss scaling is applied.
    pub enabled: bool,

    /// Initial scale.
    pub init_scale: f32,

    /// Scale multiplier after `growth_interval` finite steps.
    pub growth_factor: f32,

    /// Scale multiplier after a step with non-finite gradients.
    pub backoff_factor: f32,

    /// Finite steps between scale increases.
    pub growth_interval: usize,
}

impl Default for LossScaleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            init_scale: 65536.0,
            growth_factor: 2.0,
            backoff_factor: 0.5,
            growth_interval: 2000,
        }
    }
}

impl LossScaleConfig {
    /// Enabled dynamic scaling with default factors.
    #[must_use]
    pub fn dynamic() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Sets the initial scale.
    #[must_use]
    pub const fn with_init_scale(mut self, init_scale: f32) -> Self {
        self.init_scale = init_scale;
        self
    }

    /// Sets the growth interval.
    #[must_use]
    pub const fn with_growth_interval(mut self, growth_interval: usize) -> Self {
        self.growth_interval = growth_interval;
        self
    }

    /// Validates the configuration.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.init_scale.is_finite()
            && self.init_scale > 0.0
            && self.growth_factor >= 1.0
            && self.backoff_factor > 0.0
            && self.backoff_factor < 1.0
            && self.growth_interval > 0
    }
}
