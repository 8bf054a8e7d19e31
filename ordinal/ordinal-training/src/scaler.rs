//! Dynamic loss scaler.

use std::marker::PhantomData;

use burn::module::{AutodiffModule, ModuleVisitor, ParamId};
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::config::LossScaleConfig;
use crate::loss::ensure_finite;

/// Scale state of a run; persisted in the checkpoint.
///
/// # Example
///
/// ```
/// use ordinal_training::{LossScaleConfig, LossScaler};
///
/// let mut scaler = LossScaler::new(LossScaleConfig::dynamic().with_init_scale(8.0));
/// scaler.update(false);
/// assert_eq!(scaler.scale(), 4.0);
/// assert_eq!(scaler.skipped_steps(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossScaler {
    config: LossScaleConfig,
    scale: f32,
    growth_tracker: usize,
    skipped_steps: usize,
}

impl LossScaler {
    /// Creates a scaler at the configured initial scale.
    #[must_use]
    pub const fn new(config: LossScaleConfig) -> Self {
        Self {
            config,
            scale: config.init_scale,
            growth_tracker: 0,
            skipped_steps: 0,
        }
    }

    /// Current scale; 1 when disabled.
    #[must_use]
    pub const fn scale(&self) -> f32 {
        if self.config.enabled { self.scale } else { 1.0 }
    }

    /// Whether scaling is applied.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Number of optimizer steps skipped for non-finite gradients.
    #[must_use]
    pub const fn skipped_steps(&self) -> usize {
        self.skipped_steps
    }

    /// Multiplies the loss by the current scale.
    #[must_use]
    pub fn scale_loss<B: AutodiffBackend>(&self, loss: Tensor<B, 1>) -> Tensor<B, 1> {
        if self.config.enabled {
            loss.mul_scalar(self.scale)
        } else {
            loss
        }
    }

    /// Divides every gradient of `module` by the scale.
    ///
    /// Returns the gradients and whether all of them are finite. Disabled
    /// scaling returns the gradients untouched.
    pub fn unscale<B, M>(&self, module: &M, mut grads: GradientsParams) -> (GradientsParams, bool)
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        if !self.config.enabled {
            return (grads, true);
        }
        let mut visitor = GradientUnscaler::<B> {
            grads: &mut grads,
            inverse_scale: 1.0 / self.scale,
            finite: true,
            backend: PhantomData,
        };
        module.visit(&mut visitor);
        let finite = visitor.finite;
        (grads, finite)
    }

    /// Adjusts the scale after a step.
    pub fn update(&mut self, finite: bool) {
        if !self.config.enabled {
            return;
        }
        if finite {
            self.growth_tracker += 1;
            if self.growth_tracker >= self.config.growth_interval {
                self.scale *= self.config.growth_factor;
                self.growth_tracker = 0;
            }
        } else {
            self.scale *= self.config.backoff_factor;
            self.growth_tracker = 0;
            self.skipped_steps += 1;
            tracing::warn!(scale = self.scale, "non-finite gradients, step skipped");
        }
    }
}

struct GradientUnscaler<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    inverse_scale: f32,
    finite: bool,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradientUnscaler<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            let grad = grad.mul_scalar(self.inverse_scale);
            self.finite &= ensure_finite(&grad, String::new).is_ok();
            self.grads.register::<B::InnerBackend, D>(id, grad);
        }
    }
}
