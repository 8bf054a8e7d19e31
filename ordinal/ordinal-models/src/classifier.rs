//! Reference multi-head classifier.

use burn::module::{Ignored, Module};
use burn::nn;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use ordinal_dataset::HostBatch;
use ordinal_types::HeadSpec;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::model::{HeadLogits, MultiHeadModel, batch_inputs};

/// Output layer of one head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadOutput {
    /// Head tag.
    pub tag: String,

    /// Number of logits.
    pub width: usize,
}

/// Configuration for the multi-head classifier.
///
/// # Example
///
/// ```
/// use ordinal_models::MultiHeadClassifierConfig;
/// use ordinal_types::{HeadSpec, LossKind};
///
/// let heads = vec![
///     HeadSpec::new("grade", 5, LossKind::CrossEntropy),
///     HeadSpec::new("grade_coral", 5, LossKind::RankConsistent),
/// ];
/// let config = MultiHeadClassifierConfig::new(16).with_heads(&heads);
///
/// assert_eq!(config.heads[1].width, 4);
/// assert!(config.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiHeadClassifierConfig {
    /// Input dimension.
    pub input_dim: usize,

    /// Number of hidden units of the shared layer.
    pub hidden: usize,

    /// One output layer per head.
    pub heads: Vec<HeadOutput>,
}

impl Default for MultiHeadClassifierConfig {
    fn default() -> Self {
        Self {
            input_dim: 4,
            hidden: 64,
            heads: Vec::new(),
        }
    }
}

impl MultiHeadClassifierConfig {
    /// Creates a configuration for the given input dimension.
    #[must_use]
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            ..Self::default()
        }
    }

    /// Sets the hidden size.
    #[must_use]
    pub const fn with_hidden(mut self, hidden: usize) -> Self {
        self.hidden = hidden;
        self
    }

    /// Adds an output layer sized for each head.
    #[must_use]
    pub fn with_heads(mut self, heads: &[HeadSpec]) -> Self {
        self.heads.extend(heads.iter().map(|h| HeadOutput {
            tag: h.tag.clone(),
            width: h.logit_width(),
        }));
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `true` if all dimensions are positive and there is at least
    /// one head.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.input_dim > 0
            && self.hidden > 0
            && !self.heads.is_empty()
            && self.heads.iter().all(|h| h.width > 0 && !h.tag.is_empty())
    }
}

/// A shared hidden layer feeding one linear output layer per head.
///
/// Architecture: Input -> Linear -> `ReLU` -> { Linear per head }
///
/// Used in tests and demos as a stand-in for a real backbone.
#[derive(Debug, Module)]
pub struct MultiHeadClassifier<B: Backend> {
    backbone: nn::Linear<B>,
    heads: Vec<nn::Linear<B>>,
    tags: Ignored<Vec<String>>,
}

impl<B: Backend> MultiHeadClassifier<B> {
    /// Creates a new classifier.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if the configuration is not valid.
    pub fn new(config: &MultiHeadClassifierConfig, device: &B::Device) -> Result<Self> {
        if !config.is_valid() {
            return Err(ModelError::invalid_config(format!(
                "input_dim={}, hidden={}, heads={}",
                config.input_dim,
                config.hidden,
                config.heads.len()
            )));
        }

        let backbone = nn::LinearConfig::new(config.input_dim, config.hidden).init(device);
        let heads = config
            .heads
            .iter()
            .map(|h| nn::LinearConfig::new(config.hidden, h.width).init(device))
            .collect();
        let tags = config.heads.iter().map(|h| h.tag.clone()).collect();

        Ok(Self {
            backbone,
            heads,
            tags: Ignored(tags),
        })
    }

    /// Runs the forward pass on an input tensor of shape `[batch, input_dim]`.
    pub fn forward_tensor(&self, input: Tensor<B, 2>) -> HeadLogits<B> {
        let hidden = relu(self.backbone.forward(input));
        self.tags
            .iter()
            .zip(&self.heads)
            .map(|(tag, layer)| (tag.clone(), layer.forward(hidden.clone())))
            .collect()
    }
}

impl<B: Backend> MultiHeadModel<B> for MultiHeadClassifier<B> {
    fn forward(&self, batch: &HostBatch, device: &B::Device) -> HeadLogits<B> {
        self.forward_tensor(batch_inputs(batch, device))
    }
}
