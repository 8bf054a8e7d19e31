//! Prediction head configuration.

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// One output channel of a multi-head model.
///
/// A head pairs a tag with the loss family used to train it and the weight
/// of its loss in the combined training objective.
///
/// # Example
///
/// ```
/// use ordinal_types::{HeadSpec, LossKind};
///
/// let head = HeadSpec::new("grade", 5, LossKind::RankConsistent);
/// assert_eq!(head.logit_width(), 4);
/// assert!(head.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadSpec {
    /// Unique head identifier.
    pub tag: String,

    /// Contribution of this head to the combined loss.
    pub weight: f32,

    /// Number of ordinal classes.
    pub nr_classes: usize,

    /// Loss family and its hyperparameters.
    pub loss: LossKind,
}

impl HeadSpec {
    /// Creates a head with unit weight.
    #[must_use]
    pub fn new(tag: impl Into<String>, nr_classes: usize, loss: LossKind) -> Self {
        Self {
            tag: tag.into(),
            weight: 1.0,
            nr_classes,
            loss,
        }
    }

    /// Sets the loss weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Width of the logits vector this head expects per example.
    #[must_use]
    pub const fn logit_width(&self) -> usize {
        self.loss.logit_width(self.nr_classes)
    }

    /// Validates the head configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tag.is_empty() {
            return Err(ValidationError::MissingField("head tag".to_string()));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ValidationError::InvalidWeight {
                tag: self.tag.clone(),
                weight: self.weight,
            });
        }
        if self.nr_classes < 2 {
            return Err(ValidationError::TooFewClasses {
                tag: self.tag.clone(),
                nr_classes: self.nr_classes,
            });
        }
        self.loss.validate(&self.tag, self.nr_classes)
    }
}

/// Loss family of a head, with its hyperparameters.
///
/// Each variant determines both the logit width and the posterior transform
/// of the head. Serialized with an internal `kind` tag:
///
/// ```
/// use ordinal_types::LossKind;
///
/// let json = r#"{"kind":"mean_variance","lambda_1":0.2,"lambda_2":0.05}"#;
/// let kind: LossKind = serde_json::from_str(json).unwrap();
/// assert_eq!(kind.name(), "mean_variance");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LossKind {
    /// Plain cross-entropy against the hard label.
    CrossEntropy,

    /// Cross-entropy with mean and variance penalties.
    MeanVariance(MeanVarianceParams),

    /// Concentrated likelihood with a unimodality penalty.
    UnimodalConcentrated(UnimodalParams),

    /// Cross-entropy against a discretized Gaussian label distribution.
    GaussianLabelDistribution(GaussianParams),

    /// KL divergence to a Gaussian label distribution plus L1 on the expectation.
    GaussianKl(GaussianKlParams),

    /// [`LossKind::GaussianKl`] with per-example target mean and sigma.
    NoisyGaussianKl(GaussianKlParams),

    /// Jensen-Shannon style divergence between cumulative distributions.
    CumulativeJensenShannon(GaussianParams),

    /// Cross-entropy against a softmax of negative label distances.
    SoftLabels(SoftLabelParams),

    /// Independent weighted binary classifiers on `label > k`.
    ExtendedBinary(ExtendedBinaryParams),

    /// Rank-consistent binary decomposition.
    RankConsistent,

    /// Label distribution plus truncated hyperplane loss on binary outputs.
    PosteriorExtendedBinary(PosteriorExtendedBinaryParams),

    /// Absolute error of a single regression output.
    MeanAbsoluteError,
}

impl LossKind {
    /// Returns the snake-case name of the loss family.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CrossEntropy => "cross_entropy",
            Self::MeanVariance(_) => "mean_variance",
            Self::UnimodalConcentrated(_) => "unimodal_concentrated",
            Self::GaussianLabelDistribution(_) => "gaussian_label_distribution",
            Self::GaussianKl(_) => "gaussian_kl",
            Self::NoisyGaussianKl(_) => "noisy_gaussian_kl",
            Self::CumulativeJensenShannon(_) => "cumulative_jensen_shannon",
            Self::SoftLabels(_) => "soft_labels",
            Self::ExtendedBinary(_) => "extended_binary",
            Self::RankConsistent => "rank_consistent",
            Self::PosteriorExtendedBinary(_) => "posterior_extended_binary",
            Self::MeanAbsoluteError => "mean_absolute_error",
        }
    }

    /// Number of logits per example for a head with `nr_classes` classes.
    #[must_use]
    pub const fn logit_width(&self, nr_classes: usize) -> usize {
        match self {
            Self::ExtendedBinary(_) | Self::RankConsistent => nr_classes.saturating_sub(1),
            Self::PosteriorExtendedBinary(_) => (2 * nr_classes).saturating_sub(1),
            Self::MeanAbsoluteError => 1,
            Self::CrossEntropy
            | Self::MeanVariance(_)
            | Self::UnimodalConcentrated(_)
            | Self::GaussianLabelDistribution(_)
            | Self::GaussianKl(_)
            | Self::NoisyGaussianKl(_)
            | Self::CumulativeJensenShannon(_)
            | Self::SoftLabels(_) => nr_classes,
        }
    }

    /// Returns `true` if the loss consumes per-example target means and sigmas.
    #[must_use]
    pub const fn uses_soft_targets(&self) -> bool {
        matches!(self, Self::NoisyGaussianKl(_) | Self::CumulativeJensenShannon(_))
    }

    fn validate(&self, tag: &str, nr_classes: usize) -> Result<(), ValidationError> {
        let invalid = |name: &str, value: f32| ValidationError::InvalidHyperparameter {
            tag: tag.to_string(),
            name: name.to_string(),
            value,
        };

        match self {
            Self::CrossEntropy | Self::RankConsistent | Self::MeanAbsoluteError => Ok(()),
            Self::MeanVariance(p) => {
                if p.lambda_1 < 0.0 || !p.lambda_1.is_finite() {
                    Err(invalid("lambda_1", p.lambda_1))
                } else if p.lambda_2 < 0.0 || !p.lambda_2.is_finite() {
                    Err(invalid("lambda_2", p.lambda_2))
                } else {
                    Ok(())
                }
            }
            Self::UnimodalConcentrated(p) => {
                if p.lambda < 0.0 || !p.lambda.is_finite() {
                    Err(invalid("lambda", p.lambda))
                } else {
                    Ok(())
                }
            }
            Self::GaussianLabelDistribution(p) | Self::CumulativeJensenShannon(p) => {
                if p.sigma > 0.0 && p.sigma.is_finite() {
                    Ok(())
                } else {
                    Err(invalid("sigma", p.sigma))
                }
            }
            Self::GaussianKl(p) | Self::NoisyGaussianKl(p) => {
                if !(p.sigma > 0.0 && p.sigma.is_finite()) {
                    Err(invalid("sigma", p.sigma))
                } else if p.lambda < 0.0 || !p.lambda.is_finite() {
                    Err(invalid("lambda", p.lambda))
                } else {
                    Ok(())
                }
            }
            Self::SoftLabels(_) => Ok(()),
            Self::ExtendedBinary(p) => match &p.indicator_weights {
                Some(weights) if weights.len() != nr_classes - 1 => {
                    Err(ValidationError::DimensionMismatch {
                        what: format!("indicator weights of head '{tag}'"),
                        expected: nr_classes - 1,
                        actual: weights.len(),
                    })
                }
                Some(weights) => match weights.iter().find(|w| **w < 0.0 || !w.is_finite()) {
                    Some(&w) => Err(invalid("indicator_weights", w)),
                    None => Ok(()),
                },
                None => Ok(()),
            },
            Self::PosteriorExtendedBinary(p) => {
                if p.sigma > 0.0 && p.sigma.is_finite() {
                    Ok(())
                } else {
                    Err(invalid("sigma", p.sigma))
                }
            }
        }
    }
}

/// Hyperparameters of the mean-variance loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanVarianceParams {
    /// Weight of the squared error between posterior mean and label.
    #[serde(default = "defaults::mean_weight")]
    pub lambda_1: f32,

    /// Weight of the posterior variance.
    #[serde(default = "defaults::variance_weight")]
    pub lambda_2: f32,
}

impl Default for MeanVarianceParams {
    fn default() -> Self {
        Self {
            lambda_1: defaults::mean_weight(),
            lambda_2: defaults::variance_weight(),
        }
    }
}

/// Hyperparameters of the unimodal-concentrated loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnimodalParams {
    /// Weight of the unimodality penalty.
    #[serde(default = "defaults::unimodal_weight")]
    pub lambda: f32,
}

impl Default for UnimodalParams {
    fn default() -> Self {
        Self {
            lambda: defaults::unimodal_weight(),
        }
    }
}

/// Width of a Gaussian label distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianParams {
    /// Standard deviation of the target distribution, in classes.
    #[serde(default = "defaults::sigma")]
    pub sigma: f32,
}

impl Default for GaussianParams {
    fn default() -> Self {
        Self {
            sigma: defaults::sigma(),
        }
    }
}

/// Hyperparameters of the KL label-distribution losses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianKlParams {
    /// Standard deviation of the target distribution.
    pub sigma: f32,

    /// Weight of the L1 term on the posterior expectation.
    #[serde(default = "defaults::unit")]
    pub lambda: f32,
}

impl GaussianKlParams {
    /// Defaults of the nominal-label variant (`sigma = 0.75`).
    pub const NOMINAL: Self = Self {
        sigma: 0.75,
        lambda: 1.0,
    };

    /// Defaults of the per-example variant (`sigma = 2`).
    pub const NOISY: Self = Self {
        sigma: 2.0,
        lambda: 1.0,
    };
}

/// Label distance used to build soft labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LabelDistance {
    /// Absolute distance `|k - y|`.
    #[default]
    L1,
    /// Squared distance `(k - y)^2`.
    L2,
}

/// Hyperparameters of the soft-labels loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SoftLabelParams {
    /// Distance measure between class index and label.
    #[serde(default)]
    pub distance: LabelDistance,
}

/// Hyperparameters of the extended binary loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtendedBinaryParams {
    /// Per-indicator weights (length `nr_classes - 1`); uniform when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_weights: Option<Vec<f32>>,
}

/// Hyperparameters of the posterior + extended binary loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosteriorExtendedBinaryParams {
    /// Binary mismatches closer than this to the label are ignored.
    #[serde(default = "defaults::truncation_distance")]
    pub truncation_distance: usize,

    /// Standard deviation of the Gaussian target on the distribution part.
    #[serde(default = "defaults::sigma")]
    pub sigma: f32,
}

impl Default for PosteriorExtendedBinaryParams {
    fn default() -> Self {
        Self {
            truncation_distance: defaults::truncation_distance(),
            sigma: defaults::sigma(),
        }
    }
}

mod defaults {
    pub const fn mean_weight() -> f32 {
        0.2
    }

    pub const fn variance_weight() -> f32 {
        0.05
    }

    pub const fn unimodal_weight() -> f32 {
        1000.0
    }

    pub const fn sigma() -> f32 {
        2.0
    }

    pub const fn unit() -> f32 {
        1.0
    }

    pub const fn truncation_distance() -> usize {
        3
    }
}
