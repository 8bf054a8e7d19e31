//! Ordinal-regression loss functions.
//!
//! Every function takes `[batch, width]` logits and returns a one-element
//! tensor holding the batch mean of a non-negative loss. Inputs are checked
//! first: non-finite logits or posteriors, and Gaussian targets with a
//! non-finite mean or a sigma that is not positive, give
//! [`TrainingError::NumericalInstability`]. Widths that do not fit the loss
//! give [`TrainingError::ShapeMismatch`].

use burn::prelude::Backend;
use burn::tensor::activation::{log_sigmoid, log_softmax, relu, sigmoid, softmax};
use burn::tensor::{Bool, ElementConversion, Int, Tensor, TensorData};
use ordinal_dataset::HeadTargets;
use ordinal_types::{
    ExtendedBinaryParams, GaussianKlParams, GaussianParams, HeadSpec, LabelDistance, LossKind,
    MeanVarianceParams, PosteriorExtendedBinaryParams, SoftLabelParams, UnimodalParams,
};

use crate::error::{Result, TrainingError};

/// Floor added to probabilities and variances before logs and divisions.
const EPSILON: f32 = 1e-10;

/// Floor applied to target probabilities inside `t * log(t)`.
const TARGET_FLOOR: f32 = 1e-30;

/// Labels of a batch on the device, with optional per-example Gaussian
/// target parameters.
#[derive(Debug, Clone)]
pub struct LossTargets<B: Backend> {
    /// Class labels, `[batch]`.
    pub labels: Tensor<B, 1, Int>,

    /// Per-example target means, `[batch]`.
    pub means: Option<Tensor<B, 1>>,

    /// Per-example target standard deviations, `[batch]`.
    pub sigmas: Option<Tensor<B, 1>>,
}

impl<B: Backend> LossTargets<B> {
    /// Creates targets from labels only.
    #[must_use]
    pub const fn from_labels(labels: Tensor<B, 1, Int>) -> Self {
        Self {
            labels,
            means: None,
            sigmas: None,
        }
    }

    /// Attaches per-example target means and standard deviations.
    #[must_use]
    pub fn with_distribution(mut self, means: Tensor<B, 1>, sigmas: Tensor<B, 1>) -> Self {
        self.means = Some(means);
        self.sigmas = Some(sigmas);
        self
    }

    /// Moves the host-side targets of a head to the device.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidLabel`] for a label outside
    /// `[0, head.nr_classes)` and [`TrainingError::ShapeMismatch`] if the
    /// per-example means or sigmas do not have one entry per label.
    #[allow(clippy::cast_possible_wrap)]
    pub fn from_host(targets: &HeadTargets, head: &HeadSpec, device: &B::Device) -> Result<Self> {
        let len = targets.len();
        if let Some(&label) = targets.labels.iter().find(|&&l| l >= head.nr_classes) {
            return Err(TrainingError::invalid_label(&head.tag, label, head.nr_classes));
        }

        let labels: Vec<i64> = targets.labels.iter().map(|&l| l as i64).collect();
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [len]).convert::<B::IntElem>(),
            device,
        );

        let to_device = |values: &Option<Vec<f32>>, what: &str| -> Result<Option<Tensor<B, 1>>> {
            values
                .as_ref()
                .map(|values| {
                    if values.len() == len {
                        Ok(Tensor::from_data(
                            TensorData::new(values.clone(), [len]).convert::<B::FloatElem>(),
                            device,
                        ))
                    } else {
                        Err(TrainingError::shape_mismatch(
                            format!("{} of head '{}'", what, head.tag),
                            format!("[{len}]"),
                            format!("[{}]", values.len()),
                        ))
                    }
                })
                .transpose()
        };

        Ok(Self {
            labels,
            means: to_device(&targets.means, "target means")?,
            sigmas: to_device(&targets.sigmas, "target sigmas")?,
        })
    }

    /// Number of examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.dims()[0]
    }

    /// Returns `true` if there are no examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes the loss of one head.
///
/// Dispatches on [`LossKind`]. [`LossKind::NoisyGaussianKl`] and
/// [`LossKind::CumulativeJensenShannon`] use the per-example target means and
/// sigmas when present, and fall back to the label and the configured sigma
/// otherwise.
///
/// # Errors
///
/// Returns [`TrainingError::ShapeMismatch`] if the logit width is not
/// `head.logit_width()` or the batch sizes differ, and
/// [`TrainingError::NumericalInstability`] for non-finite inputs.
pub fn head_loss<B: Backend>(
    head: &HeadSpec,
    logits: Tensor<B, 2>,
    targets: &LossTargets<B>,
) -> Result<Tensor<B, 1>> {
    let [batch, width] = logits.dims();
    if width != head.logit_width() {
        return Err(TrainingError::shape_mismatch(
            format!("logits of head '{}'", head.tag),
            format!("[{batch}, {}]", head.logit_width()),
            format!("[{batch}, {width}]"),
        ));
    }

    let labels = targets.labels.clone();
    match &head.loss {
        LossKind::CrossEntropy => cross_entropy(logits, labels),
        LossKind::MeanVariance(params) => mean_variance(logits, labels, params),
        LossKind::UnimodalConcentrated(params) => unimodal_concentrated(logits, labels, params),
        LossKind::GaussianLabelDistribution(params) => {
            gaussian_label_distribution(logits, labels, params)
        }
        LossKind::GaussianKl(params) => gaussian_kl(logits, labels, params),
        LossKind::NoisyGaussianKl(params) => {
            let (means, sigmas) = target_distribution(targets, params.sigma);
            noisy_gaussian_kl(logits, means, sigmas, params.lambda)
        }
        LossKind::CumulativeJensenShannon(params) => {
            let (means, sigmas) = target_distribution(targets, params.sigma);
            cumulative_jensen_shannon(logits, means, sigmas)
        }
        LossKind::SoftLabels(params) => soft_labels(logits, labels, params),
        LossKind::ExtendedBinary(params) => extended_binary(logits, labels, params),
        LossKind::RankConsistent => rank_consistent(logits, labels),
        LossKind::PosteriorExtendedBinary(params) => {
            posterior_extended_binary(logits, labels, params)
        }
        LossKind::MeanAbsoluteError => mean_absolute_error(logits, labels),
    }
}

/// Per-example target means and sigmas, or the nominal label and `sigma`.
fn target_distribution<B: Backend>(
    targets: &LossTargets<B>,
    sigma: f32,
) -> (Tensor<B, 1>, Tensor<B, 1>) {
    let means = targets
        .means
        .clone()
        .unwrap_or_else(|| targets.labels.clone().float());
    let sigmas = targets
        .sigmas
        .clone()
        .unwrap_or_else(|| Tensor::full([targets.len()], sigma, &targets.labels.device()));
    (means, sigmas)
}

/// Cross-entropy with the hard label.
///
/// # Errors
///
/// See [`head_loss`].
pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Result<Tensor<B, 1>> {
    let [_, width] = check_inputs(&logits, &labels, 2, "cross_entropy")?;
    Ok(soft_cross_entropy(logits, one_hot(labels, width)))
}

/// Mean-variance loss: cross-entropy plus penalties on the squared error of
/// the posterior mean and on the posterior variance.
///
/// # Errors
///
/// See [`head_loss`].
pub fn mean_variance<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    params: &MeanVarianceParams,
) -> Result<Tensor<B, 1>> {
    let [_, width] = check_inputs(&logits, &labels, 2, "mean_variance")?;
    let probas = checked_softmax(logits.clone(), "mean_variance")?;
    let (mean, variance) = moments(probas);

    let ce = soft_cross_entropy(logits, one_hot(labels.clone(), width));
    let mean_loss = (mean - column(labels.float(), 1)).powf_scalar(2.0).mean().div_scalar(2.0);
    let variance_loss = variance.mean();

    Ok(ce + mean_loss.mul_scalar(params.lambda_1) + variance_loss.mul_scalar(params.lambda_2))
}

/// Unimodal-concentrated loss.
///
/// A Gaussian negative log-likelihood of the label under the posterior mean
/// and variance, plus `lambda` times the summed violations of unimodality
/// around the label: probabilities must increase up to the label and
/// decrease after it.
///
/// # Errors
///
/// See [`head_loss`].
pub fn unimodal_concentrated<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    params: &UnimodalParams,
) -> Result<Tensor<B, 1>> {
    let [batch, width] = check_inputs(&logits, &labels, 2, "unimodal_concentrated")?;
    let probas = checked_softmax(logits, "unimodal_concentrated")?;
    let device = probas.device();
    let (mean, variance) = moments(probas.clone());
    let variance = variance.add_scalar(EPSILON);
    let labels = labels.float();

    let concentrated = (variance.clone().add_scalar(EPSILON).log().div_scalar(2.0)
        + (mean - column(labels.clone(), 1)).powf_scalar(2.0)
            / variance.mul_scalar(2.0).add_scalar(EPSILON))
    .mean();

    // s_j = -1 below the label, +1 from the label on
    let steps = width - 1;
    let diffs = probas.clone().slice([0..batch, 1..width]) - probas.slice([0..batch, 0..steps]);
    let sign = class_grid(batch, steps, &device)
        .lower(column(labels, steps))
        .float()
        .mul_scalar(-2.0)
        .add_scalar(1.0);
    let unimodal = relu(sign * diffs).sum_dim(1).mean();

    Ok(concentrated + unimodal.mul_scalar(params.lambda))
}

/// Deep label distribution learning: soft cross-entropy against a
/// discretized Gaussian centred on the label.
///
/// # Errors
///
/// See [`head_loss`].
pub fn gaussian_label_distribution<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    params: &GaussianParams,
) -> Result<Tensor<B, 1>> {
    let [_, width] = check_inputs(&logits, &labels, 2, "gaussian_label_distribution")?;
    checked_softmax(logits.clone(), "gaussian_label_distribution")?;
    let target = nominal_gaussian_target(labels, params.sigma, width);
    Ok(soft_cross_entropy(logits, target))
}

/// KL divergence to a Gaussian target centred on the label plus `lambda`
/// times the absolute error of the posterior expectation.
///
/// # Errors
///
/// See [`head_loss`].
pub fn gaussian_kl<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    params: &GaussianKlParams,
) -> Result<Tensor<B, 1>> {
    let [batch, _] = check_inputs(&logits, &labels, 2, "gaussian_kl")?;
    let sigmas = Tensor::full([batch], params.sigma, &logits.device());
    divergence_with_expectation(logits, labels.float(), sigmas, params.lambda, "gaussian_kl")
}

/// KL divergence to per-example Gaussian targets plus `lambda` times the
/// absolute error between the posterior expectation and the target mean.
///
/// # Errors
///
/// See [`head_loss`].
pub fn noisy_gaussian_kl<B: Backend>(
    logits: Tensor<B, 2>,
    means: Tensor<B, 1>,
    sigmas: Tensor<B, 1>,
    lambda: f32,
) -> Result<Tensor<B, 1>> {
    check_distribution_inputs(&logits, &means, &sigmas, "noisy_gaussian_kl")?;
    divergence_with_expectation(logits, means, sigmas, lambda, "noisy_gaussian_kl")
}

/// `KL(t || p) + lambda * mean|E[p] - means|` for Gaussian targets `t`.
fn divergence_with_expectation<B: Backend>(
    logits: Tensor<B, 2>,
    means: Tensor<B, 1>,
    sigmas: Tensor<B, 1>,
    lambda: f32,
    loss: &str,
) -> Result<Tensor<B, 1>> {
    let [batch, width] = logits.dims();
    let probas = checked_softmax(logits, loss)?;
    let target = gaussian_target(means.clone(), sigmas, width);

    let divergence = (target.clone()
        * (target.clamp_min(TARGET_FLOOR).log() - probas.clone().add_scalar(EPSILON).log()))
    .sum_dim(1)
    .mean();

    let expectation = (probas * class_grid(batch, width, &means.device()))
        .sum_dim(1)
        .reshape([batch]);
    let expectation_loss = (expectation - means).abs().mean();

    Ok(divergence + expectation_loss.mul_scalar(lambda))
}

/// Cumulative Jensen-Shannon divergence between the posterior and a
/// per-example Gaussian target, computed on their cumulative distributions.
///
/// # Errors
///
/// See [`head_loss`].
pub fn cumulative_jensen_shannon<B: Backend>(
    logits: Tensor<B, 2>,
    means: Tensor<B, 1>,
    sigmas: Tensor<B, 1>,
) -> Result<Tensor<B, 1>> {
    let [_, width] = check_distribution_inputs(&logits, &means, &sigmas, "cumulative_jensen_shannon")?;
    let probas = checked_softmax(logits, "cumulative_jensen_shannon")?;
    let device = probas.device();
    let target = gaussian_target(means, sigmas, width);

    let cumulative = cumulative_matrix::<B>(width, &device);
    let p_cdf = probas.matmul(cumulative.clone());
    let q_cdf = target.matmul(cumulative);
    let midpoint = (p_cdf.clone() + q_cdf.clone()).div_scalar(2.0);
    let log_midpoint = midpoint.clone().clamp_min(TARGET_FLOOR).log();

    let divergence = midpoint.clone() * (log_midpoint.clone() - p_cdf.add_scalar(EPSILON).log())
        + midpoint * (log_midpoint - q_cdf.add_scalar(EPSILON).log());

    Ok(divergence.mul_scalar(0.5).sum_dim(1).mean())
}

/// Soft cross-entropy against `softmax(-d(k, y))`.
///
/// # Errors
///
/// See [`head_loss`].
pub fn soft_labels<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    params: &SoftLabelParams,
) -> Result<Tensor<B, 1>> {
    let [batch, width] = check_inputs(&logits, &labels, 2, "soft_labels")?;
    checked_softmax(logits.clone(), "soft_labels")?;

    let offset = class_grid(batch, width, &logits.device()) - column(labels.float(), width);
    let distance = match params.distance {
        LabelDistance::L1 => offset.abs(),
        LabelDistance::L2 => offset.powf_scalar(2.0),
    };
    let target = softmax(distance.neg(), 1);
    Ok(soft_cross_entropy(logits, target))
}

/// Extended binary classification: a weighted binary cross-entropy per
/// indicator `[y > k]`.
///
/// # Errors
///
/// Returns [`TrainingError::ShapeMismatch`] if indicator weights are given
/// and their length is not the logit width, otherwise see [`head_loss`].
pub fn extended_binary<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    params: &ExtendedBinaryParams,
) -> Result<Tensor<B, 1>> {
    let [batch, width] = check_inputs(&logits, &labels, 1, "extended_binary")?;
    let device = logits.device();

    let weights = match &params.indicator_weights {
        Some(weights) if weights.len() != width => {
            return Err(TrainingError::shape_mismatch(
                "extended_binary indicator weights",
                format!("[{width}]"),
                format!("[{}]", weights.len()),
            ));
        }
        Some(weights) => Tensor::<B, 1>::from_data(
            TensorData::new(weights.clone(), [width]).convert::<B::FloatElem>(),
            &device,
        ),
        None => Tensor::ones([width], &device),
    };

    let indicators = binary_indicators(labels.float(), width);
    let bce = binary_cross_entropy(logits, indicators);
    let weights = weights.reshape([1, width]).expand([batch, width]);
    Ok((bce * weights).sum_dim(1).mean())
}

/// Rank-consistent ordinal regression: summed binary cross-entropy of the
/// indicators `[y > k]`.
///
/// # Errors
///
/// See [`head_loss`].
pub fn rank_consistent<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Result<Tensor<B, 1>> {
    let [_, width] = check_inputs(&logits, &labels, 1, "rank_consistent")?;
    let indicators = binary_indicators(labels.float(), width);
    Ok(binary_cross_entropy(logits, indicators).sum_dim(1).mean())
}

/// Posterior plus truncated extended binary loss.
///
/// The first `K` logits are trained with a Gaussian soft cross-entropy, the
/// last `K - 1` as sigmoid indicators `[y > k]` with a squared error that
/// ignores indicators `k` with `y - t <= k < y + t`.
///
/// # Errors
///
/// Returns [`TrainingError::ShapeMismatch`] if the width is not `2K - 1`
/// for some `K >= 2`, otherwise see [`head_loss`].
#[allow(clippy::cast_precision_loss)]
pub fn posterior_extended_binary<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    params: &PosteriorExtendedBinaryParams,
) -> Result<Tensor<B, 1>> {
    let [batch, width] = check_inputs(&logits, &labels, 3, "posterior_extended_binary")?;
    if width % 2 == 0 {
        return Err(TrainingError::shape_mismatch(
            "posterior_extended_binary logits",
            "[batch, 2K - 1]",
            format!("[{batch}, {width}]"),
        ));
    }
    let nr_classes = width.div_ceil(2);
    let steps = nr_classes - 1;
    let device = logits.device();

    let distribution = logits.clone().slice([0..batch, 0..nr_classes]);
    let binary = logits.slice([0..batch, nr_classes..width]);
    checked_softmax(distribution.clone(), "posterior_extended_binary")?;

    let target = nominal_gaussian_target(labels.clone(), params.sigma, nr_classes);
    let posterior_loss = soft_cross_entropy(distribution, target);

    let labels = labels.float();
    let truncation = params.truncation_distance as f32;
    let offset = class_grid(batch, steps, &device) - column(labels.clone(), steps);
    let near = offset.clone().greater_equal_elem(-truncation).float() * offset.lower_elem(truncation).float();
    let mask = near.neg().add_scalar(1.0);

    let indicators = binary_indicators(labels, steps);
    let hyperplane_loss = ((sigmoid(binary) - indicators).powf_scalar(2.0) * mask)
        .sum_dim(1)
        .mean();

    Ok(posterior_loss + hyperplane_loss)
}

/// Mean absolute error of a `[batch, 1]` regression output.
///
/// # Errors
///
/// Returns [`TrainingError::ShapeMismatch`] if the width is not 1,
/// otherwise see [`head_loss`].
pub fn mean_absolute_error<B: Backend>(
    outputs: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
) -> Result<Tensor<B, 1>> {
    let [batch, width] = check_inputs(&outputs, &labels, 1, "mean_absolute_error")?;
    if width != 1 {
        return Err(TrainingError::shape_mismatch(
            "mean_absolute_error outputs",
            format!("[{batch}, 1]"),
            format!("[{batch}, {width}]"),
        ));
    }
    Ok((outputs.reshape([batch]) - labels.float()).abs().mean())
}

/// Builds normalized discretized Gaussian targets, `[batch, nr_classes]`.
///
/// Row `i` is proportional to `exp(-(k - means[i])^2 / (2 sigmas[i]^2))`
/// over the classes `k` and sums to one.
///
/// # Example
///
/// ```
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
/// use ordinal_training::gaussian_target;
///
/// let device = Default::default();
/// let means = Tensor::<NdArray<f32>, 1>::from_floats([2.0], &device);
/// let sigmas = Tensor::<NdArray<f32>, 1>::from_floats([1.0], &device);
///
/// let target = gaussian_target(means, sigmas, 5);
/// assert_eq!(target.dims(), [1, 5]);
/// ```
#[must_use]
pub fn gaussian_target<B: Backend>(
    means: Tensor<B, 1>,
    sigmas: Tensor<B, 1>,
    nr_classes: usize,
) -> Tensor<B, 2> {
    let [batch] = means.dims();
    let grid = class_grid(batch, nr_classes, &means.device());
    let squared = (grid - column(means, nr_classes)).powf_scalar(2.0);
    let spread = column(sigmas, nr_classes).powf_scalar(2.0).mul_scalar(2.0);
    // Normalizing exp(-x) is a softmax; it stays finite far from the mean.
    softmax(squared.neg() / spread, 1)
}

/// Gaussian targets centred on the labels with a shared `sigma`.
#[must_use]
pub fn nominal_gaussian_target<B: Backend>(
    labels: Tensor<B, 1, Int>,
    sigma: f32,
    nr_classes: usize,
) -> Tensor<B, 2> {
    let [batch] = labels.dims();
    let sigmas = Tensor::full([batch], sigma, &labels.device());
    gaussian_target(labels.float(), sigmas, nr_classes)
}

/// `-sum_k t_k log softmax(x)_k`, averaged over the batch.
fn soft_cross_entropy<B: Backend>(logits: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    (target * log_softmax(logits, 1)).sum_dim(1).neg().mean()
}

/// Element-wise binary cross-entropy of `sigmoid(x)` in log-sigmoid form.
fn binary_cross_entropy<B: Backend>(logits: Tensor<B, 2>, indicators: Tensor<B, 2>) -> Tensor<B, 2> {
    let log_p = log_sigmoid(logits.clone());
    let complement = indicators.clone().neg().add_scalar(1.0);
    (log_p.clone() * indicators + (log_p - logits) * complement).neg()
}

/// Indicators `[y > k]` for `k < width`, `[batch, width]`.
fn binary_indicators<B: Backend>(labels: Tensor<B, 1>, width: usize) -> Tensor<B, 2> {
    let [batch] = labels.dims();
    let grid = class_grid(batch, width, &labels.device());
    column(labels, width).greater(grid).float()
}

fn one_hot<B: Backend>(labels: Tensor<B, 1, Int>, width: usize) -> Tensor<B, 2> {
    let [batch] = labels.dims();
    let grid = class_grid(batch, width, &labels.device());
    grid.equal(column(labels.float(), width)).float()
}

/// Posterior mean and variance, each `[batch, 1]`.
fn moments<B: Backend>(probas: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [batch, width] = probas.dims();
    let grid = class_grid(batch, width, &probas.device());
    let mean = (probas.clone() * grid.clone()).sum_dim(1);
    let variance = (probas * (grid - mean.clone().expand([batch, width])).powf_scalar(2.0)).sum_dim(1);
    (mean, variance)
}

/// Class indices `0..width` repeated over the batch.
#[allow(clippy::cast_possible_wrap)]
fn class_grid<B: Backend>(batch: usize, width: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1, Int>::arange(0..width as i64, device)
        .float()
        .reshape([1, width])
        .expand([batch, width])
}

/// Repeats a `[batch]` vector over `width` columns.
fn column<B: Backend>(values: Tensor<B, 1>, width: usize) -> Tensor<B, 2> {
    let [batch] = values.dims();
    values.reshape([batch, 1]).expand([batch, width])
}

/// Upper-triangular ones, `U[i][j] = [i <= j]`; `p · U` is the CDF of `p`.
#[allow(clippy::cast_possible_wrap)]
fn cumulative_matrix<B: Backend>(width: usize, device: &B::Device) -> Tensor<B, 2> {
    let index = Tensor::<B, 1, Int>::arange(0..width as i64, device).float();
    let rows = index.clone().reshape([width, 1]).expand([width, width]);
    let cols = index.reshape([1, width]).expand([width, width]);
    rows.lower_equal(cols).float()
}

fn checked_softmax<B: Backend>(logits: Tensor<B, 2>, loss: &str) -> Result<Tensor<B, 2>> {
    let probas = softmax(logits, 1);
    ensure_finite(&probas, || format!("{loss}: posterior"))?;
    Ok(probas)
}

/// Fails if any element is NaN or infinite.
pub(crate) fn ensure_finite<B: Backend, const D: usize>(
    tensor: &Tensor<B, D>,
    what: impl FnOnce() -> String,
) -> Result<()> {
    let non_finite = tensor.clone().is_nan().bool_or(tensor.clone().abs().equal_elem(f32::INFINITY));
    if any_true(non_finite) {
        Err(TrainingError::numerical_instability(format!(
            "{} is not finite",
            what()
        )))
    } else {
        Ok(())
    }
}

fn any_true<B: Backend, const D: usize>(mask: Tensor<B, D, Bool>) -> bool {
    mask.any().int().into_scalar().elem::<i64>() != 0
}

/// Checks batch agreement, minimum width and finiteness of the logits.
fn check_inputs<B: Backend>(
    logits: &Tensor<B, 2>,
    labels: &Tensor<B, 1, Int>,
    min_width: usize,
    loss: &str,
) -> Result<[usize; 2]> {
    let [batch, width] = logits.dims();
    let [nr_labels] = labels.dims();
    if nr_labels != batch {
        return Err(TrainingError::shape_mismatch(
            format!("{loss} labels"),
            format!("[{batch}]"),
            format!("[{nr_labels}]"),
        ));
    }
    if width < min_width {
        return Err(TrainingError::shape_mismatch(
            format!("{loss} logits"),
            format!("[{batch}, >= {min_width}]"),
            format!("[{batch}, {width}]"),
        ));
    }
    ensure_finite(logits, || format!("{loss}: logits"))?;
    Ok([batch, width])
}

fn check_distribution_inputs<B: Backend>(
    logits: &Tensor<B, 2>,
    means: &Tensor<B, 1>,
    sigmas: &Tensor<B, 1>,
    loss: &str,
) -> Result<[usize; 2]> {
    let [batch, width] = logits.dims();
    for (name, values) in [("means", means), ("sigmas", sigmas)] {
        let [len] = values.dims();
        if len != batch {
            return Err(TrainingError::shape_mismatch(
                format!("{loss} target {name}"),
                format!("[{batch}]"),
                format!("[{len}]"),
            ));
        }
        ensure_finite(values, || format!("{loss}: target {name}"))?;
    }
    if any_true(sigmas.clone().lower_equal_elem(0.0)) {
        return Err(TrainingError::numerical_instability(format!(
            "{loss}: target sigmas must be positive"
        )));
    }
    if width < 2 {
        return Err(TrainingError::shape_mismatch(
            format!("{loss} logits"),
            format!("[{batch}, >= 2]"),
            format!("[{batch}, {width}]"),
        ));
    }
    ensure_finite(logits, || format!("{loss}: logits"))?;
    Ok([batch, width])
}
