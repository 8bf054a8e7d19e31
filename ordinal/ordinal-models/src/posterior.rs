//! Posterior distributions from head logits.

use burn::prelude::Backend;
use burn::tensor::activation::{relu, sigmoid, softmax};
use burn::tensor::{Int, Tensor};
use ordinal_types::{HeadSpec, LossKind};

use crate::error::{ModelError, Result};

/// Converts the logits of a head into a `[batch, nr_classes]` posterior.
///
/// - Distribution heads: softmax over the classes.
/// - Binary decompositions ([`LossKind::ExtendedBinary`],
///   [`LossKind::RankConsistent`]): with `P(y > k) = sigmoid(x_k)`,
///   `p_k = relu(P(y > k-1) - P(y > k))`, renormalized.
/// - [`LossKind::PosteriorExtendedBinary`]: softmax over the first
///   `nr_classes` logits; the binary part only shapes training.
/// - [`LossKind::MeanAbsoluteError`]: one-hot of the regression output
///   rounded to the nearest class and clamped to `[0, nr_classes)`.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] if the logit width does not match
/// the head.
///
/// # Example
///
/// ```
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
/// use ordinal_models::head_posterior;
/// use ordinal_types::{HeadSpec, LossKind};
///
/// let device = Default::default();
/// let head = HeadSpec::new("grade", 3, LossKind::CrossEntropy);
/// let logits = Tensor::<NdArray<f32>, 2>::from_floats([[0.0, 0.0, 0.0]], &device);
///
/// let posterior = head_posterior(&head, logits).unwrap();
/// let total: f32 = posterior.sum().into_scalar();
/// assert!((total - 1.0).abs() < 1e-6);
/// ```
pub fn head_posterior<B: Backend>(head: &HeadSpec, logits: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
    let [batch, width] = logits.dims();
    if width != head.logit_width() {
        return Err(ModelError::shape_mismatch(
            &head.tag,
            format!("[{batch}, {}]", head.logit_width()),
            format!("[{batch}, {width}]"),
        ));
    }

    let posterior = match &head.loss {
        LossKind::CrossEntropy
        | LossKind::MeanVariance(_)
        | LossKind::UnimodalConcentrated(_)
        | LossKind::GaussianLabelDistribution(_)
        | LossKind::GaussianKl(_)
        | LossKind::NoisyGaussianKl(_)
        | LossKind::CumulativeJensenShannon(_)
        | LossKind::SoftLabels(_) => softmax(logits, 1),
        LossKind::ExtendedBinary(_) | LossKind::RankConsistent => binary_posterior(logits),
        LossKind::PosteriorExtendedBinary(_) => {
            softmax(logits.slice([0..batch, 0..head.nr_classes]), 1)
        }
        LossKind::MeanAbsoluteError => regression_posterior(logits, head.nr_classes),
    };
    Ok(posterior)
}

/// Posterior of a binary decomposition from `[batch, K-1]` logits.
fn binary_posterior<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, width] = logits.dims();
    let device = logits.device();
    let above = sigmoid(logits);

    let upper = Tensor::cat(vec![Tensor::ones([batch, 1], &device), above.clone()], 1);
    let lower = Tensor::cat(vec![above, Tensor::zeros([batch, 1], &device)], 1);
    let posterior = relu(upper - lower);

    // The unclamped differences telescope to one, so the sum is at least one.
    let total = posterior.clone().sum_dim(1).expand([batch, width + 1]);
    posterior / total
}

/// One-hot posterior of a `[batch, 1]` regression output.
#[allow(clippy::cast_possible_wrap)]
fn regression_posterior<B: Backend>(outputs: Tensor<B, 2>, nr_classes: usize) -> Tensor<B, 2> {
    let [batch, _] = outputs.dims();
    let device = outputs.device();

    // Number of half-way thresholds below the output = rounded, clamped class.
    let thresholds = Tensor::<B, 1, Int>::arange(0..(nr_classes - 1) as i64, &device)
        .float()
        .add_scalar(0.5)
        .reshape([1, nr_classes - 1])
        .expand([batch, nr_classes - 1]);
    let class = outputs
        .expand([batch, nr_classes - 1])
        .greater(thresholds)
        .float()
        .sum_dim(1);

    let classes = Tensor::<B, 1, Int>::arange(0..nr_classes as i64, &device)
        .float()
        .reshape([1, nr_classes])
        .expand([batch, nr_classes]);
    classes.equal(class.expand([batch, nr_classes])).float()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn_ndarray::NdArray;
    use ordinal_types::{ExtendedBinaryParams, MeanVarianceParams, PosteriorExtendedBinaryParams};

    type TestBackend = NdArray<f32>;

    fn rows(tensor: Tensor<TestBackend, 2>) -> Vec<Vec<f32>> {
        let [_, width] = tensor.dims();
        tensor
            .into_data()
            .to_vec::<f32>()
            .unwrap()
            .chunks(width)
            .map(<[f32]>::to_vec)
            .collect()
    }

    #[test]
    fn softmax_posterior_sums_to_one() {
        let device = Default::default();
        let head = HeadSpec::new("age", 4, LossKind::MeanVariance(MeanVarianceParams::default()));
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 2.0, 3.0, 4.0], [0.0, -5.0, 2.0, 0.5]],
            &device,
        );

        for row in rows(head_posterior(&head, logits).unwrap()) {
            assert_relative_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn rank_consistent_posterior() {
        let device = Default::default();
        let head = HeadSpec::new("grade", 3, LossKind::RankConsistent);
        // sigmoid(0) = 0.5, sigmoid(-inf-ish) ~ 0
        let logits = Tensor::<TestBackend, 2>::from_floats([[0.0, -30.0]], &device);

        let posterior = rows(head_posterior(&head, logits).unwrap());
        assert_relative_eq!(posterior[0][0], 0.5, epsilon = 1e-5);
        assert_relative_eq!(posterior[0][1], 0.5, epsilon = 1e-5);
        assert_relative_eq!(posterior[0][2], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn extended_binary_posterior_renormalizes_inconsistent_outputs() {
        let device = Default::default();
        let head = HeadSpec::new("grade", 3, LossKind::ExtendedBinary(ExtendedBinaryParams::default()));
        // P(y > 0) ~ 0, P(y > 1) ~ 1: differences [1, 0 (clamped from -1), 1]
        let logits = Tensor::<TestBackend, 2>::from_floats([[-30.0, 30.0]], &device);

        let posterior = rows(head_posterior(&head, logits).unwrap());
        assert_relative_eq!(posterior[0][0], 0.5, epsilon = 1e-5);
        assert_relative_eq!(posterior[0][1], 0.0, epsilon = 1e-5);
        assert_relative_eq!(posterior[0][2], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn posterior_extended_binary_ignores_binary_part() {
        let device = Default::default();
        let head = HeadSpec::new(
            "age",
            2,
            LossKind::PosteriorExtendedBinary(PosteriorExtendedBinaryParams::default()),
        );
        let logits = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0, 50.0]], &device);

        let posterior = rows(head_posterior(&head, logits).unwrap());
        assert_eq!(posterior[0].len(), 2);
        assert_relative_eq!(posterior[0][0], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn regression_posterior_rounds_and_clamps() {
        let device = Default::default();
        let head = HeadSpec::new("age", 4, LossKind::MeanAbsoluteError);
        let outputs = Tensor::<TestBackend, 2>::from_floats([[1.4], [1.6], [-3.0], [9.0]], &device);

        let posterior = rows(head_posterior(&head, outputs).unwrap());
        assert_eq!(posterior[0], vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(posterior[1], vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(posterior[2], vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(posterior[3], vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn posterior_rejects_wrong_width() {
        let device = Default::default();
        let head = HeadSpec::new("grade", 5, LossKind::RankConsistent);
        let logits = Tensor::<TestBackend, 2>::zeros([2, 5], &device);
        assert!(matches!(
            head_posterior(&head, logits),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
