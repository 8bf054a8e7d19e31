//! Bayes-risk decisions from posteriors and cost matrices.

use burn::prelude::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use ordinal_types::CostMatrix;

use crate::error::{Result, TrainingError};

/// Moves a cost matrix to the device as a `[K, K]` tensor.
#[must_use]
pub fn cost_tensor<B: Backend>(cost: &CostMatrix, device: &B::Device) -> Tensor<B, 2> {
    let k = cost.nr_classes();
    Tensor::from_data(
        TensorData::new(cost.as_slice().to_vec(), [k, k]).convert::<B::FloatElem>(),
        device,
    )
}

/// Expected cost of every decision, `posterior · cost` (`[batch, K]`).
///
/// Entry `[b][j]` is `sum_i p_b(i) cost[i][j]`.
///
/// # Errors
///
/// Returns [`TrainingError::ShapeMismatch`] if the posterior width is not
/// the cost matrix size.
pub fn expected_costs<B: Backend>(posterior: Tensor<B, 2>, cost: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
    let [batch, width] = posterior.dims();
    let [rows, cols] = cost.dims();
    if rows != width || cols != width {
        return Err(TrainingError::shape_mismatch(
            "cost matrix",
            format!("[{width}, {width}]"),
            format!("[{rows}, {cols}]"),
        ));
    }
    let expected = posterior.matmul(cost);
    debug_assert_eq!(expected.dims(), [batch, width]);
    Ok(expected)
}

/// Decision with minimum expected cost per example (`[batch]`).
///
/// Ties go to the backend's `argmin`, which picks the lowest index on the
/// bundled backends. With 0/1 costs this is the posterior argmax.
///
/// # Errors
///
/// See [`expected_costs`].
///
/// # Example
///
/// ```
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
/// use ordinal_training::{cost_tensor, risk_decision};
/// use ordinal_types::CostMatrix;
///
/// let device = Default::default();
/// let posterior = Tensor::<NdArray<f32>, 2>::from_floats([[0.1, 0.6, 0.2, 0.1]], &device);
/// let cost = cost_tensor(&CostMatrix::squared(4), &device);
///
/// let decision = risk_decision(posterior, cost).unwrap();
/// assert_eq!(decision.into_scalar(), 1);
/// ```
pub fn risk_decision<B: Backend>(posterior: Tensor<B, 2>, cost: Tensor<B, 2>) -> Result<Tensor<B, 1, Int>> {
    let [batch, _] = posterior.dims();
    Ok(expected_costs(posterior, cost)?.argmin(1).reshape([batch]))
}

/// Reads decisions back to the host.
#[must_use]
pub fn decisions_to_host<B: Backend>(decisions: Tensor<B, 1, Int>) -> Vec<usize> {
    decisions
        .into_data()
        .iter::<i64>()
        .map(|d| usize::try_from(d).unwrap_or_default())
        .collect()
}

/// Decides on the host-side posterior rows of a batch.
///
/// # Errors
///
/// See [`expected_costs`].
pub fn predict_labels<B: Backend>(posterior: Tensor<B, 2>, cost: &CostMatrix) -> Result<Vec<usize>> {
    let cost = cost_tensor(cost, &posterior.device());
    Ok(decisions_to_host(risk_decision(posterior, cost)?))
}

/// Mean cost of the predictions, `mean_i cost[truth_i][predicted_i]`.
///
/// Returns 0 for an empty batch.
///
/// # Errors
///
/// Returns [`TrainingError::ShapeMismatch`] if the slices differ in length
/// and [`TrainingError::InvalidLabel`] if a class is outside the matrix.
#[allow(clippy::cast_precision_loss)]
pub fn batch_error(truth: &[usize], predicted: &[usize], cost: &CostMatrix) -> Result<f64> {
    if truth.len() != predicted.len() {
        return Err(TrainingError::shape_mismatch(
            "predictions",
            format!("[{}]", truth.len()),
            format!("[{}]", predicted.len()),
        ));
    }
    if truth.is_empty() {
        return Ok(0.0);
    }

    let k = cost.nr_classes();
    let mut total = 0.0_f64;
    for (&t, &p) in truth.iter().zip(predicted) {
        if let Some(&bad) = [t, p].iter().find(|&&c| c >= k) {
            return Err(TrainingError::invalid_label("cost matrix", bad, k));
        }
        total += f64::from(cost.get(t, p));
    }
    Ok(total / truth.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn posterior(rows: &[[f32; 4]]) -> Tensor<TestBackend, 2> {
        let values: Vec<f32> = rows.iter().flatten().copied().collect();
        Tensor::from_data(TensorData::new(values, [rows.len(), 4]), &Default::default())
    }

    #[test]
    fn expected_costs_squared_distance() {
        let device = Default::default();
        let cost = cost_tensor(&CostMatrix::squared(4), &device);

        let expected = expected_costs(posterior(&[[0.1, 0.6, 0.2, 0.1]]), cost)
            .unwrap()
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert_relative_eq!(expected[0], 2.3, epsilon = 1e-5);
        assert_relative_eq!(expected[1], 0.7, epsilon = 1e-5);
        assert_relative_eq!(expected[2], 1.1, epsilon = 1e-5);
        assert_relative_eq!(expected[3], 3.5, epsilon = 1e-5);
    }

    #[test]
    fn squared_cost_selects_class_one() {
        let predicted = predict_labels(posterior(&[[0.1, 0.6, 0.2, 0.1]]), &CostMatrix::squared(4)).unwrap();
        assert_eq!(predicted, vec![1]);
    }

    #[test]
    fn zero_one_cost_is_argmax() {
        let rows = [
            [0.4, 0.1, 0.1, 0.4 + 1e-3],
            [0.05, 0.05, 0.5, 0.4],
            [0.7, 0.1, 0.1, 0.1],
        ];
        let predicted = predict_labels(posterior(&rows), &CostMatrix::zero_one(4)).unwrap();
        assert_eq!(predicted, vec![3, 2, 0]);
    }

    #[test]
    fn absolute_cost_picks_posterior_median() {
        // Argmax is 0 but the median is 2.
        let rows = [[0.4, 0.05, 0.3, 0.25]];
        let predicted = predict_labels(posterior(&rows), &CostMatrix::absolute(4)).unwrap();
        assert_eq!(predicted, vec![2]);

        let zero_one = predict_labels(posterior(&rows), &CostMatrix::zero_one(4)).unwrap();
        assert_eq!(zero_one, vec![0]);
    }

    #[test]
    fn expected_costs_rejects_size_mismatch() {
        let device = Default::default();
        let cost = cost_tensor::<TestBackend>(&CostMatrix::zero_one(3), &device);
        assert!(matches!(
            expected_costs(posterior(&[[0.25; 4]]), cost),
            Err(TrainingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn batch_error_is_mean_cost() {
        let cost = CostMatrix::absolute(5);
        let error = batch_error(&[0, 2, 4, 1], &[0, 4, 1, 1], &cost).unwrap();
        assert_relative_eq!(error, (0.0 + 2.0 + 3.0 + 0.0) / 4.0);
    }

    #[test]
    fn batch_error_empty() {
        let error = batch_error(&[], &[], &CostMatrix::zero_one(3)).unwrap();
        assert_relative_eq!(error, 0.0);
    }

    #[test]
    fn batch_error_rejects_mismatched_lengths() {
        let result = batch_error(&[0, 1], &[0], &CostMatrix::zero_one(3));
        assert!(matches!(result, Err(TrainingError::ShapeMismatch { .. })));
    }

    #[test]
    fn batch_error_rejects_out_of_range_class() {
        let result = batch_error(&[0, 3], &[0, 1], &CostMatrix::zero_one(3));
        assert!(matches!(result, Err(TrainingError::InvalidLabel { label: 3, .. })));
    }
}
