//! Full-split evaluation of a trained model.

use std::collections::BTreeMap;

use burn::prelude::Backend;
use burn::tensor::Tensor;
use ordinal_dataset::BatchSource;
use ordinal_models::{MultiHeadModel, head_posterior, take_head_logits};
use ordinal_types::{CostMatrices, CostMatrix, HeadSpec, Partition, validate_heads};
use serde::{Deserialize, Serialize};

use crate::decision::{batch_error, predict_labels};
use crate::error::{Result, TrainingError};

/// Mean decision cost per partition; `None` for an empty partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionErrors {
    /// Training partition.
    pub train: Option<f64>,

    /// Validation partition.
    pub validation: Option<f64>,

    /// Test partition.
    pub test: Option<f64>,
}

impl PartitionErrors {
    /// Error of a partition.
    #[must_use]
    pub const fn get(&self, partition: Partition) -> Option<f64> {
        match partition {
            Partition::Train => self.train,
            Partition::Validation => self.validation,
            Partition::Test => self.test,
        }
    }

    fn set(&mut self, partition: Partition, error: Option<f64>) {
        match partition {
            Partition::Train => self.train = error,
            Partition::Validation => self.validation = error,
            Partition::Test => self.test = error,
        }
    }
}

/// Evaluation of one head, rows in sample order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadEvaluation {
    /// Posterior over the classes of every sample.
    pub posteriors: Vec<Vec<f32>>,

    /// Bayes-risk decision of every sample.
    pub predicted: Vec<usize>,

    /// True label of every sample.
    pub truth: Vec<usize>,

    /// Mean cost per partition.
    pub errors: PartitionErrors,
}

/// Predictions of every head over a batch source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Sample IDs in evaluation order.
    pub sample_ids: Vec<u64>,

    /// Partition of each sample.
    pub partitions: Vec<Partition>,

    /// Per-head results keyed by tag.
    pub heads: BTreeMap<String, HeadEvaluation>,
}

impl EvaluationReport {
    /// Number of evaluated samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    /// Returns `true` if nothing was evaluated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    /// Results of a head.
    #[must_use]
    pub fn head(&self, tag: &str) -> Option<&HeadEvaluation> {
        self.heads.get(tag)
    }
}

/// Runs `model` over every batch of `source` and collects posteriors,
/// decisions and per-partition errors.
///
/// Takes any [`MultiHeadModel`]; pass `model.valid()` for a model trained on
/// an autodiff backend.
///
/// # Errors
///
/// Returns [`TrainingError::InvalidConfig`] if heads or cost matrices are
/// invalid, and propagates data, shape and label errors.
pub fn evaluate<B, M>(
    model: &M,
    heads: &[HeadSpec],
    costs: &CostMatrices,
    source: &dyn BatchSource,
    device: &B::Device,
) -> Result<EvaluationReport>
where
    B: Backend,
    M: MultiHeadModel<B>,
{
    validate_heads(heads)?;
    costs.check_heads(heads)?;

    let mut report = EvaluationReport {
        heads: heads
            .iter()
            .map(|h| (h.tag.clone(), HeadEvaluation::default()))
            .collect(),
        ..EvaluationReport::default()
    };

    for batch in source.batches(0) {
        let batch = batch?;
        if batch.is_empty() {
            continue;
        }

        let mut logits = model.forward(&batch, device);
        for head in heads {
            let cost = head_cost(costs, head)?;
            let targets = batch.targets(&head.tag).ok_or_else(|| {
                TrainingError::Dataset(format!("batch has no targets for head '{}'", head.tag))
            })?;

            let head_logits = take_head_logits(&mut logits, head, batch.len())?;
            let posterior = head_posterior(head, head_logits)?;
            let rows = posterior_rows(posterior.clone(), head.nr_classes)?;
            let predicted = predict_labels(posterior, cost)?;

            let evaluation = report.heads.entry(head.tag.clone()).or_default();
            evaluation.posteriors.extend(rows);
            evaluation.predicted.extend(predicted);
            evaluation.truth.extend_from_slice(&targets.labels);
        }
        report.sample_ids.extend_from_slice(&batch.sample_ids);
        report.partitions.extend_from_slice(&batch.partitions);
    }

    for head in heads {
        let cost = head_cost(costs, head)?;
        if let Some(evaluation) = report.heads.get_mut(&head.tag) {
            for partition in Partition::ALL {
                let error = partition_error(evaluation, &report.partitions, partition, cost)?;
                evaluation.errors.set(partition, error);
            }
        }
    }

    tracing::info!(samples = report.len(), heads = heads.len(), "evaluation finished");
    Ok(report)
}

fn head_cost<'a>(costs: &'a CostMatrices, head: &HeadSpec) -> Result<&'a CostMatrix> {
    costs
        .get(&head.tag)
        .ok_or_else(|| TrainingError::invalid_config(format!("no cost matrix for head '{}'", head.tag)))
}

fn posterior_rows<B: Backend>(posterior: Tensor<B, 2>, nr_classes: usize) -> Result<Vec<Vec<f32>>> {
    let values = posterior
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| TrainingError::Model(format!("posterior readback: {e:?}")))?;
    Ok(values.chunks(nr_classes).map(<[f32]>::to_vec).collect())
}

fn partition_error(
    evaluation: &HeadEvaluation,
    partitions: &[Partition],
    partition: Partition,
    cost: &CostMatrix,
) -> Result<Option<f64>> {
    let (truth, predicted): (Vec<usize>, Vec<usize>) = evaluation
        .truth
        .iter()
        .zip(&evaluation.predicted)
        .zip(partitions)
        .filter(|(_, p)| **p == partition)
        .map(|((&t, &y), _)| (t, y))
        .unzip();

    if truth.is_empty() {
        return Ok(None);
    }
    batch_error(&truth, &predicted, cost).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use ordinal_dataset::{HeadLabel, InMemoryDataset, LoaderConfig, OrdinalSample};
    use ordinal_models::HeadLogits;
    use ordinal_types::LossKind;

    type TestBackend = NdArray<f32>;

    /// Predicts the class stored in the first feature with certainty.
    struct Oracle {
        nr_classes: usize,
    }

    impl MultiHeadModel<TestBackend> for Oracle {
        fn forward(
            &self,
            batch: &ordinal_dataset::HostBatch,
            device: &<TestBackend as Backend>::Device,
        ) -> HeadLogits<TestBackend> {
            let mut values = Vec::new();
            for row in batch.inputs.chunks(batch.nr_features) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let class = row[0] as usize;
                values.extend((0..self.nr_classes).map(|k| if k == class { 20.0_f32 } else { 0.0 }));
            }
            let logits = Tensor::<TestBackend, 2>::from_data(
                TensorData::new(values, [batch.len(), self.nr_classes]),
                device,
            );
            HeadLogits::from([("grade".to_string(), logits)])
        }
    }

    fn heads() -> Vec<HeadSpec> {
        vec![HeadSpec::new("grade", 4, LossKind::CrossEntropy)]
    }

    fn sample(id: u64, predicted: usize, truth: usize, partition: Partition) -> OrdinalSample {
        #[allow(clippy::cast_precision_loss)]
        let feature = predicted as f32;
        OrdinalSample::new(id, vec![feature, 0.0])
            .with_label("grade", HeadLabel::new(truth))
            .with_partition(partition)
    }

    fn dataset(samples: Vec<OrdinalSample>) -> InMemoryDataset {
        InMemoryDataset::new(samples, &heads(), LoaderConfig::default().with_batch_size(3)).unwrap()
    }

    #[test]
    fn evaluate_collects_rows_and_partition_errors() {
        let samples = vec![
            sample(10, 0, 0, Partition::Train),
            sample(11, 3, 1, Partition::Train),
            sample(12, 2, 2, Partition::Validation),
            sample(13, 1, 3, Partition::Validation),
            sample(14, 0, 0, Partition::Validation),
        ];
        let costs = CostMatrices::new().with("grade", CostMatrix::absolute(4));

        let report = evaluate::<TestBackend, _>(
            &Oracle { nr_classes: 4 },
            &heads(),
            &costs,
            &dataset(samples),
            &Default::default(),
        )
        .unwrap();

        assert_eq!(report.len(), 5);
        assert_eq!(report.sample_ids, vec![10, 11, 12, 13, 14]);
        assert_eq!(report.partitions[2], Partition::Validation);

        let grade = report.head("grade").unwrap();
        assert_eq!(grade.predicted, vec![0, 3, 2, 1, 0]);
        assert_eq!(grade.truth, vec![0, 1, 2, 3, 0]);
        assert_eq!(grade.posteriors.len(), 5);
        assert!(grade.posteriors.iter().all(|row| row.len() == 4));
        assert!((grade.posteriors[1].iter().sum::<f32>() - 1.0).abs() < 1e-5);

        assert!((grade.errors.train.unwrap() - 1.0).abs() < 1e-9);
        assert!((grade.errors.validation.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(grade.errors.test, None);
        assert_eq!(grade.errors.get(Partition::Test), None);
    }

    #[test]
    fn evaluate_requires_cost_matrix() {
        let samples = vec![sample(0, 0, 0, Partition::Test)];
        let result = evaluate::<TestBackend, _>(
            &Oracle { nr_classes: 4 },
            &heads(),
            &CostMatrices::new(),
            &dataset(samples),
            &Default::default(),
        );
        assert!(matches!(result, Err(TrainingError::InvalidConfig(_))));
    }

    #[test]
    fn evaluate_rejects_wrong_logit_width() {
        let samples = vec![sample(0, 0, 0, Partition::Test)];
        let costs = CostMatrices::new().with("grade", CostMatrix::zero_one(4));
        let result = evaluate::<TestBackend, _>(
            &Oracle { nr_classes: 3 },
            &heads(),
            &costs,
            &dataset(samples),
            &Default::default(),
        );
        assert!(matches!(result, Err(TrainingError::ShapeMismatch { .. })));
    }

    #[test]
    fn partition_errors_default_is_empty() {
        let errors = PartitionErrors::default();
        assert!(Partition::ALL.iter().all(|&p| errors.get(p).is_none()));
    }
}
