//! End-to-end tests of the training loop.
//!
//! Every test trains a small `MultiHeadClassifier` on a synthetic ordinal
//! dataset whose class is encoded in the features, with checkpoints in a
//! temporary directory.

// Allow test-specific patterns
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

use std::path::Path;

use approx::assert_relative_eq;
use burn::module::{AutodiffModule, Module};
use burn::prelude::Backend;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use ordinal_dataset::{HeadLabel, HostBatch, InMemoryDataset, LoaderConfig, OrdinalSample};
use ordinal_models::{HeadLogits, MultiHeadClassifier, MultiHeadClassifierConfig, MultiHeadModel};
use ordinal_training::{
    EpochLog, JsonLinesSink, LossScaleConfig, MemorySink, OptimizerConfig, StopReason, Trainer,
    TrainingConfig, TrainingError, TrainingOutcome, checkpoint_path, evaluate,
};
use ordinal_types::{CostMatrices, CostMatrix, HeadSpec, LossKind, Partition};

type TestBackend = Autodiff<NdArray<f32>>;
type Model = MultiHeadClassifier<TestBackend>;

const NR_CLASSES: usize = 4;

// =============================================================================
// Fixtures
// =============================================================================

fn heads() -> Vec<HeadSpec> {
    vec![HeadSpec::new("grade", NR_CLASSES, LossKind::CrossEntropy)]
}

fn costs(heads: &[HeadSpec]) -> CostMatrices {
    heads.iter().fold(CostMatrices::new(), |costs, head| {
        costs.with(head.tag.clone(), CostMatrix::absolute(head.nr_classes))
    })
}

/// Samples with `features = [class + jitter, 1 - class / 3]`, every fifth
/// one in the validation partition.
fn samples(heads: &[HeadSpec]) -> Vec<OrdinalSample> {
    (0..80_u64)
        .map(|id| {
            let class = (id % NR_CLASSES as u64) as usize;
            let jitter = ((id * 37) % 11) as f32 / 22.0 - 0.25;
            let features = vec![class as f32 + jitter, 1.0 - class as f32 / 3.0];
            let partition = if id % 5 == 0 {
                Partition::Validation
            } else {
                Partition::Train
            };
            heads
                .iter()
                .fold(OrdinalSample::new(id, features), |sample, head| {
                    sample.with_label(head.tag.clone(), HeadLabel::new(class))
                })
                .with_partition(partition)
        })
        .collect()
}

struct Splits {
    all: InMemoryDataset,
    train: InMemoryDataset,
    validation: InMemoryDataset,
}

fn splits(heads: &[HeadSpec]) -> Splits {
    let loader = LoaderConfig::default().with_batch_size(16);
    let all = InMemoryDataset::new(samples(heads), heads, loader).unwrap();
    Splits {
        train: all.partition(Partition::Train).unwrap(),
        validation: all.partition(Partition::Validation).unwrap(),
        all,
    }
}

fn model(heads: &[HeadSpec]) -> Model {
    let config = MultiHeadClassifierConfig::new(2).with_hidden(16).with_heads(heads);
    MultiHeadClassifier::new(&config, &Default::default()).unwrap()
}

fn config(heads: &[HeadSpec], output_dir: &Path, max_epochs: usize) -> TrainingConfig {
    TrainingConfig::new(heads.to_vec(), costs(heads))
        .with_max_epochs(max_epochs)
        .with_patience(max_epochs)
        .with_optimizer(OptimizerConfig::adam(0.05))
        .with_output_dir(output_dir)
        .with_run_name("synthetic")
}

/// Classifier whose `age` head emits NaN logits.
#[derive(Module, Debug)]
struct NanAgeHead<B: Backend> {
    inner: MultiHeadClassifier<B>,
}

impl<B: Backend> MultiHeadModel<B> for NanAgeHead<B> {
    fn forward(&self, batch: &HostBatch, device: &B::Device) -> HeadLogits<B> {
        let mut logits = self.inner.forward(batch, device);
        if let Some(age) = logits.remove("age") {
            logits.insert("age".to_string(), age.mul_scalar(f32::NAN));
        }
        logits
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fit_model(
    config: TrainingConfig,
    heads: &[HeadSpec],
    model: Model,
    sink: &mut MemorySink,
) -> TrainingOutcome<Model> {
    init_tracing();
    let data = splits(heads);
    let trainer = Trainer::<TestBackend>::new(config, Default::default()).unwrap();
    trainer.fit(model, &data.train, &data.validation, sink).unwrap()
}

fn fit(config: TrainingConfig, heads: &[HeadSpec], sink: &mut MemorySink) -> TrainingOutcome<Model> {
    fit_model(config, heads, model(heads), sink)
}

/// Last epoch with the minimum validation error.
fn best_epoch(history: &[EpochLog]) -> usize {
    let min = history
        .iter()
        .map(|log| log.validation.error)
        .fold(f64::INFINITY, f64::min);
    history
        .iter()
        .filter(|log| log.validation.error <= min)
        .map(|log| log.epoch)
        .max()
        .unwrap()
}

// =============================================================================
// Training
// =============================================================================

#[test]
fn training_runs_all_epochs_and_learns() {
    let dir = tempfile::tempdir().unwrap();
    let heads = heads();
    let mut sink = MemorySink::new();

    let outcome = fit(config(&heads, dir.path(), 12), &heads, &mut sink);

    assert_eq!(outcome.stop_reason, StopReason::MaxEpochs);
    assert_eq!(outcome.epochs_completed(), 12);
    let first = &outcome.log_history[0];
    let last = &outcome.log_history[11];
    assert!(last.train.loss < first.train.loss);
    assert!(outcome.log_history.iter().all(|log| log.train.loss.is_finite()));

    assert_eq!(outcome.best_epoch, best_epoch(&outcome.log_history));
    assert_relative_eq!(
        outcome.min_val_error,
        outcome.log_history[outcome.best_epoch].validation.error
    );

    assert_eq!(sink.runs, vec!["synthetic".to_string()]);
    assert_eq!(sink.epochs(), (0..12).collect::<Vec<_>>());
    assert!(!sink.is_open);
    assert!(sink.entries[0].1.contains_key("val_error_grade"));
    assert!(checkpoint_path(dir.path()).join("state.json").is_file());
}

#[test]
fn multi_head_training_weights_heads() {
    let dir = tempfile::tempdir().unwrap();
    let heads = vec![
        HeadSpec::new("grade", NR_CLASSES, LossKind::CrossEntropy).with_weight(0.25),
        HeadSpec::new("grade_coral", NR_CLASSES, LossKind::RankConsistent).with_weight(0.75),
    ];
    let mut sink = MemorySink::new();

    let outcome = fit(config(&heads, dir.path(), 3), &heads, &mut sink);

    for log in &outcome.log_history {
        let phase = &log.validation;
        let weighted = 0.25 * phase.head_error["grade"] + 0.75 * phase.head_error["grade_coral"];
        assert_relative_eq!(phase.error, weighted, epsilon = 1e-9);
    }
}

#[test]
fn every_optimizer_and_loss_scaling_train() {
    let heads = heads();
    let optimizers = [
        OptimizerConfig::sgd_momentum(0.05, 0.9),
        OptimizerConfig::adamw(0.01, 0.01),
        OptimizerConfig::adam(0.01).with_gradient_clip(1.0),
    ];

    for optimizer in optimizers {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&heads, dir.path(), 2)
            .with_optimizer(optimizer)
            .with_loss_scale(LossScaleConfig::dynamic().with_init_scale(1024.0));
        let outcome = fit(config, &heads, &mut MemorySink::new());

        assert_eq!(outcome.epochs_completed(), 2);
        assert!(outcome.log_history.iter().all(|log| log.train.loss.is_finite()));
    }
}

#[test]
fn json_lines_sink_gets_one_line_per_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let heads = heads();
    let data = splits(&heads);
    let log_path = dir.path().join("metrics.jsonl");

    let trainer = Trainer::<TestBackend>::new(config(&heads, dir.path(), 2), Default::default()).unwrap();
    let mut sink = JsonLinesSink::new(&log_path);
    trainer.fit(model(&heads), &data.train, &data.validation, &mut sink).unwrap();

    let entries = JsonLinesSink::read(&log_path).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.run == "synthetic"));
    assert!(entries[1].metrics.contains_key("elapsed_minutes"));
}

#[test]
fn non_finite_head_logits_stop_training() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let heads = vec![
        HeadSpec::new("grade", NR_CLASSES, LossKind::CrossEntropy),
        HeadSpec::new("age", NR_CLASSES, LossKind::RankConsistent),
    ];
    let data = splits(&heads);
    let mut sink = MemorySink::new();

    let trainer = Trainer::<TestBackend>::new(config(&heads, dir.path(), 3), Default::default()).unwrap();
    let model = NanAgeHead { inner: model(&heads) };
    let result = trainer.fit(model, &data.train, &data.validation, &mut sink);

    match result {
        Err(TrainingError::NumericalInstability(message)) => {
            assert!(message.contains("logits"), "{message}");
        }
        Err(other) => panic!("expected numerical instability, got {other}"),
        Ok(outcome) => panic!("training finished after {} epochs", outcome.epochs_completed()),
    }
    assert!(sink.entries.is_empty());
    assert!(!sink.is_open);
    assert!(!checkpoint_path(dir.path()).join("state.json").exists());
}

// =============================================================================
// Checkpoints and resume
// =============================================================================

#[test]
fn resume_continues_after_last_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let heads = heads();

    let mut first_sink = MemorySink::new();
    let first = fit(config(&heads, dir.path(), 3), &heads, &mut first_sink);
    assert_eq!(first_sink.epochs(), vec![0, 1, 2]);

    let mut second_sink = MemorySink::new();
    let second = fit(config(&heads, dir.path(), 5), &heads, &mut second_sink);

    // Restored epochs are replayed before the new ones are logged.
    assert_eq!(second_sink.epochs(), vec![0, 1, 2, 3, 4]);
    assert_eq!(second_sink.entries[..3], first_sink.entries[..]);

    assert_eq!(second.epochs_completed(), 5);
    assert_eq!(second.log_history[..3], first.log_history[..]);
    assert_eq!(second.best_epoch, best_epoch(&second.log_history));
    assert!(second.log_history[3].elapsed_minutes >= second.log_history[2].elapsed_minutes);
}

#[test]
fn resumed_run_selects_same_best_epoch_as_uninterrupted() {
    let heads = heads();
    let initial = model(&heads);

    let straight_dir = tempfile::tempdir().unwrap();
    let straight = fit_model(
        config(&heads, straight_dir.path(), 6),
        &heads,
        initial.clone(),
        &mut MemorySink::new(),
    );

    let resumed_dir = tempfile::tempdir().unwrap();
    fit_model(
        config(&heads, resumed_dir.path(), 3),
        &heads,
        initial,
        &mut MemorySink::new(),
    );
    let resumed = fit(config(&heads, resumed_dir.path(), 6), &heads, &mut MemorySink::new());

    assert_eq!(resumed.best_epoch, straight.best_epoch);
    for (a, b) in resumed.log_history.iter().zip(&straight.log_history) {
        assert_relative_eq!(a.validation.error, b.validation.error, epsilon = 1e-6);
        assert_relative_eq!(a.train.loss, b.train.loss, epsilon = 1e-4);
    }
}

#[test]
fn finished_run_resumes_without_training() {
    let dir = tempfile::tempdir().unwrap();
    let heads = heads();

    let first = fit(config(&heads, dir.path(), 2), &heads, &mut MemorySink::new());
    let mut sink = MemorySink::new();
    let again = fit(config(&heads, dir.path(), 2), &heads, &mut sink);

    assert_eq!(again.log_history, first.log_history);
    assert_eq!(again.best_epoch, first.best_epoch);
    assert_eq!(sink.epochs(), vec![0, 1]);
}

#[test]
fn corrupt_checkpoint_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let heads = heads();
    let checkpoint = checkpoint_path(dir.path());
    std::fs::create_dir_all(&checkpoint).unwrap();
    std::fs::write(checkpoint.join("state.json"), "{\"epoch\": 7").unwrap();

    let mut sink = MemorySink::new();
    let outcome = fit(config(&heads, dir.path(), 2), &heads, &mut sink);

    assert_eq!(sink.epochs(), vec![0, 1]);
    assert_eq!(outcome.log_history[0].epoch, 0);
    assert!(checkpoint.join("model.bin").is_file());
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn evaluation_matches_best_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let heads = heads();
    let outcome = fit(config(&heads, dir.path(), 4), &heads, &mut MemorySink::new());

    let data = splits(&heads);
    let report = evaluate::<NdArray<f32>, _>(
        &outcome.model.valid(),
        &heads,
        &costs(&heads),
        &data.all,
        &Default::default(),
    )
    .unwrap();

    assert_eq!(report.len(), 80);
    let grade = report.head("grade").unwrap();
    assert!(grade.predicted.iter().all(|&p| p < NR_CLASSES));
    assert!(grade.errors.train.is_some());
    assert_eq!(grade.errors.test, None);
    assert_relative_eq!(
        grade.errors.validation.unwrap(),
        outcome.min_val_error,
        epsilon = 1e-9
    );
}
