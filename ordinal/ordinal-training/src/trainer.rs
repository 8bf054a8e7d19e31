//! Training loop with checkpointing and early stopping.

use std::fmt;
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::Backend;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use ordinal_dataset::{BatchSource, HostBatch};
use ordinal_models::{HeadLogits, MultiHeadModel, head_posterior, take_head_logits};
use ordinal_types::{CostMatrix, HeadSpec};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{CheckpointState, load_checkpoint, save_checkpoint};
use crate::config::{OptimizerType, TrainingConfig};
use crate::decision::{batch_error, predict_labels};
use crate::error::{Result, TrainingError};
use crate::loss::{LossTargets, head_loss};
use crate::metrics::{EpochLog, PhaseMetrics, PhaseSummary};
use crate::scaler::LossScaler;
use crate::sink::MetricsSink;

/// Stage of the training lifecycle. Each transition is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerPhase {
    /// No usable checkpoint; starting at epoch 0.
    FreshStart,
    /// Restored from a checkpoint.
    Resumed,
    /// Optimizing over the training partition.
    TrainPhase,
    /// Measuring the validation partition.
    ValidationPhase,
    /// Checkpoint of the finished epoch written.
    Checkpointed,
    /// Training finished.
    Stopped,
}

impl fmt::Display for TrainerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FreshStart => "fresh_start",
            Self::Resumed => "resumed",
            Self::TrainPhase => "train",
            Self::ValidationPhase => "validation",
            Self::Checkpointed => "checkpointed",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// All configured epochs ran.
    MaxEpochs,
    /// No validation improvement within the patience window.
    Patience,
}

/// In-memory state of a run.
///
/// # Example
///
/// ```
/// use ordinal_training::{EpochLog, PhaseSummary, TrainingState};
///
/// let mut state = TrainingState::fresh("initial weights");
/// let log = EpochLog {
///     epoch: 0,
///     validation: PhaseSummary { error: 0.4, ..PhaseSummary::default() },
///     ..EpochLog::default()
/// };
///
/// assert!(state.record_epoch(log, &"epoch 0 weights"));
/// assert_eq!(state.best_model, "epoch 0 weights");
/// assert_eq!(state.next_epoch, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingState<M> {
    /// Next epoch to run.
    pub next_epoch: usize,

    /// Snapshot of the weights with the lowest validation error.
    pub best_model: M,

    /// Epoch of `best_model`.
    pub best_epoch: usize,

    /// Lowest validation error so far; `+inf` before the first epoch.
    pub min_val_error: f64,

    /// Every finished epoch.
    pub log_history: Vec<EpochLog>,
}

impl<M: Clone> TrainingState<M> {
    /// State of a run that has not trained yet.
    #[must_use]
    pub const fn fresh(initial: M) -> Self {
        Self {
            next_epoch: 0,
            best_model: initial,
            best_epoch: 0,
            min_val_error: f64::INFINITY,
            log_history: Vec::new(),
        }
    }

    /// State restored from a checkpoint.
    #[must_use]
    pub fn resumed(state: CheckpointState, best_model: M) -> Self {
        Self {
            next_epoch: state.epoch + 1,
            best_model,
            best_epoch: state.best_epoch,
            min_val_error: state.min_val_error.unwrap_or(f64::INFINITY),
            log_history: state.log_history,
        }
    }

    /// Whether `epoch` lies beyond the patience window of the best epoch.
    #[must_use]
    pub const fn should_stop(&self, epoch: usize, patience: usize) -> bool {
        epoch.saturating_sub(self.best_epoch) > patience
    }

    /// Appends a finished epoch, snapshotting `model` if its validation
    /// error is at most the best so far.
    ///
    /// Returns whether the snapshot was taken.
    pub fn record_epoch(&mut self, log: EpochLog, model: &M) -> bool {
        let improved = log.validation.error <= self.min_val_error;
        if improved {
            self.min_val_error = log.validation.error;
            self.best_epoch = log.epoch;
            self.best_model = model.clone();
        }
        self.next_epoch = log.epoch + 1;
        self.log_history.push(log);
        improved
    }

    /// Scalar state for a checkpoint of the last recorded epoch.
    #[must_use]
    pub fn checkpoint_state(&self, scaler: LossScaler) -> CheckpointState {
        CheckpointState {
            epoch: self.next_epoch.saturating_sub(1),
            best_epoch: self.best_epoch,
            min_val_error: self.min_val_error.is_finite().then_some(self.min_val_error),
            log_history: self.log_history.clone(),
            scaler,
        }
    }

    /// Minutes already spent before this process took over.
    #[must_use]
    pub fn elapsed_minutes(&self) -> f64 {
        self.log_history.last().map_or(0.0, |log| log.elapsed_minutes)
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome<M> {
    /// Model carrying the best weights.
    pub model: M,

    /// Epoch of the best weights.
    pub best_epoch: usize,

    /// Validation error of the best weights.
    pub min_val_error: f64,

    /// Every epoch log, including epochs restored from a checkpoint.
    pub log_history: Vec<EpochLog>,

    /// Why training ended.
    pub stop_reason: StopReason,
}

impl<M> TrainingOutcome<M> {
    /// Number of epochs in the history.
    #[must_use]
    pub fn epochs_completed(&self) -> usize {
        self.log_history.len()
    }

    /// Human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = String::new();
        let _ = writeln!(s, "Training Summary");
        let _ = writeln!(s, "================");
        let _ = writeln!(s, "Epochs completed: {}", self.epochs_completed());
        if let (Some(first), Some(last)) = (self.log_history.first(), self.log_history.last()) {
            let _ = writeln!(
                s,
                "Train loss: {:.4} -> {:.4}",
                first.train.loss, last.train.loss
            );
            let _ = writeln!(s, "Total time: {:.1} min", last.elapsed_minutes);
        }
        let _ = writeln!(
            s,
            "Best val error: {:.4} (epoch {})",
            self.min_val_error, self.best_epoch
        );
        match self.stop_reason {
            StopReason::MaxEpochs => {
                let _ = writeln!(s, "Stopped: max epochs");
            }
            StopReason::Patience => {
                let _ = writeln!(s, "Stopped early: no improvement since epoch {}", self.best_epoch);
            }
        }
        s
    }
}

/// Loss and decision cost of one head on one batch.
///
/// The loss keeps its graph; the cost is computed on detached logits.
///
/// # Errors
///
/// Propagates shape, label and numerical errors of the head.
pub(crate) fn head_step<B: Backend>(
    head: &HeadSpec,
    cost: &CostMatrix,
    logits: &mut HeadLogits<B>,
    batch: &HostBatch,
    device: &B::Device,
) -> Result<(Tensor<B, 1>, f64)> {
    let head_logits = take_head_logits(logits, head, batch.len())?;
    let targets = batch.targets(&head.tag).ok_or_else(|| {
        TrainingError::Dataset(format!("batch has no targets for head '{}'", head.tag))
    })?;

    let loss_targets = LossTargets::from_host(targets, head, device)?;
    let loss = head_loss(head, head_logits.clone(), &loss_targets)?;

    let posterior = head_posterior(head, head_logits.detach())?;
    let predicted = predict_labels(posterior, cost)?;
    let error = batch_error(&targets.labels, &predicted, cost)?;
    Ok((loss, error))
}

pub(crate) fn cost_matrix<'a>(config: &'a TrainingConfig, head: &HeadSpec) -> Result<&'a CostMatrix> {
    config
        .cost_matrices
        .get(&head.tag)
        .ok_or_else(|| TrainingError::invalid_config(format!("no cost matrix for head '{}'", head.tag)))
}

fn enter(phase: TrainerPhase, epoch: usize) {
    match phase {
        TrainerPhase::TrainPhase | TrainerPhase::ValidationPhase | TrainerPhase::Checkpointed => {
            tracing::debug!(%phase, epoch, "trainer phase");
        }
        TrainerPhase::FreshStart | TrainerPhase::Resumed | TrainerPhase::Stopped => {
            tracing::info!(%phase, epoch, "trainer phase");
        }
    }
}

/// Runs training for a multi-head model.
///
/// Validation and checkpoints happen every epoch. The run resumes from the
/// checkpoint under `config.output_dir` when one is readable.
///
/// # Example
///
/// ```no_run
/// use burn_autodiff::Autodiff;
/// use burn_ndarray::NdArray;
/// use ordinal_dataset::{HeadLabel, InMemoryDataset, LoaderConfig, OrdinalSample};
/// use ordinal_models::{MultiHeadClassifier, MultiHeadClassifierConfig};
/// use ordinal_training::{MemorySink, Trainer, TrainingConfig};
/// use ordinal_types::{CostMatrices, CostMatrix, HeadSpec, LossKind};
///
/// type B = Autodiff<NdArray<f32>>;
///
/// let heads = vec![HeadSpec::new("grade", 5, LossKind::RankConsistent)];
/// let costs = CostMatrices::new().with("grade", CostMatrix::absolute(5));
/// let config = TrainingConfig::new(heads.clone(), costs).with_output_dir("runs/grade");
///
/// let device = Default::default();
/// let model_config = MultiHeadClassifierConfig::new(8).with_heads(&heads);
/// let model = MultiHeadClassifier::<B>::new(&model_config, &device)?;
///
/// let samples = |offset: u64| -> Vec<OrdinalSample> {
///     (0..100)
///         .map(|i| {
///             let grade = (i % 5) as usize;
///             OrdinalSample::new(offset + i, vec![grade as f32; 8])
///                 .with_label("grade", HeadLabel::new(grade))
///         })
///         .collect()
/// };
/// let train = InMemoryDataset::new(samples(0), &heads, LoaderConfig::default())?;
/// let val = InMemoryDataset::new(samples(1000), &heads, LoaderConfig::default())?;
///
/// let trainer = Trainer::<B>::new(config, device)?;
/// let outcome = trainer.fit(model, &train, &val, &mut MemorySink::new())?;
/// println!("{}", outcome.summary());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Trainer<B: AutodiffBackend> {
    config: TrainingConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Creates a trainer after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] if the configuration is not valid.
    pub fn new(config: TrainingConfig, device: B::Device) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, device })
    }

    /// Returns the training configuration.
    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains with the configured optimizer.
    ///
    /// # Errors
    ///
    /// See [`Trainer::fit_with`].
    pub fn fit<M>(
        &self,
        model: M,
        train: &dyn BatchSource,
        validation: &dyn BatchSource,
        sink: &mut dyn MetricsSink,
    ) -> Result<TrainingOutcome<M>>
    where
        M: AutodiffModule<B> + MultiHeadModel<B>,
        M::InnerModule: MultiHeadModel<B::InnerBackend>,
    {
        let optimizer = &self.config.optimizer;
        match optimizer.optimizer_type {
            OptimizerType::Adam => {
                let adam = optimizer.adam_config().init::<B, M>();
                self.fit_with(model, adam, train, validation, sink)
            }
            OptimizerType::AdamW => {
                let adamw = optimizer.adamw_config().init::<B, M>();
                self.fit_with(model, adamw, train, validation, sink)
            }
            OptimizerType::Sgd => {
                let sgd = optimizer.sgd_config().init::<B, M>();
                self.fit_with(model, sgd, train, validation, sink)
            }
        }
    }

    /// Trains with a caller-supplied optimizer.
    ///
    /// The sink is opened before and closed after the run, also on failure.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::NumericalInstability`] if logits turn
    /// non-finite, and propagates data, label, sink and checkpoint errors.
    /// An unreadable checkpoint is not an error; training starts fresh.
    pub fn fit_with<M, O>(
        &self,
        model: M,
        optimizer: O,
        train: &dyn BatchSource,
        validation: &dyn BatchSource,
        sink: &mut dyn MetricsSink,
    ) -> Result<TrainingOutcome<M>>
    where
        M: AutodiffModule<B> + MultiHeadModel<B>,
        M::InnerModule: MultiHeadModel<B::InnerBackend>,
        O: Optimizer<M, B>,
    {
        sink.open(&self.config.run_name)?;
        let outcome = self.run(model, optimizer, train, validation, sink);
        let closed = sink.close();
        let outcome = outcome?;
        closed?;
        Ok(outcome)
    }

    fn run<M, O>(
        &self,
        model: M,
        optimizer: O,
        train: &dyn BatchSource,
        validation: &dyn BatchSource,
        sink: &mut dyn MetricsSink,
    ) -> Result<TrainingOutcome<M>>
    where
        M: AutodiffModule<B> + MultiHeadModel<B>,
        M::InnerModule: MultiHeadModel<B::InnerBackend>,
        O: Optimizer<M, B>,
    {
        let started = Instant::now();
        let (mut model, mut optimizer, mut state, mut scaler) = self.restore(model, optimizer, sink)?;
        let elapsed_before = state.elapsed_minutes();

        let mut stop_reason = StopReason::MaxEpochs;
        for epoch in state.next_epoch..self.config.max_epochs {
            if state.should_stop(epoch, self.config.patience) {
                stop_reason = StopReason::Patience;
                break;
            }

            let learning_rate = self.config.learning_rate(epoch);
            enter(TrainerPhase::TrainPhase, epoch);
            let (trained, train_summary) =
                self.train_epoch(model, &mut optimizer, &mut scaler, train, epoch, learning_rate)?;
            model = trained;

            enter(TrainerPhase::ValidationPhase, epoch);
            let validation_summary = self.validate_epoch(&model.valid(), validation, epoch)?;

            let log = EpochLog {
                epoch,
                learning_rate,
                train: train_summary,
                validation: validation_summary,
                elapsed_minutes: elapsed_before + started.elapsed().as_secs_f64() / 60.0,
            };
            tracing::info!(
                epoch,
                lr = learning_rate,
                trn_loss = log.train.loss,
                trn_error = log.train.error,
                val_loss = log.validation.loss,
                val_error = log.validation.error,
                "epoch finished"
            );
            sink.log(epoch, &log.to_flat())?;
            if state.record_epoch(log, &model) {
                tracing::info!(epoch, val_error = state.min_val_error, "new best weights");
            }

            save_checkpoint::<B, M, O::Record>(
                &self.config.output_dir,
                &state.checkpoint_state(scaler),
                &model,
                &state.best_model,
                optimizer.to_record(),
            )?;
            enter(TrainerPhase::Checkpointed, epoch);
        }
        enter(TrainerPhase::Stopped, state.next_epoch);

        Ok(TrainingOutcome {
            model: state.best_model,
            best_epoch: state.best_epoch,
            min_val_error: state.min_val_error,
            log_history: state.log_history,
            stop_reason,
        })
    }

    /// Loads the checkpoint or sets up a fresh run, replaying restored
    /// epochs into the sink.
    fn restore<M, O>(
        &self,
        model: M,
        optimizer: O,
        sink: &mut dyn MetricsSink,
    ) -> Result<(M, O, TrainingState<M>, LossScaler)>
    where
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let fresh_scaler = LossScaler::new(self.config.loss_scale);
        match load_checkpoint::<B, M, O::Record>(&self.config.output_dir, model.clone(), &self.device) {
            Ok(Some(checkpoint)) => {
                let scaler = checkpoint.state.scaler;
                let state = TrainingState::resumed(checkpoint.state, checkpoint.best_model);
                enter(TrainerPhase::Resumed, state.next_epoch);
                for log in &state.log_history {
                    sink.log(log.epoch, &log.to_flat())?;
                }
                let optimizer = optimizer.load_record(checkpoint.optimizer);
                Ok((checkpoint.model, optimizer, state, scaler))
            }
            Ok(None) => {
                enter(TrainerPhase::FreshStart, 0);
                let state = TrainingState::fresh(model.clone());
                Ok((model, optimizer, state, fresh_scaler))
            }
            Err(e) => {
                tracing::warn!(error = %e, "unreadable checkpoint, starting fresh");
                enter(TrainerPhase::FreshStart, 0);
                let state = TrainingState::fresh(model.clone());
                Ok((model, optimizer, state, fresh_scaler))
            }
        }
    }

    fn train_epoch<M, O>(
        &self,
        mut model: M,
        optimizer: &mut O,
        scaler: &mut LossScaler,
        source: &dyn BatchSource,
        epoch: usize,
        learning_rate: f64,
    ) -> Result<(M, PhaseSummary)>
    where
        M: AutodiffModule<B> + MultiHeadModel<B>,
        O: Optimizer<M, B>,
    {
        let heads = &self.config.heads;
        let mut metrics = PhaseMetrics::new(heads);

        for batch in source.batches(epoch) {
            let batch = batch?;
            if batch.is_empty() {
                continue;
            }

            let mut logits = model.forward(&batch, &self.device);
            let mut total: Option<Tensor<B, 1>> = None;
            for head in heads {
                let cost = cost_matrix(&self.config, head)?;
                let (loss, error) = head_step(head, cost, &mut logits, &batch, &self.device)?;
                let value = loss.clone().into_scalar().elem::<f64>();
                metrics.update(&head.tag, value, error, batch.len());

                let weighted = loss.mul_scalar(head.weight);
                total = Some(match total {
                    Some(sum) => sum + weighted,
                    None => weighted,
                });
            }
            let Some(total) = total else {
                continue;
            };

            let grads = scaler.scale_loss(total).backward();
            let grads = GradientsParams::from_grads(grads, &model);
            let (grads, finite) = scaler.unscale::<B, M>(&model, grads);
            if finite {
                model = optimizer.step(learning_rate, model, grads);
            }
            scaler.update(finite);
        }

        Ok((model, metrics.summary(heads)))
    }

    fn validate_epoch<V>(&self, model: &V, source: &dyn BatchSource, epoch: usize) -> Result<PhaseSummary>
    where
        V: MultiHeadModel<B::InnerBackend>,
    {
        let heads = &self.config.heads;
        let mut metrics = PhaseMetrics::new(heads);

        for batch in source.batches(epoch) {
            let batch = batch?;
            if batch.is_empty() {
                continue;
            }

            let mut logits = model.forward(&batch, &self.device);
            for head in heads {
                let cost = cost_matrix(&self.config, head)?;
                let (loss, error) = head_step(head, cost, &mut logits, &batch, &self.device)?;
                metrics.update(&head.tag, loss.into_scalar().elem::<f64>(), error, batch.len());
            }
        }

        Ok(metrics.summary(heads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;
    use ordinal_types::{CostMatrices, LossKind};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn log(epoch: usize, val_error: f64) -> EpochLog {
        EpochLog {
            epoch,
            validation: PhaseSummary {
                error: val_error,
                ..PhaseSummary::default()
            },
            elapsed_minutes: 0.5 * (epoch + 1) as f64,
            ..EpochLog::default()
        }
    }

    /// Drives the epoch loop bookkeeping over scripted validation errors and
    /// returns the epochs that ran.
    fn run_script(errors: &[f64], patience: usize) -> (Vec<usize>, TrainingState<usize>, StopReason) {
        let mut state = TrainingState::fresh(usize::MAX);
        let mut ran = Vec::new();
        for (epoch, &error) in errors.iter().enumerate() {
            if state.should_stop(epoch, patience) {
                return (ran, state, StopReason::Patience);
            }
            ran.push(epoch);
            state.record_epoch(log(epoch, error), &epoch);
        }
        (ran, state, StopReason::MaxEpochs)
    }

    #[test]
    fn training_state_fresh() {
        let state = TrainingState::fresh(());
        assert_eq!(state.next_epoch, 0);
        assert_eq!(state.best_epoch, 0);
        assert!(state.min_val_error.is_infinite());
        assert!(state.log_history.is_empty());
    }

    #[test]
    fn first_epoch_is_always_best() {
        let mut state = TrainingState::fresh(0_usize);
        assert!(state.record_epoch(log(0, 1e6), &7));
        assert_eq!(state.best_model, 7);
    }

    #[test]
    fn ties_take_the_later_epoch() {
        let mut state = TrainingState::fresh(0_usize);
        state.record_epoch(log(0, 0.5), &0);
        assert!(state.record_epoch(log(1, 0.5), &1));
        assert_eq!(state.best_epoch, 1);
        assert!(!state.record_epoch(log(2, 0.6), &2));
        assert_eq!(state.best_model, 1);
    }

    #[test]
    fn early_stopping_halts_patience_plus_one_after_minimum() {
        let errors = [0.5, 0.3, 0.4, 0.45, 0.5, 0.6, 0.2, 0.1];
        let (ran, state, reason) = run_script(&errors, 2);

        assert_eq!(reason, StopReason::Patience);
        assert_eq!(state.best_epoch, 1);
        // Epoch 4 = best + patience + 1 does not run.
        assert_eq!(ran, vec![0, 1, 2, 3]);
        assert_eq!(state.best_model, 1);
    }

    #[test]
    fn zero_patience_stops_after_first_worse_epoch() {
        let (ran, _, reason) = run_script(&[0.5, 0.6, 0.1], 0);
        assert_eq!(reason, StopReason::Patience);
        assert_eq!(ran, vec![0, 1]);
    }

    #[test]
    fn improving_run_reaches_max_epochs() {
        let (ran, state, reason) = run_script(&[0.5, 0.4, 0.3, 0.2], 1);
        assert_eq!(reason, StopReason::MaxEpochs);
        assert_eq!(ran.len(), 4);
        assert_eq!(state.best_epoch, 3);
    }

    #[test]
    fn checkpoint_state_round_trip() {
        let mut state = TrainingState::fresh(0_usize);
        state.record_epoch(log(0, 0.5), &0);
        state.record_epoch(log(1, 0.25), &1);
        state.record_epoch(log(2, 0.75), &2);

        let saved = state.checkpoint_state(LossScaler::new(crate::config::LossScaleConfig::default()));
        assert_eq!(saved.epoch, 2);
        assert_eq!(saved.best_epoch, 1);
        assert_eq!(saved.min_val_error, Some(0.25));

        let resumed = TrainingState::resumed(saved, 1_usize);
        assert_eq!(resumed.next_epoch, 3);
        assert_eq!(resumed.best_epoch, 1);
        assert_eq!(resumed.log_history, state.log_history);
        assert!((resumed.elapsed_minutes() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn fresh_checkpoint_state_has_no_min_error() {
        let state = TrainingState::fresh(());
        let saved = state.checkpoint_state(LossScaler::new(crate::config::LossScaleConfig::default()));
        assert_eq!(saved.min_val_error, None);
        assert!(TrainingState::resumed(saved, ()).min_val_error.is_infinite());
    }

    #[test]
    fn trainer_phase_display() {
        assert_eq!(TrainerPhase::FreshStart.to_string(), "fresh_start");
        assert_eq!(TrainerPhase::ValidationPhase.to_string(), "validation");
        assert_eq!(TrainerPhase::Stopped.to_string(), "stopped");
    }

    #[test]
    fn trainer_rejects_invalid_config() {
        let heads = vec![HeadSpec::new("grade", 5, LossKind::CrossEntropy)];
        let config = TrainingConfig::new(heads, CostMatrices::new());
        let result = Trainer::<TestBackend>::new(config, Default::default());
        assert!(matches!(result, Err(TrainingError::InvalidConfig(_))));
    }

    #[test]
    fn trainer_keeps_config() {
        let heads = vec![HeadSpec::new("grade", 5, LossKind::CrossEntropy)];
        let costs = CostMatrices::new().with("grade", ordinal_types::CostMatrix::zero_one(5));
        let config = TrainingConfig::new(heads, costs)
            .with_max_epochs(3)
            .with_optimizer(OptimizerConfig::sgd(0.1));
        let trainer = Trainer::<TestBackend>::new(config, Default::default()).unwrap();
        assert_eq!(trainer.config().max_epochs, 3);
        assert!(cost_matrix(trainer.config(), &trainer.config().heads[0]).is_ok());
    }

    #[test]
    fn outcome_summary() {
        let outcome = TrainingOutcome {
            model: (),
            best_epoch: 1,
            min_val_error: 0.25,
            log_history: vec![log(0, 0.5), log(1, 0.25), log(2, 0.75)],
            stop_reason: StopReason::Patience,
        };
        let summary = outcome.summary();
        assert_eq!(outcome.epochs_completed(), 3);
        assert!(summary.contains("Best val error: 0.2500 (epoch 1)"));
        assert!(summary.contains("Stopped early"));
    }
}
