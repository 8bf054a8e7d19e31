//! Running metrics and per-epoch logs.

use std::collections::BTreeMap;
use std::fmt;

use ordinal_types::HeadSpec;
use serde::{Deserialize, Serialize};

/// Exact online mean of batch values weighted by batch size.
///
/// # Example
///
/// ```
/// use ordinal_training::RunningMean;
///
/// let mut mean = RunningMean::new();
/// mean.update(1.0, 3);
/// mean.update(5.0, 1);
/// assert!((mean.value() - 2.0).abs() < 1e-12);
/// assert_eq!(mean.count(), 4);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningMean {
    mean: f64,
    count: usize,
}

impl RunningMean {
    /// Creates an empty mean.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mean: 0.0,
            count: 0,
        }
    }

    /// Adds a batch whose mean is `value` over `batch_size` examples.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, value: f64, batch_size: usize) {
        if batch_size == 0 {
            return;
        }
        let n = self.count as f64;
        let b = batch_size as f64;
        self.mean = (n * self.mean + b * value) / (n + b);
        self.count += batch_size;
    }

    /// Current mean; zero before the first update.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.mean
    }

    /// Number of examples seen.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

/// Running loss and error of one head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadMetrics {
    /// Mean loss.
    pub loss: RunningMean,

    /// Mean decision cost.
    pub error: RunningMean,
}

/// Training or validation phase of an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Optimization pass over the training partition.
    Train,
    /// Gradient-free pass over the validation partition.
    Validation,
}

impl Phase {
    /// Prefix of the phase's keys in flattened logs.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Train => "trn",
            Self::Validation => "val",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Per-head running metrics of one phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseMetrics {
    heads: BTreeMap<String, HeadMetrics>,
}

impl PhaseMetrics {
    /// Creates empty metrics for the given heads.
    #[must_use]
    pub fn new(heads: &[HeadSpec]) -> Self {
        Self {
            heads: heads
                .iter()
                .map(|h| (h.tag.clone(), HeadMetrics::default()))
                .collect(),
        }
    }

    /// Records the loss and error of a head on one batch.
    pub fn update(&mut self, tag: &str, loss: f64, error: f64, batch_size: usize) {
        let head = self.heads.entry(tag.to_string()).or_default();
        head.loss.update(loss, batch_size);
        head.error.update(error, batch_size);
    }

    /// Running metrics of a head.
    #[must_use]
    pub fn head(&self, tag: &str) -> Option<&HeadMetrics> {
        self.heads.get(tag)
    }

    /// Head-weighted totals and per-head means.
    #[must_use]
    pub fn summary(&self, heads: &[HeadSpec]) -> PhaseSummary {
        let mut summary = PhaseSummary::default();
        for head in heads {
            let metrics = self.heads.get(&head.tag).copied().unwrap_or_default();
            let weight = f64::from(head.weight);
            summary.loss += weight * metrics.loss.value();
            summary.error += weight * metrics.error.value();
            summary.head_loss.insert(head.tag.clone(), metrics.loss.value());
            summary.head_error.insert(head.tag.clone(), metrics.error.value());
        }
        summary
    }
}

/// Aggregated metrics of a finished phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    /// `sum_h weight_h * loss_h`.
    pub loss: f64,

    /// `sum_h weight_h * error_h`.
    pub error: f64,

    /// Mean loss per head.
    pub head_loss: BTreeMap<String, f64>,

    /// Mean decision cost per head.
    pub head_error: BTreeMap<String, f64>,
}

impl PhaseSummary {
    fn flatten_into(&self, phase: Phase, out: &mut BTreeMap<String, f64>) {
        let prefix = phase.prefix();
        out.insert(format!("{prefix}_loss"), self.loss);
        out.insert(format!("{prefix}_error"), self.error);
        for (tag, value) in &self.head_loss {
            out.insert(format!("{prefix}_loss_{tag}"), *value);
        }
        for (tag, value) in &self.head_error {
            out.insert(format!("{prefix}_error_{tag}"), *value);
        }
    }
}

/// Log record of one epoch.
///
/// # Example
///
/// ```
/// use ordinal_training::{EpochLog, PhaseSummary};
///
/// let log = EpochLog {
///     epoch: 3,
///     learning_rate: 1e-3,
///     train: PhaseSummary { loss: 0.9, error: 0.4, ..PhaseSummary::default() },
///     validation: PhaseSummary { loss: 1.1, error: 0.5, ..PhaseSummary::default() },
///     elapsed_minutes: 0.5,
/// };
///
/// let flat = log.to_flat();
/// assert_eq!(flat["trn_loss"], 0.9);
/// assert_eq!(flat["val_error"], 0.5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochLog {
    /// Epoch number (0-indexed).
    pub epoch: usize,

    /// Learning rate used.
    pub learning_rate: f64,

    /// Training phase metrics.
    pub train: PhaseSummary,

    /// Validation phase metrics.
    pub validation: PhaseSummary,

    /// Minutes since the start of the run.
    pub elapsed_minutes: f64,
}

impl EpochLog {
    /// Flattens into `trn_*`, `val_*` and `elapsed_minutes` keys.
    #[must_use]
    pub fn to_flat(&self) -> BTreeMap<String, f64> {
        let mut flat = BTreeMap::new();
        self.train.flatten_into(Phase::Train, &mut flat);
        self.validation.flatten_into(Phase::Validation, &mut flat);
        flat.insert("elapsed_minutes".to_string(), self.elapsed_minutes);
        flat
    }

    /// Metrics of a phase.
    #[must_use]
    pub const fn phase(&self, phase: Phase) -> &PhaseSummary {
        match phase {
            Phase::Train => &self.train,
            Phase::Validation => &self.validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ordinal_types::LossKind;

    fn heads() -> Vec<HeadSpec> {
        vec![
            HeadSpec::new("grade", 5, LossKind::CrossEntropy).with_weight(0.25),
            HeadSpec::new("grade_coral", 5, LossKind::RankConsistent).with_weight(0.75),
        ]
    }

    #[test]
    fn running_mean_empty() {
        let mean = RunningMean::new();
        assert_eq!(mean.count(), 0);
        assert_relative_eq!(mean.value(), 0.0);
    }

    #[test]
    fn running_mean_ignores_empty_batch() {
        let mut mean = RunningMean::new();
        mean.update(2.0, 4);
        mean.update(100.0, 0);
        assert_relative_eq!(mean.value(), 2.0);
        assert_eq!(mean.count(), 4);
    }

    #[test]
    fn running_mean_matches_full_mean_for_any_split() {
        let values: Vec<f64> = (0..23).map(|i| f64::from(i).sin() * 3.0 + 1.0).collect();
        #[allow(clippy::cast_precision_loss)]
        let full = values.iter().sum::<f64>() / values.len() as f64;

        for batch_size in [1, 2, 5, 7, 23] {
            let mut mean = RunningMean::new();
            for chunk in values.chunks(batch_size) {
                #[allow(clippy::cast_precision_loss)]
                let chunk_mean = chunk.iter().sum::<f64>() / chunk.len() as f64;
                mean.update(chunk_mean, chunk.len());
            }
            assert_relative_eq!(mean.value(), full, epsilon = 1e-12);
            assert_eq!(mean.count(), values.len());
        }
    }

    #[test]
    fn phase_metrics_weighted_summary() {
        let heads = heads();
        let mut metrics = PhaseMetrics::new(&heads);
        metrics.update("grade", 1.0, 0.4, 2);
        metrics.update("grade", 2.0, 0.0, 2);
        metrics.update("grade_coral", 4.0, 1.0, 4);

        let summary = metrics.summary(&heads);
        assert_relative_eq!(summary.head_loss["grade"], 1.5);
        assert_relative_eq!(summary.head_error["grade"], 0.2);
        assert_relative_eq!(summary.loss, 0.25 * 1.5 + 0.75 * 4.0);
        assert_relative_eq!(summary.error, 0.25 * 0.2 + 0.75 * 1.0);
        assert_eq!(metrics.head("grade").map(|h| h.loss.count()), Some(4));
    }

    #[test]
    fn epoch_log_flat_keys() {
        let heads = heads();
        let mut metrics = PhaseMetrics::new(&heads);
        metrics.update("grade", 1.0, 0.5, 1);
        metrics.update("grade_coral", 2.0, 0.25, 1);

        let log = EpochLog {
            epoch: 0,
            learning_rate: 1e-3,
            train: metrics.summary(&heads),
            validation: metrics.summary(&heads),
            elapsed_minutes: 1.5,
        };
        let flat = log.to_flat();

        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "elapsed_minutes",
                "trn_error",
                "trn_error_grade",
                "trn_error_grade_coral",
                "trn_loss",
                "trn_loss_grade",
                "trn_loss_grade_coral",
                "val_error",
                "val_error_grade",
                "val_error_grade_coral",
                "val_loss",
                "val_loss_grade",
                "val_loss_grade_coral",
            ]
        );
        assert_relative_eq!(flat["val_loss_grade_coral"], 2.0);
        assert_relative_eq!(flat["elapsed_minutes"], 1.5);
    }

    #[test]
    fn phase_prefix() {
        assert_eq!(Phase::Train.to_string(), "trn");
        assert_eq!(Phase::Validation.prefix(), "val");
    }

    #[test]
    fn epoch_log_serialization() {
        let log = EpochLog {
            epoch: 2,
            learning_rate: 0.01,
            ..EpochLog::default()
        };
        let json = serde_json::to_string(&log).unwrap();
        let parsed: EpochLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, log);
    }
}
