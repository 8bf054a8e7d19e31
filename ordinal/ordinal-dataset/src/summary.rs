//! Label statistics.

use ordinal_types::{HeadSpec, Partition};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::sample::OrdinalSample;

/// Class frequencies of one head.
///
/// # Example
///
/// ```
/// use ordinal_dataset::{HeadLabel, LabelSummary, OrdinalSample};
/// use ordinal_types::{HeadSpec, LossKind};
///
/// let head = HeadSpec::new("grade", 3, LossKind::CrossEntropy);
/// let samples: Vec<_> = [0, 1, 1, 2]
///     .iter()
///     .enumerate()
///     .map(|(i, &y)| OrdinalSample::new(i as u64, vec![]).with_label("grade", HeadLabel::new(y)))
///     .collect();
///
/// let summary = LabelSummary::from_samples(&samples, &head).unwrap();
/// assert_eq!(summary.counts, vec![1, 2, 1]);
/// assert!((summary.mean_label() - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    /// Head tag.
    pub tag: String,

    /// Number of labelled samples.
    pub total: usize,

    /// Samples per class (index = class).
    pub counts: Vec<usize>,
}

impl LabelSummary {
    /// Counts the labels of a head over all samples.
    ///
    /// # Errors
    ///
    /// Returns an error if a sample lacks the head's label or has one
    /// outside `[0, nr_classes)`.
    pub fn from_samples<'a, I>(samples: I, head: &HeadSpec) -> Result<Self>
    where
        I: IntoIterator<Item = &'a OrdinalSample>,
    {
        let mut counts = vec![0usize; head.nr_classes];
        let mut total = 0;

        for sample in samples {
            let label = sample
                .label(&head.tag)
                .ok_or_else(|| DatasetError::missing_label(sample.id, &head.tag))?
                .label;
            let slot = counts.get_mut(label).ok_or_else(|| {
                DatasetError::label_out_of_range(sample.id, &head.tag, label, head.nr_classes)
            })?;
            *slot += 1;
            total += 1;
        }

        Ok(Self {
            tag: head.tag.clone(),
            total,
            counts,
        })
    }

    /// Counts the labels of a head within one partition.
    ///
    /// # Errors
    ///
    /// See [`LabelSummary::from_samples`].
    pub fn from_partition(
        samples: &[OrdinalSample],
        head: &HeadSpec,
        partition: Partition,
    ) -> Result<Self> {
        Self::from_samples(samples.iter().filter(|s| s.partition == partition), head)
    }

    /// Number of classes.
    #[must_use]
    pub fn nr_classes(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if no samples were counted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Relative frequency of each class.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn frequencies(&self) -> Vec<f32> {
        if self.total == 0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts
            .iter()
            .map(|&c| c as f32 / self.total as f32)
            .collect()
    }

    /// Mean class index.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_label(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: usize = self.counts.iter().enumerate().map(|(k, &c)| k * c).sum();
        sum as f32 / self.total as f32
    }

    /// Per-indicator weights for the extended binary loss.
    ///
    /// Indicator `k` (is the label above `k`?) gets
    /// `sqrt(N_{k+1}) / sum_{i=1}^{K-1} sqrt(N_i)`, so indicators whose upper
    /// class is rare contribute less. Returns `None` when classes `1..K`
    /// are all empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extended_binary_weights(&self) -> Option<Vec<f32>> {
        let roots: Vec<f32> = self
            .counts
            .iter()
            .skip(1)
            .map(|&c| (c as f32).sqrt())
            .collect();
        let norm: f32 = roots.iter().sum();
        if norm <= 0.0 {
            return None;
        }
        Some(roots.into_iter().map(|r| r / norm).collect())
    }

    /// Adds the counts of another summary of the same head.
    ///
    /// # Errors
    ///
    /// Returns an error if the tags or class counts differ.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        if self.tag != other.tag || self.counts.len() != other.counts.len() {
            return Err(DatasetError::validation(format!(
                "cannot merge summaries of '{}' ({} classes) and '{}' ({} classes)",
                self.tag,
                self.counts.len(),
                other.tag,
                other.counts.len()
            )));
        }
        Ok(Self {
            tag: self.tag.clone(),
            total: self.total + other.total,
            counts: self
                .counts
                .iter()
                .zip(&other.counts)
                .map(|(a, b)| a + b)
                .collect(),
        })
    }

    /// Returns a human-readable summary string.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn to_report(&self) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        let _ = writeln!(report, "Label Summary: {}", self.tag);
        let _ = writeln!(report, "===============");
        let _ = writeln!(report, "Total samples: {}", self.total);
        let _ = writeln!(report, "Mean label: {:.2}", self.mean_label());
        for (class, (count, freq)) in self.counts.iter().zip(self.frequencies()).enumerate() {
            let _ = writeln!(report, "  Class {class}: {count} ({:.1}%)", freq * 100.0);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::HeadLabel;
    use approx::assert_relative_eq;
    use ordinal_types::LossKind;

    fn head() -> HeadSpec {
        HeadSpec::new("grade", 4, LossKind::CrossEntropy)
    }

    fn samples(labels: &[usize]) -> Vec<OrdinalSample> {
        labels
            .iter()
            .zip(0u64..)
            .map(|(&y, id)| OrdinalSample::new(id, vec![]).with_label("grade", HeadLabel::new(y)))
            .collect()
    }

    #[test]
    fn summary_counts() {
        let summary = LabelSummary::from_samples(&samples(&[0, 0, 1, 3, 3, 3]), &head()).unwrap();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.counts, vec![2, 1, 0, 3]);
        assert_relative_eq!(summary.frequencies()[3], 0.5);
        assert_relative_eq!(summary.mean_label(), 11.0 / 6.0, epsilon = 1e-6);
    }

    #[test]
    fn summary_empty() {
        let summary = LabelSummary::from_samples(&samples(&[]), &head()).unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.frequencies(), vec![0.0; 4]);
        assert!(summary.extended_binary_weights().is_none());
    }

    #[test]
    fn summary_rejects_out_of_range() {
        let result = LabelSummary::from_samples(&samples(&[1, 4]), &head());
        assert!(matches!(result, Err(DatasetError::LabelOutOfRange { label: 4, .. })));
    }

    #[test]
    fn summary_by_partition() {
        let mut data = samples(&[0, 1, 2, 3]);
        data[3].partition = Partition::Test;
        let test = LabelSummary::from_partition(&data, &head(), Partition::Test).unwrap();
        assert_eq!(test.counts, vec![0, 0, 0, 1]);
    }

    #[test]
    fn extended_binary_weights_follow_sqrt_counts() {
        // N = [5, 1, 4, 9] -> roots of N_1..N_3 = [1, 2, 3]
        let labels: Vec<usize> = [(0, 5), (1, 1), (2, 4), (3, 9)]
            .iter()
            .flat_map(|&(y, n)| std::iter::repeat_n(y, n))
            .collect();
        let summary = LabelSummary::from_samples(&samples(&labels), &head()).unwrap();

        let weights = summary.extended_binary_weights().unwrap();
        assert_eq!(weights.len(), 3);
        assert_relative_eq!(weights[0], 1.0 / 6.0, epsilon = 1e-6);
        assert_relative_eq!(weights[1], 2.0 / 6.0, epsilon = 1e-6);
        assert_relative_eq!(weights[2], 3.0 / 6.0, epsilon = 1e-6);
    }

    #[test]
    fn summary_merge() {
        let a = LabelSummary::from_samples(&samples(&[0, 1]), &head()).unwrap();
        let b = LabelSummary::from_samples(&samples(&[1, 3]), &head()).unwrap();
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.total, 4);
        assert_eq!(merged.counts, vec![1, 2, 0, 1]);

        let other = LabelSummary::from_samples(
            std::iter::empty::<&OrdinalSample>(),
            &HeadSpec::new("age", 4, LossKind::CrossEntropy),
        )
        .unwrap();
        assert!(a.merge(&other).is_err());
    }

    #[test]
    fn summary_to_report() {
        let summary = LabelSummary::from_samples(&samples(&[0, 2]), &head()).unwrap();
        let report = summary.to_report();
        assert!(report.contains("Label Summary: grade"));
        assert!(report.contains("Class 2: 1 (50.0%)"));
    }

    #[test]
    fn summary_serialization() {
        let summary = LabelSummary::from_samples(&samples(&[1, 1, 2]), &head()).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: LabelSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }
}
