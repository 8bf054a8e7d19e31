//! Dataset sample types.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ordinal_types::{HeadSpec, Partition};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Ground truth of one sample for one head.
///
/// `mean` and `sigma` carry a per-sample target distribution for the
/// noise-aware losses (for example an age estimated from several annotators).
/// Losses that need them fall back to `label` and the configured sigma when
/// they are absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadLabel {
    /// Nominal ordinal class.
    pub label: usize,

    /// Per-sample target mean.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f32>,

    /// Per-sample target standard deviation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f32>,
}

impl HeadLabel {
    /// Creates a label without a per-sample distribution.
    #[must_use]
    pub const fn new(label: usize) -> Self {
        Self {
            label,
            mean: None,
            sigma: None,
        }
    }

    /// Attaches a per-sample target mean and sigma.
    #[must_use]
    pub const fn with_distribution(mut self, mean: f32, sigma: f32) -> Self {
        self.mean = Some(mean);
        self.sigma = Some(sigma);
        self
    }
}

/// A single sample: a feature vector plus one label per head.
///
/// # Example
///
/// ```
/// use ordinal_dataset::{HeadLabel, OrdinalSample};
/// use ordinal_types::Partition;
///
/// let sample = OrdinalSample::new(42, vec![0.5; 8])
///     .with_label("grade", HeadLabel::new(3))
///     .with_partition(Partition::Validation);
///
/// assert_eq!(sample.id, 42);
/// assert_eq!(sample.label("grade").map(|l| l.label), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalSample {
    /// Sample ID.
    pub id: u64,

    /// Flat input features.
    pub features: Vec<f32>,

    /// Labels keyed by head tag.
    pub labels: BTreeMap<String, HeadLabel>,

    /// Partition the sample belongs to.
    #[serde(default = "default_partition")]
    pub partition: Partition,
}

const fn default_partition() -> Partition {
    Partition::Train
}

impl OrdinalSample {
    /// Creates a training sample without labels.
    #[must_use]
    pub const fn new(id: u64, features: Vec<f32>) -> Self {
        Self {
            id,
            features,
            labels: BTreeMap::new(),
            partition: Partition::Train,
        }
    }

    /// Adds or replaces the label of a head.
    #[must_use]
    pub fn with_label(mut self, tag: impl Into<String>, label: HeadLabel) -> Self {
        self.labels.insert(tag.into(), label);
        self
    }

    /// Sets the partition.
    #[must_use]
    pub const fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    /// Label of a head.
    #[must_use]
    pub fn label(&self, tag: &str) -> Option<&HeadLabel> {
        self.labels.get(tag)
    }

    /// Checks that the sample has an in-range label for every head, and that
    /// any per-sample distribution has a finite mean and a positive sigma.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingLabel`],
    /// [`DatasetError::LabelOutOfRange`] or [`DatasetError::Validation`] for
    /// the first offending head.
    pub fn check_labels(&self, heads: &[HeadSpec]) -> Result<()> {
        for head in heads {
            let label = self
                .label(&head.tag)
                .ok_or_else(|| DatasetError::missing_label(self.id, &head.tag))?;
            if label.label >= head.nr_classes {
                return Err(DatasetError::label_out_of_range(
                    self.id,
                    &head.tag,
                    label.label,
                    head.nr_classes,
                ));
            }
            if let Some(mean) = label.mean.filter(|m| !m.is_finite()) {
                return Err(DatasetError::validation(format!(
                    "sample {}: head '{}' mean must be finite, got {mean}",
                    self.id, head.tag
                )));
            }
            if let Some(sigma) = label.sigma.filter(|s| !(s.is_finite() && *s > 0.0)) {
                return Err(DatasetError::validation(format!(
                    "sample {}: head '{}' sigma must be positive and finite, got {sigma}",
                    self.id, head.tag
                )));
            }
        }
        Ok(())
    }
}

/// Reads samples from a JSON-lines file, one [`OrdinalSample`] per line.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line does not parse.
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<OrdinalSample>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| DatasetError::io(format!("{}: {e}", path.display())))?;

    let mut samples = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sample = serde_json::from_str(&line).map_err(|e| {
            DatasetError::serialization(format!("{}:{}: {e}", path.display(), line_no + 1))
        })?;
        samples.push(sample);
    }

    tracing::debug!(path = %path.display(), count = samples.len(), "loaded samples");
    Ok(samples)
}

/// Writes samples as JSON lines.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_samples(path: impl AsRef<Path>, samples: &[OrdinalSample]) -> Result<()> {
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    for sample in samples {
        serde_json::to_writer(&mut writer, sample)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordinal_types::LossKind;

    fn heads() -> Vec<HeadSpec> {
        vec![HeadSpec::new("grade", 4, LossKind::CrossEntropy)]
    }

    #[test]
    fn sample_builder() {
        let sample = OrdinalSample::new(1, vec![0.0; 3])
            .with_label("grade", HeadLabel::new(2).with_distribution(2.4, 0.8));

        let label = sample.label("grade").unwrap();
        assert_eq!(label.label, 2);
        assert_eq!(label.mean, Some(2.4));
        assert_eq!(sample.partition, Partition::Train);
    }

    #[test]
    fn check_labels_ok() {
        let sample = OrdinalSample::new(1, vec![]).with_label("grade", HeadLabel::new(3));
        assert!(sample.check_labels(&heads()).is_ok());
    }

    #[test]
    fn check_labels_out_of_range() {
        let sample = OrdinalSample::new(1, vec![]).with_label("grade", HeadLabel::new(4));
        assert!(matches!(
            sample.check_labels(&heads()),
            Err(DatasetError::LabelOutOfRange { label: 4, .. })
        ));
    }

    #[test]
    fn check_labels_rejects_zero_sigma() {
        let sample = OrdinalSample::new(1, vec![])
            .with_label("grade", HeadLabel::new(1).with_distribution(1.5, 0.0));
        assert!(matches!(
            sample.check_labels(&heads()),
            Err(DatasetError::Validation(_))
        ));

        let valid = OrdinalSample::new(2, vec![])
            .with_label("grade", HeadLabel::new(1).with_distribution(1.5, 0.5));
        assert!(valid.check_labels(&heads()).is_ok());
    }

    #[test]
    fn check_labels_missing() {
        let sample = OrdinalSample::new(1, vec![]);
        assert!(matches!(
            sample.check_labels(&heads()),
            Err(DatasetError::MissingLabel { .. })
        ));
    }

    #[test]
    fn sample_json_defaults() {
        let json = r#"{"id":5,"features":[1.0],"labels":{"grade":{"label":1}}}"#;
        let sample: OrdinalSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.partition, Partition::Train);
        assert_eq!(sample.label("grade"), Some(&HeadLabel::new(1)));
    }

    #[test]
    fn save_and_load_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.jsonl");
        let samples: Vec<_> = (0..3)
            .map(|i| {
                OrdinalSample::new(i, vec![0.25; 2])
                    .with_label("grade", HeadLabel::new(1))
                    .with_partition(Partition::Test)
            })
            .collect();

        save_samples(&path, &samples).unwrap();
        let loaded = load_samples(&path).unwrap();
        assert_eq!(loaded, samples);
    }

    #[test]
    fn load_samples_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"id\":1,\"features\":[],\"labels\":{}}\n\nnot json\n").unwrap();

        let err = load_samples(&path).unwrap_err();
        assert!(err.to_string().contains(":3:"));
    }
}
