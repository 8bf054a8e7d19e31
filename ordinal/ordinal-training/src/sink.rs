//! Destinations for per-epoch metrics.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Receives flattened epoch logs.
///
/// The trainer opens the sink once per run, logs every epoch (including
/// epochs replayed from a checkpoint) and closes it when the run ends.
pub trait MetricsSink {
    /// Starts a run.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Sink`] if the sink cannot be opened.
    fn open(&mut self, run_name: &str) -> Result<()>;

    /// Records the metrics of one epoch.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Sink`] if the entry cannot be written.
    fn log(&mut self, epoch: usize, metrics: &BTreeMap<String, f64>) -> Result<()>;

    /// Ends the run.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Sink`] if pending entries cannot be flushed.
    fn close(&mut self) -> Result<()>;
}

/// Emits each epoch as a `tracing` event.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    run_name: String,
}

impl TracingSink {
    /// Creates a sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            run_name: String::new(),
        }
    }
}

impl MetricsSink for TracingSink {
    fn open(&mut self, run_name: &str) -> Result<()> {
        self.run_name = run_name.to_string();
        tracing::info!(run = %self.run_name, "metrics run opened");
        Ok(())
    }

    fn log(&mut self, epoch: usize, metrics: &BTreeMap<String, f64>) -> Result<()> {
        let fields = metrics
            .iter()
            .map(|(key, value)| format!("{key}={value:.6}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(run = %self.run_name, epoch, "{fields}");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        tracing::info!(run = %self.run_name, "metrics run closed");
        Ok(())
    }
}

/// One line of a [`JsonLinesSink`] file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsEntry {
    /// Run name given to `open`.
    pub run: String,

    /// Epoch number.
    pub epoch: usize,

    /// Flattened metrics.
    pub metrics: BTreeMap<String, f64>,
}

/// Appends one JSON object per epoch to a file.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use ordinal_training::{JsonLinesSink, MetricsSink};
///
/// let dir = tempfile::tempdir().unwrap();
/// let mut sink = JsonLinesSink::new(dir.path().join("metrics.jsonl"));
/// sink.open("demo").unwrap();
/// sink.log(0, &BTreeMap::from([("val_error".to_string(), 0.5)])).unwrap();
/// sink.close().unwrap();
///
/// let entries = JsonLinesSink::read(dir.path().join("metrics.jsonl")).unwrap();
/// assert_eq!(entries[0].metrics["val_error"], 0.5);
/// ```
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    run_name: String,
    writer: Option<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Creates a sink writing to `path`. Nothing is opened until [`MetricsSink::open`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            run_name: String::new(),
            writer: None,
        }
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the entries of a file written by this sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not a valid entry.
    pub fn read(path: impl AsRef<Path>) -> Result<Vec<MetricsEntry>> {
        fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(TrainingError::from))
            .collect()
    }
}

impl MetricsSink for JsonLinesSink {
    fn open(&mut self, run_name: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TrainingError::sink(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TrainingError::sink(format!("{}: {e}", self.path.display())))?;
        self.writer = Some(BufWriter::new(file));
        self.run_name = run_name.to_string();
        Ok(())
    }

    fn log(&mut self, epoch: usize, metrics: &BTreeMap<String, f64>) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| TrainingError::sink("log before open"))?;
        let entry = MetricsEntry {
            run: self.run_name.clone(),
            epoch,
            metrics: metrics.clone(),
        };
        serde_json::to_writer(&mut *writer, &entry).map_err(|e| TrainingError::sink(e.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| TrainingError::sink(e.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| TrainingError::sink(e.to_string()))?;
        }
        Ok(())
    }
}

/// Keeps every entry in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    /// Run names passed to `open`, in order.
    pub runs: Vec<String>,

    /// Logged `(epoch, metrics)` pairs.
    pub entries: Vec<(usize, BTreeMap<String, f64>)>,

    /// Whether the current run is open.
    pub is_open: bool,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            runs: Vec::new(),
            entries: Vec::new(),
            is_open: false,
        }
    }

    /// Logged epochs, in order.
    #[must_use]
    pub fn epochs(&self) -> Vec<usize> {
        self.entries.iter().map(|(epoch, _)| *epoch).collect()
    }
}

impl MetricsSink for MemorySink {
    fn open(&mut self, run_name: &str) -> Result<()> {
        self.runs.push(run_name.to_string());
        self.is_open = true;
        Ok(())
    }

    fn log(&mut self, epoch: usize, metrics: &BTreeMap<String, f64>) -> Result<()> {
        if !self.is_open {
            return Err(TrainingError::sink("log before open"));
        }
        self.entries.push((epoch, metrics.clone()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.is_open = false;
        Ok(())
    }
}
