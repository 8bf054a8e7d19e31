//! Checkpoint persistence.
//!
//! A checkpoint lives in one well-known directory under the output directory:
//!
//! ```text
//! <output>/checkpoint/
//!     model.bin
//!     best_model.bin
//!     optimizer.bin
//!     state.json
//! ```
//!
//! Writes go to `checkpoint.tmp/` first. The previous checkpoint is moved to
//! `checkpoint.old/`, the new one renamed into place and the old one removed,
//! so an interrupted save always leaves one complete checkpoint behind.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::Record;
use ordinal_models::{RecordFormat, load_module, load_record, save_module, save_record};
use serde::{Deserialize, Serialize};

use crate::config::CHECKPOINT_DIR;
use crate::error::{Result, TrainingError};
use crate::metrics::EpochLog;
use crate::scaler::LossScaler;

const MODEL_FILE: &str = "model";
const BEST_MODEL_FILE: &str = "best_model";
const OPTIMIZER_FILE: &str = "optimizer";
const STATE_FILE: &str = "state.json";

/// Scalar state of a run stored next to the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Last completed epoch.
    pub epoch: usize,

    /// Epoch of the best validation error.
    pub best_epoch: usize,

    /// Best validation error; `None` until the first validation.
    pub min_val_error: Option<f64>,

    /// Every epoch log so far.
    pub log_history: Vec<EpochLog>,

    /// Loss scaler state.
    pub scaler: LossScaler,
}

/// A restored checkpoint.
#[derive(Debug)]
pub struct Checkpoint<M, R> {
    /// Scalar run state.
    pub state: CheckpointState,

    /// Model at the end of the checkpointed epoch.
    pub model: M,

    /// Model with the best validation error so far.
    pub best_model: M,

    /// Optimizer record.
    pub optimizer: R,
}

/// Path of the current checkpoint under an output directory.
#[must_use]
pub fn checkpoint_path(output_dir: &Path) -> PathBuf {
    output_dir.join(CHECKPOINT_DIR)
}

fn sibling(output_dir: &Path, suffix: &str) -> PathBuf {
    output_dir.join(format!("{CHECKPOINT_DIR}.{suffix}"))
}

/// Writes a checkpoint and swaps it into place.
///
/// Returns the checkpoint directory.
///
/// # Errors
///
/// Returns [`TrainingError::Checkpoint`] if a record cannot be saved and
/// [`TrainingError::Io`] if a file operation fails.
pub fn save_checkpoint<B, M, R>(
    output_dir: &Path,
    state: &CheckpointState,
    model: &M,
    best_model: &M,
    optimizer: R,
) -> Result<PathBuf>
where
    B: Backend,
    M: Module<B>,
    R: Record<B>,
{
    let tmp = sibling(output_dir, "tmp");
    if tmp.exists() {
        fs::remove_dir_all(&tmp)?;
    }
    fs::create_dir_all(&tmp)?;

    save_module::<B, M>(model, &tmp.join(MODEL_FILE), RecordFormat::Binary)
        .map_err(|e| TrainingError::checkpoint(e.to_string()))?;
    save_module::<B, M>(best_model, &tmp.join(BEST_MODEL_FILE), RecordFormat::Binary)
        .map_err(|e| TrainingError::checkpoint(e.to_string()))?;
    save_record::<B, R>(optimizer, &tmp.join(OPTIMIZER_FILE), RecordFormat::Binary)
        .map_err(|e| TrainingError::checkpoint(e.to_string()))?;

    let writer = BufWriter::new(fs::File::create(tmp.join(STATE_FILE))?);
    serde_json::to_writer_pretty(writer, state)?;

    let current = checkpoint_path(output_dir);
    let old = sibling(output_dir, "old");
    if old.exists() {
        fs::remove_dir_all(&old)?;
    }
    if current.exists() {
        fs::rename(&current, &old)?;
    }
    fs::rename(&tmp, &current)?;
    if old.exists() {
        fs::remove_dir_all(&old)?;
    }

    tracing::debug!(epoch = state.epoch, path = %current.display(), "checkpoint written");
    Ok(current)
}

/// Finds the directory to restore from.
///
/// Prefers `checkpoint/`, then a leftover `checkpoint.old/` from an
/// interrupted save.
#[must_use]
pub fn find_checkpoint(output_dir: &Path) -> Option<PathBuf> {
    [checkpoint_path(output_dir), sibling(output_dir, "old")]
        .into_iter()
        .find(|dir| dir.join(STATE_FILE).is_file())
}

/// Reads the scalar state of a checkpoint directory.
///
/// # Errors
///
/// Returns an error if the file is missing or not valid JSON.
pub fn load_state(dir: &Path) -> Result<CheckpointState> {
    let reader = BufReader::new(fs::File::open(dir.join(STATE_FILE))?);
    Ok(serde_json::from_reader(reader)?)
}

/// Restores the checkpoint under `output_dir`, if any.
///
/// `template` supplies the module structure the records are loaded into.
///
/// # Errors
///
/// Returns an error if a checkpoint exists but cannot be read.
pub fn load_checkpoint<B, M, R>(
    output_dir: &Path,
    template: M,
    device: &B::Device,
) -> Result<Option<Checkpoint<M, R>>>
where
    B: Backend,
    M: Module<B>,
    R: Record<B>,
{
    let Some(dir) = find_checkpoint(output_dir) else {
        return Ok(None);
    };

    let state = load_state(&dir)?;
    let record_path = |name: &str| dir.join(name).with_extension(RecordFormat::Binary.extension());

    let model = load_module::<B, M>(template.clone(), &record_path(MODEL_FILE), device)
        .map_err(|e| TrainingError::checkpoint(e.to_string()))?;
    let best_model = load_module::<B, M>(template, &record_path(BEST_MODEL_FILE), device)
        .map_err(|e| TrainingError::checkpoint(e.to_string()))?;
    let optimizer = load_record::<B, R>(&record_path(OPTIMIZER_FILE), device)
        .map_err(|e| TrainingError::checkpoint(e.to_string()))?;

    tracing::info!(epoch = state.epoch, path = %dir.display(), "checkpoint loaded");
    Ok(Some(Checkpoint {
        state,
        model,
        best_model,
        optimizer,
    }))
}
