//! File persistence for module and optimizer records.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{BinFileRecorder, FullPrecisionSettings, PrettyJsonFileRecorder, Record, Recorder};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Supported record file formats.
///
/// # Example
///
/// ```
/// use ordinal_models::RecordFormat;
///
/// let format = RecordFormat::from_extension("bin");
/// assert_eq!(format, Some(RecordFormat::Binary));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// Binary format.
    ///
    /// Uses Burn's `BinFileRecorder` with full precision.
    #[default]
    Binary,

    /// JSON format, for inspection.
    Json,
}

impl RecordFormat {
    /// Determines format from file extension.
    ///
    /// - `.bin`, `.burn` -> Binary
    /// - `.json` -> Json
    /// - Other -> None
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bin" | "burn" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determines format from file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the file extension written by this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Writes a record to `path`, replacing its extension with the format's.
///
/// Works for module records and optimizer records alike.
///
/// # Errors
///
/// Returns [`ModelError::SaveRecord`] if writing fails.
pub fn save_record<B, R>(record: R, path: &Path, format: RecordFormat) -> Result<PathBuf>
where
    B: Backend,
    R: Record<B>,
{
    let full_path = path.with_extension(format.extension());
    let result = match format {
        RecordFormat::Binary => Recorder::<B>::record(
            &BinFileRecorder::<FullPrecisionSettings>::new(),
            record,
            full_path.clone(),
        ),
        RecordFormat::Json => Recorder::<B>::record(
            &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(),
            record,
            full_path.clone(),
        ),
    };
    result.map_err(|e| ModelError::save_record(full_path.display().to_string(), e.to_string()))?;
    tracing::debug!(path = %full_path.display(), %format, "record saved");
    Ok(full_path)
}

/// Reads a record written by [`save_record`].
///
/// # Errors
///
/// Returns [`ModelError::RecordNotFound`] if the file does not exist,
/// [`ModelError::UnsupportedFormat`] for an unknown extension and
/// [`ModelError::LoadRecord`] if decoding fails.
pub fn load_record<B, R>(path: &Path, device: &B::Device) -> Result<R>
where
    B: Backend,
    R: Record<B>,
{
    if !path.exists() {
        return Err(ModelError::record_not_found(path.display().to_string()));
    }
    let format = RecordFormat::from_path(path)
        .ok_or_else(|| ModelError::unsupported_format(path.display().to_string()))?;

    let result = match format {
        RecordFormat::Binary => Recorder::<B>::load(
            &BinFileRecorder::<FullPrecisionSettings>::new(),
            path.to_path_buf(),
            device,
        ),
        RecordFormat::Json => Recorder::<B>::load(
            &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(),
            path.to_path_buf(),
            device,
        ),
    };
    result.map_err(|e| ModelError::load_record(path.display().to_string(), e.to_string()))
}

/// Saves the weights of a module.
///
/// # Errors
///
/// See [`save_record`].
pub fn save_module<B, M>(module: &M, path: &Path, format: RecordFormat) -> Result<PathBuf>
where
    B: Backend,
    M: Module<B>,
{
    save_record::<B, _>(module.clone().into_record(), path, format)
}

/// Loads weights into a module.
///
/// # Errors
///
/// See [`load_record`].
pub fn load_module<B, M>(module: M, path: &Path, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let record = load_record::<B, M::Record>(path, device)?;
    Ok(module.load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{MultiHeadClassifier, MultiHeadClassifierConfig};
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;
    use ordinal_types::{HeadSpec, LossKind};

    type TestBackend = NdArray<f32>;

    fn model(device: &<TestBackend as Backend>::Device) -> MultiHeadClassifier<TestBackend> {
        let heads = vec![HeadSpec::new("grade", 3, LossKind::CrossEntropy)];
        let config = MultiHeadClassifierConfig::new(2).with_hidden(4).with_heads(&heads);
        MultiHeadClassifier::new(&config, device).unwrap()
    }

    fn outputs(model: &MultiHeadClassifier<TestBackend>) -> Vec<f32> {
        let device = Default::default();
        let input = Tensor::<TestBackend, 2>::from_floats([[0.3, -1.2]], &device);
        model.forward_tensor(input)["grade"]
            .clone()
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(RecordFormat::from_extension("burn"), Some(RecordFormat::Binary));
        assert_eq!(RecordFormat::from_extension("JSON"), Some(RecordFormat::Json));
        assert_eq!(RecordFormat::from_extension("xml"), None);
        assert_eq!(RecordFormat::from_path(Path::new("model")), None);
    }

    #[test]
    fn format_display() {
        assert_eq!(format!("{}", RecordFormat::Binary), "binary");
        assert_eq!(RecordFormat::Json.extension(), "json");
    }

    #[test]
    fn module_round_trip() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let original = model(&device);

        for format in [RecordFormat::Binary, RecordFormat::Json] {
            let path = save_module(&original, &dir.path().join("model"), format).unwrap();
            assert_eq!(RecordFormat::from_path(&path), Some(format));

            let restored = load_module(model(&device), &path, &device).unwrap();
            assert_eq!(outputs(&restored), outputs(&original));
        }
    }

    #[test]
    fn load_missing_record() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let result = load_module(model(&device), &dir.path().join("missing.bin"), &device);
        assert!(matches!(result, Err(ModelError::RecordNotFound(_))));
    }

    #[test]
    fn load_corrupt_record() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"not a record").unwrap();

        let result = load_module(model(&device), &path, &device);
        assert!(matches!(result, Err(ModelError::LoadRecord { .. })));
    }
}
