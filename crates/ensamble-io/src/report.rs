//! JSON reports for training, model inspection, and prediction.
//!
//! The report structs take primitives so this crate has no dependency on
//! `ensamble-bagging`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Summary printed after `train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Rows in the training dataset.
    pub n_samples: usize,
    /// Feature columns in the training dataset.
    pub n_features: usize,
    /// Distinct class codes seen.
    pub n_classes: usize,
    /// Fitted estimators.
    pub n_estimators: usize,
    /// Out-of-bag accuracy, when computed.
    pub oob_score: Option<f64>,
    /// Where the model file was written.
    pub model_path: String,
}

/// Model metadata printed by `info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Application name.
    pub app_name: String,
    /// Application version.
    pub version: String,
    /// Owning team identifier.
    pub team: String,
    /// Model family label.
    pub model: String,
    /// Number of estimators.
    pub n_estimators: usize,
    /// Per-estimator feature policy, e.g. `"sqrt"`.
    pub max_features: String,
    /// Depth limit passed to every estimator; `None` means unlimited.
    pub max_depth: Option<usize>,
    /// Split quality criterion of every estimator.
    pub criterion: String,
    /// Minimum rows a node needs before it may split.
    pub min_samples_split: usize,
    /// Minimum rows on each side of a split.
    pub min_samples_leaf: usize,
    /// Feature count the model expects.
    pub n_features: usize,
    /// Class codes the model can predict, sorted.
    pub classes: Vec<u32>,
    /// Out-of-bag accuracy, when computed.
    pub oob_score: Option<f64>,
}

/// Result printed by `predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class name, or `"unknown"`.
    pub prediction: String,
}

/// Liveness report printed by `health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Always `"ok"` when the model loaded.
    pub status: String,
}

impl Health {
    /// A healthy status.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Encode a report as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`IoError::EncodeJson`] if serialization fails.
pub fn to_json<T: Serialize>(report: &T) -> Result<String, IoError> {
    serde_json::to_string_pretty(report).map_err(|e| IoError::EncodeJson { source: e })
}

/// Writes reports as JSON files into one directory.
///
/// Creates the output directory on construction if it does not exist.
/// Files are named `{stem}.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Write `report` to `{stem}.json`, returning the path written.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::EncodeJson`] or [`IoError::WriteFile`].
    #[instrument(skip(self, report))]
    pub fn write<T: Serialize>(&self, stem: &str, report: &T) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join(format!("{stem}.json"));
        let json = to_json(report)?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "report written");
        Ok(path)
    }
}
