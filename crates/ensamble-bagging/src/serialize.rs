//! Model serialization and deserialization via bincode.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::ensemble::BaggingClassifier;
use crate::error::BaggingError;
use crate::learner::LearnerFactory;

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

/// Versioned envelope around the serialized ensemble.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope<M> {
    format_version: u32,
    n_estimators: usize,
    n_features: usize,
    n_classes: usize,
    model: M,
}

impl<L, F> BaggingClassifier<L, F>
where
    L: Serialize + DeserializeOwned,
    F: LearnerFactory + Serialize + DeserializeOwned,
    F::Learner: Serialize + DeserializeOwned,
{
    /// Save the fitted ensemble to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BaggingError::NotFitted`] | the ensemble has not been fitted |
    /// | [`BaggingError::SerializeModel`] | bincode encoding failed |
    /// | [`BaggingError::WriteModel`] | file write failed |
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BaggingError> {
        let path = path.as_ref();
        if !self.is_fitted() {
            return Err(BaggingError::NotFitted);
        }

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_estimators: self.members.len(),
            n_features: self.n_features,
            n_classes: self.classes.len(),
            model: self,
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| BaggingError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| BaggingError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_estimators = self.members.len(),
            "model saved"
        );
        Ok(())
    }

    /// Load an ensemble from a binary file written by [`Self::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`BaggingError::ReadModel`] | file read failed |
    /// | [`BaggingError::DeserializeModel`] | decoding failed or the model is inconsistent |
    /// | [`BaggingError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BaggingError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| BaggingError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        // The version is the leading field, so it can be checked before the
        // rest of the payload is trusted.
        let found: u32 =
            bincode::deserialize(&bytes).map_err(|e| BaggingError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;
        if found != FORMAT_VERSION {
            return Err(BaggingError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found,
                path: path.to_path_buf(),
            });
        }

        let envelope: ModelEnvelope<Self> =
            bincode::deserialize(&bytes).map_err(|e| BaggingError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        let model = envelope.model;
        let consistent = if model.n_features == envelope.n_features
            && model.classes.len() == envelope.n_classes
            && model.members.len() == envelope.n_estimators
        {
            model.check_integrity()
        } else {
            Err("header does not match the model body".to_string())
        };
        consistent.map_err(|reason| BaggingError::DeserializeModel {
            path: path.to_path_buf(),
            source: Box::new(bincode::ErrorKind::Custom(reason)),
        })?;

        debug!(
            n_estimators = envelope.n_estimators,
            n_features = envelope.n_features,
            n_classes = envelope.n_classes,
            "model loaded"
        );
        Ok(model)
    }
}
