use std::path::PathBuf;

/// Errors from bagging ensemble operations.
#[derive(Debug, thiserror::Error)]
pub enum BaggingError {
    /// Returned when n_estimators is zero.
    #[error("n_estimators must be at least 1, got {n_estimators}")]
    InvalidEstimatorCount {
        /// The invalid n_estimators value provided.
        n_estimators: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when the max_features policy cannot be resolved for the data.
    #[error("invalid max_features policy for {n_features} features: {reason}")]
    InvalidMaxFeatures {
        /// The number of features in the dataset.
        n_features: usize,
        /// What was wrong with the policy.
        reason: String,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the number of feature rows and labels differ.
    #[error("dataset has {n_samples} feature rows but {n_labels} labels")]
    LengthMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a base learner reports a class index the ensemble does not know.
    #[error("base learner reported class index {class_index}, but only {n_classes} classes exist")]
    UnknownClassIndex {
        /// The class index reported by the learner.
        class_index: usize,
        /// The number of classes seen during training.
        n_classes: usize,
    },

    /// Returned when prediction, OOB access, or saving is attempted before `fit`.
    #[error("ensemble is not fitted; call fit before using it")]
    NotFitted,

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}

impl BaggingError {
    /// Return `true` for errors caused by malformed data or hyperparameters.
    ///
    /// These are raised before any fitted state is touched.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            BaggingError::InvalidEstimatorCount { .. }
                | BaggingError::InvalidMaxDepth { .. }
                | BaggingError::InvalidMinSamplesSplit { .. }
                | BaggingError::InvalidMinSamplesLeaf { .. }
                | BaggingError::InvalidMaxFeatures { .. }
                | BaggingError::EmptyDataset
                | BaggingError::LengthMismatch { .. }
                | BaggingError::ZeroFeatures
                | BaggingError::FeatureCountMismatch { .. }
                | BaggingError::PredictionFeatureMismatch { .. }
                | BaggingError::NonFiniteValue { .. }
                | BaggingError::UnknownClassIndex { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::BaggingError;

    #[test]
    fn shape_errors_are_invalid_input() {
        assert!(BaggingError::EmptyDataset.is_invalid_input());
        assert!(
            BaggingError::LengthMismatch {
                n_samples: 3,
                n_labels: 2
            }
            .is_invalid_input()
        );
    }

    #[test]
    fn not_fitted_is_not_invalid_input() {
        assert!(!BaggingError::NotFitted.is_invalid_input());
    }

    #[test]
    fn length_mismatch_message() {
        let err = BaggingError::LengthMismatch {
            n_samples: 4,
            n_labels: 5,
        };
        assert_eq!(err.to_string(), "dataset has 4 feature rows but 5 labels");
    }
}
