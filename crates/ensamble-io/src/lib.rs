//! Dataset loading, prediction-input validation, and JSON reports for the
//! ensamble pipeline.

mod class_names;
mod dataset_reader;
mod error;
mod input;
mod report;

pub use class_names::{ClassNames, UNKNOWN_CLASS};
pub use dataset_reader::{DatasetReader, LabeledDataset};
pub use error::IoError;
pub use input::{DEFAULT_FEATURE_COUNT, FeatureVector};
pub use report::{Health, ModelInfo, Prediction, ResultWriter, TrainingSummary, to_json};
