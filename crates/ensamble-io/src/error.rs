//! I/O error types for ensamble-io.

use std::path::PathBuf;

/// Errors from dataset loading, prediction-input validation, and report output.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the header has no column besides the label column.
    #[error("no feature columns in {path}: need at least one feature and a label column")]
    NoFeatureColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error(
        "inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}"
    )]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a feature cell is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Zero-based feature column index.
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the label cell is not a non-negative integer class code.
    #[error("invalid class label in {path}: row {row_index}, raw value \"{raw}\"")]
    InvalidLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw label cell.
        raw: String,
    },

    /// Returned when a prediction input has the wrong number of values.
    #[error("expected exactly {expected} feature values, got {got}")]
    WrongFeatureCount {
        /// Feature count the model was trained on.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },

    /// Returned when a prediction input value does not parse as a finite float.
    #[error("feature {index} is not a finite number: \"{raw}\"")]
    NonFiniteFeature {
        /// Zero-based position in the input vector.
        index: usize,
        /// The raw value supplied.
        raw: String,
    },

    /// Returned when a prediction input value is below zero.
    #[error("feature {index} must be non-negative, got {value}")]
    NegativeFeature {
        /// Zero-based position in the input vector.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when a report cannot be encoded as JSON.
    #[error("cannot encode report as JSON")]
    EncodeJson {
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a report file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
