//! CSV reader for labeled classification datasets.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;

/// A labeled dataset: row-major features plus one integer class code per row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    labels: Vec<u32>,
}

impl LabeledDataset {
    /// Return the feature column names from the header.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the row-major feature matrix.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the class code of every row.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Consume the dataset, returning `(features, labels)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Vec<u32>) {
        (self.features, self.labels)
    }
}

/// Reads a labeled dataset from a CSV file.
///
/// Expected CSV format:
/// - Header row required: `feature1,feature2,...,featureN,label`
/// - Every column but the last is a finite float feature
/// - The last column is a non-negative integer class code
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Header has fewer than two columns |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable |
/// | [`IoError::InvalidLabel`] | Label cell is not a non-negative integer |
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<LabeledDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that ragged rows surface as InconsistentRowLength
        // rather than a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");
        if expected_cols < 2 {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let n_features = expected_cols - 1;
        let feature_names: Vec<String> = header.iter().take(n_features).map(String::from).collect();

        let mut features = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut row = Vec::with_capacity(n_features);
            for (col_index, raw) in record.iter().take(n_features).enumerate() {
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        col_index,
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }

            let raw_label = record.get(n_features).unwrap_or("");
            let label = raw_label.parse::<u32>().map_err(|_| IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw_label.to_string(),
            })?;

            features.push(row);
            labels.push(label);
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_samples = features.len(),
            n_features,
            "labeled dataset loaded"
        );

        Ok(LabeledDataset {
            feature_names,
            features,
            labels,
        })
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
