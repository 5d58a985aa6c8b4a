//! Validation of a single prediction input vector.

use tracing::debug;

use crate::IoError;

/// Feature count of the bundled Iris model.
pub const DEFAULT_FEATURE_COUNT: usize = 4;

/// A validated prediction input: exactly the expected number of finite,
/// non-negative values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Validate already-parsed values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::WrongFeatureCount`] | `values.len() != expected` |
    /// | [`IoError::NonFiniteFeature`] | a value is NaN or infinite |
    /// | [`IoError::NegativeFeature`] | a value is below zero |
    pub fn new(values: Vec<f64>, expected: usize) -> Result<Self, IoError> {
        if values.len() != expected {
            return Err(IoError::WrongFeatureCount {
                expected,
                got: values.len(),
            });
        }
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(IoError::NonFiniteFeature {
                    index,
                    raw: value.to_string(),
                });
            }
            if value < 0.0 {
                return Err(IoError::NegativeFeature { index, value });
            }
        }
        Ok(Self(values))
    }

    /// Parse and validate a comma-separated list such as `5.1,3.5,1.4,0.2`.
    ///
    /// # Errors
    ///
    /// Same as [`FeatureVector::new`]. Blank or unparseable fields are
    /// reported as [`IoError::NonFiniteFeature`] at their position in `raw`;
    /// an entirely blank input is [`IoError::WrongFeatureCount`].
    pub fn parse(raw: &str, expected: usize) -> Result<Self, IoError> {
        if raw.trim().is_empty() {
            return Err(IoError::WrongFeatureCount { expected, got: 0 });
        }
        let values = raw
            .split(',')
            .map(str::trim)
            .enumerate()
            .map(|(index, s)| {
                s.parse::<f64>().map_err(|_| IoError::NonFiniteFeature {
                    index,
                    raw: s.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, IoError>>()?;
        debug!(n_values = values.len(), expected, "parsed prediction input");
        Self::new(values, expected)
    }

    /// Return the validated values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Consume the vector, returning the values.
    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}
