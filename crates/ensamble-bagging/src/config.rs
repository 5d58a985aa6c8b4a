//! Hyperparameter builder for the bagging ensemble.

use crate::ensemble::BaggingClassifier;
use crate::error::BaggingError;
use crate::learner::LearnerFactory;
use crate::tree::DecisionTreeConfig;

/// Policy for how many feature columns each estimator is trained on.
///
/// Resolved independently per estimator once the training feature count
/// `p` is known.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// `ceil(sqrt(p))` features.
    Sqrt,
    /// All `p` features (no column subsampling).
    All,
    /// `round(f * p)` features, at least one. `f` must be in (0.0, 1.0].
    Fraction(f64),
    /// `min(p, k)` features. `k` must be at least 1.
    Count(usize),
}

impl MaxFeatures {
    /// Resolve the policy to a concrete feature count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`BaggingError::InvalidMaxFeatures`] when `n_features` is zero,
    /// a fraction is outside (0.0, 1.0] or non-finite, or a count is zero.
    pub fn resolve(self, n_features: usize) -> Result<usize, BaggingError> {
        let invalid = |reason: String| BaggingError::InvalidMaxFeatures { n_features, reason };
        if n_features == 0 {
            return Err(invalid("no feature columns to select from".to_string()));
        }
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fraction(f) => {
                if !f.is_finite() || f <= 0.0 || f > 1.0 {
                    return Err(invalid(format!("fraction must be in (0.0, 1.0], got {f}")));
                }
                ((n_features as f64) * f).round().max(1.0) as usize
            }
            MaxFeatures::Count(k) => {
                if k == 0 {
                    return Err(invalid("count must be at least 1".to_string()));
                }
                k.min(n_features)
            }
        };
        Ok(resolved.clamp(1, n_features))
    }
}

/// Whether to compute the out-of-bag score during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OobMode {
    /// Accumulate OOB probabilities and compute the OOB accuracy.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Hyperparameters for a bagging ensemble.
///
/// Construct via [`BaggingConfig::new`], then chain `with_*` methods and
/// finish with [`BaggingConfig::build`].
///
/// # Defaults
///
/// | Parameter      | Default     |
/// |----------------|-------------|
/// | `max_features` | `Sqrt`      |
/// | `max_depth`    | `None`      |
/// | `oob_mode`     | `Disabled`  |
/// | `seed`         | `Some(42)`  |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BaggingConfig {
    pub(crate) n_estimators: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) oob_mode: OobMode,
    pub(crate) seed: Option<u64>,
}

impl BaggingConfig {
    /// Create a new config with the given number of estimators.
    ///
    /// # Errors
    ///
    /// Returns [`BaggingError::InvalidEstimatorCount`] if `n_estimators` is zero.
    pub fn new(n_estimators: usize) -> Result<Self, BaggingError> {
        if n_estimators == 0 {
            return Err(BaggingError::InvalidEstimatorCount { n_estimators });
        }
        Ok(Self {
            n_estimators,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            oob_mode: OobMode::Disabled,
            seed: Some(42),
        })
    }

    /// Set the per-estimator feature subset policy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum depth passed to every base learner. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Set the root random seed. `None` seeds from OS entropy on every fit.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of estimators.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the feature subset policy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the root random seed, if fixed.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Build an unfitted ensemble backed by the default CART learner.
    #[must_use]
    pub fn build<L>(&self) -> BaggingClassifier<L> {
        BaggingClassifier::new(self.clone(), DecisionTreeConfig::new())
    }

    /// Build an unfitted ensemble backed by a custom learner factory.
    #[must_use]
    pub fn build_with<L, F: LearnerFactory>(&self, factory: F) -> BaggingClassifier<L, F> {
        BaggingClassifier::new(self.clone(), factory)
    }
}

#[cfg(test)]
mod tests {
    use super::{BaggingConfig, MaxFeatures, OobMode};
    use crate::BaggingError;

    #[test]
    fn zero_estimators_rejected() {
        let err = BaggingConfig::new(0).unwrap_err();
        assert!(matches!(err, BaggingError::InvalidEstimatorCount { n_estimators: 0 }));
    }

    #[test]
    fn defaults() {
        let config = BaggingConfig::new(10).unwrap();
        assert_eq!(config.n_estimators(), 10);
        assert_eq!(config.max_features(), MaxFeatures::Sqrt);
        assert_eq!(config.max_depth(), None);
        assert_eq!(config.oob_mode(), OobMode::Disabled);
        assert_eq!(config.seed(), Some(42));
    }

    #[test]
    fn sqrt_rounds_up() {
        assert_eq!(MaxFeatures::Sqrt.resolve(4).unwrap(), 2);
        assert_eq!(MaxFeatures::Sqrt.resolve(5).unwrap(), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::Sqrt.resolve(10).unwrap(), 4);
    }

    #[test]
    fn all_uses_every_feature() {
        assert_eq!(MaxFeatures::All.resolve(7).unwrap(), 7);
    }

    #[test]
    fn fraction_rounds_with_floor_of_one() {
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(10).unwrap(), 5);
        assert_eq!(MaxFeatures::Fraction(0.26).resolve(10).unwrap(), 3);
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(4).unwrap(), 1);
        assert_eq!(MaxFeatures::Fraction(1.0).resolve(4).unwrap(), 4);
    }

    #[test]
    fn fraction_out_of_range_rejected() {
        for f in [0.0, -0.5, 1.5, f64::NAN] {
            let err = MaxFeatures::Fraction(f).resolve(4).unwrap_err();
            assert!(matches!(err, BaggingError::InvalidMaxFeatures { .. }), "f = {f}");
        }
    }

    #[test]
    fn count_is_capped_at_feature_count() {
        assert_eq!(MaxFeatures::Count(2).resolve(4).unwrap(), 2);
        assert_eq!(MaxFeatures::Count(9).resolve(4).unwrap(), 4);
    }

    #[test]
    fn zero_count_rejected() {
        assert!(MaxFeatures::Count(0).resolve(4).is_err());
    }

    #[test]
    fn zero_features_rejected() {
        assert!(MaxFeatures::All.resolve(0).is_err());
    }

    #[test]
    fn build_produces_unfitted_ensemble() {
        let ensemble = BaggingConfig::new(3).unwrap().build::<usize>();
        assert!(!ensemble.is_fitted());
        assert_eq!(ensemble.n_estimators(), 3);
    }
}
