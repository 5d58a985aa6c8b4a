//! The base-learner capability the ensemble delegates to.
//!
//! The ensemble never inspects how a learner splits; it only fits one on a
//! row/column slice and asks it for labels or class probabilities. Labels
//! crossing this boundary are class indices into the ensemble's sorted
//! `classes` list.

use std::fmt;

use crate::error::BaggingError;

/// Fits base learners on a bootstrap slice.
pub trait LearnerFactory: Send + Sync {
    /// The fitted learner type.
    type Learner: BaseLearner + Clone + fmt::Debug;

    /// Fit a learner on row-major `features` with class-index `labels`.
    ///
    /// Must be deterministic for identical inputs and `seed`.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole ensemble fit.
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        max_depth: Option<usize>,
        seed: u64,
    ) -> Result<Self::Learner, BaggingError>;
}

/// A fitted base learner.
pub trait BaseLearner: Send + Sync {
    /// Class indices this learner knows, in the column order of
    /// [`BaseLearner::predict_proba`].
    ///
    /// May be a strict subset of the ensemble's classes when the bootstrap
    /// sample missed a class.
    fn classes(&self) -> &[usize];

    /// Width of the rows this learner was fitted on.
    fn n_features(&self) -> usize;

    /// Predict a class index for one row.
    ///
    /// # Errors
    ///
    /// Returns an error when the row has the wrong width.
    fn predict(&self, sample: &[f64]) -> Result<usize, BaggingError>;

    /// Class probabilities for one row, ordered like [`BaseLearner::classes`].
    ///
    /// # Errors
    ///
    /// Returns an error when the row has the wrong width.
    fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, BaggingError>;

    /// Check that a deserialized learner can predict without panicking.
    ///
    /// # Errors
    ///
    /// Describes the first inconsistency found.
    fn check_integrity(&self) -> Result<(), String> {
        Ok(())
    }
}
