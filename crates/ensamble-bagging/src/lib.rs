//! Bagging ensemble classification: fit, score out-of-bag, predict.
//!
//! Each estimator is fitted on a bootstrap resample of the rows restricted
//! to a random subset of the columns. Predictions are a hard majority vote;
//! rows whose vote ties fall back to the arg-max of the averaged class
//! probabilities. The default base learner is a hand-rolled CART decision
//! tree; any [`LearnerFactory`] can stand in for it.

mod config;
mod distribution;
mod ensemble;
mod error;
mod learner;
mod serialize;
mod split;
mod tree;

pub use config::{BaggingConfig, MaxFeatures, OobMode};
pub use distribution::ClassDistribution;
pub use ensemble::{BaggingClassifier, Member};
pub use error::BaggingError;
pub use learner::{BaseLearner, LearnerFactory};
pub use serialize::FORMAT_VERSION;
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
