//! The bagging ensemble engine.
//!
//! Every estimator is trained on a bootstrap resample of the rows and a
//! random subset of the columns. All randomness of one `fit` call comes from
//! a single root generator consumed in estimator order, so a fixed seed
//! reproduces the same ensemble bit for bit. Prediction is a hard majority
//! vote; only rows whose vote ties fall back to the averaged class
//! probabilities.

use std::collections::HashSet;

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{BaggingConfig, OobMode};
use crate::distribution::{ClassDistribution, argmax};
use crate::error::BaggingError;
use crate::learner::{BaseLearner, LearnerFactory};
use crate::tree::DecisionTreeConfig;

/// One fitted estimator: a base learner and the columns it was trained on.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Member<B> {
    pub(crate) learner: B,
    pub(crate) feature_indices: Vec<usize>,
}

impl<B: BaseLearner> Member<B> {
    /// Borrow the fitted base learner.
    #[must_use]
    pub fn learner(&self) -> &B {
        &self.learner
    }

    /// Return the strictly increasing column indices this member sees.
    #[must_use]
    pub fn feature_indices(&self) -> &[usize] {
        &self.feature_indices
    }

    fn vote(&self, sample: &[f64], n_classes: usize) -> Result<usize, BaggingError> {
        let class_index = self.learner.predict(&project(sample, &self.feature_indices))?;
        if class_index >= n_classes {
            return Err(BaggingError::UnknownClassIndex {
                class_index,
                n_classes,
            });
        }
        Ok(class_index)
    }

    /// Add this member's class probabilities for `sample` into `acc`,
    /// reindexed from the learner's class order onto the ensemble's.
    fn add_proba(&self, sample: &[f64], acc: &mut [f64]) -> Result<(), BaggingError> {
        let proba = self
            .learner
            .predict_proba(&project(sample, &self.feature_indices))?;
        let n_classes = acc.len();
        for (&class_index, p) in self.learner.classes().iter().zip(proba) {
            let slot = acc.get_mut(class_index).ok_or(BaggingError::UnknownClassIndex {
                class_index,
                n_classes,
            })?;
            *slot += p;
        }
        Ok(())
    }
}

/// A bagging classifier over labels of type `L`.
///
/// Build one with [`BaggingConfig::build`], then call
/// [`BaggingClassifier::fit`]. `F` is the base-learner factory, the CART
/// [`DecisionTreeConfig`] by default.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(bound(
    serialize = "L: serde::Serialize, F: serde::Serialize, F::Learner: serde::Serialize",
    deserialize = "L: serde::de::DeserializeOwned, F: serde::de::DeserializeOwned, \
                   F::Learner: serde::de::DeserializeOwned"
))]
pub struct BaggingClassifier<L, F: LearnerFactory = DecisionTreeConfig> {
    pub(crate) config: BaggingConfig,
    pub(crate) factory: F,
    pub(crate) members: Vec<Member<F::Learner>>,
    pub(crate) classes: Vec<L>,
    pub(crate) n_features: usize,
    pub(crate) oob_score: Option<f64>,
}

impl<L, F: LearnerFactory> BaggingClassifier<L, F> {
    /// Create an unfitted ensemble.
    #[must_use]
    pub fn new(config: BaggingConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            members: Vec::new(),
            classes: Vec::new(),
            n_features: 0,
            oob_score: None,
        }
    }

    /// Return `true` once a `fit` call has succeeded.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.members.is_empty()
    }

    /// Return the hyperparameters.
    #[must_use]
    pub fn config(&self) -> &BaggingConfig {
        &self.config
    }

    /// Return the base-learner factory.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Return the configured number of estimators.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.config.n_estimators
    }

    /// Return the fitted members in training order. Empty before `fit`.
    #[must_use]
    pub fn members(&self) -> &[Member<F::Learner>] {
        &self.members
    }

    /// Return the sorted distinct training labels. Empty before `fit`.
    #[must_use]
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    /// Return the training feature count. Zero before `fit`.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the out-of-bag accuracy.
    ///
    /// `Ok(None)` when OOB scoring was disabled or no row was ever held out.
    ///
    /// # Errors
    ///
    /// Returns [`BaggingError::NotFitted`] before a successful `fit`.
    pub fn oob_score(&self) -> Result<Option<f64>, BaggingError> {
        self.check_fitted()?;
        Ok(self.oob_score)
    }

    fn check_fitted(&self) -> Result<(), BaggingError> {
        if self.members.is_empty() {
            return Err(BaggingError::NotFitted);
        }
        Ok(())
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), BaggingError> {
        if sample.len() != self.n_features {
            return Err(BaggingError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    /// Plurality vote for one row: `(winner, tied)`.
    ///
    /// On a tie `winner` is only a placeholder and must be resolved by the
    /// caller.
    fn hard_vote(&self, sample: &[f64]) -> Result<(usize, bool), BaggingError> {
        self.check_width(sample)?;
        let n_classes = self.n_classes();
        let mut counts = vec![0usize; n_classes];
        for member in &self.members {
            counts[member.vote(sample, n_classes)?] += 1;
        }
        let top = counts.iter().copied().max().unwrap_or(0);
        let winner = counts.iter().position(|&c| c == top).unwrap_or(0);
        let tied = counts.iter().filter(|&&c| c == top).count() > 1;
        Ok((winner, tied))
    }

    /// Unweighted mean of every member's class probabilities for one row.
    fn mean_proba(&self, sample: &[f64]) -> Result<ClassDistribution, BaggingError> {
        self.check_width(sample)?;
        let mut acc = vec![0.0f64; self.n_classes()];
        for member in &self.members {
            member.add_proba(sample, &mut acc)?;
        }
        let n = self.members.len() as f64;
        acc.iter_mut().for_each(|v| *v /= n);
        Ok(ClassDistribution::new(acc))
    }

    fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Check that every member only reads columns and reports classes the
    /// ensemble has, so a decoded model cannot panic at prediction time.
    pub(crate) fn check_integrity(&self) -> Result<(), String> {
        if !self.members.is_empty() && self.classes.is_empty() {
            return Err("fitted model has no classes".to_string());
        }
        for (i, member) in self.members.iter().enumerate() {
            let columns = &member.feature_indices;
            if !columns.windows(2).all(|w| w[0] < w[1]) {
                return Err(format!("member {i} columns are not strictly increasing"));
            }
            if let Some(&c) = columns.last().filter(|&&c| c >= self.n_features) {
                return Err(format!("member {i} reads column {c} of {}", self.n_features));
            }
            if member.learner.n_features() != columns.len() {
                return Err(format!(
                    "member {i} learner expects {} columns but is given {}",
                    member.learner.n_features(),
                    columns.len()
                ));
            }
            if let Some(c) = member.learner.classes().iter().find(|&&c| c >= self.n_classes()) {
                return Err(format!("member {i} knows class {c} of {}", self.n_classes()));
            }
            member
                .learner
                .check_integrity()
                .map_err(|reason| format!("member {i}: {reason}"))?;
        }
        Ok(())
    }
}

impl<L, F> BaggingClassifier<L, F>
where
    L: Ord + Clone + Send + Sync,
    F: LearnerFactory,
{
    /// Fit the ensemble on row-major `features` and their `labels`.
    ///
    /// Replaces any previous fitted state. On error the previous state is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                          |
    /// |------------------------------------------|-----------------------------------------------|
    /// | [`BaggingError::EmptyDataset`]           | `features` is empty                           |
    /// | [`BaggingError::LengthMismatch`]         | `features.len() != labels.len()`              |
    /// | [`BaggingError::ZeroFeatures`]           | rows have zero feature columns                |
    /// | [`BaggingError::FeatureCountMismatch`]   | rows have inconsistent lengths                |
    /// | [`BaggingError::NonFiniteValue`]         | any value is NaN or infinite                  |
    /// | [`BaggingError::InvalidMaxFeatures`]     | the `max_features` policy is invalid          |
    /// | [`BaggingError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                      |
    /// | any learner error                        | a base learner failed to fit or predict       |
    #[instrument(
        skip_all,
        fields(n_estimators = self.config.n_estimators, n_samples = features.len())
    )]
    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[L]) -> Result<&mut Self, BaggingError> {
        let n_features = validate_training_data(features, labels.len())?;
        if let Some(d) = self.config.max_depth
            && d == 0
        {
            return Err(BaggingError::InvalidMaxDepth { max_depth: 0 });
        }
        let features_per_estimator = self.config.max_features.resolve(n_features)?;

        let n_samples = features.len();
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        let encoded: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or_default())
            .collect();
        let n_classes = classes.len();

        info!(
            n_estimators = self.config.n_estimators,
            n_samples,
            n_features,
            n_classes,
            features_per_estimator,
            oob = self.config.oob_mode == OobMode::Enabled,
            "fitting bagging ensemble"
        );

        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut oob = (self.config.oob_mode == OobMode::Enabled)
            .then(|| OobAccumulator::new(n_samples, n_classes));
        let mut used_seeds = HashSet::with_capacity(self.config.n_estimators);
        let mut members = Vec::with_capacity(self.config.n_estimators);

        for estimator in 0..self.config.n_estimators {
            let (bootstrap_indices, oob_indices) = bootstrap_sample(n_samples, &mut rng);
            let feature_indices =
                draw_feature_subset(n_features, features_per_estimator, &mut rng);
            let seed = draw_sub_seed(&mut used_seeds, &mut rng);

            let boot_features: Vec<Vec<f64>> = bootstrap_indices
                .iter()
                .map(|&i| project(&features[i], &feature_indices))
                .collect();
            let boot_labels: Vec<usize> = bootstrap_indices.iter().map(|&i| encoded[i]).collect();

            let learner = self.factory.fit(
                &boot_features,
                &boot_labels,
                self.config.max_depth,
                seed,
            )?;
            let member = Member {
                learner,
                feature_indices,
            };

            if let Some(acc) = oob.as_mut() {
                for &row in &oob_indices {
                    acc.add(row, &features[row], &member)?;
                }
            }

            debug!(
                estimator,
                n_oob = oob_indices.len(),
                features = ?member.feature_indices,
                "estimator fitted"
            );
            members.push(member);
        }

        let oob_score = oob.and_then(|acc| acc.score(&encoded));

        self.members = members;
        self.classes = classes;
        self.n_features = n_features;
        self.oob_score = oob_score;

        info!(oob_score = ?self.oob_score, "bagging ensemble fitted");
        Ok(self)
    }

    /// Mean class probabilities for each row, aligned to [`Self::classes`].
    ///
    /// # Errors
    ///
    /// Returns [`BaggingError::NotFitted`] before `fit`, and
    /// [`BaggingError::PredictionFeatureMismatch`] for rows of the wrong width.
    pub fn predict_proba(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, BaggingError> {
        self.check_fitted()?;
        features
            .par_iter()
            .map(|sample| self.mean_proba(sample))
            .collect()
    }

    /// Predict a label for each row by majority vote.
    ///
    /// Rows where two or more labels share the top vote count are decided by
    /// the arg-max of the mean class probabilities instead. Probabilities are
    /// only computed for those rows.
    ///
    /// # Errors
    ///
    /// Returns [`BaggingError::NotFitted`] before `fit`, and
    /// [`BaggingError::PredictionFeatureMismatch`] for rows of the wrong width.
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<L>, BaggingError> {
        self.check_fitted()?;
        let votes: Vec<(usize, bool)> = features
            .par_iter()
            .map(|sample| self.hard_vote(sample))
            .collect::<Result<_, _>>()?;

        let tied_rows: Vec<usize> = votes
            .iter()
            .enumerate()
            .filter(|(_, (_, tied))| *tied)
            .map(|(row, _)| row)
            .collect();
        let mut winners: Vec<usize> = votes.iter().map(|&(winner, _)| winner).collect();

        if !tied_rows.is_empty() {
            let soft: Vec<usize> = tied_rows
                .par_iter()
                .map(|&row| self.mean_proba(&features[row]).map(|d| d.predicted_class()))
                .collect::<Result<_, _>>()?;
            for (&row, class) in tied_rows.iter().zip(soft) {
                winners[row] = class;
            }
            debug!(n_tied = tied_rows.len(), "ties resolved by mean probability");
        }

        Ok(winners
            .into_iter()
            .map(|class| self.classes[class].clone())
            .collect())
    }

    /// Predict the label of a single row.
    ///
    /// # Errors
    ///
    /// Same as [`Self::predict`].
    pub fn predict_one(&self, sample: &[f64]) -> Result<L, BaggingError> {
        self.check_fitted()?;
        let (winner, tied) = self.hard_vote(sample)?;
        let class = if tied {
            self.mean_proba(sample)?.predicted_class()
        } else {
            winner
        };
        Ok(self.classes[class].clone())
    }
}

/// Running OOB probability sums and contribution counts, indexed by row.
struct OobAccumulator {
    n_classes: usize,
    sums: Vec<f64>,
    counts: Vec<usize>,
}

impl OobAccumulator {
    fn new(n_samples: usize, n_classes: usize) -> Self {
        Self {
            n_classes,
            sums: vec![0.0; n_samples * n_classes],
            counts: vec![0; n_samples],
        }
    }

    fn add<B: BaseLearner>(
        &mut self,
        row: usize,
        sample: &[f64],
        member: &Member<B>,
    ) -> Result<(), BaggingError> {
        let start = row * self.n_classes;
        member.add_proba(sample, &mut self.sums[start..start + self.n_classes])?;
        self.counts[row] += 1;
        Ok(())
    }

    /// Accuracy of the mean-probability arg-max over rows held out at least
    /// once. `None` when no row was ever held out.
    fn score(&self, labels: &[usize]) -> Option<f64> {
        let mut n_rows = 0usize;
        let mut correct = 0usize;
        for (row, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let start = row * self.n_classes;
            let mean: Vec<f64> = self.sums[start..start + self.n_classes]
                .iter()
                .map(|s| s / count as f64)
                .collect();
            n_rows += 1;
            if argmax(&mean) == labels[row] {
                correct += 1;
            }
        }
        debug!(n_oob_rows = n_rows, "oob rows scored");
        (n_rows > 0).then(|| correct as f64 / n_rows as f64)
    }
}

/// Check shapes and values; return the feature count.
fn validate_training_data(features: &[Vec<f64>], n_labels: usize) -> Result<usize, BaggingError> {
    if features.is_empty() {
        return Err(BaggingError::EmptyDataset);
    }
    if features.len() != n_labels {
        return Err(BaggingError::LengthMismatch {
            n_samples: features.len(),
            n_labels,
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(BaggingError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(BaggingError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(BaggingError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Draw `n_samples` row indices with replacement; also return the rows never drawn.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut bootstrap_indices = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let idx = rng.gen_range(0..n_samples);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// Draw `k` distinct columns out of `n_features`, sorted ascending.
fn draw_feature_subset(n_features: usize, k: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut selected = index::sample(rng, n_features, k).into_vec();
    selected.sort_unstable();
    selected
}

/// Draw a learner seed not yet used in this fit.
fn draw_sub_seed(used: &mut HashSet<u64>, rng: &mut impl Rng) -> u64 {
    loop {
        let seed: u64 = rng.r#gen();
        if used.insert(seed) {
            return seed;
        }
    }
}

fn project(sample: &[f64], feature_indices: &[usize]) -> Vec<f64> {
    feature_indices.iter().map(|&f| sample[f]).collect()
}
