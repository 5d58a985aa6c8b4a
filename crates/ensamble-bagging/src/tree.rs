use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    BaggingError,
    learner::{BaseLearner, LearnerFactory},
    split::{SplitCriterion, best_split},
};

/// Configuration for a single CART decision tree.
///
/// Used directly, or as the template [`LearnerFactory`] of an ensemble, in
/// which case `max_depth` and `seed` are overridden per estimator.
///
/// # Defaults
///
/// | Parameter           | Default             |
/// |---------------------|---------------------|
/// | `criterion`         | `Gini`              |
/// | `max_depth`         | `None` (unlimited)  |
/// | `min_samples_split` | 2                   |
/// | `min_samples_leaf`  | 1                   |
/// | `seed`              | 42                  |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `None` grows until leaves are pure or no split is possible.
    /// `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the random seed that orders the column scan.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the split limits without fitting anything.
    ///
    /// # Errors
    ///
    /// [`BaggingError::InvalidMaxDepth`], [`BaggingError::InvalidMinSamplesSplit`]
    /// or [`BaggingError::InvalidMinSamplesLeaf`].
    pub fn validate(&self) -> Result<(), BaggingError> {
        if self.max_depth == Some(0) {
            return Err(BaggingError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(BaggingError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(BaggingError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// `labels[sample_idx]` are class indices; the tree remembers which
    /// ones it saw and reports them through [`BaseLearner::classes`].
    ///
    /// # Errors
    ///
    /// | Variant                                     | When                                |
    /// |---------------------------------------------|-------------------------------------|
    /// | [`BaggingError::EmptyDataset`]              | `features` is empty                 |
    /// | [`BaggingError::LengthMismatch`]            | `features` and `labels` differ      |
    /// | [`BaggingError::ZeroFeatures`]              | rows have zero feature columns      |
    /// | [`BaggingError::FeatureCountMismatch`]      | rows have inconsistent lengths      |
    /// | [`BaggingError::NonFiniteValue`]            | any value is NaN or infinite        |
    /// | [`BaggingError::InvalidMaxDepth`]           | `max_depth` is `Some(0)`            |
    /// | [`BaggingError::InvalidMinSamplesSplit`]    | `min_samples_split` < 2             |
    /// | [`BaggingError::InvalidMinSamplesLeaf`]     | `min_samples_leaf` < 1              |
    #[instrument(level = "trace", skip_all, fields(n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<DecisionTree, BaggingError> {
        if features.is_empty() {
            return Err(BaggingError::EmptyDataset);
        }
        if features.len() != labels.len() {
            return Err(BaggingError::LengthMismatch {
                n_samples: features.len(),
                n_labels: labels.len(),
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
        self.validate()?;

        let mut classes = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let local: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or_default())
            .collect();

        let mut grower = Grower {
            config: self,
            columns: (0..n_features)
                .map(|c| features.iter().map(|row| row[c]).collect())
                .collect(),
            labels: &local,
            n_classes: classes.len(),
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            nodes: Vec::new(),
        };
        let rows: Vec<usize> = (0..features.len()).collect();
        grower.grow(&rows, 0);

        let tree = DecisionTree {
            nodes: grower.nodes,
            n_features,
            classes,
        };
        debug!(
            n_nodes = tree.nodes.len(),
            depth = tree.depth(),
            n_classes = tree.classes.len(),
            "decision tree built"
        );
        Ok(tree)
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LearnerFactory for DecisionTreeConfig {
    type Learner = DecisionTree;

    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        max_depth: Option<usize>,
        seed: u64,
    ) -> Result<DecisionTree, BaggingError> {
        self.clone()
            .with_max_depth(max_depth)
            .with_seed(seed)
            .fit(features, labels)
    }
}

/// Arena node. Children always sit at higher indices than their parent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Local position of the majority class.
        prediction: usize,
        /// Class shares over local positions.
        distribution: Vec<f64>,
    },
}

/// Recursive state for one `fit` call.
struct Grower<'a> {
    config: &'a DecisionTreeConfig,
    columns: Vec<Vec<f64>>,
    labels: &'a [usize],
    n_classes: usize,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
}

impl Grower<'_> {
    /// Grow the subtree for `rows` and return its arena index.
    fn grow(&mut self, rows: &[usize], depth: usize) -> usize {
        let mut counts = vec![0usize; self.n_classes];
        rows.iter().for_each(|&r| counts[self.labels[r]] += 1);

        let config = self.config;
        let stop = rows.len() < config.min_samples_split
            || counts.iter().filter(|&&c| c > 0).count() < 2
            || config.max_depth.is_some_and(|max| depth >= max);
        let split = if stop {
            None
        } else {
            best_split(
                &self.columns,
                self.labels,
                rows,
                self.n_classes,
                config.criterion,
                config.min_samples_leaf,
                &mut self.rng,
            )
        };

        let slot = self.nodes.len();
        let Some((feature, threshold)) = split else {
            self.nodes.push(leaf(&counts, rows.len()));
            return slot;
        };

        // Placeholder until both children exist.
        self.nodes.push(leaf(&counts, rows.len()));
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.columns[feature][r] <= threshold);
        let left = self.grow(&left_rows, depth + 1);
        let right = self.grow(&right_rows, depth + 1);
        self.nodes[slot] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        slot
    }
}

/// Leaf for the given class counts. The first maximum wins on equal counts.
fn leaf(counts: &[usize], total: usize) -> Node {
    let top = counts.iter().copied().max().unwrap_or(0);
    Node::Leaf {
        prediction: counts.iter().position(|&c| c == top).unwrap_or(0),
        distribution: counts.iter().map(|&c| c as f64 / total as f64).collect(),
    }
}

/// A fitted CART decision tree, stored as an index-linked node arena.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) classes: Vec<usize>,
}

impl DecisionTree {
    /// Longest root-to-leaf path. A single leaf has depth 0.
    fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((idx, d)) = queue.pop_front() {
            match self.nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    queue.push_back((*left, d + 1));
                    queue.push_back((*right, d + 1));
                }
                Some(Node::Leaf { .. }) => deepest = deepest.max(d),
                None => {}
            }
        }
        deepest
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

    /// Walk from the root to a leaf: left when `sample[feature] <= threshold`.
    ///
    /// Returns the leaf's `(prediction, distribution)`.
    fn walk(&self, sample: &[f64]) -> Result<(usize, &[f64]), BaggingError> {
        self.check_width(sample)?;
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    prediction,
                    distribution,
                } => return Ok((*prediction, distribution.as_slice())),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if sample[*feature] <= *threshold { *left } else { *right },
            }
        }
    }
}

impl BaseLearner for DecisionTree {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, sample: &[f64]) -> Result<usize, BaggingError> {
        let (prediction, _) = self.walk(sample)?;
        Ok(self.classes[prediction])
    }

    fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, BaggingError> {
        let (_, distribution) = self.walk(sample)?;
        Ok(distribution.to_vec())
    }

    fn check_integrity(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let n_nodes = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= self.n_features {
                        return Err(format!(
                            "node {idx} splits on column {feature} of {}",
                            self.n_features
                        ));
                    }
                    if [left, right].iter().any(|&&c| c <= idx || c >= n_nodes) {
                        return Err(format!("node {idx} has children {left} and {right}"));
                    }
                }
                Node::Leaf {
                    prediction,
                    distribution,
                } => {
                    if *prediction >= self.classes.len()
                        || distribution.len() != self.classes.len()
                    {
                        return Err(format!(
                            "leaf {idx} does not match the tree's {} classes",
                            self.classes.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
