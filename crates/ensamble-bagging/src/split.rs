use rand::Rng;
use rand::seq::SliceRandom;

/// Node impurity measure used to score candidate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// 1 - Σ p²
    Gini,
    /// -Σ p ln p
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node holding `counts` samples per class out of `total`.
    pub(crate) fn impurity(self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        let shares = counts.iter().filter(|&&c| c > 0).map(|&c| c as f64 / n);
        match self {
            SplitCriterion::Gini => 1.0 - shares.map(|p| p * p).sum::<f64>(),
            SplitCriterion::Entropy => -shares.map(|p| p * p.ln()).sum::<f64>(),
        }
    }
}

/// Best `(column, threshold)` for the rows in `rows`, or `None` when every
/// column is constant over them or `min_leaf` rules out every boundary.
///
/// `columns[c][row]` is column-major and `labels[row]` is a local class
/// position below `n_classes`. Columns are visited in an `rng`-shuffled
/// order and only a strictly better decrease replaces the incumbent, so the
/// seed breaks ties between equally good columns.
pub(crate) fn best_split(
    columns: &[Vec<f64>],
    labels: &[usize],
    rows: &[usize],
    n_classes: usize,
    criterion: SplitCriterion,
    min_leaf: usize,
    rng: &mut impl Rng,
) -> Option<(usize, f64)> {
    let total = rows.len();
    if total < 2 {
        return None;
    }

    let mut parent = vec![0usize; n_classes];
    rows.iter().for_each(|&r| parent[labels[r]] += 1);
    let parent_score = total as f64 * criterion.impurity(&parent, total);

    let mut order: Vec<usize> = (0..columns.len()).collect();
    order.shuffle(rng);

    let mut best: Option<(usize, f64)> = None;
    let mut best_gain = f64::NEG_INFINITY;
    for column in order {
        let values = &columns[column];
        let mut sorted = rows.to_vec();
        sorted.sort_unstable_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));

        let mut left = vec![0usize; n_classes];
        let mut right = parent.clone();
        for (n_left, pair) in (1..).zip(sorted.windows(2)) {
            let (here, next) = (pair[0], pair[1]);
            left[labels[here]] += 1;
            right[labels[here]] -= 1;

            let n_right = total - n_left;
            if values[here] == values[next] || n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let gain = parent_score
                - n_left as f64 * criterion.impurity(&left, n_left)
                - n_right as f64 * criterion.impurity(&right, n_right);
            if gain > best_gain {
                best_gain = gain;
                best = Some((column, (values[here] + values[next]) / 2.0));
            }
        }
    }
    best
}
