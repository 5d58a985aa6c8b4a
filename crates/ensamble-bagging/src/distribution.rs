//! Averaged class probabilities returned by the ensemble.

/// Class probability distribution for one row, aligned to the ensemble's
/// sorted `classes`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the position of the most probable class.
    ///
    /// The first maximum wins when several classes share it.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        argmax(&self.probs)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

/// Index of the first maximum, `0` for an empty slice.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0usize;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{ClassDistribution, argmax};

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn predicted_class_is_most_probable() {
        let dist = ClassDistribution::new(vec![0.1, 0.6, 0.3]);
        assert_eq!(dist.predicted_class(), 1);
        assert_eq!(dist.as_slice(), &[0.1, 0.6, 0.3]);
    }
}
