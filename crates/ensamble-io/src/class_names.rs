//! Mapping from integer class codes to human-readable names.

use std::collections::BTreeMap;

/// Name reported for a class code with no mapping.
pub const UNKNOWN_CLASS: &str = "unknown";

/// Class code to name lookup. Codes without a name map to [`UNKNOWN_CLASS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
    names: BTreeMap<u32, String>,
}

impl ClassNames {
    /// Assign `names[i]` to class code `i`.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let names = (0u32..).zip(names.into_iter().map(Into::into)).collect();
        Self { names }
    }

    /// Parse a comma-separated list such as `setosa,versicolor,virginica`.
    /// Blank entries leave their code unmapped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let names = (0u32..)
            .zip(raw.split(','))
            .map(|(code, name)| (code, name.trim()))
            .filter(|(_, name)| !name.is_empty())
            .map(|(code, name)| (code, name.to_string()))
            .collect();
        Self { names }
    }

    /// The three Iris species in class-code order.
    #[must_use]
    pub fn iris() -> Self {
        Self::new(["setosa", "versicolor", "virginica"])
    }

    /// Return the name for `code`, or [`UNKNOWN_CLASS`].
    #[must_use]
    pub fn name(&self, code: u32) -> &str {
        self.names.get(&code).map_or(UNKNOWN_CLASS, String::as_str)
    }

    /// Return the number of mapped codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return `true` when no code is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::iris()
    }
}
