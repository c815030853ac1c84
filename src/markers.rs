//! Flank marker pairs bounding the regions of interest
use serde::Deserialize;
use std::fmt;

/// Separator between the start and end marker in the fixed-format label
pub const LABEL_SEPARATOR: &str = "~~~";

/// One extraction rule: the content between `start` and the next `end`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkerPair {
    pub start: String,
    pub end: String,
}

impl MarkerPair {
    pub fn new<S: Into<String>, E: Into<String>>(start: S, end: E) -> Self {
        MarkerPair {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Canonical `start~~~end` label stored alongside every extracted sequence
    pub fn label(&self) -> String {
        format!("{}{}{}", self.start, LABEL_SEPARATOR, self.end)
    }
}

impl fmt::Display for MarkerPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ordered list of marker pairs, evaluated in order for every record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    pairs: Vec<MarkerPair>,
}

impl MarkerTable {
    pub fn new(pairs: Vec<MarkerPair>) -> Self {
        MarkerTable { pairs }
    }

    pub fn pairs(&self) -> &[MarkerPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for MarkerTable {
    /// The four reference marker pairs.
    /// Pair 4 shares its end marker with pair 1 and its start is a prefix of pair 1's start.
    fn default() -> Self {
        MarkerTable::new(vec![
            MarkerPair::new("ACGCT", "ACCGC"),
            MarkerPair::new("GG", "CTCGAA"),
            MarkerPair::new("CTTCTGGCAAAA", "CTCTTTGCAA"),
            MarkerPair::new("ACG", "ACCGC"),
        ])
    }
}
