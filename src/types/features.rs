//! Feature tables, the canonical feature schema, and normal operating ranges

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Ordered list of feature names the classifier was trained on.
///
/// The order is significant: classifier weights are positional, so every
/// inference input is rearranged into this order before prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// First name that occurs more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.names
            .iter()
            .find(|n| !seen.insert(n.as_str()))
            .map(String::as_str)
    }
}

/// A row whose width differs from the table's column count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Feature row {row} has {found} values but the table has {expected} columns")]
pub struct RaggedRowError {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

/// Row-major table of derived features, one row per operating cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Build a table from column names and rows. Every row must have one
    /// value per column.
    pub fn from_parts(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, RaggedRowError> {
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != names.len()) {
            return Err(RaggedRowError {
                row,
                expected: names.len(),
                found: r.len(),
            });
        }
        Ok(Self { names, rows })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    /// Values of one column, in row order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |r| r[index])
    }

    /// Schema describing this table's column order.
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.names.clone())
    }

    /// Append the columns of `other` to the right of this table.
    ///
    /// Row counts must already match; the feature extractor checks this and
    /// reports the offending channel before calling here.
    pub(crate) fn hconcat(&mut self, other: Self) {
        if self.names.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }
        debug_assert_eq!(self.rows.len(), other.rows.len());
        self.names.extend(other.names);
        for (row, extra) in self.rows.iter_mut().zip(other.rows) {
            row.extend(extra);
        }
    }

    /// Copy of the table restricted to the given row indices.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Interval of values considered normal for one feature.
///
/// Deserialization goes through [`NormalRange::new`], so bounds read from a
/// file are ordered the same way as computed ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct NormalRange {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Deserialize)]
struct RangeBounds {
    lower: f64,
    upper: f64,
}

impl TryFrom<RangeBounds> for NormalRange {
    type Error = String;

    fn try_from(b: RangeBounds) -> Result<Self, Self::Error> {
        if !(b.lower.is_finite() && b.upper.is_finite()) {
            return Err(format!("range bounds must be finite (got {} - {})", b.lower, b.upper));
        }
        Ok(Self::new(b.lower, b.upper))
    }
}

impl NormalRange {
    /// Build a range, swapping the bounds if they arrive inverted so that
    /// `lower <= upper` always holds.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { lower: a, upper: b }
        } else {
            Self { lower: b, upper: a }
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Normal ranges keyed by feature name. Features without an entry have no
/// known range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable {
    ranges: BTreeMap<String, NormalRange>,
}

impl RangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: impl Into<String>, range: NormalRange) {
        self.ranges.insert(feature.into(), range);
    }

    pub fn get(&self, feature: &str) -> Option<&NormalRange> {
        self.ranges.get(feature)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NormalRange)> {
        self.ranges.iter()
    }
}

impl FromIterator<(String, NormalRange)> for RangeTable {
    fn from_iter<I: IntoIterator<Item = (String, NormalRange)>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}
