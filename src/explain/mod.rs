//! Explanation pipeline
//!
//! Ranks per-feature attributions and renders the most influential features
//! as text, qualified by each feature's normal operating range.

mod templates;

pub use templates::{explain_feature, humanize_feature, RangeStatus};

use serde::Serialize;
use std::cmp::Ordering;

use crate::types::{NormalRange, RangeTable};

/// Number of explanations attached to a prediction by default.
pub const DEFAULT_TOP_K: usize = 3;

/// One rendered explanation for a single influential feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationEntry {
    pub feature: String,
    pub value: f64,
    pub attribution: f64,
    pub range: Option<NormalRange>,
    pub text: String,
}

/// Indices of the `k` features with the largest absolute attribution, most
/// influential first. Equal magnitudes are ordered by feature name so the
/// result does not depend on input order.
pub fn rank_attributions(names: &[String], scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..names.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .abs()
            .partial_cmp(&scores[a].abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| names[a].cmp(&names[b]))
    });
    order.truncate(k);
    order
}

/// Build explanations for the top `k` features.
///
/// `names`, `values` and `scores` are parallel slices in schema order.
pub fn explain_top(
    names: &[String],
    values: &[f64],
    scores: &[f64],
    ranges: &RangeTable,
    k: usize,
) -> Vec<ExplanationEntry> {
    rank_attributions(names, scores, k)
        .into_iter()
        .map(|i| {
            let feature = &names[i];
            let range = ranges.get(feature).copied();
            ExplanationEntry {
                feature: feature.clone(),
                value: values[i],
                attribution: scores[i],
                range,
                text: explain_feature(feature, values[i], range.as_ref()),
            }
        })
        .collect()
}
