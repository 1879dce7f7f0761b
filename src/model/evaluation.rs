//! Train/test splitting and classification metrics.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::ConditionCode;

/// Row indices assigned to each side of a split, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so each class keeps roughly the same share on both sides.
///
/// Within each class the rows are shuffled with a seeded RNG and
/// `round(n_c * test_fraction)` of them go to the test side, always leaving at
/// least one row of every class for training.
pub fn stratified_split(labels: &[ConditionCode], test_fraction: f64, seed: u64) -> SplitIndices {
    let mut by_class: BTreeMap<ConditionCode, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for indices in by_class.values_mut() {
        indices.shuffle(&mut rng);
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let n_test = ((indices.len() as f64 * fraction).round() as usize)
            .min(indices.len().saturating_sub(1));
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    SplitIndices { train, test }
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: ConditionCode,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class and overall metrics for a set of predictions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    pub total: usize,
}

impl ClassificationReport {
    /// Compare predictions against ground truth. Classes are the union of both
    /// sides, in ascending order.
    pub fn compute(truth: &[ConditionCode], predicted: &[ConditionCode]) -> Self {
        let total = truth.len().min(predicted.len());
        let pairs = || truth.iter().zip(predicted);

        let mut classes: Vec<ConditionCode> = pairs().flat_map(|(&t, &p)| [t, p]).collect();
        classes.sort_unstable();
        classes.dedup();

        #[allow(clippy::cast_precision_loss)]
        let ratio = |num: usize, den: usize| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };

        let per_class = classes
            .into_iter()
            .map(|class| {
                let tp = pairs().filter(|(&t, &p)| t == class && p == class).count();
                let predicted_n = pairs().filter(|(_, &p)| p == class).count();
                let support = pairs().filter(|(&t, _)| t == class).count();
                let precision = ratio(tp, predicted_n);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let correct = pairs().filter(|(t, p)| t == p).count();
        Self {
            accuracy: ratio(correct, total),
            per_class,
            total,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10} {:>10} {:>10} {:>10} {:>10}", "class", "precision", "recall", "f1-score", "support")?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>10} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.class.value(), m.precision, m.recall, m.f1, m.support
            )?;
        }
        write!(f, "{:>10} {:>32.2} {:>10}", "accuracy", self.accuracy, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(v: &[i64]) -> Vec<ConditionCode> {
        v.iter().copied().map(ConditionCode).collect()
    }

    #[test]
    fn test_split_is_stratified_and_disjoint() {
        let mut labels = codes(&[100; 50]);
        labels.extend(codes(&[73; 10]));

        let split = stratified_split(&labels, 0.2, 42);
        assert_eq!(split.train.len() + split.test.len(), labels.len());
        assert_eq!(split.test.iter().filter(|&&i| labels[i] == ConditionCode(100)).count(), 10);
        assert_eq!(split.test.iter().filter(|&&i| labels[i] == ConditionCode(73)).count(), 2);
        assert!(split.train.iter().all(|i| !split.test.contains(i)));
    }

    #[test]
    fn test_split_is_reproducible() {
        let labels = codes(&[100, 90, 80, 73, 100, 90, 80, 73, 100, 90]);
        assert_eq!(stratified_split(&labels, 0.3, 7), stratified_split(&labels, 0.3, 7));
    }

    #[test]
    fn test_split_keeps_one_training_row_per_class() {
        let labels = codes(&[100, 73]);
        let split = stratified_split(&labels, 0.9, 1);
        assert_eq!(split.train, vec![0, 1]);
        assert!(split.test.is_empty());
    }

    #[test]
    fn test_report_metrics() {
        let truth = codes(&[100, 100, 90, 90]);
        let pred = codes(&[100, 90, 90, 90]);
        let report = ClassificationReport::compute(&truth, &pred);

        assert!((report.accuracy - 0.75).abs() < 1e-12);
        let c90 = report.per_class.iter().find(|m| m.class == ConditionCode(90)).unwrap();
        assert!((c90.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((c90.recall - 1.0).abs() < 1e-12);
        assert_eq!(c90.support, 2);

        let text = report.to_string();
        assert!(text.contains("accuracy"));
        assert!(text.contains("100"));
    }
}
