//! Multinomial logistic regression on standardized features.
//!
//! Trained by full-batch gradient descent with class-balanced sample weights
//! (`n / (k * n_c)`) and an L2 penalty. Weights start at zero, so training is
//! fully deterministic for a given dataset and config.
//!
//! Attributions are exact for the linear logit: with the training mean as the
//! background, feature `i` contributes `w[c][i] * z[i]` to class `c`, where
//! `z` is the standardized input. The contributions sum to the class logit
//! minus its bias.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{check_input, Attributor, Classifier, ModelError};
use crate::types::{ConditionCode, FeatureTable};

/// Floor under which a feature's spread is treated as zero.
const MIN_STD: f64 = 1e-12;

/// Training hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for SoftmaxConfig {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
            l2: 1e-4,
        }
    }
}

/// Per-feature z-score transform fitted on the training set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Standardizer {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let first = rows.first().ok_or(ModelError::EmptyTrainingSet)?;
        let d = first.len();
        #[allow(clippy::cast_precision_loss)]
        let n = rows.len() as f64;

        let mut mean = vec![0.0; d];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut std = vec![0.0; d];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in &mut std {
            *s = s.sqrt();
            if *s < MIN_STD {
                // Constant feature: centre it but leave the scale alone
                *s = 1.0;
            }
        }

        Ok(Self { mean, std })
    }

    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// Fitted softmax classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    classes: Vec<ConditionCode>,
    standardizer: Standardizer,
    /// Row-major `classes x features`.
    weights: Vec<f64>,
    bias: Vec<f64>,
}

impl SoftmaxClassifier {
    /// Fit on a feature table with one label per row.
    pub fn fit(
        features: &FeatureTable,
        labels: &[ConditionCode],
        config: &SoftmaxConfig,
    ) -> Result<Self, ModelError> {
        let rows = features.rows();
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(ModelError::LabelCountMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }

        let mut counts: BTreeMap<ConditionCode, usize> = BTreeMap::new();
        for &label in labels {
            *counts.entry(label).or_default() += 1;
        }
        if counts.len() < 2 {
            return Err(ModelError::TooFewClasses(counts.len()));
        }
        let classes: Vec<ConditionCode> = counts.keys().copied().collect();
        let k = classes.len();
        let d = features.n_cols();

        let standardizer = Standardizer::fit(rows)?;
        let z: Vec<Vec<f64>> = rows.iter().map(|r| standardizer.transform(r)).collect();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or_default())
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let n = rows.len() as f64;
        #[allow(clippy::cast_precision_loss)]
        let sample_weight: Vec<f64> = classes
            .iter()
            .map(|c| n / (k as f64 * counts[c] as f64))
            .collect();

        info!(
            samples = rows.len(),
            features = d,
            classes = k,
            epochs = config.epochs,
            "Training softmax classifier"
        );

        let mut weights = vec![0.0; k * d];
        let mut bias = vec![0.0; k];
        let mut grad_w = vec![0.0; k * d];
        let mut grad_b = vec![0.0; k];
        let mut logits = vec![0.0; k];

        for epoch in 0..config.epochs {
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            grad_b.iter_mut().for_each(|g| *g = 0.0);
            let mut loss = 0.0;

            for (zi, &target) in z.iter().zip(&targets) {
                linear(&weights, &bias, zi, &mut logits);
                let probs = softmax(&logits);
                let sw = sample_weight[target];
                loss -= sw * probs[target].max(f64::MIN_POSITIVE).ln();

                for c in 0..k {
                    let indicator = if c == target { 1.0 } else { 0.0 };
                    let g = sw * (probs[c] - indicator);
                    grad_b[c] += g;
                    for (gw, x) in grad_w[c * d..(c + 1) * d].iter_mut().zip(zi) {
                        *gw += g * x;
                    }
                }
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= config.learning_rate * (g / n + config.l2 * *w);
            }
            for (b, g) in bias.iter_mut().zip(&grad_b) {
                *b -= config.learning_rate * g / n;
            }

            if epoch % 100 == 0 {
                debug!(epoch, loss = loss / n, "Training progress");
            }
        }

        if weights.iter().chain(&bias).any(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteOutput);
        }

        Ok(Self {
            classes,
            standardizer,
            weights,
            bias,
        })
    }

    /// Check that the stored parameters are consistent with each other.
    ///
    /// A fitted model always passes; a hand-edited or truncated artifact may
    /// not, and would otherwise fail on the first prediction.
    pub fn check_shape(&self) -> Result<(), ModelError> {
        let malformed = |msg: String| Err(ModelError::Malformed(msg));
        let k = self.classes.len();
        let d = self.standardizer.mean.len();

        if k < 2 {
            return malformed(format!("need at least two classes, found {k}"));
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return malformed("classes must be unique and sorted".into());
        }
        if d == 0 {
            return malformed("no features".into());
        }
        if self.standardizer.std.len() != d {
            return malformed(format!(
                "standardizer has {d} means but {} deviations",
                self.standardizer.std.len()
            ));
        }
        if self.standardizer.std.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return malformed("standardizer deviations must be positive".into());
        }
        if self.weights.len() != k * d {
            return malformed(format!(
                "expected {} weights for {k} classes x {d} features, found {}",
                k * d,
                self.weights.len()
            ));
        }
        if self.bias.len() != k {
            return malformed(format!("expected {k} biases, found {}", self.bias.len()));
        }
        let mut params = self.standardizer.mean.iter().chain(&self.weights).chain(&self.bias);
        if params.any(|v| !v.is_finite()) {
            return malformed("parameters must be finite".into());
        }
        Ok(())
    }

    fn logits(&self, x: &[f64]) -> Result<(Vec<f64>, Vec<f64>), ModelError> {
        check_input(x, self.n_features())?;
        let z = self.standardizer.transform(x);
        let mut logits = vec![0.0; self.classes.len()];
        linear(&self.weights, &self.bias, &z, &mut logits);
        Ok((z, logits))
    }
}

impl Classifier for SoftmaxClassifier {
    fn classes(&self) -> &[ConditionCode] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.standardizer.mean.len()
    }

    fn predict(&self, x: &[f64]) -> Result<ConditionCode, ModelError> {
        let probs = self.predict_proba(x)?;
        let best = probs
            .iter()
            .enumerate()
            .fold(0, |best, (i, &p)| if p > probs[best] { i } else { best });
        Ok(self.classes[best])
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        let (_, logits) = self.logits(x)?;
        let probs = softmax(&logits);
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(probs)
    }
}

impl Attributor for SoftmaxClassifier {
    fn attribute(&self, x: &[f64], class_index: usize) -> Result<Vec<f64>, ModelError> {
        if class_index >= self.classes.len() {
            return Err(ModelError::ClassIndexOutOfRange {
                index: class_index,
                n_classes: self.classes.len(),
            });
        }
        let (z, _) = self.logits(x)?;
        let d = z.len();
        let row = &self.weights[class_index * d..(class_index + 1) * d];
        Ok(row.iter().zip(&z).map(|(w, zi)| w * zi).collect())
    }
}

fn linear(weights: &[f64], bias: &[f64], z: &[f64], out: &mut [f64]) {
    let d = z.len();
    for (c, o) in out.iter_mut().enumerate() {
        *o = bias[c]
            + weights[c * d..(c + 1) * d]
                .iter()
                .zip(z)
                .map(|(w, x)| w * x)
                .sum::<f64>();
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well separated clusters per class on the first feature, noise on
    /// the second.
    fn toy_dataset() -> (FeatureTable, Vec<ConditionCode>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let jitter = f64::from(i % 7) * 0.1;
            let (x0, label) = match i % 3 {
                0 => (10.0 + jitter, ConditionCode(100)),
                1 => (20.0 + jitter, ConditionCode(90)),
                _ => (30.0 + jitter, ConditionCode(73)),
            };
            rows.push(vec![x0, f64::from(i % 5)]);
            labels.push(label);
        }
        (
            FeatureTable::from_parts(vec!["PS1_mean".into(), "PS1_std".into()], rows).unwrap(),
            labels,
        )
    }

    fn fit_toy() -> SoftmaxClassifier {
        let (features, labels) = toy_dataset();
        let cfg = SoftmaxConfig {
            epochs: 2000,
            learning_rate: 0.5,
            l2: 0.0,
        };
        SoftmaxClassifier::fit(&features, &labels, &cfg).unwrap()
    }

    #[test]
    fn test_fit_separates_classes() {
        let model = fit_toy();

        assert_eq!(model.classes(), [ConditionCode(73), ConditionCode(90), ConditionCode(100)]);
        assert_eq!(model.predict(&[10.2, 1.0]).unwrap(), ConditionCode(100));
        assert_eq!(model.predict(&[20.1, 3.0]).unwrap(), ConditionCode(90));
        assert_eq!(model.predict(&[30.3, 2.0]).unwrap(), ConditionCode(73));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = fit_toy();
        let probs = model.predict_proba(&[15.0, 2.0]).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_attributions_sum_to_logit_minus_bias() {
        let model = fit_toy();
        let x = [25.0, 4.0];
        let (_, logits) = model.logits(&x).unwrap();

        for c in 0..model.classes().len() {
            let phi = model.attribute(&x, c).unwrap();
            let total: f64 = phi.iter().sum();
            assert!((total - (logits[c] - model.bias[c])).abs() < 1e-9);
        }
    }

    #[test]
    fn test_informative_feature_dominates_attribution() {
        let model = fit_toy();
        let x = [30.0, 2.0];
        let idx = model.class_index(model.predict(&x).unwrap()).unwrap();
        let phi = model.attribute(&x, idx).unwrap();
        assert!(phi[0].abs() > phi[1].abs());
    }

    #[test]
    fn test_training_is_deterministic() {
        let (features, labels) = toy_dataset();
        let cfg = SoftmaxConfig { epochs: 50, ..SoftmaxConfig::default() };
        let a = SoftmaxClassifier::fit(&features, &labels, &cfg).unwrap();
        let b = SoftmaxClassifier::fit(&features, &labels, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimension_and_class_checks() {
        let model = fit_toy();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            model.attribute(&[1.0, 2.0], 9),
            Err(ModelError::ClassIndexOutOfRange { index: 9, .. })
        ));
        assert!(matches!(
            model.predict(&[f64::NAN, 1.0]),
            Err(ModelError::NonFiniteInput(0))
        ));
    }

    #[test]
    fn test_fitted_model_passes_shape_check() {
        fit_toy().check_shape().unwrap();
    }

    #[test]
    fn test_shape_check_catches_truncated_parameters() {
        let mut short_weights = fit_toy();
        short_weights.weights.truncate(1);
        assert!(matches!(short_weights.check_shape(), Err(ModelError::Malformed(_))));

        let mut short_bias = fit_toy();
        short_bias.bias.pop();
        assert!(matches!(short_bias.check_shape(), Err(ModelError::Malformed(_))));

        let mut no_classes = fit_toy();
        no_classes.classes.clear();
        assert!(matches!(no_classes.check_shape(), Err(ModelError::Malformed(_))));

        let mut extra_class = fit_toy();
        extra_class.classes.push(ConditionCode(120));
        assert!(matches!(extra_class.check_shape(), Err(ModelError::Malformed(_))));

        let mut zero_std = fit_toy();
        zero_std.standardizer.std[0] = 0.0;
        assert!(matches!(zero_std.check_shape(), Err(ModelError::Malformed(_))));
    }

    #[test]
    fn test_single_class_rejected() {
        let features = FeatureTable::from_parts(vec!["a".into()], vec![vec![1.0], vec![2.0]]).unwrap();
        let labels = [ConditionCode(100), ConditionCode(100)];
        assert!(matches!(
            SoftmaxClassifier::fit(&features, &labels, &SoftmaxConfig::default()),
            Err(ModelError::TooFewClasses(1))
        ));
    }

    #[test]
    fn test_constant_feature_does_not_blow_up() {
        let rows = vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![8.0, 5.0], vec![9.0, 5.0]];
        let features = FeatureTable::from_parts(vec!["a".into(), "b".into()], rows).unwrap();
        let labels = [ConditionCode(100), ConditionCode(100), ConditionCode(80), ConditionCode(80)];
        let model = SoftmaxClassifier::fit(&features, &labels, &SoftmaxConfig::default()).unwrap();
        let phi = model.attribute(&[5.0, 5.0], 0).unwrap();
        assert_eq!(phi[1], 0.0);
    }
}
