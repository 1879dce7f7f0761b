//! Offline training: raw sensor files to a saved model artifact.

use chrono::Utc;
use tracing::{info, warn};

use super::TrainingError;
use crate::acquisition::{load_profile, load_sensors};
use crate::baseline::RangeCalculator;
use crate::config::{DataConfig, ExplainConfig, ModelConfig};
use crate::model::{
    stratified_split, ArtifactMetadata, Classifier, ClassificationReport, ModelArtifact,
    SoftmaxClassifier, SoftmaxConfig,
};
use crate::processing::extract_features;
use crate::types::{valve_labels, ConditionCode, FeatureTable};

/// Features and valve-condition labels for every recorded cycle.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: FeatureTable,
    pub labels: Vec<ConditionCode>,
    /// Sensor channels that were found and contributed features.
    pub sensors: Vec<String>,
}

impl Dataset {
    pub fn new(
        features: FeatureTable,
        labels: Vec<ConditionCode>,
        sensors: Vec<String>,
    ) -> Result<Self, TrainingError> {
        if features.n_rows() != labels.len() {
            return Err(TrainingError::ProfileMismatch {
                cycles: features.n_rows(),
                profile: labels.len(),
            });
        }
        Ok(Self {
            features,
            labels,
            sensors,
        })
    }

    /// Load the profile and every available sensor file, then extract
    /// per-cycle features.
    pub fn load(data: &DataConfig) -> Result<Self, TrainingError> {
        let profile_path = data.profile_path();
        info!(path = %profile_path.display(), "Loading condition profile");
        let profile = load_profile(&profile_path)?;

        let channels = load_sensors(&data.dir, &data.sensors)?;
        let features = extract_features(&channels)?;
        let sensors = channels.iter().map(|c| c.id().to_string()).collect();

        Self::new(features, valve_labels(&profile), sensors)
    }
}

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    /// Metrics on the held-out split.
    pub report: ClassificationReport,
}

/// Fits the classifier, evaluates it, and derives normal ranges.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    model: ModelConfig,
    ranges: RangeCalculator,
}

impl TrainingPipeline {
    pub fn new(model: &ModelConfig, explain: &ExplainConfig) -> Result<Self, TrainingError> {
        let ranges = RangeCalculator::new(
            explain.nominal_code,
            explain.lower_percentile,
            explain.upper_percentile,
        )?;
        Ok(Self {
            model: model.clone(),
            ranges,
        })
    }

    pub fn run(&self, dataset: &Dataset) -> Result<TrainingOutcome, TrainingError> {
        let split = stratified_split(&dataset.labels, self.model.test_fraction, self.model.seed);
        info!(
            train = split.train.len(),
            test = split.test.len(),
            seed = self.model.seed,
            "Split dataset"
        );

        let train_x = dataset.features.select_rows(&split.train);
        let train_y: Vec<ConditionCode> = split.train.iter().map(|&i| dataset.labels[i]).collect();

        let softmax = SoftmaxConfig {
            epochs: self.model.epochs,
            learning_rate: self.model.learning_rate,
            l2: self.model.l2,
        };
        let classifier = SoftmaxClassifier::fit(&train_x, &train_y, &softmax)?;

        let test_y: Vec<ConditionCode> = split.test.iter().map(|&i| dataset.labels[i]).collect();
        let predicted = split
            .test
            .iter()
            .map(|&i| classifier.predict(&dataset.features.rows()[i]))
            .collect::<Result<Vec<_>, _>>()?;
        let report = ClassificationReport::compute(&test_y, &predicted);
        if split.test.is_empty() {
            warn!("Test split is empty; accuracy is not meaningful");
        } else {
            info!(accuracy = report.accuracy, "Evaluated on test split");
        }

        // Ranges come from every cycle, not just the training split
        let ranges = self.ranges.compute(&dataset.features, &dataset.labels)?;
        if ranges.is_empty() {
            warn!(nominal = %self.ranges.nominal(), "No nominal cycles; explanations will carry no ranges");
        }

        let metadata = ArtifactMetadata {
            trained_at: Utc::now(),
            sensors: dataset.sensors.clone(),
            train_samples: split.train.len(),
            test_samples: split.test.len(),
            test_accuracy: report.accuracy,
        };
        let artifact =
            ModelArtifact::new(metadata, dataset.features.schema(), classifier, ranges)?;

        Ok(TrainingOutcome { artifact, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated classes on two features, 10 cycles each.
    fn dataset() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            let jitter = f64::from(i) * 0.1;
            rows.push(vec![10.0 + jitter, 1.0 - jitter * 0.1]);
            labels.push(ConditionCode::OPTIMAL);
            rows.push(vec![2.0 + jitter, 5.0 + jitter]);
            labels.push(ConditionCode::NEAR_FAILURE);
        }
        let features =
            FeatureTable::from_parts(vec!["PS1_mean".into(), "VS1_mean".into()], rows).unwrap();
        Dataset::new(features, labels, vec!["PS1".into(), "VS1".into()]).unwrap()
    }

    fn pipeline() -> TrainingPipeline {
        TrainingPipeline::new(&ModelConfig::default(), &ExplainConfig::default()).unwrap()
    }

    #[test]
    fn test_run_produces_consistent_artifact() {
        let outcome = pipeline().run(&dataset()).unwrap();
        let artifact = &outcome.artifact;

        assert_eq!(artifact.schema.names(), ["PS1_mean", "VS1_mean"]);
        assert_eq!(artifact.metadata.train_samples + artifact.metadata.test_samples, 20);
        assert_eq!(artifact.metadata.test_samples, 4);
        assert_eq!(artifact.metadata.sensors, ["PS1", "VS1"]);
        assert_eq!(
            artifact.classifier.classes(),
            [ConditionCode::NEAR_FAILURE, ConditionCode::OPTIMAL]
        );
        assert!((outcome.report.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ranges_cover_nominal_cycles_only() {
        let outcome = pipeline().run(&dataset()).unwrap();
        let r = outcome.artifact.ranges.get("PS1_mean").unwrap();
        assert!(r.lower >= 10.0 && r.upper <= 10.9);
    }

    #[test]
    fn test_profile_mismatch_rejected() {
        let features = FeatureTable::from_parts(vec!["PS1_mean".into()], vec![vec![1.0]]).unwrap();
        let err = Dataset::new(features, vec![], vec![]).unwrap_err();
        assert!(matches!(err, TrainingError::ProfileMismatch { cycles: 1, profile: 0 }));
    }

    #[test]
    fn test_single_class_fails() {
        let features = FeatureTable::from_parts(
            vec!["PS1_mean".into()],
            vec![vec![1.0], vec![2.0], vec![3.0]],
        )
        .unwrap();
        let data = Dataset::new(features, vec![ConditionCode::OPTIMAL; 3], vec![]).unwrap();
        assert!(matches!(pipeline().run(&data), Err(TrainingError::Model(_))));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("PS1.txt"), "1\t2\t3\n4\t5\t6\n").unwrap();
        std::fs::write(dir.path().join("profile.txt"), "3\t100\t0\t130\t1\n3\t73\t0\t130\t0\n")
            .unwrap();
        let data = DataConfig {
            dir: dir.path().to_path_buf(),
            ..DataConfig::default()
        };

        let dataset = Dataset::load(&data).unwrap();
        assert_eq!(dataset.sensors, ["PS1"]);
        assert_eq!(dataset.features.n_rows(), 2);
        assert_eq!(dataset.features.n_cols(), 4);
        assert_eq!(dataset.labels, [ConditionCode::OPTIMAL, ConditionCode::NEAR_FAILURE]);
    }
}
