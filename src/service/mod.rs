//! Prediction service
//!
//! Orchestrates one diagnosis: validate the request, put the features into
//! the order the model was trained on, classify, attribute the decision to
//! features, and explain the most influential ones.
//!
//! The service owns only immutable state (model handles, schema, ranges) and
//! builds a fresh [`PredictionResponse`] for every request, so one instance
//! can be shared across concurrent handlers behind an `Arc`.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::explain::{explain_top, ExplanationEntry, DEFAULT_TOP_K};
use crate::model::{Attributor, Classifier, ModelArtifact, ModelError};
use crate::types::{describe, ConditionCode, FeatureSchema, RangeTable, Severity};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The model could not be loaded at startup.
    #[error("{0}")]
    Unavailable(String),

    /// The request payload is malformed or incomplete.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Something failed while classifying or attributing.
    #[error("Prediction failed: {0}")]
    Computation(String),
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        Self::Computation(e.to_string())
    }
}

/// Diagnosis returned for one prediction request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub remedy: Vec<String>,
    /// Probability of the predicted class, two decimals.
    pub confidence: String,
    pub prediction_code: ConditionCode,
    pub explanations: Vec<String>,
    #[serde(skip)]
    pub details: Vec<ExplanationEntry>,
}

/// Validated request features in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInput {
    values: Vec<f64>,
}

impl FeatureInput {
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    attributor: Arc<dyn Attributor>,
    schema: FeatureSchema,
    ranges: RangeTable,
    top_k: usize,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("classes", &self.classifier.classes())
            .field("features", &self.schema.len())
            .field("ranges", &self.ranges.len())
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl PredictionService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        attributor: Arc<dyn Attributor>,
        schema: FeatureSchema,
        ranges: RangeTable,
    ) -> Result<Self, ServiceError> {
        if let Some(name) = schema.first_duplicate() {
            return Err(ServiceError::Unavailable(format!(
                "Feature schema lists {name} more than once"
            )));
        }
        if schema.len() != classifier.n_features() {
            return Err(ServiceError::Unavailable(format!(
                "Feature schema has {} names but the classifier expects {}",
                schema.len(),
                classifier.n_features()
            )));
        }
        Ok(Self {
            classifier,
            attributor,
            schema,
            ranges,
            top_k: DEFAULT_TOP_K,
        })
    }

    /// Build a service around the reference model stored in an artifact.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ServiceError> {
        let model = Arc::new(artifact.classifier);
        Self::new(model.clone(), model, artifact.schema, artifact.ranges)
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn classes(&self) -> &[ConditionCode] {
        self.classifier.classes()
    }

    /// Validate a raw request body and arrange its features in schema order.
    ///
    /// Keys not in the schema are ignored.
    pub fn parse_request(&self, body: &Value) -> Result<FeatureInput, ServiceError> {
        let obj = body
            .as_object()
            .ok_or_else(|| ServiceError::Validation("request body must be a JSON object".into()))?;
        let features = obj
            .get("features")
            .ok_or_else(|| ServiceError::Validation("\"features\" key missing".into()))?
            .as_object()
            .ok_or_else(|| ServiceError::Validation("\"features\" must be an object".into()))?;

        let missing: Vec<&str> = self
            .schema
            .names()
            .iter()
            .filter(|n| !features.contains_key(n.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::Validation(format!(
                "missing features: {}",
                missing.join(", ")
            )));
        }

        let values = self
            .schema
            .names()
            .iter()
            .map(|name| {
                features[name.as_str()]
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        ServiceError::Validation(format!("feature {name} must be a finite number"))
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let extra = features.keys().filter(|k| !self.schema.contains(k)).count();
        if extra > 0 {
            debug!(extra, "Ignoring features not in the model schema");
        }

        Ok(FeatureInput { values })
    }

    /// Diagnose one validated input.
    pub fn predict(&self, input: &FeatureInput) -> Result<PredictionResponse, ServiceError> {
        let x = input.values();
        let code = self.classifier.predict(x)?;
        let probs = self.classifier.predict_proba(x)?;

        let class_index = self.classifier.class_index(code).ok_or_else(|| {
            ServiceError::Computation(format!("predicted class {code} is not among the model classes"))
        })?;
        let confidence = *probs.get(class_index).ok_or_else(|| {
            ServiceError::Computation(format!(
                "probability vector has {} entries, class index is {class_index}",
                probs.len()
            ))
        })?;

        let scores = self.attributor.attribute(x, class_index)?;
        if scores.len() != x.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.len(),
                got: scores.len(),
            }
            .into());
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ServiceError::Computation("attribution produced a non-finite score".into()));
        }

        let details = explain_top(self.schema.names(), x, &scores, &self.ranges, self.top_k);
        let descriptor = describe(code);

        Ok(PredictionResponse {
            label: descriptor.label.map(str::to_string),
            severity: descriptor.severity,
            remedy: descriptor.remedy.iter().map(|s| (*s).to_string()).collect(),
            confidence: format!("{confidence:.2}"),
            prediction_code: code,
            explanations: details.iter().map(|e| e.text.clone()).collect(),
            details,
        })
    }

    /// Validate and diagnose a raw request body. Computation failures are
    /// logged here; the caller only sees the error message.
    pub fn handle(&self, body: &Value) -> Result<PredictionResponse, ServiceError> {
        let input = self.parse_request(body)?;
        self.predict(&input).inspect_err(|e| {
            error!(error = %e, "Prediction error");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NormalRange;
    use serde_json::json;

    /// Classifier with canned output, for checking how the service reads it.
    struct FixedModel {
        classes: Vec<ConditionCode>,
        predicted: ConditionCode,
        probs: Vec<f64>,
        scores: Vec<f64>,
    }

    impl Classifier for FixedModel {
        fn classes(&self) -> &[ConditionCode] {
            &self.classes
        }
        fn n_features(&self) -> usize {
            self.scores.len()
        }
        fn predict(&self, _x: &[f64]) -> Result<ConditionCode, ModelError> {
            Ok(self.predicted)
        }
        fn predict_proba(&self, _x: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(self.probs.clone())
        }
    }

    impl Attributor for FixedModel {
        fn attribute(&self, _x: &[f64], class_index: usize) -> Result<Vec<f64>, ModelError> {
            // Scale by class so asking for the wrong class would be visible
            #[allow(clippy::cast_precision_loss)]
            let scale = (class_index + 1) as f64;
            Ok(self.scores.iter().map(|s| s * scale).collect())
        }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            ["PS1_mean", "PS1_std", "TS1_max", "VS1_min"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        )
    }

    fn service(model: FixedModel) -> PredictionService {
        let model = Arc::new(model);
        let mut ranges = RangeTable::new();
        ranges.insert("PS1_mean", NormalRange::new(10.0, 20.0));
        ranges.insert("TS1_max", NormalRange::new(30.0, 40.0));
        PredictionService::new(model.clone(), model, schema(), ranges).unwrap()
    }

    fn default_model() -> FixedModel {
        FixedModel {
            classes: vec![ConditionCode(73), ConditionCode(80), ConditionCode(90), ConditionCode(100)],
            predicted: ConditionCode(100),
            probs: vec![0.05, 0.5, 0.15, 0.3],
            scores: vec![0.2, -0.05, -0.9, 0.4],
        }
    }

    fn body() -> Value {
        json!({"features": {
            "VS1_min": 0.5,
            "TS1_max": 45.0,
            "PS1_std": 1.0,
            "PS1_mean": 15.0,
        }})
    }

    #[test]
    fn test_confidence_is_predicted_class_probability() {
        let resp = service(default_model()).handle(&body()).unwrap();
        assert_eq!(resp.prediction_code, ConditionCode(100));
        // Class 100 sits at index 3 with 0.30, not the 0.50 maximum
        assert_eq!(resp.confidence, "0.30");
        assert_eq!(resp.label.as_deref(), Some("Optimal"));
        assert_eq!(resp.severity, Some(Severity::Low));
        assert_eq!(resp.remedy, vec!["System is operating optimally.".to_string()]);
    }

    #[test]
    fn test_request_order_does_not_matter() {
        let resp = service(default_model()).handle(&body()).unwrap();
        let names: Vec<&str> = resp.details.iter().map(|d| d.feature.as_str()).collect();
        assert_eq!(names, ["TS1_max", "VS1_min", "PS1_mean"]);
        assert_eq!(resp.details[0].value, 45.0);
        assert!(resp.explanations[0].contains("unusually high"));
        assert!(resp.explanations[1].contains("significant factor"));
        assert!(resp.explanations[2].contains("within"));
    }

    #[test]
    fn test_attributions_requested_for_predicted_class() {
        let resp = service(default_model()).handle(&body()).unwrap();
        // FixedModel scales scores by (class_index + 1); class 100 is index 3
        assert!((resp.details[0].attribution - (-3.6)).abs() < 1e-12);
    }

    #[test]
    fn test_at_most_three_explanations() {
        let resp = service(default_model()).handle(&body()).unwrap();
        assert_eq!(resp.explanations.len(), 3);
    }

    #[test]
    fn test_fewer_features_than_three() {
        let model = Arc::new(FixedModel {
            classes: vec![ConditionCode(90), ConditionCode(100)],
            predicted: ConditionCode(90),
            probs: vec![0.8, 0.2],
            scores: vec![0.1, 0.2],
        });
        let schema = FeatureSchema::new(vec!["PS1_mean".into(), "PS1_max".into()]);
        let svc = PredictionService::new(model.clone(), model, schema, RangeTable::new()).unwrap();
        let resp = svc
            .handle(&json!({"features": {"PS1_mean": 1.0, "PS1_max": 2.0}}))
            .unwrap();
        assert_eq!(resp.explanations.len(), 2);
        assert!(resp.explanations[0].contains("Max of Ps1"));
        assert_eq!(resp.confidence, "0.80");
    }

    #[test]
    fn test_missing_features_key() {
        let err = service(default_model()).handle(&json!({"data": {}})).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(err.to_string().contains("\"features\" key missing"));
    }

    #[test]
    fn test_not_an_object() {
        let svc = service(default_model());
        assert!(matches!(svc.handle(&json!([1, 2])), Err(ServiceError::Validation(_))));
        assert!(matches!(
            svc.handle(&json!({"features": [1.0]})),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_feature_is_named() {
        let err = service(default_model())
            .handle(&json!({"features": {"PS1_mean": 1.0}}))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("PS1_std"));
        assert!(msg.contains("VS1_min"));
    }

    #[test]
    fn test_non_numeric_feature() {
        let mut b = body();
        b["features"]["PS1_std"] = json!("high");
        let err = service(default_model()).handle(&b).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_extra_features_ignored() {
        let mut b = body();
        b["features"]["XX9_mean"] = json!(1.0);
        assert!(service(default_model()).handle(&b).is_ok());
    }

    #[test]
    fn test_unknown_code_yields_empty_descriptor() {
        let mut model = default_model();
        model.classes.push(ConditionCode(42));
        model.probs.push(0.0);
        model.predicted = ConditionCode(42);
        let resp = service(model).handle(&body()).unwrap();
        assert!(resp.label.is_none());
        assert!(resp.severity.is_none());
        assert!(resp.remedy.is_empty());
        assert_eq!(resp.confidence, "0.00");

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("label").is_none());
        assert_eq!(json["prediction_code"], 42);
    }

    #[test]
    fn test_predicted_class_not_in_classes() {
        let mut model = default_model();
        model.predicted = ConditionCode(55);
        let err = service(model).handle(&body()).unwrap_err();
        assert!(matches!(err, ServiceError::Computation(_)));
    }

    #[test]
    fn test_duplicate_schema_names_rejected() {
        let model = Arc::new(default_model());
        let schema = FeatureSchema::new(
            ["PS1_mean", "PS1_std", "PS1_mean", "VS1_min"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        );
        let err = PredictionService::new(model.clone(), model, schema, RangeTable::new()).unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(err.to_string().contains("PS1_mean"));
    }

    #[test]
    fn test_extra_features_counted_by_name() {
        let mut b = body();
        b["features"]["XX9_mean"] = json!(1.0);
        b["features"]["XX9_std"] = json!(2.0);
        let svc = service(default_model());
        let input = svc.parse_request(&b).unwrap();
        assert_eq!(input.values(), [15.0, 1.0, 45.0, 0.5]);
    }

    #[test]
    fn test_schema_size_checked() {
        let model = Arc::new(default_model());
        let schema = FeatureSchema::new(vec!["PS1_mean".into()]);
        assert!(matches!(
            PredictionService::new(model.clone(), model, schema, RangeTable::new()),
            Err(ServiceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_response_serialization_shape() {
        let resp = service(default_model()).handle(&body()).unwrap();
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["label"], "Optimal");
        assert_eq!(json["severity"], "low");
        assert_eq!(json["confidence"], "0.30");
        assert_eq!(json["prediction_code"], 100);
        assert_eq!(json["explanations"].as_array().unwrap().len(), 3);
        assert!(json.get("details").is_none());
    }
}
