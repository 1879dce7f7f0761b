//! API route handlers
//!
//! - `POST /predict` - diagnose one cycle's features
//! - `GET /health` - model availability

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use super::error::{ApiError, MODEL_NOT_LOADED};
use crate::service::{PredictionResponse, PredictionService};
use crate::types::ConditionCode;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers.
///
/// `service` is `None` when the model could not be loaded at startup; the
/// server keeps running and reports the reason on `/health`.
#[derive(Clone, Debug, Default)]
pub struct ApiState {
    pub service: Option<Arc<PredictionService>>,
    pub startup_error: Option<String>,
}

impl ApiState {
    pub fn ready(service: PredictionService) -> Self {
        Self {
            service: Some(Arc::new(service)),
            startup_error: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            service: None,
            startup_error: Some(reason.into()),
        }
    }
}

// ============================================================================
// Prediction
// ============================================================================

/// POST /predict
pub async fn predict(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Some(service) = state.service.as_ref() else {
        return Err(ApiError::service_unavailable(MODEL_NOT_LOADED));
    };

    let Json(body) = body.map_err(|rejection| {
        warn!(reason = %rejection.body_text(), "Rejected request body");
        ApiError::bad_request(format!("Invalid input: {}", rejection.body_text()))
    })?;

    Ok(Json(service.handle(&body)?))
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub feature_count: usize,
    pub classes: Vec<ConditionCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let resp = match state.service.as_ref() {
        Some(service) => HealthResponse {
            status: "ok",
            model_loaded: true,
            feature_count: service.schema().len(),
            classes: service.classes().to_vec(),
            error: None,
        },
        None => HealthResponse {
            status: "degraded",
            model_loaded: false,
            feature_count: 0,
            classes: Vec::new(),
            error: state.startup_error.clone(),
        },
    };
    Json(resp)
}
