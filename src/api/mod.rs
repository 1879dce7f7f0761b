//! REST API module using Axum
//!
//! Exposes the prediction service over HTTP:
//! - `POST /predict` - condition, remedy, confidence and explanations
//! - `GET /health` - whether a model is loaded

pub mod error;
pub mod handlers;

pub use error::{ApiError, MODEL_NOT_LOADED};
pub use handlers::{ApiState, HealthResponse};

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the CORS layer from configured origins. `"*"` allows any origin;
/// origins that fail to parse are skipped with a warning.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "CORS: ignoring unparseable origin");
                None
            }
        })
        .collect();
    tracing::info!(count = allowed.len(), "CORS: allowing configured origins");
    layer.allow_origin(allowed)
}

/// API routes with state attached.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Create the complete application router.
pub fn create_app(state: ApiState, cors_origins: &[String]) -> Router {
    api_routes(state)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
}
