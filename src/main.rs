//! Valve Sentinel - hydraulic valve condition predictor
//!
//! Serves valve condition diagnoses with feature-level explanations over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Train a model from the data directory first
//! cargo run --release --bin train-model
//!
//! # Start the server
//! cargo run --release -- --addr 0.0.0.0:5000
//! ```
//!
//! # Environment Variables
//!
//! - `VALVE_CONFIG`: Path to a TOML config file (default: `./valve_config.toml`)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use valve_sentinel::api::{create_app, ApiState};
use valve_sentinel::config::ServiceConfig;
use valve_sentinel::model::load_from_disk;
use valve_sentinel::service::PredictionService;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "valve-sentinel")]
#[command(about = "Hydraulic valve condition prediction service")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides VALVE_CONFIG and ./valve_config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the server address (default: "127.0.0.1:5000")
    #[arg(short, long)]
    addr: Option<String>,

    /// Override the model artifact path
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,
}

/// Load the artifact and wrap it in a service. Failure here is not fatal:
/// the server still starts and `/predict` answers 503.
fn load_state(config: &ServiceConfig) -> ApiState {
    let path = &config.model.artifact_path;
    let loaded = load_from_disk(path)
        .map_err(|e| e.to_string())
        .and_then(|artifact| {
            PredictionService::from_artifact(artifact).map_err(|e| e.to_string())
        });

    match loaded {
        Ok(service) => {
            let service = service.with_top_k(config.explain.top_k);
            info!(
                path = %path.display(),
                features = service.schema().len(),
                classes = service.classes().len(),
                "✓ Model loaded"
            );
            ApiState::ready(service)
        }
        Err(reason) => {
            error!(path = %path.display(), error = %reason, "Failed to load model; /predict will return 503");
            ApiState::unavailable(reason)
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::load(),
    };
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(model) = args.model {
        config.model.artifact_path = model;
    }

    info!("  Valve Sentinel v{}", env!("CARGO_PKG_VERSION"));

    let state = load_state(&config);
    let app = create_app(state, &config.server.cors_origins);

    let server_addr = &config.server.addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("Failed to bind to {server_addr}"))?;
    info!("✓ HTTP server listening on {}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("🛑 Received Ctrl+C, initiating shutdown...");
        })
        .await
        .context("HTTP server error")?;

    info!("✓ Valve Sentinel shutdown complete");
    Ok(())
}
