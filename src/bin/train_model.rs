//! Model Training
//!
//! Reads the recorded hydraulic test-rig cycles, trains the valve condition
//! classifier, prints a classification report for the held-out split, and
//! writes the model artifact the server loads at startup.
//!
//! Usage:
//!   cargo run --release --bin train-model
//!   cargo run --release --bin train-model -- --data-dir data/hydraulic --output model.json

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use valve_sentinel::config::ServiceConfig;
use valve_sentinel::model::save_to_disk;
use valve_sentinel::pipeline::{Dataset, TrainingPipeline};

#[derive(Parser, Debug)]
#[command(name = "train-model")]
#[command(about = "Train the hydraulic valve condition classifier")]
#[command(version)]
struct Args {
    /// Path to a TOML config file (overrides VALVE_CONFIG and ./valve_config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the sensor files and profile.txt
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Where to write the model artifact
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Seed for the train/test split
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::load(),
    };
    if let Some(dir) = args.data_dir {
        config.data.dir = dir;
    }
    if let Some(output) = args.output {
        config.model.artifact_path = output;
    }
    if let Some(seed) = args.seed {
        config.model.seed = seed;
    }

    info!(dir = %config.data.dir.display(), "Loading training data");
    let dataset = Dataset::load(&config.data).context("Failed to load training data")?;
    info!(
        cycles = dataset.features.n_rows(),
        features = dataset.features.n_cols(),
        "Feature extraction complete"
    );

    let pipeline = TrainingPipeline::new(&config.model, &config.explain)?;
    let outcome = pipeline.run(&dataset).context("Training failed")?;

    println!("{}", outcome.report);

    let path = &config.model.artifact_path;
    save_to_disk(&outcome.artifact, path)
        .with_context(|| format!("Failed to save model artifact to {}", path.display()))?;
    info!(
        path = %path.display(),
        ranges = outcome.artifact.ranges.len(),
        "✓ Model artifact saved"
    );

    Ok(())
}
