//! Smart AQI trainer CLI
//!
//! Trains the AQI forecaster and writes `bundle.json` + `bundle.hash`.

use anyhow::{Context, Result};
use aqi_trainer::{train_bundle_from_csv, TrainingConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "aqi-train")]
#[command(author = "Smart AQI Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Random-forest trainer for the Smart AQI dashboard", long_about = None)]
struct Args {
    /// Historical dataset CSV (City, Date, pollutants..., AQI)
    #[arg(short, long, default_value = "data/air_quality_data.csv")]
    input: PathBuf,

    /// Output directory for the artifact bundle
    #[arg(short, long, default_value = "models")]
    output: PathBuf,

    /// Seed for the split, the search and every tree
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of configurations drawn by the randomized search
    #[arg(long, default_value = "10")]
    iterations: usize,

    /// Cross-validation folds
    #[arg(long, default_value = "3")]
    folds: usize,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// Cap the number of trees per forest (quick runs)
    #[arg(long)]
    max_trees: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Smart AQI Trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("Dataset: {}", args.input.display());

    let config = TrainingConfig {
        seed: args.seed,
        n_iter: args.iterations,
        cv: args.folds,
        test_size: args.test_size,
        max_trees: args.max_trees,
        ..TrainingConfig::default()
    };

    info!("Training configuration:");
    info!("  Seed: {}", config.seed);
    info!("  Search iterations: {}", config.n_iter);
    info!("  CV folds: {}", config.cv);
    info!("  Test size: {}", config.test_size);
    if let Some(cap) = config.max_trees {
        info!("  Tree cap: {}", cap);
    }

    let outcome = train_bundle_from_csv(&args.input, config).context("Training failed")?;
    let bundle = &outcome.bundle;

    info!("Best parameters:");
    for (name, value) in &bundle.training.hyperparameters {
        info!("  {}: {}", name, value);
    }
    info!("Model Performance:");
    info!("  RMSE: {:.2}", bundle.metrics.rmse);
    info!("  R2 Score: {:.3}", bundle.metrics.r2);

    let checksum = bundle
        .save(&args.output)
        .with_context(|| format!("Failed to write bundle to {}", args.output.display()))?;

    let report_path = args.output.join("search.json");
    let report = serde_json::to_string_pretty(&outcome.search).context("Failed to serialize search report")?;
    std::fs::write(&report_path, report)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    info!("✓ Training completed successfully");
    info!("  Bundle: {}", args.output.display());
    info!("  Checksum: {}", checksum);
    info!("  Search report: {}", report_path.display());

    Ok(())
}
