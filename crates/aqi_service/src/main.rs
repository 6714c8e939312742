//! Smart AQI dashboard server

use std::path::PathBuf;

use anyhow::{Context, Result};
use aqi_service::{start_server, AppState, ServiceConfig};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "aqi-dashboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve the Smart AQI dashboard", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, default_value = "config/dashboard.toml")]
    config: PathBuf,

    /// Listen address, overrides the config file
    #[arg(long)]
    bind: Option<String>,

    /// Directory holding bundle.json and bundle.hash
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Historical dataset CSV
    #[arg(long)]
    dataset: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    info!("Starting Smart AQI dashboard v{}", aqi_service::VERSION);

    let mut config = ServiceConfig::load(Some(&cli.config))
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(dir) = cli.artifacts {
        config.artifact_dir = dir;
    }
    if let Some(path) = cli.dataset {
        config.dataset_path = path;
    }

    let bind = config.bind.clone();
    let state = AppState::load(config).map_err(|e| {
        error!("Cannot start without model artifacts: {e:#}");
        e
    })?;

    start_server(state, &bind).await?;
    info!("Dashboard stopped");
    Ok(())
}

fn init_logging() {
    let env = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(env)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
