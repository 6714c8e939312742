use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use aqi_core::{AnalyticsReport, ArtifactBundle, ArtifactError, HistoricalData};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::live::{LiveAqiSource, NoLiveData, OpenWeatherClient};

/// Read-only state shared by all request handlers
pub struct AppState {
    pub config: ServiceConfig,
    pub bundle: Arc<ArtifactBundle>,
    pub checksum: String,
    pub data: Arc<HistoricalData>,
    pub live: Arc<dyn LiveAqiSource>,
    /// Computed once at startup
    pub analytics: Arc<AnalyticsReport>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Fails when the dataset lacks a feature column the model needs
    pub fn new(
        config: ServiceConfig,
        bundle: ArtifactBundle,
        checksum: String,
        data: HistoricalData,
        live: Arc<dyn LiveAqiSource>,
    ) -> Result<Self, ArtifactError> {
        bundle.check_dataset(&data)?;
        warn_on_city_mismatch(&bundle, &data);
        let analytics = AnalyticsReport::build(&bundle, &data);
        Ok(Self {
            config,
            bundle: Arc::new(bundle),
            checksum,
            data: Arc::new(data),
            live,
            analytics: Arc::new(analytics),
        })
    }

    /// Load artifacts and the dataset named by `config`.
    ///
    /// A missing or corrupt bundle is fatal.
    pub fn load(config: ServiceConfig) -> Result<Self> {
        let (bundle, checksum) = ArtifactBundle::load(&config.artifact_dir).with_context(|| {
            format!(
                "failed to load model artifacts from {}",
                config.artifact_dir.display()
            )
        })?;
        info!(
            checksum = %checksum,
            trees = bundle.model.num_trees(),
            features = bundle.feature_columns.len(),
            "model bundle loaded"
        );

        let data = HistoricalData::from_csv_path(&config.dataset_path).with_context(|| {
            format!("failed to load dataset {}", config.dataset_path.display())
        })?;
        info!(rows = data.len(), cities = data.cities().len(), "dataset loaded");

        let live: Arc<dyn LiveAqiSource> = if config.api_key.is_some() {
            Arc::new(OpenWeatherClient::new(&config).context("failed to build HTTP client")?)
        } else {
            warn!("OPENWEATHER_API_KEY not set; live AQI disabled");
            Arc::new(NoLiveData)
        };

        Self::new(config, bundle, checksum, data, live)
            .context("model artifacts do not match the dataset")
    }

    /// Cities offered for selection: present in the dataset and known to the model
    pub fn selectable_cities(&self) -> Vec<String> {
        self.data
            .cities()
            .into_iter()
            .filter(|city| self.bundle.city_encoder.contains(city))
            .collect()
    }
}

fn warn_on_city_mismatch(bundle: &ArtifactBundle, data: &HistoricalData) {
    let known: BTreeSet<&str> = bundle.city_encoder.classes().iter().map(String::as_str).collect();
    let cities = data.cities();
    let unknown: Vec<&str> = cities
        .iter()
        .map(String::as_str)
        .filter(|c| !known.contains(c))
        .collect();
    if !unknown.is_empty() {
        warn!(cities = ?unknown, "dataset cities unknown to the model will not be predictable");
    }
}
