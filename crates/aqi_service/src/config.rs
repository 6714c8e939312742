//! Service configuration
//!
//! Precedence, lowest first: built-in defaults, an optional TOML file,
//! environment variables (`AQI_*`, `OPENWEATHER_API_KEY`), then CLI flags
//! applied by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_ARTIFACT_DIR: &str = "models";
pub const DEFAULT_DATASET: &str = "data/air_quality_data.csv";
pub const DEFAULT_GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";
pub const DEFAULT_AIR_POLLUTION_URL: &str = "https://api.openweathermap.org/data/2.5/air_pollution";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TREND_WINDOW: usize = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind: String,
    pub artifact_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub geocoding_url: String,
    pub air_pollution_url: String,
    pub http_timeout_secs: u64,
    pub trend_window: usize,
    /// Absent key means live data is always unavailable
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            dataset_path: PathBuf::from(DEFAULT_DATASET),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            air_pollution_url: DEFAULT_AIR_POLLUTION_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            trend_window: DEFAULT_TREND_WINDOW,
            api_key: None,
        }
    }
}

/// TOML file layout; every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialServiceConfig {
    bind: Option<String>,
    artifact_dir: Option<PathBuf>,
    dataset_path: Option<PathBuf>,
    geocoding_url: Option<String>,
    air_pollution_url: Option<String>,
    http_timeout_secs: Option<u64>,
    trend_window: Option<usize>,
    api_key: Option<String>,
}

impl ServiceConfig {
    /// Load from an optional TOML file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let contents = match path {
            Some(path) if path.exists() => Some((
                path,
                std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?,
            )),
            Some(path) => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                None
            }
            None => None,
        };

        let file = match contents {
            Some((path, text)) => toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            None => PartialServiceConfig::default(),
        };

        Self::from_parts(file, |key| std::env::var(key).ok())
    }

    /// Parse a TOML document and apply overrides from `lookup`
    pub fn from_toml_str<F>(text: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_parts(file, lookup)
    }

    fn from_parts<F>(file: PartialServiceConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_timeout_secs = match env("AQI_HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_positive(&raw, "AQI_HTTP_TIMEOUT_SECS")?,
            None => file.http_timeout_secs.unwrap_or(defaults.http_timeout_secs),
        };
        let trend_window = match env("AQI_TREND_WINDOW") {
            Some(raw) => parse_positive(&raw, "AQI_TREND_WINDOW")? as usize,
            None => file.trend_window.unwrap_or(defaults.trend_window),
        };

        Ok(Self {
            bind: env("AQI_BIND").or(file.bind).unwrap_or(defaults.bind),
            artifact_dir: env("AQI_ARTIFACT_DIR")
                .map(PathBuf::from)
                .or(file.artifact_dir)
                .unwrap_or(defaults.artifact_dir),
            dataset_path: env("AQI_DATASET")
                .map(PathBuf::from)
                .or(file.dataset_path)
                .unwrap_or(defaults.dataset_path),
            geocoding_url: env("AQI_GEOCODING_URL")
                .or(file.geocoding_url)
                .unwrap_or(defaults.geocoding_url),
            air_pollution_url: env("AQI_AIR_POLLUTION_URL")
                .or(file.air_pollution_url)
                .unwrap_or(defaults.air_pollution_url),
            http_timeout_secs,
            trend_window,
            api_key: env("OPENWEATHER_API_KEY")
                .or(file.api_key.filter(|k| !k.trim().is_empty())),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_positive(raw: &str, key: &'static str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
