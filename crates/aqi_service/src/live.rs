//! Live air-quality lookups against the OpenWeather geocoding and
//! air-pollution endpoints.
//!
//! Any failure collapses to "live data unavailable" at the dashboard level;
//! the typed error is kept for logging.

use std::time::Duration;

use aqi_core::normalize_live_index;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ServiceConfig;

#[derive(Debug, Error)]
pub enum LiveFetchError {
    #[error("no OpenWeather API key configured")]
    MissingApiKey,

    #[error("live request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("malformed upstream response: {0}")]
    Parse(String),

    #[error("no coordinates found for city `{0}`")]
    CityNotFound(String),

    #[error("upstream response is missing `{0}`")]
    MissingField(&'static str),

    #[error("live index {0} is outside the 1-5 scale")]
    OutOfScale(i64),
}

impl From<reqwest::Error> for LiveFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LiveFetchError::Timeout
        } else if let Some(status) = err.status() {
            LiveFetchError::Status(status.as_u16())
        } else if err.is_decode() {
            LiveFetchError::Parse(err.to_string())
        } else {
            LiveFetchError::Transport(err.to_string())
        }
    }
}

/// Source of the current AQI for a city, already on the 0-500 scale
#[async_trait]
pub trait LiveAqiSource: Send + Sync {
    async fn fetch_live_aqi(&self, city: &str) -> Result<f64, LiveFetchError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    #[serde(default)]
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    main: Option<AirPollutionMain>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionMain {
    aqi: Option<i64>,
}

#[derive(Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: Option<String>,
    geocoding_url: String,
    air_pollution_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, LiveFetchError> {
        let client = build_http_client(config.http_timeout())?;
        Ok(Self::from_parts(
            client,
            config.api_key.clone(),
            config.geocoding_url.clone(),
            config.air_pollution_url.clone(),
        ))
    }

    pub fn from_parts(
        client: reqwest::Client,
        api_key: Option<String>,
        geocoding_url: String,
        air_pollution_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            geocoding_url,
            air_pollution_url,
        }
    }

    async fn get_bytes(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, LiveFetchError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LiveFetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn geocode(&self, city: &str, key: &str) -> Result<(f64, f64), LiveFetchError> {
        let body = self
            .get_bytes(
                &self.geocoding_url,
                &[
                    ("q", city.to_string()),
                    ("limit", "1".to_string()),
                    ("appid", key.to_string()),
                ],
            )
            .await?;
        let entries: Vec<GeocodeEntry> =
            serde_json::from_slice(&body).map_err(|e| LiveFetchError::Parse(e.to_string()))?;
        let first = entries
            .into_iter()
            .next()
            .ok_or_else(|| LiveFetchError::CityNotFound(city.to_string()))?;
        let lat = first.lat.ok_or(LiveFetchError::MissingField("lat"))?;
        let lon = first.lon.ok_or(LiveFetchError::MissingField("lon"))?;
        Ok((lat, lon))
    }

    async fn air_quality_index(&self, lat: f64, lon: f64, key: &str) -> Result<i64, LiveFetchError> {
        let body = self
            .get_bytes(
                &self.air_pollution_url,
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("appid", key.to_string()),
                ],
            )
            .await?;
        let response: AirPollutionResponse =
            serde_json::from_slice(&body).map_err(|e| LiveFetchError::Parse(e.to_string()))?;
        response
            .list
            .into_iter()
            .next()
            .ok_or(LiveFetchError::MissingField("list"))?
            .main
            .ok_or(LiveFetchError::MissingField("main"))?
            .aqi
            .ok_or(LiveFetchError::MissingField("aqi"))
    }
}

#[async_trait]
impl LiveAqiSource for OpenWeatherClient {
    async fn fetch_live_aqi(&self, city: &str) -> Result<f64, LiveFetchError> {
        let key = self.api_key.as_deref().ok_or(LiveFetchError::MissingApiKey)?;
        let (lat, lon) = self.geocode(city, key).await?;
        let index = self.air_quality_index(lat, lon, key).await?;
        debug!(city, lat, lon, index, "live index received");
        normalize_live_index(index).ok_or(LiveFetchError::OutOfScale(index))
    }
}

/// Source used when live lookups are switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLiveData;

#[async_trait]
impl LiveAqiSource for NoLiveData {
    async fn fetch_live_aqi(&self, _city: &str) -> Result<f64, LiveFetchError> {
        Err(LiveFetchError::MissingApiKey)
    }
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, LiveFetchError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LiveFetchError::Transport(e.to_string()))
}

/// Live AQI for `city`, or `None` when it cannot be obtained
pub async fn resolve_live_aqi(source: &dyn LiveAqiSource, city: &str) -> Option<f64> {
    match source.fetch_live_aqi(city).await {
        Ok(value) => Some(value),
        Err(LiveFetchError::MissingApiKey) => {
            debug!(city, "live lookup skipped: no API key");
            None
        }
        Err(err) => {
            warn!(city, error = %err, "live AQI unavailable");
            None
        }
    }
}
