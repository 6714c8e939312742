//! Smart AQI dashboard service
//!
//! Serves the dashboard page and its JSON API: per-city predictions
//! reconciled against live readings, the category legend and model
//! analytics.

pub mod config;
pub mod dashboard;
pub mod live;
pub mod server;
pub mod state;

pub use config::{ConfigError, ServiceConfig};
pub use live::{resolve_live_aqi, LiveAqiSource, LiveFetchError, NoLiveData, OpenWeatherClient};
pub use server::{build_router, start_server, ApiError};
pub use state::{AppState, SharedState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
