//! Deterministic AQI core for the Smart AQI dashboard
//!
//! Everything the serving path needs to turn a city name into a scored,
//! categorized and explained AQI figure lives here. The offline trainer
//! produces the artifact bundle this crate loads.
//!
//! Modules:
//! - `category`: fixed AQI severity bands with label and color
//! - `live`: normalization of the provider's coarse 1-5 index
//! - `dataset`: historical CSV loading and per-city queries
//! - `encoding`: city label encoder persisted at training time
//! - `features`: positional feature assembly from the latest city record
//! - `forest`: random-forest model inference
//! - `prediction`: assemble + invoke the model + truncate
//! - `advisory`: live-vs-predicted reconciliation and health advisory
//! - `report`: the per-request dashboard report
//! - `analytics`: model and dataset analytics for the dashboard
//! - `bundle`: checksummed artifact bundle persistence
//! - `metrics`: regression error metrics

pub mod advisory;
pub mod analytics;
pub mod bundle;
pub mod category;
pub mod dataset;
pub mod encoding;
pub mod errors;
pub mod features;
pub mod forest;
pub mod live;
pub mod metrics;
pub mod prediction;
pub mod report;
pub mod serde_canon;

pub use advisory::{advisory_text, reconcile, Reconciliation};
pub use analytics::AnalyticsReport;
pub use bundle::{ArtifactBundle, ModelMetrics, TrainingSummary, BUNDLE_FILE, CHECKSUM_FILE};
pub use category::{categorize, AqiCategory, CategoryView};
pub use dataset::{HistoricalData, HistoricalRecord, TrendPoint};
pub use encoding::CityEncoder;
pub use errors::{ArtifactError, AssemblyError, DatasetError, ModelError, PredictionError};
pub use features::{assemble, FeatureAssembler, FeatureVector};
pub use forest::{ForestModel, Node, Tree};
pub use live::normalize_live_index;
pub use prediction::{predict, Prediction, Regressor};
pub use report::{build_report, report_from_prediction, DashboardReport};

/// Crate version string for bundle metadata and health reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
