//! Per-request dashboard report

use serde::Serialize;

use crate::advisory::reconcile;
use crate::bundle::ArtifactBundle;
use crate::category::{categorize, CategoryView};
use crate::dataset::{HistoricalData, TrendPoint};
use crate::errors::PredictionError;
use crate::prediction::Prediction;

/// Everything the display surface renders for one city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub city: String,
    pub predicted_aqi: i64,
    pub predicted_category: CategoryView,
    pub live_aqi: Option<i64>,
    pub live_category: Option<CategoryView>,
    /// `|live - predicted|`, absent without live data
    pub difference: Option<i64>,
    pub advisory_tier: CategoryView,
    pub advisory_text: String,
    pub trend: Vec<TrendPoint>,
}

/// Predict, categorize and reconcile for `city`.
///
/// `live` is the already normalized live AQI; `None` means unavailable.
pub fn build_report(
    bundle: &ArtifactBundle,
    data: &HistoricalData,
    city: &str,
    live: Option<f64>,
    trend_window: usize,
) -> Result<DashboardReport, PredictionError> {
    let prediction = bundle.predict(city, data)?;
    Ok(report_from_prediction(data, city, &prediction, live, trend_window))
}

/// Report for a prediction already made.
///
/// Categories and the difference use the truncated prediction, the same
/// integer the dashboard shows.
pub fn report_from_prediction(
    data: &HistoricalData,
    city: &str,
    prediction: &Prediction,
    live: Option<f64>,
    trend_window: usize,
) -> DashboardReport {
    let predicted = prediction.aqi as f64;
    let reconciliation = reconcile(predicted, live);

    DashboardReport {
        city: city.to_string(),
        predicted_aqi: prediction.aqi,
        predicted_category: categorize(predicted).view(),
        live_aqi: live.map(|v| v as i64),
        live_category: live.map(|v| categorize(v).view()),
        difference: reconciliation.difference.map(|d| d as i64),
        advisory_tier: reconciliation.tier.view(),
        advisory_text: reconciliation.advisory_text.to_string(),
        trend: data.trend(city, trend_window),
    }
}
