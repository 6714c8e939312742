//! Model and dataset analytics for the dashboard's analytics view

use std::collections::BTreeMap;

use serde::Serialize;

use crate::bundle::ArtifactBundle;
use crate::dataset::HistoricalData;
use crate::metrics::round_to;
use crate::prediction::Regressor;

/// RMSE of the first-generation model, kept for the improvement chart
pub const BASELINE_RMSE: f64 = 55.0;
pub const HISTOGRAM_BINS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMetrics {
    pub r2: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageScore {
    pub stage: String,
    pub rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pearson correlation over numeric columns.
///
/// Each pair uses the rows where both values are present. A cell is `None`
/// when fewer than two such rows exist or either side has zero variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAverage {
    pub city: String,
    pub mean_aqi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub metrics: DisplayMetrics,
    pub stage_comparison: Vec<StageScore>,
    pub feature_importance: Vec<FeatureImportance>,
    pub correlation: CorrelationMatrix,
    pub city_average: Vec<CityAverage>,
    pub histogram: Vec<HistogramBin>,
}

impl AnalyticsReport {
    pub fn build(bundle: &ArtifactBundle, data: &HistoricalData) -> Self {
        let aqi: Vec<f64> = data.records().iter().filter_map(|r| data.aqi(r)).collect();

        Self {
            metrics: DisplayMetrics {
                r2: round_to(bundle.metrics.r2, 3),
                rmse: round_to(bundle.metrics.rmse, 2),
            },
            stage_comparison: stage_comparison(bundle.metrics.rmse),
            feature_importance: rank_feature_importances(
                &bundle.feature_columns,
                bundle.model.feature_importances(),
            ),
            correlation: correlation_matrix(data),
            city_average: city_averages(data),
            histogram: histogram(&aqi, HISTOGRAM_BINS),
        }
    }
}

pub fn stage_comparison(current_rmse: f64) -> Vec<StageScore> {
    vec![
        StageScore {
            stage: "Stage-1".to_string(),
            rmse: BASELINE_RMSE,
        },
        StageScore {
            stage: "Stage-2".to_string(),
            rmse: current_rmse,
        },
    ]
}

/// Pair columns with their weights, heaviest first. Ties keep column order.
pub fn rank_feature_importances(columns: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = columns
        .iter()
        .zip(importances)
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

pub fn correlation_matrix(data: &HistoricalData) -> CorrelationMatrix {
    let columns = data.columns().to_vec();
    let series: Vec<Vec<Option<f64>>> = (0..columns.len())
        .map(|i| data.records().iter().map(|r| r.values[i]).collect())
        .collect();

    let values = series
        .iter()
        .map(|x| series.iter().map(|y| pearson(x, y)).collect())
        .collect();

    CorrelationMatrix { columns, values }
}

/// Pairwise-complete Pearson coefficient
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Mean AQI per city over rows with a known AQI, sorted by city
pub fn city_averages(data: &HistoricalData) -> Vec<CityAverage> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in data.records() {
        if let Some(aqi) = data.aqi(record) {
            let entry = sums.entry(record.city.as_str()).or_insert((0.0, 0));
            entry.0 += aqi;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(city, (sum, count))| CityAverage {
            city: city.to_string(),
            mean_aqi: sum / count as f64,
        })
        .collect()
}

/// Equal-width histogram over `[min, max]`; the last bin is closed.
///
/// A single distinct value gets one unit-wide span centred on it.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for value in values {
        let idx = (((value - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}
