//! Prediction pipeline: assemble features, invoke the model, truncate.

use serde::Serialize;

use crate::dataset::HistoricalData;
use crate::encoding::CityEncoder;
use crate::errors::{ModelError, PredictionError};
use crate::features::{FeatureAssembler, FeatureVector};

/// Opaque regression function used by the serving path
pub trait Regressor: Send + Sync {
    /// Number of inputs the model expects
    fn feature_count(&self) -> usize;

    /// Scalar AQI estimate for one feature vector
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// One non-negative weight per feature, for analytics only
    fn feature_importances(&self) -> &[f64];
}

/// Outcome of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Raw model output
    pub raw: f64,
    /// Display value, truncated toward zero
    pub aqi: i64,
    /// Input the model was invoked with
    pub features: FeatureVector,
}

/// Truncate a model output to the integer AQI shown to users
pub fn truncate_aqi(raw: f64) -> i64 {
    raw.trunc() as i64
}

/// Predict the AQI of `city` from its latest historical record
pub fn predict<R: Regressor + ?Sized>(
    city: &str,
    column_order: &[String],
    data: &HistoricalData,
    encoder: &CityEncoder,
    model: &R,
) -> Result<Prediction, PredictionError> {
    predict_with(&FeatureAssembler::new(column_order, encoder), city, data, model)
}

/// Same as [`predict`] with a preconfigured assembler
pub fn predict_with<R: Regressor + ?Sized>(
    assembler: &FeatureAssembler<'_>,
    city: &str,
    data: &HistoricalData,
    model: &R,
) -> Result<Prediction, PredictionError> {
    let features = assembler.assemble(city, data)?;
    let raw = model.predict(&features)?;
    if !raw.is_finite() {
        return Err(ModelError::NonFinite.into());
    }

    tracing::debug!(city, raw, "model prediction");

    Ok(Prediction {
        raw,
        aqi: truncate_aqi(raw),
        features,
    })
}
