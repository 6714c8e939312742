//! Regression error metrics on held-out data

/// Mean of squared residuals. Empty or mismatched input yields `None`.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }

    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    Some(sum / actual.len() as f64)
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    mean_squared_error(actual, predicted).map(f64::sqrt)
}

/// Coefficient of determination.
///
/// A constant target has no variance to explain: the score is 1.0 when
/// every prediction is exact and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let mse = mean_squared_error(actual, predicted)?;
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
    let ss_res = mse * n;

    if ss_tot == 0.0 {
        return Some(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Some(1.0 - ss_res / ss_tot)
}

/// Round to a fixed number of decimal places for display
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
