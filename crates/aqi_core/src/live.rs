//! Live index normalization
//!
//! The air-pollution provider reports a coarse 1-5 index. The dashboard maps
//! it onto the 0-500 scale the model predicts on with a fixed table.

/// Provider index to AQI scale
pub const LIVE_INDEX_TABLE: [(i64, f64); 5] = [
    (1, 25.0),
    (2, 75.0),
    (3, 150.0),
    (4, 250.0),
    (5, 350.0),
];

/// Convert the provider's 1-5 index to the AQI scale.
///
/// Anything outside the table yields `None`, which callers treat as
/// "live data unavailable".
pub fn normalize_live_index(raw: i64) -> Option<f64> {
    LIVE_INDEX_TABLE
        .iter()
        .find(|(index, _)| *index == raw)
        .map(|(_, aqi)| *aqi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_values() {
        assert_eq!(normalize_live_index(1), Some(25.0));
        assert_eq!(normalize_live_index(2), Some(75.0));
        assert_eq!(normalize_live_index(3), Some(150.0));
        assert_eq!(normalize_live_index(4), Some(250.0));
        assert_eq!(normalize_live_index(5), Some(350.0));
    }

    #[test]
    fn test_out_of_scale() {
        assert_eq!(normalize_live_index(0), None);
        assert_eq!(normalize_live_index(6), None);
        assert_eq!(normalize_live_index(-3), None);
        assert_eq!(normalize_live_index(i64::MAX), None);
    }
}
