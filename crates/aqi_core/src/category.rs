//! AQI severity bands
//!
//! The five bands partition the real line at 50/100/200/300 with inclusive
//! upper bounds. Both the dashboard cards and the health advisory go through
//! [`categorize`], so color, label and advice can never disagree.

use serde::{Deserialize, Serialize};

/// Fixed AQI severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// All bands, least to most severe
    pub const ALL: [AqiCategory; 5] = [
        AqiCategory::Good,
        AqiCategory::Moderate,
        AqiCategory::Unhealthy,
        AqiCategory::VeryUnhealthy,
        AqiCategory::Hazardous,
    ];

    /// Inclusive upper bound of the band; `None` for the open-ended top band
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            AqiCategory::Good => Some(50.0),
            AqiCategory::Moderate => Some(100.0),
            AqiCategory::Unhealthy => Some(200.0),
            AqiCategory::VeryUnhealthy => Some(300.0),
            AqiCategory::Hazardous => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Display color as a CSS hex string
    pub fn color(self) -> &'static str {
        match self {
            AqiCategory::Good => "#2ecc71",
            AqiCategory::Moderate => "#f1c40f",
            AqiCategory::Unhealthy => "#e67e22",
            AqiCategory::VeryUnhealthy => "#e74c3c",
            AqiCategory::Hazardous => "#2c3e50",
        }
    }

    /// Range shown in the dashboard color guide
    pub fn range_label(self) -> &'static str {
        match self {
            AqiCategory::Good => "0–50",
            AqiCategory::Moderate => "51–100",
            AqiCategory::Unhealthy => "101–200",
            AqiCategory::VeryUnhealthy => "201–300",
            AqiCategory::Hazardous => "300+",
        }
    }

    pub fn view(self) -> CategoryView {
        CategoryView::from(self)
    }
}

/// Map a numeric AQI value to its band.
///
/// Total over every `f64`: negative values are `Good`, and NaN fails every
/// bound comparison so it lands in `Hazardous`.
pub fn categorize(aqi: f64) -> AqiCategory {
    AqiCategory::ALL
        .into_iter()
        .find(|category| category.upper_bound().map_or(true, |bound| aqi <= bound))
        .unwrap_or(AqiCategory::Hazardous)
}

/// Serializable band description for the display surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryView {
    pub key: AqiCategory,
    pub label: String,
    pub color: String,
    pub range: String,
}

impl From<AqiCategory> for CategoryView {
    fn from(category: AqiCategory) -> Self {
        Self {
            key: category,
            label: category.label().to_string(),
            color: category.color().to_string(),
            range: category.range_label().to_string(),
        }
    }
}

/// The dashboard color guide, least to most severe
pub fn legend() -> Vec<CategoryView> {
    AqiCategory::ALL.into_iter().map(CategoryView::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_inclusive() {
        assert_eq!(categorize(50.0), AqiCategory::Good);
        assert_eq!(categorize(50.0001), AqiCategory::Moderate);
        assert_eq!(categorize(100.0), AqiCategory::Moderate);
        assert_eq!(categorize(100.5), AqiCategory::Unhealthy);
        assert_eq!(categorize(200.0), AqiCategory::Unhealthy);
        assert_eq!(categorize(201.0), AqiCategory::VeryUnhealthy);
        assert_eq!(categorize(300.0), AqiCategory::VeryUnhealthy);
        assert_eq!(categorize(300.01), AqiCategory::Hazardous);
    }

    #[test]
    fn test_negative_values_are_good() {
        assert_eq!(categorize(-10.0), AqiCategory::Good);
        assert_eq!(categorize(f64::NEG_INFINITY), AqiCategory::Good);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(categorize(f64::INFINITY), AqiCategory::Hazardous);
        assert_eq!(categorize(f64::NAN), AqiCategory::Hazardous);
    }

    #[test]
    fn test_labels_and_colors() {
        assert_eq!(AqiCategory::VeryUnhealthy.label(), "Very Unhealthy");
        assert_eq!(AqiCategory::Good.color(), "#2ecc71");
        assert_eq!(AqiCategory::Moderate.color(), "#f1c40f");
        assert_eq!(AqiCategory::Unhealthy.color(), "#e67e22");
        assert_eq!(AqiCategory::VeryUnhealthy.color(), "#e74c3c");
        assert_eq!(AqiCategory::Hazardous.color(), "#2c3e50");
    }

    #[test]
    fn test_legend_order() {
        let legend = legend();
        assert_eq!(legend.len(), 5);
        assert_eq!(legend[0].label, "Good");
        assert_eq!(legend[4].range, "300+");
    }

    #[test]
    fn test_serialized_key() {
        let json = serde_json::to_string(&AqiCategory::VeryUnhealthy).unwrap();
        assert_eq!(json, "\"very_unhealthy\"");
    }
}
