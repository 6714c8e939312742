//! Live-vs-predicted reconciliation and health advisory
//!
//! Live data is authoritative when present; the model prediction is the
//! fallback. The advisory tier uses the same bands as the cards.

use serde::Serialize;

use crate::category::{categorize, AqiCategory};

const GOOD_ADVICE: &str = "✅ Air quality is GOOD.
• Safe for outdoor activities
• Ideal for jogging & exercise
• No special precautions needed";

const MODERATE_ADVICE: &str = "⚠ Moderate air quality.
• Sensitive people should reduce prolonged outdoor exposure
• Carry mask if needed";

const UNHEALTHY_ADVICE: &str = "🚨 Unhealthy air quality.
• Wear N95 mask outdoors
• Avoid heavy exercise outside
• Children & elderly stay indoors";

const VERY_UNHEALTHY_ADVICE: &str = "❗ Very Unhealthy.
• Avoid outdoor activities
• Keep windows closed
• Use air purifier if available";

const HAZARDOUS_ADVICE: &str = "☠ Hazardous air quality.
• Stay indoors completely
• Avoid physical activity
• Seek medical help if breathing discomfort occurs";

/// Fixed advisory text of a band
pub fn advisory_text(category: AqiCategory) -> &'static str {
    match category {
        AqiCategory::Good => GOOD_ADVICE,
        AqiCategory::Moderate => MODERATE_ADVICE,
        AqiCategory::Unhealthy => UNHEALTHY_ADVICE,
        AqiCategory::VeryUnhealthy => VERY_UNHEALTHY_ADVICE,
        AqiCategory::Hazardous => HAZARDOUS_ADVICE,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    /// `|live - predicted|`, only when live data exists
    pub difference: Option<f64>,
    pub tier: AqiCategory,
    pub advisory_text: &'static str,
}

pub fn reconcile(predicted: f64, live: Option<f64>) -> Reconciliation {
    let (authoritative, difference) = match live {
        Some(live) => (live, Some((live - predicted).abs())),
        None => (predicted, None),
    };
    let tier = categorize(authoritative);

    Reconciliation {
        difference,
        tier,
        advisory_text: advisory_text(tier),
    }
}
