//! Recommendation text and the favorable / watch-out lists.

use crate::analysis::risk::FactorRisks;

const FAVORABLE_COLD_BELOW: f64 = 20.0;
const FAVORABLE_HOT_BELOW: f64 = 20.0;
const FAVORABLE_RAIN_BELOW: f64 = 30.0;
const FAVORABLE_WIND_BELOW: f64 = 25.0;

/// A factor is a concern strictly above this percentage.
pub const CONCERN_ABOVE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Perfect,
    GoodOdds,
    ModerateRisk,
    HighRisk,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub verdict: Verdict,
    pub message: String,
}

/// Picks the headline recommendation for `overall_risk`.
pub fn recommend(overall_risk: f64, activity: &str) -> Recommendation {
    let (verdict, message) = if overall_risk < 25.0 {
        (
            Verdict::Perfect,
            format!("Perfect! Great weather conditions expected for your {}.", activity),
        )
    } else if overall_risk < 50.0 {
        (
            Verdict::GoodOdds,
            "Good odds! Weather is usually favorable, but have a backup plan ready.".to_string(),
        )
    } else if overall_risk < 70.0 {
        (
            Verdict::ModerateRisk,
            "Moderate risk. Weather can be unpredictable; monitor forecasts closer to your date."
                .to_string(),
        )
    } else {
        (
            Verdict::HighRisk,
            format!(
                "High risk. Historically, {}% of similar days had unfavorable conditions. Consider rescheduling.",
                overall_risk as u32
            ),
        )
    };
    Recommendation { verdict, message }
}

/// Conditions the history suggests will probably be fine.
pub fn favorable_conditions(risks: &FactorRisks) -> Vec<&'static str> {
    let mut good = Vec::new();
    if risks.too_cold < FAVORABLE_COLD_BELOW {
        good.push("Temperature will likely be comfortable");
    }
    if risks.too_hot < FAVORABLE_HOT_BELOW {
        good.push("Low chance of excessive heat");
    }
    if risks.rainy < FAVORABLE_RAIN_BELOW {
        good.push("Generally dry weather expected");
    }
    if risks.windy < FAVORABLE_WIND_BELOW {
        good.push("Calm to light winds typical");
    }
    good
}

/// Factors above [`CONCERN_ABOVE`], each with its rounded percentage.
pub fn concerns(risks: &FactorRisks) -> Vec<String> {
    [
        ("Cold temperatures", risks.too_cold),
        ("Excessive heat", risks.too_hot),
        ("Rain possible", risks.rainy),
        ("Strong winds", risks.windy),
    ]
    .into_iter()
    .filter(|(_, pct)| *pct > CONCERN_ABOVE)
    .map(|(what, pct)| format!("{} ({:.0}% chance)", what, pct))
    .collect()
}
