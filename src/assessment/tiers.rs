//! Overall-risk tiers and sample confidence.

use crate::analysis::risk::WindowStats;
use serde::Serialize;
use std::fmt;

/// Overall-risk bands, in ascending order of risk.
///
/// Boundaries are half-open: 20.0 is `Good`, 60.0 is `HighRisk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskTier {
    Excellent,
    Good,
    Moderate,
    HighRisk,
}

impl RiskTier {
    pub fn from_overall(overall_risk: f64) -> Self {
        if overall_risk < 20.0 {
            RiskTier::Excellent
        } else if overall_risk < 40.0 {
            RiskTier::Good
        } else if overall_risk < 60.0 {
            RiskTier::Moderate
        } else {
            RiskTier::HighRisk
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Excellent => "Excellent",
            RiskTier::Good => "Good",
            RiskTier::Moderate => "Moderate",
            RiskTier::HighRisk => "High Risk",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How much weight the sample can bear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// HIGH needs 10 years and 50 days; MEDIUM needs 5 years and 25 days.
    pub fn from_sample(years_analyzed: usize, total_days: usize) -> Self {
        if years_analyzed >= 10 && total_days >= 50 {
            Confidence::High
        } else if years_analyzed >= 5 && total_days >= 25 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn of(stats: &WindowStats) -> Self {
        Self::from_sample(stats.years_analyzed, stats.total_days)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries_are_half_open() {
        assert_eq!(RiskTier::from_overall(0.0), RiskTier::Excellent);
        assert_eq!(RiskTier::from_overall(19.99), RiskTier::Excellent);
        assert_eq!(RiskTier::from_overall(19.999), RiskTier::Excellent);
        assert_eq!(RiskTier::from_overall(20.0), RiskTier::Good);
        assert_eq!(RiskTier::from_overall(39.99), RiskTier::Good);
        assert_eq!(RiskTier::from_overall(40.0), RiskTier::Moderate);
        assert_eq!(RiskTier::from_overall(59.99), RiskTier::Moderate);
        assert_eq!(RiskTier::from_overall(60.0), RiskTier::HighRisk);
        assert_eq!(RiskTier::from_overall(100.0), RiskTier::HighRisk);
    }

    #[test]
    fn test_tiers_are_ordered_by_severity() {
        assert!(RiskTier::Excellent < RiskTier::Good);
        assert!(RiskTier::Moderate < RiskTier::HighRisk);
        assert_eq!(RiskTier::HighRisk.to_string(), "High Risk");
    }

    #[test]
    fn test_confidence_needs_both_years_and_days() {
        assert_eq!(Confidence::from_sample(15, 105), Confidence::High);
        assert_eq!(Confidence::from_sample(10, 50), Confidence::High);
        assert_eq!(Confidence::from_sample(15, 49), Confidence::Medium);
        assert_eq!(Confidence::from_sample(9, 100), Confidence::Medium);
        assert_eq!(Confidence::from_sample(5, 25), Confidence::Medium);
        assert_eq!(Confidence::from_sample(4, 100), Confidence::Low);
        assert_eq!(Confidence::from_sample(12, 24), Confidence::Low);
    }
}
