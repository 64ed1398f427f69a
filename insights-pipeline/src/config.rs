//! Engine configuration.
//!
//! Every constant the engine uses (pricing proxy, segment thresholds,
//! churn-risk weights) lives here and is passed in explicitly. Any field
//! missing from a TOML file keeps its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InsightsError, InsightsResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Flat per-visit price used as the lifetime-value proxy.
    pub average_service_price: f64,
    /// Scale applied to ratios to express them as percentages.
    pub percentage_multiplier: f64,
    /// Number of most recent completed visits used for the recent visit gap.
    pub recent_visit_window: usize,
    /// Horizon in years for the projected lifetime value.
    pub projection_years: f64,
    pub segmentation: SegmentationPolicy,
    pub churn_risk: ChurnRiskPolicy,
    pub outreach: OutreachPolicy,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            average_service_price: 75.0,
            percentage_multiplier: 100.0,
            recent_visit_window: 3,
            projection_years: 3.0,
            segmentation: SegmentationPolicy::default(),
            churn_risk: ChurnRiskPolicy::default(),
            outreach: OutreachPolicy::default(),
        }
    }
}

impl InsightsConfig {
    pub fn from_toml_str(raw: &str) -> InsightsResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load_file(path: impl AsRef<Path>) -> InsightsResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| InsightsError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }
}

/// Thresholds for the segment decision table. Rates are percentages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationPolicy {
    /// No visit for longer than this many days means Churned.
    pub churn_window_days: i64,
    pub vip_min_lifetime_value: f64,
    pub vip_min_visits: usize,
    pub loyal_min_visits: usize,
    /// Loyal requires a cancellation rate strictly below this.
    pub loyal_max_cancellation_rate: f64,
    /// Absence longer than this (but inside the churn window) means AtRisk.
    pub at_risk_after_days: i64,
    /// A cancellation rate strictly above this means AtRisk.
    pub at_risk_cancellation_rate: f64,
    /// New requires strictly fewer completed visits than this.
    pub new_max_visits: usize,
    pub new_customer_window_days: i64,
}

impl Default for SegmentationPolicy {
    fn default() -> Self {
        Self {
            churn_window_days: 180,
            vip_min_lifetime_value: 750.0,
            vip_min_visits: 10,
            loyal_min_visits: 5,
            loyal_max_cancellation_rate: 20.0,
            at_risk_after_days: 90,
            at_risk_cancellation_rate: 30.0,
            new_max_visits: 3,
            new_customer_window_days: 60,
        }
    }
}

/// Weights and cut-offs for the additive churn-risk score.
///
/// Ratios here are fractions (0.3 = 30%) of completed visits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnRiskPolicy {
    pub overdue_gap_multiplier: f64,
    pub overdue_score: u32,
    pub approaching_gap_multiplier: f64,
    pub approaching_score: u32,
    pub long_absence_days: f64,
    pub long_absence_score: u32,
    pub high_cancellation_ratio: f64,
    pub high_cancellation_score: u32,
    pub moderate_cancellation_ratio: f64,
    pub moderate_cancellation_score: u32,
    pub high_no_show_ratio: f64,
    pub high_no_show_score: u32,
    pub moderate_no_show_ratio: f64,
    pub moderate_no_show_score: u32,
    pub min_visits_for_frequency: usize,
    pub frequency_decline_multiplier: f64,
    pub frequency_decline_score: u32,
    pub low_visits_score: u32,
    pub critical_score: u32,
    pub high_score: u32,
    pub medium_score: u32,
}

impl Default for ChurnRiskPolicy {
    fn default() -> Self {
        Self {
            overdue_gap_multiplier: 2.0,
            overdue_score: 30,
            approaching_gap_multiplier: 1.5,
            approaching_score: 20,
            long_absence_days: 90.0,
            long_absence_score: 25,
            high_cancellation_ratio: 0.3,
            high_cancellation_score: 25,
            moderate_cancellation_ratio: 0.15,
            moderate_cancellation_score: 15,
            high_no_show_ratio: 0.2,
            high_no_show_score: 20,
            moderate_no_show_ratio: 0.1,
            moderate_no_show_score: 10,
            min_visits_for_frequency: 3,
            frequency_decline_multiplier: 1.3,
            frequency_decline_score: 15,
            low_visits_score: 10,
            critical_score: 70,
            high_score: 50,
            medium_score: 30,
        }
    }
}

/// Inclusive range of days since the last completed visit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecencyWindow {
    pub min_days: f64,
    pub max_days: f64,
}

impl RecencyWindow {
    pub fn contains(&self, days: f64) -> bool {
        days >= self.min_days && days <= self.max_days
    }
}

/// Windows and caps for the outreach lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachPolicy {
    pub at_risk: RecencyWindow,
    /// Applied to the at-risk list when the query sets no limit.
    pub at_risk_limit: usize,
    pub reactivation: RecencyWindow,
}

impl Default for OutreachPolicy {
    fn default() -> Self {
        Self {
            at_risk: RecencyWindow {
                min_days: 60.0,
                max_days: 180.0,
            },
            at_risk_limit: 20,
            reactivation: RecencyWindow {
                min_days: 90.0,
                max_days: 365.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = InsightsConfig::from_toml_str("").unwrap();
        assert_eq!(config, InsightsConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let raw = r#"
average_service_price = 90.0

[segmentation]
churn_window_days = 120
vip_min_visits = 6
"#;
        let config = InsightsConfig::from_toml_str(raw).unwrap();
        assert!((config.average_service_price - 90.0).abs() < f64::EPSILON);
        assert_eq!(config.segmentation.churn_window_days, 120);
        assert_eq!(config.segmentation.vip_min_visits, 6);
        assert_eq!(config.segmentation.loyal_min_visits, 5);
        assert_eq!(config.churn_risk, ChurnRiskPolicy::default());
    }

    #[test]
    fn outreach_windows_override_and_are_inclusive() {
        let raw = r#"
projection_years = 5.0

[outreach]
at_risk_limit = 5

[outreach.reactivation]
min_days = 120.0
max_days = 400.0
"#;
        let config = InsightsConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.projection_years, 5.0);
        assert_eq!(config.outreach.at_risk_limit, 5);
        assert_eq!(config.outreach.at_risk, OutreachPolicy::default().at_risk);
        assert!(config.outreach.reactivation.contains(120.0));
        assert!(config.outreach.reactivation.contains(400.0));
        assert!(!config.outreach.reactivation.contains(119.9));
        assert!(!config.outreach.reactivation.contains(400.1));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = InsightsConfig::from_toml_str("average_service_price = \"cheap\"").unwrap_err();
        assert!(matches!(err, InsightsError::Config(_)));
    }

    #[test]
    fn sample_config_file_spells_out_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/insights.toml");
        let config = InsightsConfig::load_file(path).unwrap();
        assert_eq!(config, InsightsConfig::default());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = InsightsConfig::load_file("/nonexistent/insights.toml").unwrap_err();
        assert!(matches!(err, InsightsError::Load { .. }));
    }
}
