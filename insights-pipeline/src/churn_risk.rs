//! Additive churn-risk scoring.
//!
//! Each factor adds points; the total maps to a risk level:
//! - recency: overdue vs the customer's own visit rhythm, or a long absence
//! - cancellation and no-show ratios (relative to completed visits)
//! - recent visit gaps stretching beyond the long-run average
//! - too few completed visits to establish a habit

use chrono::{DateTime, Utc};

use crate::config::ChurnRiskPolicy;
use crate::outreach::days_since_last_completed;
use crate::types::{ChurnRisk, CustomerMetrics, RiskLevel};

pub fn assess(metrics: &CustomerMetrics, policy: &ChurnRiskPolicy, as_of: DateTime<Utc>) -> ChurnRisk {
    let mut score = 0;
    let mut factors: Vec<String> = Vec::new();
    let mut add = |points: u32, factor: &str| {
        score += points;
        factors.push(factor.to_string());
    };

    let days_since_last = days_since_last_completed(metrics, as_of);
    let avg_gap = metrics.avg_days_between_visits;
    let absence = days_since_last.unwrap_or(f64::INFINITY);

    if avg_gap > 0.0 && absence > avg_gap * policy.overdue_gap_multiplier {
        add(policy.overdue_score, "Overdue for return visit");
    } else if avg_gap > 0.0 && absence > avg_gap * policy.approaching_gap_multiplier {
        add(policy.approaching_score, "Approaching typical return window");
    } else if absence > policy.long_absence_days {
        add(policy.long_absence_score, "Long time since last visit");
    }

    let cancellation_ratio = ratio(metrics.cancelled_appointments, metrics.total_visits);
    if cancellation_ratio > policy.high_cancellation_ratio {
        add(policy.high_cancellation_score, "High cancellation rate");
    } else if cancellation_ratio > policy.moderate_cancellation_ratio {
        add(policy.moderate_cancellation_score, "Moderate cancellation rate");
    }

    let no_show_ratio = ratio(metrics.no_show_appointments, metrics.total_visits);
    if no_show_ratio > policy.high_no_show_ratio {
        add(policy.high_no_show_score, "High no-show rate");
    } else if no_show_ratio > policy.moderate_no_show_ratio {
        add(policy.moderate_no_show_score, "Some no-shows");
    }

    if metrics.total_visits >= policy.min_visits_for_frequency
        && avg_gap > 0.0
        && metrics.recent_avg_days_between_visits > avg_gap * policy.frequency_decline_multiplier
    {
        add(policy.frequency_decline_score, "Decreasing visit frequency");
    }

    if metrics.total_visits < policy.min_visits_for_frequency {
        add(policy.low_visits_score, "New customer with few visits");
    }

    let level = level_for(score, policy);
    ChurnRisk {
        level,
        score,
        factors,
        recommendation: level.recommendation().to_string(),
        days_since_last_visit: days_since_last.map(|d| d.round() as i64),
    }
}

fn level_for(score: u32, policy: &ChurnRiskPolicy) -> RiskLevel {
    if score >= policy.critical_score {
        RiskLevel::Critical
    } else if score >= policy.high_score {
        RiskLevel::High
    } else if score >= policy.medium_score {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn steady_customer() -> CustomerMetrics {
        CustomerMetrics {
            customer_id: "c1".into(),
            total_visits: 8,
            completed_appointments: 8,
            total_appointments: 8,
            last_completed_visit_date: Some(as_of() - Duration::days(20)),
            avg_days_between_visits: 30.0,
            recent_avg_days_between_visits: 28.0,
            ..CustomerMetrics::default()
        }
    }

    #[test]
    fn steady_customer_is_low_risk() {
        let risk = assess(&steady_customer(), &ChurnRiskPolicy::default(), as_of());
        assert_eq!(risk.level, RiskLevel::Low);
        assert_eq!(risk.score, 0);
        assert!(risk.factors.is_empty());
        assert_eq!(risk.days_since_last_visit, Some(20));
    }

    #[test]
    fn overdue_unreliable_customer_is_critical() {
        let m = CustomerMetrics {
            last_completed_visit_date: Some(as_of() - Duration::days(70)),
            cancelled_appointments: 3,
            no_show_appointments: 2,
            recent_avg_days_between_visits: 45.0,
            ..steady_customer()
        };
        let risk = assess(&m, &ChurnRiskPolicy::default(), as_of());
        // overdue 30 + cancellation 3/8 25 + no-show 2/8 20 + decline 15
        assert_eq!(risk.score, 90);
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(risk.recommendation, RiskLevel::Critical.recommendation());
        assert_eq!(risk.factors.len(), 4);
    }

    #[test]
    fn approaching_window_scores_less_than_overdue() {
        let m = CustomerMetrics {
            last_completed_visit_date: Some(as_of() - Duration::days(50)),
            ..steady_customer()
        };
        let risk = assess(&m, &ChurnRiskPolicy::default(), as_of());
        assert_eq!(risk.score, 20);
        assert_eq!(risk.factors, vec!["Approaching typical return window".to_string()]);
    }

    #[test]
    fn customer_without_completed_visits() {
        let m = CustomerMetrics {
            customer_id: "c2".into(),
            total_appointments: 2,
            cancelled_appointments: 2,
            ..CustomerMetrics::default()
        };
        let risk = assess(&m, &ChurnRiskPolicy::default(), as_of());
        // long absence 25 + few visits 10; ratios are 0 with no completed visits
        assert_eq!(risk.score, 35);
        assert_eq!(risk.level, RiskLevel::Medium);
        assert_eq!(risk.days_since_last_visit, None);
    }

    #[test]
    fn level_cut_offs() {
        let policy = ChurnRiskPolicy::default();
        assert_eq!(level_for(29, &policy), RiskLevel::Low);
        assert_eq!(level_for(30, &policy), RiskLevel::Medium);
        assert_eq!(level_for(50, &policy), RiskLevel::High);
        assert_eq!(level_for(70, &policy), RiskLevel::Critical);
    }
}
