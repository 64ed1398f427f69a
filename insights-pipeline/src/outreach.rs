//! Outreach lists keyed on the last completed visit.
//!
//! At-risk customers are lapsing (default 60 to 180 days away) and are
//! ranked longest absence first. Reactivation candidates have been gone
//! longer (default 90 to 365 days) and are ranked shortest absence first,
//! since the most recent leavers are the easiest to win back. Customers
//! with no completed visit are never on either list.

use chrono::{DateTime, Utc};

use crate::config::{OutreachPolicy, RecencyWindow};
use crate::types::{CustomerMetrics, OutreachList, ReactivationOpportunities};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fractional days between the last completed visit and `as_of`.
pub fn days_since_last_completed(metrics: &CustomerMetrics, as_of: DateTime<Utc>) -> Option<f64> {
    metrics
        .last_completed_visit_date
        .map(|last| (as_of - last).num_seconds() as f64 / SECONDS_PER_DAY)
}

pub fn window_for(list: OutreachList, policy: &OutreachPolicy) -> &RecencyWindow {
    match list {
        OutreachList::AtRisk => &policy.at_risk,
        OutreachList::Reactivation => &policy.reactivation,
    }
}

pub fn in_window(metrics: &CustomerMetrics, window: &RecencyWindow, as_of: DateTime<Utc>) -> bool {
    days_since_last_completed(metrics, as_of).is_some_and(|days| window.contains(days))
}

/// Stable sort on the last completed visit. Ties keep input order.
pub fn rank(list: OutreachList, mut customers: Vec<CustomerMetrics>) -> Vec<CustomerMetrics> {
    match list {
        OutreachList::AtRisk => customers.sort_by_key(|c| c.last_completed_visit_date),
        OutreachList::Reactivation => {
            customers.sort_by(|a, b| b.last_completed_visit_date.cmp(&a.last_completed_visit_date))
        }
    }
    customers
}

pub fn at_risk_customers(
    metrics: &[CustomerMetrics],
    policy: &OutreachPolicy,
    as_of: DateTime<Utc>,
    limit: Option<usize>,
) -> Vec<CustomerMetrics> {
    let mut ranked = rank(OutreachList::AtRisk, within(metrics, &policy.at_risk, as_of));
    ranked.truncate(limit.unwrap_or(policy.at_risk_limit));
    ranked
}

pub fn reactivation_opportunities(
    metrics: &[CustomerMetrics],
    policy: &OutreachPolicy,
    as_of: DateTime<Utc>,
    limit: Option<usize>,
) -> ReactivationOpportunities {
    let mut customers = rank(
        OutreachList::Reactivation,
        within(metrics, &policy.reactivation, as_of),
    );
    let total_opportunities = customers.len();
    if let Some(limit) = limit {
        customers.truncate(limit);
    }
    ReactivationOpportunities {
        total_opportunities,
        customers,
    }
}

fn within(metrics: &[CustomerMetrics], window: &RecencyWindow, as_of: DateTime<Utc>) -> Vec<CustomerMetrics> {
    metrics
        .iter()
        .filter(|m| in_window(m, window, as_of))
        .cloned()
        .collect()
}
