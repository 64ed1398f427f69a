//! Rule-based customer segmentation.
//!
//! Rules are evaluated in priority order and the first match wins:
//!
//! | # | Segment | Rule                                                        |
//! |---|---------|-------------------------------------------------------------|
//! | 1 | Churned | days since last visit > churn window                        |
//! | 2 | VIP     | lifetime value ≥ VIP value AND visits ≥ VIP visits          |
//! | 3 | Loyal   | visits ≥ loyal visits AND cancellation rate < loyal ceiling |
//! | 4 | AtRisk  | days since last visit > at-risk days OR cancellation > ceiling |
//! | 5 | New     | visits < new max AND first visit within the new window      |
//! | 6 | Regular | always                                                      |
//!
//! The last rule is unconditional, so every input gets exactly one segment.

use chrono::{DateTime, Utc};

use crate::config::SegmentationPolicy;
use crate::types::CustomerSegment;

/// The metrics the decision table looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentInputs {
    /// Completed visits.
    pub total_visits: usize,
    pub first_visit_date: DateTime<Utc>,
    pub last_visit_date: DateTime<Utc>,
    pub lifetime_value: f64,
    /// Percentage, 0..=100.
    pub cancellation_rate: f64,
}

pub fn classify(
    inputs: &SegmentInputs,
    policy: &SegmentationPolicy,
    as_of: DateTime<Utc>,
) -> CustomerSegment {
    let days_since_last = (as_of - inputs.last_visit_date).num_days();
    let days_since_first = (as_of - inputs.first_visit_date).num_days();

    if days_since_last > policy.churn_window_days {
        CustomerSegment::Churned
    } else if inputs.lifetime_value >= policy.vip_min_lifetime_value
        && inputs.total_visits >= policy.vip_min_visits
    {
        CustomerSegment::Vip
    } else if inputs.total_visits >= policy.loyal_min_visits
        && inputs.cancellation_rate < policy.loyal_max_cancellation_rate
    {
        CustomerSegment::Loyal
    } else if days_since_last > policy.at_risk_after_days
        || inputs.cancellation_rate > policy.at_risk_cancellation_rate
    {
        CustomerSegment::AtRisk
    } else if inputs.total_visits < policy.new_max_visits
        && days_since_first <= policy.new_customer_window_days
    {
        CustomerSegment::New
    } else {
        CustomerSegment::Regular
    }
}
