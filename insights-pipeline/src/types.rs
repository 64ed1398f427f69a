use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate_pipeline::HasRequestId;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Query for one tenant's customer insights.
#[derive(Clone, Debug)]
pub struct InsightsQuery {
    pub request_id: String,
    pub tenant_id: String,
    /// Reference instant for recency rules. Filled by `AsOfQueryHydrator`
    /// when absent.
    pub as_of: Option<DateTime<Utc>>,
    /// Maximum number of customers to return after ranking.
    pub limit: Option<usize>,
    /// Restrict results to a single segment.
    pub segment: Option<CustomerSegment>,
    /// Switch to an outreach list: keep customers inside its recency
    /// window and rank by days since their last completed visit.
    pub outreach: Option<OutreachList>,
}

impl InsightsQuery {
    pub fn new(request_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            tenant_id: tenant_id.into(),
            as_of: None,
            limit: None,
            segment: None,
            outreach: None,
        }
    }

    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_segment(mut self, segment: CustomerSegment) -> Self {
        self.segment = Some(segment);
        self
    }

    pub fn with_outreach(mut self, list: OutreachList) -> Self {
        self.outreach = Some(list);
        self
    }
}

/// Customer lists for follow-up campaigns, keyed on the last completed visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachList {
    /// Lapsing regulars; longest absence first.
    AtRisk,
    /// Lapsed but recoverable; shortest absence first.
    Reactivation,
}

impl HasRequestId for InsightsQuery {
    fn request_id(&self) -> &str {
        &self.request_id
    }
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// Lifecycle status of a visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Completed,
    Cancelled,
    NoShow,
    Other,
}

impl VisitStatus {
    /// Lenient parse: anything unrecognised (pending, confirmed, ...) is `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "completed" => VisitStatus::Completed,
            "cancelled" | "canceled" => VisitStatus::Cancelled,
            "no_show" | "no-show" | "noshow" => VisitStatus::NoShow,
            _ => VisitStatus::Other,
        }
    }
}

/// One appointment-like event for a customer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisitRecord {
    pub id: String,
    pub customer_id: String,
    /// Profile display name joined by the fetcher, if any.
    pub customer_name: Option<String>,
    pub staff_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: VisitStatus,
}

/// Links a visit to a service and/or staff member.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceUsageRecord {
    pub visit_id: String,
    pub service_id: Option<String>,
    pub staff_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewRecord {
    pub customer_id: String,
    pub rating: f64,
}

// ---------------------------------------------------------------------------
// Segments and churn risk
// ---------------------------------------------------------------------------

/// Mutually exclusive customer classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CustomerSegment {
    Vip,
    Loyal,
    #[default]
    Regular,
    AtRisk,
    New,
    Churned,
}

impl CustomerSegment {
    pub const ALL: [CustomerSegment; 6] = [
        CustomerSegment::Vip,
        CustomerSegment::Loyal,
        CustomerSegment::Regular,
        CustomerSegment::AtRisk,
        CustomerSegment::New,
        CustomerSegment::Churned,
    ];

    /// Parse a segment label: "vip", "at risk", "at_risk", "AtRisk", ...
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "vip" => Some(CustomerSegment::Vip),
            "loyal" => Some(CustomerSegment::Loyal),
            "regular" => Some(CustomerSegment::Regular),
            "atrisk" => Some(CustomerSegment::AtRisk),
            "new" => Some(CustomerSegment::New),
            "churned" => Some(CustomerSegment::Churned),
            _ => None,
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerSegment::Vip => write!(f, "VIP"),
            CustomerSegment::Loyal => write!(f, "Loyal"),
            CustomerSegment::Regular => write!(f, "Regular"),
            CustomerSegment::AtRisk => write!(f, "At Risk"),
            CustomerSegment::New => write!(f, "New"),
            CustomerSegment::Churned => write!(f, "Churned"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Critical => {
                "Immediate action required: Reach out with personalized offer or exclusive promotion"
            }
            RiskLevel::High => "High risk: Send re-engagement campaign with special incentive",
            RiskLevel::Medium => "Medium risk: Send reminder or check-in message",
            RiskLevel::Low => "Low risk: Continue regular engagement",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
            RiskLevel::Critical => write!(f, "Critical"),
        }
    }
}

/// Additive churn-risk assessment for one customer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChurnRisk {
    pub level: RiskLevel,
    pub score: u32,
    pub factors: Vec<String>,
    pub recommendation: String,
    /// Whole days since the last completed visit; `None` if there never was one.
    pub days_since_last_visit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Candidate type
// ---------------------------------------------------------------------------

/// Derived metrics for one customer; the pipeline's candidate.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CustomerMetrics {
    pub customer_id: String,
    pub customer_name: String,
    pub first_visit_date: DateTime<Utc>,
    pub last_visit_date: DateTime<Utc>,
    pub first_completed_visit_date: Option<DateTime<Utc>>,
    pub last_completed_visit_date: Option<DateTime<Utc>>,
    /// Whole days from first to last completed visit.
    pub tenure_days: i64,
    /// Completed visits only.
    pub total_visits: usize,
    /// Visits of every status.
    pub total_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
    pub no_show_appointments: usize,
    pub cancellation_rate: f64,
    pub no_show_rate: f64,
    pub review_count: usize,
    pub average_rating: f64,
    pub total_services: usize,
    pub favorite_service_name: String,
    pub favorite_staff_name: String,
    pub lifetime_value: f64,
    /// Visits per year at the customer's own rhythm, times price, over the
    /// configured horizon. Rounded to whole currency units.
    pub projected_lifetime_value: f64,
    pub avg_days_between_visits: f64,
    pub recent_avg_days_between_visits: f64,
    pub segment: CustomerSegment,

    // Populated by ChurnRiskScorer
    pub churn_risk: Option<ChurnRisk>,
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Per-segment customer counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SegmentCounts {
    pub vip: usize,
    pub loyal: usize,
    pub regular: usize,
    pub at_risk: usize,
    pub new: usize,
    pub churned: usize,
}

impl SegmentCounts {
    pub fn record(&mut self, segment: CustomerSegment) {
        match segment {
            CustomerSegment::Vip => self.vip += 1,
            CustomerSegment::Loyal => self.loyal += 1,
            CustomerSegment::Regular => self.regular += 1,
            CustomerSegment::AtRisk => self.at_risk += 1,
            CustomerSegment::New => self.new += 1,
            CustomerSegment::Churned => self.churned += 1,
        }
    }

    pub fn get(&self, segment: CustomerSegment) -> usize {
        match segment {
            CustomerSegment::Vip => self.vip,
            CustomerSegment::Loyal => self.loyal,
            CustomerSegment::Regular => self.regular,
            CustomerSegment::AtRisk => self.at_risk,
            CustomerSegment::New => self.new,
            CustomerSegment::Churned => self.churned,
        }
    }

    pub fn total(&self) -> usize {
        self.vip + self.loyal + self.regular + self.at_risk + self.new + self.churned
    }
}

/// Tenant-wide rollup of customer metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InsightsSummary {
    pub total_customers: usize,
    pub active_customers: usize,
    pub avg_lifetime_value: f64,
    pub avg_visits_per_customer: f64,
    pub retention_rate: f64,
    pub churn_rate: f64,
    pub segmentation: SegmentCounts,
}

/// New vs returning customers over completed visits.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RetentionBreakdown {
    pub total_customers: usize,
    pub new_customers: usize,
    pub returning_customers: usize,
    pub retention_rate: f64,
    pub churn_rate: f64,
}

/// Customers grouped by the month of their first completed visit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cohort {
    /// `YYYY-MM`
    pub cohort_month: String,
    pub customer_count: usize,
}

/// Lapsed customers worth a win-back offer.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReactivationOpportunities {
    /// Every customer in the window, before any limit.
    pub total_opportunities: usize,
    pub customers: Vec<CustomerMetrics>,
}

/// Everything the CLI prints for one tenant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InsightsReport {
    pub tenant_id: String,
    pub as_of: DateTime<Utc>,
    pub summary: InsightsSummary,
    pub retention: RetentionBreakdown,
    pub cohorts: Vec<Cohort>,
    /// Ranked by lifetime value, filtered and truncated per the query.
    pub customers: Vec<CustomerMetrics>,
    pub at_risk_customers: Vec<CustomerMetrics>,
    pub reactivation: ReactivationOpportunities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_status_parse_is_lenient() {
        assert_eq!(VisitStatus::parse("completed"), VisitStatus::Completed);
        assert_eq!(VisitStatus::parse(" Cancelled "), VisitStatus::Cancelled);
        assert_eq!(VisitStatus::parse("canceled"), VisitStatus::Cancelled);
        assert_eq!(VisitStatus::parse("no_show"), VisitStatus::NoShow);
        assert_eq!(VisitStatus::parse("confirmed"), VisitStatus::Other);
        assert_eq!(VisitStatus::parse(""), VisitStatus::Other);
    }

    #[test]
    fn segment_parse_accepts_display_labels() {
        for segment in CustomerSegment::ALL {
            assert_eq!(CustomerSegment::parse(&segment.to_string()), Some(segment));
        }
        assert_eq!(CustomerSegment::parse("at_risk"), Some(CustomerSegment::AtRisk));
        assert_eq!(CustomerSegment::parse("gold"), None);
    }

    #[test]
    fn segment_counts_total_matches_records() {
        let mut counts = SegmentCounts::default();
        counts.record(CustomerSegment::Vip);
        counts.record(CustomerSegment::Churned);
        counts.record(CustomerSegment::Churned);
        assert_eq!(counts.get(CustomerSegment::Churned), 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn customer_metrics_default_has_no_churn_risk() {
        let m = CustomerMetrics::default();
        assert!(m.churn_risk.is_none());
        assert_eq!(m.segment, CustomerSegment::Regular);
    }
}
