//! Per-customer metrics from grouped visits.
//!
//! Derived values:
//! - total_visits: completed visits; total_appointments: visits of any status
//! - cancellation / no-show rate: share of total_appointments x multiplier (0 if none)
//! - average_rating: review total / review count (0 if none)
//! - favorite service/staff: highest usage count, earliest-seen wins a tie
//! - lifetime_value: total_visits x average_service_price
//! - visit gaps: mean days between consecutive completed visits
//! - tenure_days: first to last completed visit, rounded
//! - projected_lifetime_value: visits per year (365 / mean gap, or the visit
//!   count when there is no gap) x price x projection_years, rounded
//!
//! Visits must arrive most-recent-first. `first_visit_date` is read from the
//! last visit and `last_visit_date` from the first; with any other order both
//! dates are wrong.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::collaborators::ResolvedNames;
use crate::config::InsightsConfig;
use crate::counter::OccurrenceCounter;
use crate::grouper::{CustomerAggregate, ServiceAggregation};
use crate::segmentation::{classify, SegmentInputs};
use crate::types::{CustomerMetrics, ReviewRecord, VisitRecord, VisitStatus};

/// Sentinel for a favorite that is absent or has no resolvable name.
pub const UNRESOLVED_NAME: &str = "N/A";

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Running review totals for one customer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReviewSummary {
    pub count: usize,
    pub total: f64,
}

impl ReviewSummary {
    pub fn average(&self) -> f64 {
        if self.count > 0 {
            self.total / self.count as f64
        } else {
            0.0
        }
    }
}

pub fn summarize_reviews(reviews: &[ReviewRecord]) -> HashMap<String, ReviewSummary> {
    let mut summaries: HashMap<String, ReviewSummary> = HashMap::new();
    for review in reviews {
        let summary = summaries.entry(review.customer_id.clone()).or_default();
        summary.count += 1;
        summary.total += review.rating;
    }
    summaries
}

/// Builds `CustomerMetrics` and assigns each customer a segment.
pub struct MetricsBuilder<'a> {
    config: &'a InsightsConfig,
    as_of: DateTime<Utc>,
}

impl<'a> MetricsBuilder<'a> {
    pub fn new(config: &'a InsightsConfig, as_of: DateTime<Utc>) -> Self {
        Self { config, as_of }
    }

    /// Consumes the aggregates; output order follows input order.
    pub fn build(
        &self,
        customers: Vec<CustomerAggregate>,
        reviews: &HashMap<String, ReviewSummary>,
        services: &HashMap<String, ServiceAggregation>,
        names: &ResolvedNames,
    ) -> Vec<CustomerMetrics> {
        customers
            .into_iter()
            .map(|aggregate| {
                let review = reviews
                    .get(&aggregate.customer_id)
                    .copied()
                    .unwrap_or_default();
                let usage = services.get(&aggregate.customer_id);
                self.build_one(aggregate, review, usage, names)
            })
            .collect()
    }

    fn build_one(
        &self,
        aggregate: CustomerAggregate,
        review: ReviewSummary,
        usage: Option<&ServiceAggregation>,
        names: &ResolvedNames,
    ) -> CustomerMetrics {
        let visits = &aggregate.visits;
        let completed: Vec<&VisitRecord> = visits
            .iter()
            .filter(|v| v.status == VisitStatus::Completed)
            .collect();
        let cancelled = count_status(visits, VisitStatus::Cancelled);
        let no_show = count_status(visits, VisitStatus::NoShow);

        let total_appointments = visits.len();
        let total_visits = completed.len();

        let last_visit_date = visits.first().map(|v| v.created_at).unwrap_or(self.as_of);
        let first_visit_date = visits.last().map(|v| v.created_at).unwrap_or(self.as_of);

        let multiplier = self.config.percentage_multiplier;
        let cancellation_rate = rate(cancelled, total_appointments, multiplier);
        let no_show_rate = rate(no_show, total_appointments, multiplier);

        let lifetime_value = total_visits as f64 * self.config.average_service_price;

        let (total_services, favorite_service_name, favorite_staff_name) = match usage {
            Some(agg) => (
                agg.service_counts.total(),
                favorite_name(&agg.service_counts, &names.service_names),
                favorite_name(&agg.staff_counts, &names.staff_names),
            ),
            None => (0, UNRESOLVED_NAME.to_string(), UNRESOLVED_NAME.to_string()),
        };

        let window = self.config.recent_visit_window.min(completed.len());
        let avg_days_between_visits = mean_gap_days(&completed);
        let recent_avg_days_between_visits = mean_gap_days(&completed[..window]);

        let last_completed_visit_date = completed.first().map(|v| v.created_at);
        let first_completed_visit_date = completed.last().map(|v| v.created_at);
        let tenure_days = match (first_completed_visit_date, last_completed_visit_date) {
            (Some(first), Some(last)) => {
                ((last - first).num_seconds() as f64 / SECONDS_PER_DAY).round() as i64
            }
            _ => 0,
        };
        let projected_lifetime_value =
            self.projected_lifetime_value(total_visits, avg_days_between_visits);

        let segment = classify(
            &SegmentInputs {
                total_visits,
                first_visit_date,
                last_visit_date,
                lifetime_value,
                cancellation_rate,
            },
            &self.config.segmentation,
            self.as_of,
        );

        CustomerMetrics {
            customer_id: aggregate.customer_id,
            customer_name: aggregate.name,
            first_visit_date,
            last_visit_date,
            first_completed_visit_date,
            last_completed_visit_date,
            tenure_days,
            total_visits,
            total_appointments,
            completed_appointments: total_visits,
            cancelled_appointments: cancelled,
            no_show_appointments: no_show,
            cancellation_rate,
            no_show_rate,
            review_count: review.count,
            average_rating: review.average(),
            total_services,
            favorite_service_name,
            favorite_staff_name,
            lifetime_value,
            projected_lifetime_value,
            avg_days_between_visits,
            recent_avg_days_between_visits,
            segment,
            churn_risk: None,
        }
    }

    fn projected_lifetime_value(&self, total_visits: usize, avg_gap_days: f64) -> f64 {
        if total_visits == 0 {
            return 0.0;
        }
        let visits_per_year = if avg_gap_days > 0.0 {
            DAYS_PER_YEAR / avg_gap_days
        } else {
            total_visits as f64
        };
        (visits_per_year * self.config.average_service_price * self.config.projection_years).round()
    }
}

fn count_status(visits: &[VisitRecord], status: VisitStatus) -> usize {
    visits.iter().filter(|v| v.status == status).count()
}

fn rate(part: usize, whole: usize, multiplier: f64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * multiplier
}

fn favorite_name(counts: &OccurrenceCounter, names: &HashMap<String, String>) -> String {
    counts
        .most_frequent()
        .and_then(|(id, _)| names.get(id))
        .cloned()
        .unwrap_or_else(|| UNRESOLVED_NAME.to_string())
}

/// Mean gap in days between consecutive visits (newest first); 0 with fewer than two.
fn mean_gap_days(visits: &[&VisitRecord]) -> f64 {
    if visits.len() < 2 {
        return 0.0;
    }
    let total: f64 = visits
        .windows(2)
        .map(|pair| (pair[0].created_at - pair[1].created_at).num_seconds() as f64 / SECONDS_PER_DAY)
        .sum();
    total / (visits.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouper::{group_services_by_customer, group_visits_by_customer};
    use crate::types::{CustomerSegment, ServiceUsageRecord};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn visit(id: &str, customer: &str, status: VisitStatus, at: DateTime<Utc>) -> VisitRecord {
        VisitRecord {
            id: id.into(),
            customer_id: customer.into(),
            customer_name: Some("Dana".into()),
            staff_id: None,
            created_at: at,
            status,
        }
    }

    fn build(visits: &[VisitRecord], usage: &[ServiceUsageRecord], names: &ResolvedNames) -> Vec<CustomerMetrics> {
        let config = InsightsConfig::default();
        let grouping = group_visits_by_customer(visits);
        let services = group_services_by_customer(usage, &grouping);
        MetricsBuilder::new(&config, date(2025, 3, 15)).build(
            grouping.customers,
            &HashMap::new(),
            &services.aggregations,
            names,
        )
    }

    #[test]
    fn two_completed_visits_without_reviews_or_usage() {
        let visits = vec![
            visit("v2", "c1", VisitStatus::Completed, date(2025, 3, 1)),
            visit("v1", "c1", VisitStatus::Completed, date(2025, 1, 1)),
        ];
        let metrics = build(&visits, &[], &ResolvedNames::default());
        assert_eq!(metrics.len(), 1);
        let m = &metrics[0];
        assert_eq!(m.total_visits, 2);
        assert_eq!(m.total_appointments, 2);
        assert_eq!(m.cancellation_rate, 0.0);
        assert_eq!(m.first_visit_date, date(2025, 1, 1));
        assert_eq!(m.last_visit_date, date(2025, 3, 1));
        assert_eq!(m.favorite_service_name, UNRESOLVED_NAME);
        assert_eq!(m.favorite_staff_name, UNRESOLVED_NAME);
        assert_eq!(m.average_rating, 0.0);
        assert_eq!(m.review_count, 0);
        assert!((m.lifetime_value - 150.0).abs() < 1e-9);
        assert!((m.avg_days_between_visits - 59.0).abs() < 1e-9);
    }

    #[test]
    fn tenure_and_projection_from_completed_visits() {
        let visits = vec![
            visit("v4", "c1", VisitStatus::Cancelled, date(2025, 3, 10)),
            visit("v3", "c1", VisitStatus::Completed, date(2025, 2, 10)),
            visit("v2", "c1", VisitStatus::Completed, date(2025, 1, 21)),
            visit("v1", "c1", VisitStatus::Completed, date(2025, 1, 1)),
            visit("v0", "c1", VisitStatus::NoShow, date(2024, 12, 20)),
        ];
        let m = &build(&visits, &[], &ResolvedNames::default())[0];
        assert_eq!(m.first_completed_visit_date, Some(date(2025, 1, 1)));
        assert_eq!(m.tenure_days, 40);
        // 365 / 20 days = 18.25 visits a year x 75 x 3 years
        assert!((m.avg_days_between_visits - 20.0).abs() < 1e-9);
        assert_eq!(m.projected_lifetime_value, 4106.0);
    }

    #[test]
    fn single_visit_projects_from_visit_count() {
        let visits = vec![visit("v1", "c1", VisitStatus::Completed, date(2025, 3, 1))];
        let m = &build(&visits, &[], &ResolvedNames::default())[0];
        assert_eq!(m.tenure_days, 0);
        assert_eq!(m.projected_lifetime_value, 225.0);
    }

    #[test]
    fn no_completed_visits_projects_nothing() {
        let visits = vec![visit("v1", "c1", VisitStatus::Cancelled, date(2025, 3, 1))];
        let m = &build(&visits, &[], &ResolvedNames::default())[0];
        assert_eq!(m.first_completed_visit_date, None);
        assert_eq!(m.tenure_days, 0);
        assert_eq!(m.projected_lifetime_value, 0.0);
    }

    #[test]
    fn status_partition_and_rates() {
        let visits = vec![
            visit("v4", "c1", VisitStatus::Other, date(2025, 3, 4)),
            visit("v3", "c1", VisitStatus::NoShow, date(2025, 3, 3)),
            visit("v2", "c1", VisitStatus::Cancelled, date(2025, 3, 2)),
            visit("v1", "c1", VisitStatus::Completed, date(2025, 3, 1)),
        ];
        let m = &build(&visits, &[], &ResolvedNames::default())[0];
        assert_eq!(m.total_appointments, 4);
        assert_eq!(m.completed_appointments, 1);
        assert_eq!(m.cancelled_appointments, 1);
        assert_eq!(m.no_show_appointments, 1);
        assert!(
            m.completed_appointments + m.cancelled_appointments + m.no_show_appointments
                < m.total_appointments
        );
        assert!((m.cancellation_rate - 25.0).abs() < 1e-9);
        assert!((m.no_show_rate - 25.0).abs() < 1e-9);
        assert_eq!(m.last_completed_visit_date, Some(date(2025, 3, 1)));
    }

    #[test]
    fn favorites_resolve_through_names_with_first_seen_tie_break() {
        let visits = vec![visit("v1", "c1", VisitStatus::Completed, date(2025, 3, 1))];
        let usage = vec![
            ServiceUsageRecord {
                visit_id: "v1".into(),
                service_id: Some("svc-cut".into()),
                staff_id: Some("st-ana".into()),
            },
            ServiceUsageRecord {
                visit_id: "v1".into(),
                service_id: Some("svc-color".into()),
                staff_id: Some("st-bo".into()),
            },
        ];
        let mut names = ResolvedNames::default();
        names.service_names.insert("svc-cut".into(), "Haircut".into());
        names.service_names.insert("svc-color".into(), "Color".into());
        let m = &build(&visits, &usage, &names)[0];
        assert_eq!(m.favorite_service_name, "Haircut");
        // st-ana has no resolvable name.
        assert_eq!(m.favorite_staff_name, UNRESOLVED_NAME);
        assert_eq!(m.total_services, 2);
    }

    #[test]
    fn reviews_average_per_customer() {
        let reviews = vec![
            ReviewRecord { customer_id: "c1".into(), rating: 5.0 },
            ReviewRecord { customer_id: "c1".into(), rating: 4.0 },
            ReviewRecord { customer_id: "c2".into(), rating: 3.0 },
        ];
        let summaries = summarize_reviews(&reviews);
        assert_eq!(summaries["c1"].count, 2);
        assert!((summaries["c1"].average() - 4.5).abs() < 1e-9);
        assert_eq!(ReviewSummary::default().average(), 0.0);
    }

    #[test]
    fn review_only_customer_is_not_aggregated() {
        let config = InsightsConfig::default();
        let visits = vec![visit("v1", "c1", VisitStatus::Completed, date(2025, 3, 1))];
        let grouping = group_visits_by_customer(&visits);
        let reviews = summarize_reviews(&[ReviewRecord {
            customer_id: "ghost".into(),
            rating: 5.0,
        }]);
        let metrics = MetricsBuilder::new(&config, date(2025, 3, 15)).build(
            grouping.customers,
            &reviews,
            &HashMap::new(),
            &ResolvedNames::default(),
        );
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].customer_id, "c1");
    }

    #[test]
    fn segment_is_assigned() {
        let visits = vec![visit("v1", "c1", VisitStatus::Completed, date(2025, 3, 1))];
        let m = &build(&visits, &[], &ResolvedNames::default())[0];
        assert_eq!(m.segment, CustomerSegment::New);
    }

    #[test]
    fn recent_gap_uses_window_of_newest_completed_visits() {
        let visits = vec![
            visit("v4", "c1", VisitStatus::Completed, date(2025, 3, 11)),
            visit("v3", "c1", VisitStatus::Completed, date(2025, 3, 1)),
            visit("v2", "c1", VisitStatus::Completed, date(2025, 2, 19)),
            visit("v1", "c1", VisitStatus::Completed, date(2024, 12, 11)),
        ];
        let m = &build(&visits, &[], &ResolvedNames::default())[0];
        // Newest three: gaps of 10 and 10 days.
        assert!((m.recent_avg_days_between_visits - 10.0).abs() < 1e-9);
        // All four: 90 days over 3 gaps.
        assert!((m.avg_days_between_visits - 30.0).abs() < 1e-9);
    }

    #[test]
    fn building_twice_is_identical() {
        let visits = vec![
            visit("v2", "c2", VisitStatus::Cancelled, date(2025, 3, 2)),
            visit("v1", "c1", VisitStatus::Completed, date(2025, 3, 1)),
        ];
        let a = build(&visits, &[], &ResolvedNames::default());
        let b = build(&visits, &[], &ResolvedNames::default());
        assert_eq!(a, b);
    }
}
