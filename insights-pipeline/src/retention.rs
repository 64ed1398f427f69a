//! Retention and cohort views over per-customer metrics.
//!
//! Only completed visits count: a customer with none is outside both views.

use std::collections::BTreeMap;

use crate::types::{Cohort, CustomerMetrics, RetentionBreakdown};

/// Customers with exactly one completed visit are new, the rest returning.
/// Rates are rounded to one decimal place.
pub fn retention_breakdown(metrics: &[CustomerMetrics]) -> RetentionBreakdown {
    let total_customers = metrics.iter().filter(|m| m.total_visits > 0).count();
    if total_customers == 0 {
        return RetentionBreakdown::default();
    }

    let new_customers = metrics.iter().filter(|m| m.total_visits == 1).count();
    let returning_customers = total_customers - new_customers;
    let retention_rate = returning_customers as f64 / total_customers as f64 * 100.0;

    RetentionBreakdown {
        total_customers,
        new_customers,
        returning_customers,
        retention_rate: round_one_decimal(retention_rate),
        churn_rate: round_one_decimal(100.0 - retention_rate),
    }
}

/// Group customers by the month of their earliest completed visit,
/// newest month first.
pub fn cohorts(metrics: &[CustomerMetrics]) -> Vec<Cohort> {
    let mut by_month: BTreeMap<String, usize> = BTreeMap::new();
    for first in metrics.iter().filter_map(|m| m.first_completed_visit_date) {
        *by_month.entry(first.format("%Y-%m").to_string()).or_insert(0) += 1;
    }

    by_month
        .into_iter()
        .rev()
        .map(|(cohort_month, customer_count)| Cohort {
            cohort_month,
            customer_count,
        })
        .collect()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
