use crate::config::InsightsConfig;
use crate::types::{CustomerMetrics, CustomerSegment, InsightsSummary, SegmentCounts};

/// Roll customer metrics up into a tenant summary.
///
/// `observed_customers` is the number of distinct customers in the visit
/// source and is the denominator for every average and rate; active and
/// segment counts come from `metrics`. When `metrics` is a truncated sample
/// the two disagree, so callers should pass the full list.
/// With no customers every average and the retention rate are 0 and the
/// churn rate is the full percentage.
pub fn summarize(
    metrics: &[CustomerMetrics],
    observed_customers: usize,
    config: &InsightsConfig,
) -> InsightsSummary {
    let mut segmentation = SegmentCounts::default();
    for m in metrics {
        segmentation.record(m.segment);
    }

    let active_customers = metrics
        .iter()
        .filter(|m| m.segment != CustomerSegment::Churned)
        .count();

    let multiplier = config.percentage_multiplier;
    if observed_customers == 0 {
        return InsightsSummary {
            total_customers: 0,
            active_customers,
            avg_lifetime_value: 0.0,
            avg_visits_per_customer: 0.0,
            retention_rate: 0.0,
            churn_rate: multiplier,
            segmentation,
        };
    }

    let total = observed_customers as f64;
    let lifetime_value_sum: f64 = metrics.iter().map(|m| m.lifetime_value).sum();
    let visit_sum: usize = metrics.iter().map(|m| m.total_visits).sum();
    let retention_rate = active_customers as f64 / total * multiplier;

    InsightsSummary {
        total_customers: observed_customers,
        active_customers,
        avg_lifetime_value: lifetime_value_sum / total,
        avg_visits_per_customer: visit_sum as f64 / total,
        retention_rate,
        churn_rate: multiplier - retention_rate,
        segmentation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, visits: usize, segment: CustomerSegment) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: id.into(),
            total_visits: visits,
            lifetime_value: visits as f64 * 75.0,
            segment,
            ..CustomerMetrics::default()
        }
    }

    #[test]
    fn empty_tenant_is_zero_guarded() {
        let summary = summarize(&[], 0, &InsightsConfig::default());
        assert_eq!(summary.total_customers, 0);
        assert_eq!(summary.avg_lifetime_value, 0.0);
        assert_eq!(summary.avg_visits_per_customer, 0.0);
        assert_eq!(summary.retention_rate, 0.0);
        assert_eq!(summary.churn_rate, 100.0);
        assert!(!summary.churn_rate.is_nan());
    }

    #[test]
    fn rates_and_averages_over_observed_customers() {
        let metrics = vec![
            customer("a", 4, CustomerSegment::Loyal),
            customer("b", 2, CustomerSegment::New),
            customer("c", 0, CustomerSegment::Churned),
            customer("d", 2, CustomerSegment::Churned),
        ];
        let summary = summarize(&metrics, metrics.len(), &InsightsConfig::default());
        assert_eq!(summary.total_customers, 4);
        assert_eq!(summary.active_customers, 2);
        assert!((summary.avg_visits_per_customer - 2.0).abs() < 1e-9);
        assert!((summary.avg_lifetime_value - 150.0).abs() < 1e-9);
        assert!((summary.retention_rate - 50.0).abs() < 1e-9);
        assert!((summary.churn_rate - 50.0).abs() < 1e-9);
        assert_eq!(summary.segmentation.churned, 2);
        assert_eq!(summary.segmentation.total(), metrics.len());
    }

    #[test]
    fn sampled_metrics_divide_by_observed_total() {
        let metrics = vec![customer("a", 10, CustomerSegment::Vip)];
        let summary = summarize(&metrics, 4, &InsightsConfig::default());
        assert_eq!(summary.total_customers, 4);
        assert_eq!(summary.active_customers, 1);
        assert!((summary.retention_rate - 25.0).abs() < 1e-9);
        assert_eq!(summary.segmentation.total(), 1);
    }
}
