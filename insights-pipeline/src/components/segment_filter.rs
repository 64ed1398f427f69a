use async_trait::async_trait;

use crate::error::InsightsResult;
use crate::filter::{Filter, FilterResult};
use crate::types::{CustomerMetrics, InsightsQuery};

/// Keeps only customers in the query's segment. Inactive without one.
pub struct SegmentFilter;

#[async_trait]
impl Filter<InsightsQuery, CustomerMetrics> for SegmentFilter {
    fn enable(&self, query: &InsightsQuery) -> bool {
        query.segment.is_some()
    }

    async fn filter(
        &self,
        query: &InsightsQuery,
        candidates: Vec<CustomerMetrics>,
    ) -> InsightsResult<FilterResult<CustomerMetrics>> {
        let (kept, removed) = candidates
            .into_iter()
            .partition(|c| Some(c.segment) == query.segment);
        Ok(FilterResult { kept, removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CustomerSegment;

    fn customer(id: &str, segment: CustomerSegment) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: id.into(),
            segment,
            ..CustomerMetrics::default()
        }
    }

    #[tokio::test]
    async fn keeps_only_requested_segment_in_order() {
        let query = InsightsQuery::new("req", "salon-1").with_segment(CustomerSegment::Vip);
        let candidates = vec![
            customer("a", CustomerSegment::Vip),
            customer("b", CustomerSegment::Regular),
            customer("c", CustomerSegment::Vip),
        ];
        let result = SegmentFilter.filter(&query, candidates).await.unwrap();
        let kept: Vec<&str> = result.kept.iter().map(|c| c.customer_id.as_str()).collect();
        assert_eq!(kept, vec!["a", "c"]);
        assert_eq!(result.removed.len(), 1);
    }

    #[test]
    fn disabled_without_segment() {
        assert!(!SegmentFilter.enable(&InsightsQuery::new("req", "salon-1")));
    }
}
