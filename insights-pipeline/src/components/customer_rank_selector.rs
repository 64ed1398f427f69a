use crate::outreach;
use crate::selector::Selector;
use crate::types::{CustomerMetrics, InsightsQuery};

/// Ranks customers by lifetime value, highest first, or by last completed
/// visit when the query asks for an outreach list.
///
/// Ties keep source order. The query's `limit` is the cut-off; without
/// one everyone is kept.
pub struct CustomerRankSelector;

impl Selector<InsightsQuery, CustomerMetrics> for CustomerRankSelector {
    fn select(&self, query: &InsightsQuery, candidates: Vec<CustomerMetrics>) -> Vec<CustomerMetrics> {
        let mut ranked = match query.outreach {
            Some(list) => outreach::rank(list, candidates),
            None => self.sort(candidates),
        };
        if let Some(limit) = query.limit {
            ranked.truncate(limit);
        }
        ranked
    }

    fn score(&self, candidate: &CustomerMetrics) -> f64 {
        candidate.lifetime_value
    }
}
