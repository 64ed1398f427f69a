use async_trait::async_trait;
use chrono::Utc;

use crate::config::OutreachPolicy;
use crate::error::InsightsResult;
use crate::filter::{Filter, FilterResult};
use crate::outreach::{in_window, window_for};
use crate::types::{CustomerMetrics, InsightsQuery};

/// Keeps customers whose last completed visit falls inside the requested
/// outreach list's window. Inactive unless the query names a list.
pub struct RecencyWindowFilter {
    policy: OutreachPolicy,
}

impl RecencyWindowFilter {
    pub fn new(policy: OutreachPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Filter<InsightsQuery, CustomerMetrics> for RecencyWindowFilter {
    fn enable(&self, query: &InsightsQuery) -> bool {
        query.outreach.is_some()
    }

    async fn filter(
        &self,
        query: &InsightsQuery,
        candidates: Vec<CustomerMetrics>,
    ) -> InsightsResult<FilterResult<CustomerMetrics>> {
        let Some(list) = query.outreach else {
            return Ok(FilterResult {
                kept: candidates,
                removed: Vec::new(),
            });
        };
        let window = window_for(list, &self.policy);
        let as_of = query.as_of.unwrap_or_else(Utc::now);
        let (kept, removed) = candidates
            .into_iter()
            .partition(|c| in_window(c, window, as_of));
        Ok(FilterResult { kept, removed })
    }
}
