use async_trait::async_trait;

use crate::candidate_pipeline::stage_name;
use crate::error::InsightsResult;

/// Candidates split by a filter. `removed` is kept for reporting.
pub struct FilterResult<C> {
    pub kept: Vec<C>,
    pub removed: Vec<C>,
}

/// Filters run one after another; each sees only what the previous kept.
#[async_trait]
pub trait Filter<Q, C>: Send + Sync
where
    Q: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    fn enable(&self, _query: &Q) -> bool {
        true
    }

    /// Partition candidates. A failing filter is skipped and its input
    /// passes through untouched.
    async fn filter(&self, query: &Q, candidates: Vec<C>) -> InsightsResult<FilterResult<C>>;

    fn name(&self) -> &'static str {
        stage_name::<Self>()
    }
}
