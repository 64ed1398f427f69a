use async_trait::async_trait;

use crate::candidate_pipeline::stage_name;
use crate::error::InsightsResult;

/// Produces the pipeline's candidates. Source errors abort the run and
/// reach the caller unchanged.
#[async_trait]
pub trait Source<Q, C>: Send + Sync
where
    Q: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    /// Whether this source contributes to the given query.
    fn enable(&self, _query: &Q) -> bool {
        true
    }

    async fn get_candidates(&self, query: &Q) -> InsightsResult<Vec<C>>;

    /// Stable name for logging.
    fn name(&self) -> &'static str {
        stage_name::<Self>()
    }
}
