use async_trait::async_trait;

use crate::candidate_pipeline::stage_name;
use crate::error::InsightsResult;

/// Fills in query fields before any candidate is fetched.
#[async_trait]
pub trait QueryHydrator<Q>: Send + Sync
where
    Q: Clone + Send + Sync + 'static,
{
    fn enable(&self, _query: &Q) -> bool {
        true
    }

    /// Returns a copy of the query with this hydrator's fields set.
    async fn hydrate(&self, query: &Q) -> InsightsResult<Q>;

    /// Copy only the fields this hydrator owns.
    fn update(&self, query: &mut Q, hydrated: Q);

    fn name(&self) -> &'static str {
        stage_name::<Self>()
    }
}
