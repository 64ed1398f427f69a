use async_trait::async_trait;

use crate::candidate_pipeline::stage_name;
use crate::error::InsightsResult;

/// Scorers compute derived fields for every kept candidate.
///
/// `score` returns one partial candidate per input, in the same order;
/// `update` copies only the fields this scorer owns onto the real
/// candidate. A result of the wrong length is discarded.
#[async_trait]
pub trait Scorer<Q, C>: Send + Sync
where
    Q: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    fn enable(&self, _query: &Q) -> bool {
        true
    }

    async fn score(&self, query: &Q, candidates: &[C]) -> InsightsResult<Vec<C>>;

    fn update(&self, candidate: &mut C, scored: C);

    fn name(&self) -> &'static str {
        stage_name::<Self>()
    }
}
