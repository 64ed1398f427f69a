use std::sync::Arc;

use async_trait::async_trait;

use crate::candidate_pipeline::stage_name;
use crate::error::InsightsResult;

/// What a side effect gets to see once selection is done.
#[derive(Clone)]
pub struct SideEffectInput<Q, C> {
    pub query: Arc<Q>,
    pub selected_candidates: Vec<C>,
}

/// Fire-and-forget work after selection (logging, cache warming). Runs on
/// its own task and can never change the pipeline result.
#[async_trait]
pub trait SideEffect<Q, C>: Send + Sync
where
    Q: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    fn enable(&self, _query: Arc<Q>) -> bool {
        true
    }

    async fn run(&self, input: Arc<SideEffectInput<Q, C>>) -> InsightsResult<()>;

    fn name(&self) -> &'static str {
        stage_name::<Self>()
    }
}
