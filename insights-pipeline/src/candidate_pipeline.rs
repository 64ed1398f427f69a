//! The candidate pipeline driver.
//!
//! Stage order: query hydrators → sources → filters → scorers → selector →
//! side effects. Source errors abort the run; a failing hydrator, filter or
//! scorer is logged and skipped so one bad stage cannot empty the result.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::InsightsResult;
use crate::filter::{Filter, FilterResult};
use crate::query_hydrator::QueryHydrator;
use crate::scorer::Scorer;
use crate::selector::Selector;
use crate::side_effect::{SideEffect, SideEffectInput};
use crate::source::Source;

/// Queries carry a request id so every log line of a run can be correlated.
pub trait HasRequestId {
    fn request_id(&self) -> &str;
}

/// Short type name of a stage: `"my_crate::components::SegmentFilter"` → `"SegmentFilter"`.
pub fn stage_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Everything a run produced, stage by stage.
#[derive(Clone, Debug)]
pub struct PipelineResult<Q, C> {
    /// The query after hydration.
    pub query: Arc<Q>,
    /// Every candidate the sources returned, before filtering.
    pub retrieved_candidates: Vec<C>,
    /// Candidates removed by filters.
    pub filtered_candidates: Vec<C>,
    /// Ranked, truncated output.
    pub selected_candidates: Vec<C>,
}

#[async_trait]
pub trait CandidatePipeline<Q, C>: Send + Sync
where
    Q: HasRequestId + Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    fn query_hydrators(&self) -> &[Box<dyn QueryHydrator<Q>>];
    fn sources(&self) -> &[Box<dyn Source<Q, C>>];
    fn filters(&self) -> &[Box<dyn Filter<Q, C>>];
    fn scorers(&self) -> &[Box<dyn Scorer<Q, C>>];
    fn selector(&self) -> &dyn Selector<Q, C>;
    fn side_effects(&self) -> Arc<Vec<Box<dyn SideEffect<Q, C>>>>;

    async fn execute(&self, query: Q) -> InsightsResult<PipelineResult<Q, C>> {
        let query = self.hydrate_query(query).await;
        let retrieved_candidates = self.fetch_candidates(&query).await?;
        let (kept, filtered_candidates) = self.filter(&query, retrieved_candidates.clone()).await;
        let scored = self.score(&query, kept).await;

        let selector = self.selector();
        let selected_candidates = if selector.enable(&query) {
            selector.select(&query, scored)
        } else {
            scored
        };

        log::info!(
            "request_id={} retrieved={} filtered={} selected={}",
            query.request_id(),
            retrieved_candidates.len(),
            filtered_candidates.len(),
            selected_candidates.len()
        );

        let query = Arc::new(query);
        self.run_side_effects(Arc::new(SideEffectInput {
            query: Arc::clone(&query),
            selected_candidates: selected_candidates.clone(),
        }));

        Ok(PipelineResult {
            query,
            retrieved_candidates,
            filtered_candidates,
            selected_candidates,
        })
    }

    async fn hydrate_query(&self, query: Q) -> Q {
        let mut query = query;
        for hydrator in self.query_hydrators() {
            if !hydrator.enable(&query) {
                continue;
            }
            match hydrator.hydrate(&query).await {
                Ok(hydrated) => hydrator.update(&mut query, hydrated),
                Err(e) => log::warn!(
                    "request_id={} query hydrator {} failed: {}",
                    query.request_id(),
                    hydrator.name(),
                    e
                ),
            }
        }
        query
    }

    async fn fetch_candidates(&self, query: &Q) -> InsightsResult<Vec<C>> {
        let mut candidates = Vec::new();
        for source in self.sources().iter().filter(|s| s.enable(query)) {
            let fetched = source.get_candidates(query).await.map_err(|e| {
                log::error!(
                    "request_id={} source {} failed: {}",
                    query.request_id(),
                    source.name(),
                    e
                );
                e
            })?;
            log::debug!(
                "request_id={} source {} returned {} candidates",
                query.request_id(),
                source.name(),
                fetched.len()
            );
            candidates.extend(fetched);
        }
        Ok(candidates)
    }

    async fn filter(&self, query: &Q, candidates: Vec<C>) -> (Vec<C>, Vec<C>) {
        let mut kept = candidates;
        let mut removed = Vec::new();
        for filter in self.filters().iter().filter(|f| f.enable(query)) {
            let backup = kept.clone();
            match filter.filter(query, kept).await {
                Ok(FilterResult {
                    kept: next,
                    removed: dropped,
                }) => {
                    kept = next;
                    removed.extend(dropped);
                }
                Err(e) => {
                    log::warn!(
                        "request_id={} filter {} failed: {}",
                        query.request_id(),
                        filter.name(),
                        e
                    );
                    kept = backup;
                }
            }
        }
        (kept, removed)
    }

    async fn score(&self, query: &Q, candidates: Vec<C>) -> Vec<C> {
        let mut candidates = candidates;
        for scorer in self.scorers().iter().filter(|s| s.enable(query)) {
            match scorer.score(query, &candidates).await {
                Ok(scored) if scored.len() == candidates.len() => {
                    for (candidate, partial) in candidates.iter_mut().zip(scored) {
                        scorer.update(candidate, partial);
                    }
                }
                Ok(scored) => log::warn!(
                    "request_id={} scorer {} returned {} results for {} candidates",
                    query.request_id(),
                    scorer.name(),
                    scored.len(),
                    candidates.len()
                ),
                Err(e) => log::warn!(
                    "request_id={} scorer {} failed: {}",
                    query.request_id(),
                    scorer.name(),
                    e
                ),
            }
        }
        candidates
    }

    fn run_side_effects(&self, input: Arc<SideEffectInput<Q, C>>) {
        let side_effects = self.side_effects();
        if side_effects.is_empty() {
            return;
        }
        tokio::spawn(async move {
            for side_effect in side_effects.iter() {
                if !side_effect.enable(Arc::clone(&input.query)) {
                    continue;
                }
                if let Err(e) = side_effect.run(Arc::clone(&input)).await {
                    log::warn!(
                        "request_id={} side effect {} failed: {}",
                        input.query.request_id(),
                        side_effect.name(),
                        e
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SegmentFilter;

    #[test]
    fn stage_name_strips_module_path() {
        assert_eq!(stage_name::<SegmentFilter>(), "SegmentFilter");
        assert_eq!(stage_name::<str>(), "str");
    }
}
