use std::cmp::Ordering;

use crate::candidate_pipeline::stage_name;

/// Ranks candidates after scoring and cuts the list down.
pub trait Selector<Q, C>: Send + Sync
where
    Q: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    /// Sort descending by `score`, then truncate to `size`.
    fn select(&self, _query: &Q, candidates: Vec<C>) -> Vec<C> {
        let mut sorted = self.sort(candidates);
        if let Some(limit) = self.size() {
            sorted.truncate(limit);
        }
        sorted
    }

    fn enable(&self, _query: &Q) -> bool {
        true
    }

    fn score(&self, candidate: &C) -> f64;

    /// Descending by score. The sort is stable, so equal scores keep their
    /// incoming order, and NaN scores sink to the bottom.
    fn sort(&self, candidates: Vec<C>) -> Vec<C> {
        let mut sorted = candidates;
        sorted.sort_by(|a, b| {
            let (sa, sb) = (self.score(a), self.score(b));
            match (sa.is_nan(), sb.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => sb.partial_cmp(&sa).unwrap_or(Ordering::Equal),
            }
        });
        sorted
    }

    /// Maximum number of candidates to keep; `None` keeps all.
    fn size(&self) -> Option<usize> {
        None
    }

    fn name(&self) -> &'static str {
        stage_name::<Self>()
    }
}
