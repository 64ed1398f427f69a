use async_trait::async_trait;
use chrono::Utc;

use crate::error::InsightsResult;
use crate::query_hydrator::QueryHydrator;
use crate::types::InsightsQuery;

/// Pins the reference instant for the run.
///
/// Every recency rule downstream reads `as_of`, so it is fixed once here
/// and a run never observes the clock moving.
pub struct AsOfQueryHydrator;

#[async_trait]
impl QueryHydrator<InsightsQuery> for AsOfQueryHydrator {
    fn enable(&self, query: &InsightsQuery) -> bool {
        query.as_of.is_none()
    }

    async fn hydrate(&self, query: &InsightsQuery) -> InsightsResult<InsightsQuery> {
        Ok(InsightsQuery {
            as_of: Some(Utc::now()),
            ..query.clone()
        })
    }

    fn update(&self, query: &mut InsightsQuery, hydrated: InsightsQuery) {
        query.as_of = hydrated.as_of;
    }
}
