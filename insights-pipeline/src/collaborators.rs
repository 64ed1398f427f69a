//! Seams to the outside world.
//!
//! The engine never talks to storage directly. A `RecordFetcher` hands it
//! tenant-scoped records and a `NameResolver` turns staff/service ids into
//! display names. Errors from either propagate to the caller unchanged.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::InsightsResult;
use crate::types::{ReviewRecord, ServiceUsageRecord, VisitRecord};

#[async_trait]
pub trait RecordFetcher: Send + Sync {
    /// All visits of the tenant, ordered most-recent-first.
    async fn fetch_visits(&self, tenant_id: &str) -> InsightsResult<Vec<VisitRecord>>;

    async fn fetch_reviews(
        &self,
        tenant_id: &str,
        customer_ids: &[String],
    ) -> InsightsResult<Vec<ReviewRecord>>;

    async fn fetch_service_usage(
        &self,
        tenant_id: &str,
        visit_ids: &[String],
    ) -> InsightsResult<Vec<ServiceUsageRecord>>;
}

/// Display names keyed by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedNames {
    pub staff_names: HashMap<String, String>,
    pub service_names: HashMap<String, String>,
}

#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Batched lookup. Ids with no known name are simply absent from the result.
    async fn resolve_names(
        &self,
        staff_ids: &[String],
        service_ids: &[String],
    ) -> InsightsResult<ResolvedNames>;
}
