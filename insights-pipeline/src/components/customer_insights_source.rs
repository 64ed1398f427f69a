use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::collaborators::{NameResolver, RecordFetcher, ResolvedNames};
use crate::config::InsightsConfig;
use crate::error::InsightsResult;
use crate::grouper::{group_services_by_customer, group_visits_by_customer};
use crate::metrics::{summarize_reviews, MetricsBuilder};
use crate::source::Source;
use crate::types::{CustomerMetrics, InsightsQuery};

/// Builds one `CustomerMetrics` per customer of the tenant.
///
/// Flow: fetch visits, group them per customer, fetch reviews and service
/// usage concurrently for the grouped ids, resolve staff and service names,
/// then build metrics. A tenant with no visits yields no candidates and
/// triggers no further fetches. Any collaborator error aborts the source.
pub struct CustomerInsightsSource {
    fetcher: Arc<dyn RecordFetcher>,
    resolver: Arc<dyn NameResolver>,
    config: Arc<InsightsConfig>,
}

impl CustomerInsightsSource {
    pub fn new(
        fetcher: Arc<dyn RecordFetcher>,
        resolver: Arc<dyn NameResolver>,
        config: Arc<InsightsConfig>,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            config,
        }
    }
}

#[async_trait]
impl Source<InsightsQuery, CustomerMetrics> for CustomerInsightsSource {
    fn enable(&self, query: &InsightsQuery) -> bool {
        !query.tenant_id.is_empty()
    }

    async fn get_candidates(&self, query: &InsightsQuery) -> InsightsResult<Vec<CustomerMetrics>> {
        let tenant = query.tenant_id.as_str();
        let visits = self.fetcher.fetch_visits(tenant).await?;
        let grouping = group_visits_by_customer(&visits);
        if grouping.is_empty() {
            log::debug!("request_id={} tenant={} has no visits", query.request_id, tenant);
            return Ok(Vec::new());
        }

        let customer_ids = grouping.customer_ids();
        let visit_ids = grouping.visit_ids();
        let (reviews, usage) = tokio::join!(
            self.fetcher.fetch_reviews(tenant, &customer_ids),
            self.fetcher.fetch_service_usage(tenant, &visit_ids),
        );
        let reviews = summarize_reviews(&reviews?);
        let usage_index = group_services_by_customer(&usage?, &grouping);

        let names = if usage_index.staff_ids.is_empty() && usage_index.service_ids.is_empty() {
            ResolvedNames::default()
        } else {
            self.resolver
                .resolve_names(&usage_index.staff_ids, &usage_index.service_ids)
                .await?
        };

        let as_of = query.as_of.unwrap_or_else(Utc::now);
        let metrics = MetricsBuilder::new(&self.config, as_of).build(
            grouping.customers,
            &reviews,
            &usage_index.aggregations,
            &names,
        );

        log::debug!(
            "request_id={} tenant={} visits={} customers={}",
            query.request_id,
            tenant,
            visits.len(),
            metrics.len()
        );
        Ok(metrics)
    }
}
