use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::candidate_pipeline::{CandidatePipeline, PipelineResult};
use crate::collaborators::{NameResolver, RecordFetcher};
use crate::components::as_of_query_hydrator::AsOfQueryHydrator;
use crate::components::churn_risk_scorer::ChurnRiskScorer;
use crate::components::customer_insights_source::CustomerInsightsSource;
use crate::components::customer_rank_selector::CustomerRankSelector;
use crate::components::insights_log_side_effect::InsightsLogSideEffect;
use crate::components::recency_window_filter::RecencyWindowFilter;
use crate::components::segment_filter::SegmentFilter;
use crate::config::InsightsConfig;
use crate::error::InsightsResult;
use crate::filter::Filter;
use crate::outreach;
use crate::query_hydrator::QueryHydrator;
use crate::record_loader::InMemoryRecords;
use crate::retention;
use crate::scorer::Scorer;
use crate::selector::Selector;
use crate::side_effect::SideEffect;
use crate::source::Source;
use crate::summary::summarize;
use crate::types::{
    Cohort, CustomerMetrics, CustomerSegment, InsightsQuery, InsightsReport, InsightsSummary,
    OutreachList, ReactivationOpportunities, RetentionBreakdown,
};

/// The customer insights pipeline.
///
/// Pipeline flow:
/// 1. AsOfQueryHydrator pins the reference instant
/// 2. CustomerInsightsSource fetches, groups and builds per-customer metrics
/// 3. SegmentFilter keeps one segment when the query asks for it
/// 4. RecencyWindowFilter keeps an outreach list's recency window
/// 5. ChurnRiskScorer attaches a churn-risk assessment
/// 6. CustomerRankSelector ranks by lifetime value (or recency for outreach
///    lists) and applies the limit
/// 7. InsightsLogSideEffect logs a digest of the selection
pub struct CustomerInsightsPipeline {
    config: Arc<InsightsConfig>,
    query_hydrators: Vec<Box<dyn QueryHydrator<InsightsQuery>>>,
    sources: Vec<Box<dyn Source<InsightsQuery, CustomerMetrics>>>,
    filters: Vec<Box<dyn Filter<InsightsQuery, CustomerMetrics>>>,
    scorers: Vec<Box<dyn Scorer<InsightsQuery, CustomerMetrics>>>,
    selector: CustomerRankSelector,
    side_effects: Arc<Vec<Box<dyn SideEffect<InsightsQuery, CustomerMetrics>>>>,
}

impl CustomerInsightsPipeline {
    /// Pipeline with the default configuration.
    pub fn new(fetcher: Arc<dyn RecordFetcher>, resolver: Arc<dyn NameResolver>) -> Self {
        Self::with_config(fetcher, resolver, InsightsConfig::default())
    }

    pub fn with_config(
        fetcher: Arc<dyn RecordFetcher>,
        resolver: Arc<dyn NameResolver>,
        config: InsightsConfig,
    ) -> Self {
        let config = Arc::new(config);

        let query_hydrators: Vec<Box<dyn QueryHydrator<InsightsQuery>>> =
            vec![Box::new(AsOfQueryHydrator)];

        let sources: Vec<Box<dyn Source<InsightsQuery, CustomerMetrics>>> =
            vec![Box::new(CustomerInsightsSource::new(
                fetcher,
                resolver,
                Arc::clone(&config),
            ))];

        let filters: Vec<Box<dyn Filter<InsightsQuery, CustomerMetrics>>> =
            vec![
                Box::new(SegmentFilter),
                Box::new(RecencyWindowFilter::new(config.outreach.clone())),
            ];

        let scorers: Vec<Box<dyn Scorer<InsightsQuery, CustomerMetrics>>> =
            vec![Box::new(ChurnRiskScorer::new(config.churn_risk.clone()))];

        let side_effects: Arc<Vec<Box<dyn SideEffect<InsightsQuery, CustomerMetrics>>>> =
            Arc::new(vec![Box::new(InsightsLogSideEffect)]);

        Self {
            config,
            query_hydrators,
            sources,
            filters,
            scorers,
            selector: CustomerRankSelector,
            side_effects,
        }
    }

    /// Pipeline over records already loaded into memory.
    pub fn with_records(records: InMemoryRecords, config: InsightsConfig) -> Self {
        let records = Arc::new(records);
        Self::with_config(records.clone(), records, config)
    }

    /// Customers ranked by lifetime value, truncated to `query.limit`.
    pub async fn compute_customer_metrics(
        &self,
        query: InsightsQuery,
    ) -> InsightsResult<Vec<CustomerMetrics>> {
        Ok(self.execute(query).await?.selected_candidates)
    }

    /// Tenant rollup over every customer, ignoring the query's limit and
    /// segment.
    pub async fn compute_insights_summary(
        &self,
        query: InsightsQuery,
    ) -> InsightsResult<InsightsSummary> {
        let result = self.execute(unrestricted(query)).await?;
        Ok(self.summary_of(&result))
    }

    /// Customers of one segment, ranked and truncated like
    /// `compute_customer_metrics`.
    pub async fn filter_by_segment(
        &self,
        query: InsightsQuery,
        segment: CustomerSegment,
    ) -> InsightsResult<Vec<CustomerMetrics>> {
        self.compute_customer_metrics(query.with_segment(segment)).await
    }

    /// Lapsing customers, longest absence first. Without a query limit
    /// the list is capped at the configured `at_risk_limit`. The query's
    /// segment is ignored.
    pub async fn at_risk_customers(&self, query: InsightsQuery) -> InsightsResult<Vec<CustomerMetrics>> {
        let limit = query.limit.unwrap_or(self.config.outreach.at_risk_limit);
        let query = InsightsQuery {
            segment: None,
            ..query
        }
        .with_outreach(OutreachList::AtRisk)
        .with_limit(limit);
        Ok(self.execute(query).await?.selected_candidates)
    }

    /// Lapsed customers worth winning back, shortest absence first. The
    /// total counts every customer in the window before `query.limit`;
    /// the query's segment is ignored.
    pub async fn reactivation_opportunities(
        &self,
        query: InsightsQuery,
    ) -> InsightsResult<ReactivationOpportunities> {
        let limit = query.limit;
        let query = unrestricted(query).with_outreach(OutreachList::Reactivation);
        let mut customers = self.execute(query).await?.selected_candidates;
        let total_opportunities = customers.len();
        if let Some(limit) = limit {
            customers.truncate(limit);
        }
        Ok(ReactivationOpportunities {
            total_opportunities,
            customers,
        })
    }

    pub async fn retention_breakdown(&self, tenant_id: &str) -> InsightsResult<RetentionBreakdown> {
        let result = self.execute(tenant_wide(tenant_id, "retention")).await?;
        Ok(retention::retention_breakdown(&result.retrieved_candidates))
    }

    pub async fn cohorts(&self, tenant_id: &str) -> InsightsResult<Vec<Cohort>> {
        let result = self.execute(tenant_wide(tenant_id, "cohorts")).await?;
        Ok(retention::cohorts(&result.retrieved_candidates))
    }

    /// Summary, retention, cohorts, outreach lists and the ranked customer
    /// list in one go.
    ///
    /// The pipeline runs once without restrictions and every view is
    /// derived from that single fetch. The query's segment and limit apply
    /// to the ranked list only, so the summary always covers every
    /// customer.
    pub async fn generate_report(&self, query: InsightsQuery) -> InsightsResult<InsightsReport> {
        let segment = query.segment;
        let limit = query.limit;
        let result = self.execute(unrestricted(query)).await?;
        let summary = self.summary_of(&result);

        let tenant_id = result.query.tenant_id.clone();
        let as_of = result.query.as_of.unwrap_or_else(Utc::now);
        let cohorts = retention::cohorts(&result.retrieved_candidates);
        let breakdown = retention::retention_breakdown(&result.retrieved_candidates);

        let scored = result.selected_candidates;
        let policy = &self.config.outreach;
        let at_risk_customers = outreach::at_risk_customers(&scored, policy, as_of, None);
        let reactivation = outreach::reactivation_opportunities(&scored, policy, as_of, None);

        let mut customers: Vec<CustomerMetrics> = scored
            .into_iter()
            .filter(|c| segment.map_or(true, |s| c.segment == s))
            .collect();
        if let Some(limit) = limit {
            customers.truncate(limit);
        }

        Ok(InsightsReport {
            tenant_id,
            as_of,
            summary,
            retention: breakdown,
            cohorts,
            customers,
            at_risk_customers,
            reactivation,
        })
    }

    fn summary_of(&self, result: &PipelineResult<InsightsQuery, CustomerMetrics>) -> InsightsSummary {
        let all = &result.retrieved_candidates;
        summarize(all, all.len(), &self.config)
    }
}

fn unrestricted(query: InsightsQuery) -> InsightsQuery {
    InsightsQuery {
        limit: None,
        segment: None,
        outreach: None,
        ..query
    }
}

fn tenant_wide(tenant_id: &str, view: &str) -> InsightsQuery {
    InsightsQuery::new(format!("{}-{}", view, tenant_id), tenant_id)
}

#[async_trait]
impl CandidatePipeline<InsightsQuery, CustomerMetrics> for CustomerInsightsPipeline {
    fn query_hydrators(&self) -> &[Box<dyn QueryHydrator<InsightsQuery>>] {
        &self.query_hydrators
    }

    fn sources(&self) -> &[Box<dyn Source<InsightsQuery, CustomerMetrics>>] {
        &self.sources
    }

    fn filters(&self) -> &[Box<dyn Filter<InsightsQuery, CustomerMetrics>>] {
        &self.filters
    }

    fn scorers(&self) -> &[Box<dyn Scorer<InsightsQuery, CustomerMetrics>>] {
        &self.scorers
    }

    fn selector(&self) -> &dyn Selector<InsightsQuery, CustomerMetrics> {
        &self.selector
    }

    fn side_effects(&self) -> Arc<Vec<Box<dyn SideEffect<InsightsQuery, CustomerMetrics>>>> {
        Arc::clone(&self.side_effects)
    }
}
