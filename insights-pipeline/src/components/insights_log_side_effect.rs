use std::sync::Arc;

use async_trait::async_trait;

use crate::error::InsightsResult;
use crate::side_effect::{SideEffect, SideEffectInput};
use crate::types::{CustomerMetrics, CustomerSegment, InsightsQuery};

/// Logs a one-line digest of what was selected.
pub struct InsightsLogSideEffect;

#[async_trait]
impl SideEffect<InsightsQuery, CustomerMetrics> for InsightsLogSideEffect {
    async fn run(&self, input: Arc<SideEffectInput<InsightsQuery, CustomerMetrics>>) -> InsightsResult<()> {
        let selected = &input.selected_candidates;
        let at_risk = selected
            .iter()
            .filter(|c| matches!(c.segment, CustomerSegment::AtRisk | CustomerSegment::Churned))
            .count();
        let top_value = selected.first().map(|c| c.lifetime_value).unwrap_or(0.0);

        log::info!(
            "request_id={} tenant={} selected={} at_risk_or_churned={} top_lifetime_value={:.2}",
            input.query.request_id,
            input.query.tenant_id,
            selected.len(),
            at_risk,
            top_value
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_on_empty_selection() {
        let input = Arc::new(SideEffectInput {
            query: Arc::new(InsightsQuery::new("req", "salon-1")),
            selected_candidates: Vec::new(),
        });
        assert!(InsightsLogSideEffect.run(input).await.is_ok());
    }
}
