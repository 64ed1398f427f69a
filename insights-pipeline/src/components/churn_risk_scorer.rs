use async_trait::async_trait;
use chrono::Utc;

use crate::churn_risk::assess;
use crate::config::ChurnRiskPolicy;
use crate::error::InsightsResult;
use crate::scorer::Scorer;
use crate::types::{CustomerMetrics, InsightsQuery};

/// Attaches a churn-risk assessment to every kept customer.
pub struct ChurnRiskScorer {
    pub policy: ChurnRiskPolicy,
}

impl ChurnRiskScorer {
    pub fn new(policy: ChurnRiskPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Scorer<InsightsQuery, CustomerMetrics> for ChurnRiskScorer {
    async fn score(
        &self,
        query: &InsightsQuery,
        candidates: &[CustomerMetrics],
    ) -> InsightsResult<Vec<CustomerMetrics>> {
        let as_of = query.as_of.unwrap_or_else(Utc::now);
        Ok(candidates
            .iter()
            .map(|c| CustomerMetrics {
                churn_risk: Some(assess(c, &self.policy, as_of)),
                ..c.clone()
            })
            .collect())
    }

    fn update(&self, candidate: &mut CustomerMetrics, scored: CustomerMetrics) {
        candidate.churn_risk = scored.churn_risk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLevel;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn scores_each_candidate_in_order() {
        let as_of = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let query = InsightsQuery::new("req", "salon-1").with_as_of(as_of);
        let regular = CustomerMetrics {
            customer_id: "steady".into(),
            total_visits: 6,
            last_completed_visit_date: Some(as_of - Duration::days(10)),
            avg_days_between_visits: 30.0,
            recent_avg_days_between_visits: 30.0,
            ..CustomerMetrics::default()
        };
        let lapsed = CustomerMetrics {
            customer_id: "lapsed".into(),
            total_visits: 1,
            last_completed_visit_date: Some(as_of - Duration::days(200)),
            ..CustomerMetrics::default()
        };

        let scorer = ChurnRiskScorer::new(ChurnRiskPolicy::default());
        let scored = scorer.score(&query, &[regular.clone(), lapsed]).await.unwrap();
        assert_eq!(scored.len(), 2);

        let mut target = regular;
        scorer.update(&mut target, scored[0].clone());
        assert_eq!(target.churn_risk.as_ref().map(|r| r.level), Some(RiskLevel::Low));

        let lapsed_risk = scored[1].churn_risk.as_ref().unwrap();
        // long absence 25 + few visits 10
        assert_eq!(lapsed_risk.score, 35);
        assert_eq!(lapsed_risk.days_since_last_visit, Some(200));
    }
}
