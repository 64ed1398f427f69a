pub mod as_of_query_hydrator;
pub mod churn_risk_scorer;
pub mod customer_insights_source;
pub mod customer_rank_selector;
pub mod insights_log_side_effect;
pub mod recency_window_filter;
pub mod segment_filter;
