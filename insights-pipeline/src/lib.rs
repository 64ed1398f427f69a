//! Customer insights for a single salon tenant.
//!
//! Visit, review and service-usage records flow through a candidate
//! pipeline that groups them per customer, derives visit statistics and
//! lifetime value, assigns a segment, scores churn risk and finally ranks
//! customers by value or, for outreach lists, by recency. The pure stages
//! (`grouper`, `metrics`, `segmentation`, `summary`, `churn_risk`,
//! `retention`, `outreach`) never touch I/O; fetching goes through the
//! `collaborators` traits.

pub mod candidate_pipeline;
pub mod churn_risk;
pub mod collaborators;
pub mod components;
pub mod config;
pub mod counter;
pub mod error;
pub mod filter;
pub mod grouper;
pub mod metrics;
pub mod outreach;
pub mod pipelines;
pub mod query_hydrator;
pub mod record_loader;
pub mod retention;
pub mod scorer;
pub mod segmentation;
pub mod selector;
pub mod side_effect;
pub mod source;
pub mod summary;
pub mod types;

pub use config::InsightsConfig;
pub use error::{InsightsError, InsightsResult};
pub use pipelines::customer_insights::CustomerInsightsPipeline;
pub use record_loader::InMemoryRecords;
pub use types::{CustomerMetrics, CustomerSegment, InsightsQuery, InsightsReport, InsightsSummary};
