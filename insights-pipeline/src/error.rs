//! Insights error types.
//!
//! Fetch failures from collaborators surface unchanged as `Fetch`; every
//! other failure is a boundary problem (loading, config, bad rows).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("Fetch failed for tenant {tenant}: {reason}")]
    Fetch { tenant: String, reason: String },

    #[error("Failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    #[error("Invalid record in {source_name} at line {line}: {reason}")]
    InvalidRecord {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl InsightsError {
    pub fn fetch(tenant: &str, reason: impl Into<String>) -> Self {
        InsightsError::Fetch {
            tenant: tenant.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for insights operations.
pub type InsightsResult<T> = Result<T, InsightsError>;
