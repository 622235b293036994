//! Error taxonomy for correlation analysis.
//!
//! Sentiment paths absorb provider failures and the capital-flow correlation
//! lookup absorbs any failure; everywhere else these errors propagate.

use thiserror::Error;

/// Errors raised while fetching, fusing, or analyzing metric series.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// No constituents or no samples were found for an entity.
    #[error("no data for {entity}: {reason}")]
    NoData {
        /// Ecosystem or asset identifier.
        entity: String,
        /// What was missing.
        reason: String,
    },

    /// The requested metric is not recognized by the operation.
    #[error("unsupported metric '{metric}' for {operation}")]
    UnsupportedMetric {
        /// Metric name as requested.
        metric: String,
        /// Operation that rejected it.
        operation: String,
    },

    /// A capability (e.g. a sentiment provider) is required but not configured.
    #[error("missing capability: {0}")]
    MissingCapability(String),

    /// The external data provider failed.
    #[error("provider error for {entity}: {message}")]
    Provider {
        /// Entity the request was made for.
        entity: String,
        /// Provider error message.
        message: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CorrelationError {
    /// Creates a no-data error.
    pub fn no_data(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoData {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported-metric error.
    pub fn unsupported_metric(metric: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedMetric {
            metric: metric.into(),
            operation: operation.into(),
        }
    }

    /// Creates a provider error from any displayable failure.
    ///
    /// Uses the alternate format so `anyhow` context chains are preserved.
    pub fn provider(entity: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Provider {
            entity: entity.into(),
            message: format!("{err:#}"),
        }
    }
}

/// Result type alias for correlation operations.
pub type Result<T> = std::result::Result<T, CorrelationError>;
