//! Error types for the pricing core.

use thiserror::Error;

pub type PricingResult<T> = Result<T, PricingError>;

/// Errors raised while building a query plan, fetching/filtering listings,
/// clustering, aggregating, or estimating via V3.
///
/// Per §7, adapter and normalization failures are isolated and degrade
/// gracefully; only validation and cache-backend errors in this enum are
/// meant to propagate as fatal to the caller.
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("adapter '{adapter}' failed: {message}")]
    AdapterError { adapter: String, message: String },

    #[error("adapter '{adapter}' timed out after {timeout_ms}ms")]
    AdapterTimeout { adapter: String, timeout_ms: u64 },

    #[error("AI clusterer normalization failed: {0}")]
    NormalizationError(String),

    #[error("invalid LLM response JSON: {0}")]
    ValidationError(String),

    #[error("pricing service is disabled")]
    Disabled,

    #[error("request validation failed: {0}")]
    InvalidRequest(String),

    #[error("overall request timed out")]
    Timeout,

    #[error("rate limited by upstream estimator")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),
}

impl PricingError {
    pub fn adapter_error(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AdapterError {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Whether this error should be isolated to one adapter rather than
    /// failing the whole pricing request (§7, §8 invariant 8).
    pub fn is_adapter_local(&self) -> bool {
        matches!(self, PricingError::AdapterError { .. } | PricingError::AdapterTimeout { .. })
    }
}
