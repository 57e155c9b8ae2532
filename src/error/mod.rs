//! Error types for tokenmeter.

use thiserror::Error;

/// Primary error type for all tokenmeter operations.
#[derive(Error, Debug)]
pub enum MeterError {
    /// A budget scope's cost ceiling was crossed.
    #[error("cost limit exceeded: ${current:.6} spent, ${max:.6} allowed")]
    CostLimitExceeded { current: f64, max: f64 },

    /// A budget scope's token ceiling was crossed.
    #[error("token limit exceeded: {current} tokens used, {max} allowed")]
    TokenLimitExceeded { current: i64, max: u64 },

    /// No pricing entry exists for the given model key.
    #[error("no pricing entry for model: {0}")]
    UnknownPricingKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MeterError {
    /// Whether this error is a budget-limit breach (of either kind).
    pub fn is_limit_breach(&self) -> bool {
        matches!(
            self,
            Self::CostLimitExceeded { .. } | Self::TokenLimitExceeded { .. }
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, MeterError>;
