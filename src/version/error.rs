use thiserror::Error;

/// Failure of a single resolution strategy.
///
/// Strategy failures are never fatal: the resolver logs them and proceeds to
/// the next strategy in the chain. They stay distinct from "nothing found"
/// (`Ok(None)`) so degraded sources remain visible in logs.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("source not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
