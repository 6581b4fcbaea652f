use thiserror::Error;

use crate::domain::MarketId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Per-aggregator quote failures.
///
/// Recorded on the composite result, never retried inline; the next scheduled
/// cycle is the retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("no liquidity: {0}")]
    NoLiquidity(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QuoteError::Timeout(0)
        } else if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            QuoteError::RateLimited
        } else if err.is_decode() {
            QuoteError::Malformed(err.to_string())
        } else {
            QuoteError::Http(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("quote failed: {0}")]
    Quote(#[from] QuoteError),

    #[error("all aggregators failed for market {market}")]
    AllAggregatorsFailed { market: MarketId },

    #[error("unknown market: {market}")]
    UnknownMarket { market: MarketId },

    #[error("no chain configuration for chain {0}")]
    UnknownChain(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
