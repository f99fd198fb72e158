use thiserror::Error;

use crate::domain::id::{CacheKey, CategoryId, HubId, RouteId};

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

/// Failures reported by an upstream market feed.
///
/// The refresh scheduler branches on [`FeedError::is_transient`]: transient
/// failures are retried on later ticks up to the configured ceiling, fatal
/// failures mark the entry `Error` and disable auto-refresh immediately.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("feed request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("feed rate limit hit, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("upstream feed failure: {0}")]
    Upstream(String),

    #[error("malformed feed response: {0}")]
    Malformed(String),

    #[error("feed rejected credentials: {0}")]
    AuthRejected(String),
}

impl FeedError {
    /// True when the failure is worth retrying on a later tick.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::Timeout { .. } | FeedError::RateLimited { .. } | FeedError::Upstream(_)
        )
    }
}

/// Domain-level errors from the intelligence core.
///
/// Not-found variants are surfaced to callers; they are distinct from the
/// zero-result cases (an empty observation window, a route with no
/// profitability records) which return empty values, not errors.
#[derive(Error, Debug, Clone)]
pub enum IntelError {
    #[error("cache entry not found: {key}")]
    EntryNotFound { key: CacheKey },

    #[error("trade hub not found: {hub}")]
    HubNotFound { hub: HubId },

    #[error("trade route not found: {route}")]
    RouteNotFound { route: RouteId },

    #[error("market category not found: {category}")]
    CategoryNotFound { category: CategoryId },

    #[error("cache entry {key} has Critical priority and cannot be evicted")]
    CriticalEntryProtected { key: CacheKey },

    #[error("cache entry {key} has no (item, region) scope to refresh from")]
    UnscopedEntry { key: CacheKey },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Intel(#[from] IntelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
