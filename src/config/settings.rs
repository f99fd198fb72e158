//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct aggregating all subsystem settings.
//! Configuration is loaded from a TOML file; every section and field has a
//! default so a partial file (or none at all, via
//! [`Config::load_or_default`]) yields a runnable setup.

use std::path::Path;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::entry::SnapshotKind;
use crate::domain::id::{RegionId, TypeId};
use crate::domain::route::RiskLevel;
use crate::error::{ConfigError, Result};

use super::logging::LoggingConfig;

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Snapshot store TTLs, size budget, and failure handling.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Background refresh scheduling.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Arbitrage scan thresholds.
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,

    /// Synthetic feed shape for offline runs.
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Cache TTLs and eviction limits.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// TTL applied when no per-kind override is set.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Per-kind TTL overrides. Order books churn fast, history barely moves.
    #[serde(default)]
    pub orders_ttl_secs: Option<u64>,
    #[serde(default)]
    pub history_ttl_secs: Option<u64>,
    #[serde(default)]
    pub statistics_ttl_secs: Option<u64>,
    #[serde(default)]
    pub predictions_ttl_secs: Option<u64>,
    #[serde(default)]
    pub route_intel_ttl_secs: Option<u64>,

    /// Payload byte budget enforced by eviction.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Consecutive refresh failures before an entry stops auto-refreshing.
    #[serde(default = "default_failure_ceiling")]
    pub failure_ceiling: u32,

    /// Invalidation events retained for inspection.
    #[serde(default = "default_invalidation_log_size")]
    pub invalidation_log_size: usize,
}

impl CacheConfig {
    /// Effective TTL for a snapshot kind.
    #[must_use]
    pub fn ttl_for(&self, kind: SnapshotKind) -> Duration {
        let secs = match kind {
            SnapshotKind::Orders => self.orders_ttl_secs,
            SnapshotKind::History => self.history_ttl_secs,
            SnapshotKind::Statistics => self.statistics_ttl_secs,
            SnapshotKind::Predictions => self.predictions_ttl_secs,
            SnapshotKind::RouteIntel => self.route_intel_ttl_secs,
        }
        .unwrap_or(self.default_ttl_secs);
        Duration::seconds(secs as i64)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            orders_ttl_secs: None,
            history_ttl_secs: None,
            statistics_ttl_secs: None,
            predictions_ttl_secs: None,
            route_intel_ttl_secs: None,
            max_bytes: default_max_bytes(),
            failure_ceiling: default_failure_ceiling(),
            invalidation_log_size: default_invalidation_log_size(),
        }
    }
}

/// Background refresh scheduling.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between scheduler ticks.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Entries dispatched per tick at most.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-attempt fetch timeout.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Observation window a refresh pulls, in days.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Whether the background scheduler runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl RefreshConfig {
    #[must_use]
    pub fn tick(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_secs)
    }

    #[must_use]
    pub fn attempt_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            batch_size: default_batch_size(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            window_days: default_window_days(),
            enabled: true,
        }
    }
}

/// Arbitrage scan thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrageConfig {
    /// Minimum margin a route and its items must clear.
    #[serde(default = "default_min_margin")]
    pub min_margin: Decimal,

    /// Risk ceiling for the risk-filtered route view.
    #[serde(default = "default_max_risk")]
    pub max_risk: RiskLevel,

    /// Items reported by top-item queries.
    #[serde(default = "default_top_items")]
    pub top_items: usize,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_margin: default_min_margin(),
            max_risk: default_max_risk(),
            top_items: default_top_items(),
        }
    }
}

/// Shape of the deterministic synthetic feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// RNG seed; identical seeds replay identical markets.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Item types the feed serves.
    #[serde(default = "default_types")]
    pub types: Vec<TypeId>,

    /// Regions the feed serves.
    #[serde(default = "default_regions")]
    pub regions: Vec<RegionId>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            types: default_types(),
            regions: default_regions(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    900
}

fn default_max_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_failure_ceiling() -> u32 {
    5
}

fn default_invalidation_log_size() -> usize {
    256
}

fn default_tick_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    16
}

fn default_attempt_timeout_ms() -> u64 {
    5_000
}

fn default_window_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

fn default_min_margin() -> Decimal {
    dec!(0.05)
}

fn default_max_risk() -> RiskLevel {
    RiskLevel::Moderate
}

fn default_top_items() -> usize {
    5
}

fn default_seed() -> u64 {
    2501
}

fn default_types() -> Vec<TypeId> {
    // Tritanium through Isogen, the staple mineral market.
    vec![
        TypeId::new(34),
        TypeId::new(35),
        TypeId::new(36),
        TypeId::new(37),
    ]
}

fn default_regions() -> Vec<RegionId> {
    vec![RegionId::new(10_000_002), RegionId::new(10_000_043)]
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation
    /// fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load from an explicit path, or fall back to defaults when none is
    /// given and no `voidwatch.toml` sits in the working directory.
    ///
    /// An explicit path that fails to load is still an error; only the
    /// nothing-configured case falls back.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => Self::load(explicit),
            None => {
                let conventional = Path::new("voidwatch.toml");
                if conventional.exists() {
                    Self::load(conventional)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Validate configuration values.
    ///
    /// Checks that all values are within acceptable ranges; errors name the
    /// offending field.
    fn validate(&self) -> Result<()> {
        if self.cache.default_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_ttl_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        let overrides = [
            ("orders_ttl_secs", self.cache.orders_ttl_secs),
            ("history_ttl_secs", self.cache.history_ttl_secs),
            ("statistics_ttl_secs", self.cache.statistics_ttl_secs),
            ("predictions_ttl_secs", self.cache.predictions_ttl_secs),
            ("route_intel_ttl_secs", self.cache.route_intel_ttl_secs),
        ];
        for (field, value) in overrides {
            if value == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0 when set".to_string(),
                }
                .into());
            }
        }
        if self.cache.max_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_bytes",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.cache.failure_ceiling == 0 {
            return Err(ConfigError::InvalidValue {
                field: "failure_ceiling",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.cache.invalidation_log_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "invalidation_log_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.refresh.tick_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.refresh.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.refresh.attempt_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "attempt_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.refresh.window_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window_days",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.arbitrage.min_margin < Decimal::ZERO || self.arbitrage.min_margin > Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "min_margin",
                reason: "must be between 0 and 1".to_string(),
            }
            .into());
        }
        if self.arbitrage.top_items == 0 {
            return Err(ConfigError::InvalidValue {
                field: "top_items",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.feed.types.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "feed.types",
                reason: "must list at least one item type".to_string(),
            }
            .into());
        }
        if self.feed.regions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "feed.regions",
                reason: "must list at least one region".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn invalid_field(result: Result<Config>) -> &'static str {
        match result {
            Err(Error::Config(ConfigError::InvalidValue { field, .. })) => field,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.cache.default_ttl_secs, 900);
        assert_eq!(config.refresh.batch_size, 16);
        assert_eq!(config.arbitrage.min_margin, dec!(0.05));
        assert_eq!(config.arbitrage.max_risk, RiskLevel::Moderate);
        assert!(config.refresh.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse_toml(
            r#"
            [cache]
            orders_ttl_secs = 120

            [arbitrage]
            max_risk = "low"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.orders_ttl_secs, Some(120));
        assert_eq!(config.cache.default_ttl_secs, 900);
        assert_eq!(config.arbitrage.max_risk, RiskLevel::Low);
        assert_eq!(config.arbitrage.min_margin, dec!(0.05));
    }

    #[test]
    fn ttl_for_prefers_kind_override() {
        let config = Config::parse_toml(
            r#"
            [cache]
            default_ttl_secs = 600
            orders_ttl_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(
            config.cache.ttl_for(SnapshotKind::Orders),
            Duration::seconds(120)
        );
        assert_eq!(
            config.cache.ttl_for(SnapshotKind::History),
            Duration::seconds(600)
        );
    }

    #[test]
    fn zero_ttl_is_rejected_with_field_name() {
        let result = Config::parse_toml("[cache]\ndefault_ttl_secs = 0\n");
        assert_eq!(invalid_field(result), "default_ttl_secs");
    }

    #[test]
    fn zero_kind_override_is_rejected() {
        let result = Config::parse_toml("[cache]\nstatistics_ttl_secs = 0\n");
        assert_eq!(invalid_field(result), "statistics_ttl_secs");
    }

    #[test]
    fn margin_outside_unit_interval_is_rejected() {
        let result = Config::parse_toml("[arbitrage]\nmin_margin = 1.5\n");
        assert_eq!(invalid_field(result), "min_margin");
    }

    #[test]
    fn empty_feed_types_are_rejected() {
        let result = Config::parse_toml("[feed]\ntypes = []\n");
        assert_eq!(invalid_field(result), "feed.types");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let result = Config::parse_toml("[cache\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Parse(_)))
        ));
    }

    #[test]
    fn unknown_risk_level_fails_to_parse() {
        let result = Config::parse_toml("[arbitrage]\nmax_risk = \"suicidal\"\n");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }
}
