//! Cached snapshot entries and their lifecycle metadata.
//!
//! A [`CacheEntry`] is one cached market payload plus the bookkeeping the
//! freshness policy operates on: timestamps, status, priority, failure
//! counters, and a content checksum. Entries are created on first successful
//! fetch and updated in place on every refresh; read access bumps access
//! stats but never mutates freshness state.

use chrono::{DateTime, Duration, Utc};

use super::id::{CacheKey, LocationId, RegionId, TypeId};

/// What kind of market snapshot an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    /// Raw buy/sell order snapshots.
    Orders,
    /// Daily price history.
    History,
    /// Derived market statistics.
    Statistics,
    /// Price forecasts.
    Predictions,
    /// Trade-route intelligence.
    RouteIntel,
}

impl SnapshotKind {
    /// Canonical lowercase name, used in cache keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SnapshotKind::Orders => "orders",
            SnapshotKind::History => "history",
            SnapshotKind::Statistics => "statistics",
            SnapshotKind::Predictions => "predictions",
            SnapshotKind::RouteIntel => "route_intel",
        }
    }
}

impl std::fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a cached entry.
///
/// `Refreshing` is transient: the operation that sets it must resolve the
/// entry to `Fresh` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Within its refresh interval and trustworthy.
    Fresh,
    /// Past its refresh interval but still usable.
    Stale,
    /// Past its hard TTL; must not be trusted without a refresh.
    Expired,
    /// A refresh attempt is in flight.
    Refreshing,
    /// The last refresh attempt failed.
    Error,
    /// Removed by the eviction policy or explicit invalidation.
    Evicted,
}

impl CacheStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Fresh => "fresh",
            CacheStatus::Stale => "stale",
            CacheStatus::Expired => "expired",
            CacheStatus::Refreshing => "refreshing",
            CacheStatus::Error => "error",
            CacheStatus::Evicted => "evicted",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refresh/eviction priority.
///
/// Declaration order is rank order: `Critical` sorts first, so ascending
/// sorts schedule the most important entries earliest. `Critical` entries
/// are never auto-evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CachePriority {
    Critical,
    High,
    Normal,
    Low,
    Disposable,
}

impl CachePriority {
    /// Numeric rank, 0 = most important.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// True for priorities the size-budget eviction path may remove.
    #[must_use]
    pub const fn is_evictable(self) -> bool {
        matches!(self, CachePriority::Low | CachePriority::Disposable)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CachePriority::Critical => "critical",
            CachePriority::High => "high",
            CachePriority::Normal => "normal",
            CachePriority::Low => "low",
            CachePriority::Disposable => "disposable",
        }
    }
}

impl std::fmt::Display for CachePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checksum of a serialized payload.
///
/// Guards against accidental corruption, not tampering; cheap enough to run
/// on every put and every integrity sweep.
#[must_use]
pub fn payload_checksum(payload: &str) -> u32 {
    crc32fast::hash(payload.as_bytes())
}

/// One cached market snapshot with its lifecycle metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Globally unique cache key.
    pub key: CacheKey,
    /// What the payload holds.
    pub kind: SnapshotKind,
    /// Region scope, when the snapshot is region-bound.
    pub region: Option<RegionId>,
    /// Item scope, when the snapshot is item-bound.
    pub type_id: Option<TypeId>,
    /// Location scope, when the snapshot is station-bound.
    pub location: Option<LocationId>,
    /// Serialized JSON payload.
    pub payload: String,
    /// Payload size in bytes.
    pub payload_bytes: usize,
    /// crc32 of the payload at last write.
    pub checksum: u32,
    /// When the current payload was written.
    pub created_at: DateTime<Utc>,
    /// Hard TTL; past this the payload must not be trusted.
    pub expires_at: DateTime<Utc>,
    /// Configured refresh cadence.
    pub refresh_interval: Duration,
    /// Last read access.
    pub last_access: DateTime<Utc>,
    /// Number of read accesses since creation.
    pub access_count: u64,
    pub status: CacheStatus,
    pub priority: CachePriority,
    /// Consecutive refresh failures since the last success.
    pub failure_count: u32,
    /// Message from the most recent failure.
    pub last_error: Option<String>,
    /// When a refresh attempt last started.
    pub last_refresh_attempt: Option<DateTime<Utc>>,
    /// When a refresh last succeeded.
    pub last_refreshed: Option<DateTime<Utc>>,
    /// Whether the background scheduler refreshes this entry.
    pub auto_refresh: bool,
    /// Free-form labels for operators.
    pub tags: Vec<String>,
}

impl CacheEntry {
    /// Create a new entry from a first successful fetch at `now`.
    ///
    /// Defaults: `Normal` priority, auto-refresh on, no scope, no tags.
    #[must_use]
    pub fn new(
        key: CacheKey,
        kind: SnapshotKind,
        payload: String,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let payload_bytes = payload.len();
        let checksum = payload_checksum(&payload);
        Self {
            key,
            kind,
            region: None,
            type_id: None,
            location: None,
            payload,
            payload_bytes,
            checksum,
            created_at: now,
            expires_at: now + ttl,
            refresh_interval: ttl,
            last_access: now,
            access_count: 0,
            status: CacheStatus::Fresh,
            priority: CachePriority::Normal,
            failure_count: 0,
            last_error: None,
            last_refresh_attempt: None,
            last_refreshed: Some(now),
            auto_refresh: true,
            tags: Vec::new(),
        }
    }

    /// Set the (region, item, location) scope.
    #[must_use]
    pub fn with_scope(
        mut self,
        region: Option<RegionId>,
        type_id: Option<TypeId>,
        location: Option<LocationId>,
    ) -> Self {
        self.region = region;
        self.type_id = type_id;
        self.location = location;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: CachePriority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Replace the payload after a successful refresh at `now`.
    ///
    /// Re-stamps creation/expiry, resets failure tracking, and recomputes
    /// the checksum. Access stats are deliberately preserved.
    pub fn refresh_payload(&mut self, payload: String, now: DateTime<Utc>) {
        self.payload_bytes = payload.len();
        self.checksum = payload_checksum(&payload);
        self.payload = payload;
        self.created_at = now;
        self.expires_at = now + self.refresh_interval;
        self.last_refreshed = Some(now);
        self.failure_count = 0;
        self.last_error = None;
        self.status = CacheStatus::Fresh;
    }

    /// Record a read access. Never mutates freshness state.
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.access_count += 1;
        self.last_access = now;
    }

    /// Mark a refresh attempt as started.
    pub fn mark_refreshing(&mut self, now: DateTime<Utc>) {
        self.status = CacheStatus::Refreshing;
        self.last_refresh_attempt = Some(now);
    }

    /// Mark the entry fresh without replacing the payload.
    ///
    /// Resets failures and recomputes expiry from `now`, matching the
    /// post-refresh invariant `expires_at = refreshed_at + refresh_interval`.
    pub fn mark_fresh(&mut self, now: DateTime<Utc>) {
        self.status = CacheStatus::Fresh;
        self.last_refreshed = Some(now);
        self.failure_count = 0;
        self.last_error = None;
        self.expires_at = now + self.refresh_interval;
    }

    /// Mark a refresh failure.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = CacheStatus::Error;
        self.failure_count += 1;
        self.last_error = Some(message.into());
    }

    /// Verify the stored checksum still matches the payload.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        payload_checksum(&self.payload) == self.checksum
    }

    /// True once the hard TTL has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Staleness rule: auto-refreshed `Fresh`/`Stale` entries become refresh
    /// candidates once the refresh interval has elapsed, independent of
    /// expiry.
    #[must_use]
    pub fn is_refresh_candidate(&self, now: DateTime<Utc>) -> bool {
        self.auto_refresh
            && matches!(self.status, CacheStatus::Fresh | CacheStatus::Stale)
            && now >= self.created_at + self.refresh_interval
    }

    /// Combined due rule: refresh candidates plus anything past expiry,
    /// except entries already `Refreshing` or `Evicted`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !matches!(self.status, CacheStatus::Refreshing | CacheStatus::Evicted)
            && (self.is_expired(now) || self.is_refresh_candidate(now))
    }

    /// True for entries the size-budget eviction path may remove.
    #[must_use]
    pub fn is_evictable(&self) -> bool {
        self.priority.is_evictable()
    }

    /// Status as a display surface should report it: a `Fresh` entry past
    /// its refresh interval reads `Stale`, past its TTL reads `Expired`.
    /// Stored state is untouched.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> CacheStatus {
        match self.status {
            CacheStatus::Fresh if self.is_expired(now) => CacheStatus::Expired,
            CacheStatus::Fresh if now >= self.created_at + self.refresh_interval => {
                CacheStatus::Stale
            }
            other => other,
        }
    }
}
