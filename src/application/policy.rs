//! Freshness and eviction policy sweeps.
//!
//! [`FreshnessPolicy`] owns the TTL/budget/failure configuration and the
//! bounded invalidation log. Every sweep is total: individual bad entries
//! land in the returned report and the sweep keeps going.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::domain::entry::{CacheEntry, CachePriority, CacheStatus, SnapshotKind};
use crate::domain::id::CacheKey;
use crate::error::{IntelError, Result};
use crate::feed::ReferenceData;

use super::store::SnapshotStore;

/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    Expired,
    SizeLimit,
    Manual,
    IntegrityFailure,
    Superseded,
}

impl InvalidationReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            InvalidationReason::Expired => "expired",
            InvalidationReason::SizeLimit => "size_limit",
            InvalidationReason::Manual => "manual",
            InvalidationReason::IntegrityFailure => "integrity_failure",
            InvalidationReason::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvalidationReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expired" => Ok(InvalidationReason::Expired),
            "size_limit" => Ok(InvalidationReason::SizeLimit),
            "manual" => Ok(InvalidationReason::Manual),
            "integrity_failure" => Ok(InvalidationReason::IntegrityFailure),
            "superseded" => Ok(InvalidationReason::Superseded),
            other => Err(format!(
                "unknown invalidation reason '{other}' (expected expired|size_limit|manual|integrity_failure|superseded)"
            )),
        }
    }
}

/// One recorded removal.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationEvent {
    pub id: Uuid,
    pub key: CacheKey,
    pub reason: InvalidationReason,
    pub at: DateTime<Utc>,
    /// Payload bytes released.
    pub bytes: usize,
}

/// Result of a size-budget eviction pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EvictionReport {
    pub evicted: usize,
    pub bytes_freed: u64,
    pub bytes_remaining: u64,
}

/// Result of an expired-entry cleanup pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CleanupReport {
    pub removed: usize,
    pub bytes_freed: u64,
}

/// Result of an integrity sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub checked: usize,
    pub checksum_failures: usize,
    pub dangling_references: usize,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.checksum_failures == 0 && self.dangling_references == 0
    }
}

/// TTL, eviction, and integrity rules over a [`SnapshotStore`].
#[derive(Debug)]
pub struct FreshnessPolicy {
    config: CacheConfig,
    log: Mutex<VecDeque<InvalidationEvent>>,
}

impl FreshnessPolicy {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            log: Mutex::new(VecDeque::new()),
        }
    }

    /// Effective TTL for a snapshot kind.
    #[must_use]
    pub fn ttl_for(&self, kind: SnapshotKind) -> Duration {
        self.config.ttl_for(kind)
    }

    /// Consecutive failures after which auto-refresh is disabled.
    #[must_use]
    pub fn failure_ceiling(&self) -> u32 {
        self.config.failure_ceiling
    }

    /// Configured payload byte budget.
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.config.max_bytes
    }

    /// Evict `Low`/`Disposable` entries, least recently accessed first,
    /// until total payload bytes fit `max_bytes` or nothing evictable
    /// remains. `Critical`/`High`/`Normal` entries are never touched by
    /// this path.
    pub fn evict_to_budget(
        &self,
        store: &SnapshotStore,
        max_bytes: u64,
        now: DateTime<Utc>,
    ) -> EvictionReport {
        let mut remaining = store.total_payload_bytes();
        let mut report = EvictionReport {
            bytes_remaining: remaining,
            ..EvictionReport::default()
        };
        if remaining <= max_bytes {
            return report;
        }

        let mut candidates: Vec<CacheEntry> = store
            .entries()
            .into_iter()
            .filter(CacheEntry::is_evictable)
            .collect();
        candidates.sort_by_key(|entry| entry.last_access);

        for candidate in candidates {
            if remaining <= max_bytes {
                break;
            }
            store.set_status(&candidate.key, CacheStatus::Evicted, now);
            if let Some(removed) = store.remove(&candidate.key) {
                let bytes = removed.payload_bytes as u64;
                remaining = remaining.saturating_sub(bytes);
                report.evicted += 1;
                report.bytes_freed += bytes;
                self.log_event(removed.key, InvalidationReason::SizeLimit, now, removed.payload_bytes);
            }
        }

        report.bytes_remaining = remaining;
        if remaining > max_bytes {
            warn!(
                remaining,
                max_bytes, "size budget still exceeded after evicting all evictable entries"
            );
        }
        info!(
            evicted = report.evicted,
            bytes_freed = report.bytes_freed,
            "size budget eviction pass complete"
        );
        report
    }

    /// Remove entries past expiry whose priority is below `Critical`.
    /// Running it again with nothing newly expired removes nothing.
    pub fn cleanup_expired(&self, store: &SnapshotStore, now: DateTime<Utc>) -> CleanupReport {
        let mut report = CleanupReport::default();

        let expired: Vec<CacheEntry> = store
            .entries()
            .into_iter()
            .filter(|entry| entry.is_expired(now) && entry.priority != CachePriority::Critical)
            .collect();

        for entry in expired {
            store.set_status(&entry.key, CacheStatus::Evicted, now);
            if let Some(removed) = store.remove(&entry.key) {
                report.removed += 1;
                report.bytes_freed += removed.payload_bytes as u64;
                self.log_event(removed.key, InvalidationReason::Expired, now, removed.payload_bytes);
            }
        }

        if report.removed > 0 {
            info!(removed = report.removed, bytes_freed = report.bytes_freed, "expired cleanup");
        } else {
            debug!("expired cleanup found nothing to remove");
        }
        report
    }

    /// Verify stored checksums and scope-id resolution for every entry.
    ///
    /// Mismatches are reported, never repaired; re-fetch or re-hash is an
    /// explicit separate operation.
    pub fn check_integrity(
        &self,
        store: &SnapshotStore,
        reference: &dyn ReferenceData,
    ) -> IntegrityReport {
        let mut report = IntegrityReport::default();

        for entry in store.entries() {
            report.checked += 1;

            if !entry.verify_checksum() {
                report.checksum_failures += 1;
                report
                    .issues
                    .push(format!("checksum mismatch for {}", entry.key));
            }
            if let Some(region) = entry.region {
                if !reference.region_exists(region) {
                    report.dangling_references += 1;
                    report.issues.push(format!(
                        "{} references unknown region {region}",
                        entry.key
                    ));
                }
            }
            if let Some(type_id) = entry.type_id {
                if !reference.type_exists(type_id) {
                    report.dangling_references += 1;
                    report.issues.push(format!(
                        "{} references unknown item type {type_id}",
                        entry.key
                    ));
                }
            }
        }

        if report.is_healthy() {
            debug!(checked = report.checked, "integrity sweep clean");
        } else {
            warn!(
                checked = report.checked,
                checksum_failures = report.checksum_failures,
                dangling_references = report.dangling_references,
                "integrity sweep found problems"
            );
        }
        report
    }

    /// Explicitly invalidate one entry: mark `Evicted`, remove, log.
    ///
    /// # Errors
    ///
    /// A `Critical` entry is protected; demote it before invalidating.
    pub fn invalidate(
        &self,
        store: &SnapshotStore,
        key: &CacheKey,
        reason: InvalidationReason,
        now: DateTime<Utc>,
    ) -> Result<Option<InvalidationEvent>> {
        let Some(entry) = store.peek(key) else {
            return Ok(None);
        };
        if entry.priority == CachePriority::Critical {
            return Err(IntelError::CriticalEntryProtected { key: key.clone() }.into());
        }

        store.set_status(key, CacheStatus::Evicted, now);
        let bytes = store
            .remove(key)
            .map_or(entry.payload_bytes, |removed| removed.payload_bytes);
        let event = self.log_event(key.clone(), reason, now, bytes);
        info!(key = %key, reason = %reason, "entry invalidated");
        Ok(Some(event))
    }

    /// Recent invalidation events, oldest first, bounded by configuration.
    #[must_use]
    pub fn invalidation_log(&self) -> Vec<InvalidationEvent> {
        self.log.lock().iter().cloned().collect()
    }

    fn log_event(
        &self,
        key: CacheKey,
        reason: InvalidationReason,
        at: DateTime<Utc>,
        bytes: usize,
    ) -> InvalidationEvent {
        let event = InvalidationEvent {
            id: Uuid::new_v4(),
            key,
            reason,
            at,
            bytes,
        };
        let mut log = self.log.lock();
        log.push_back(event.clone());
        while log.len() > self.config.invalidation_log_size {
            log.pop_front();
        }
        event
    }
}
