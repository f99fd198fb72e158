//! Concurrent snapshot store.
//!
//! Entries live in a [`DashMap`], so mutation on the same key is serialized
//! by the map's shard locks while different keys proceed in parallel.
//! Reads return cloned snapshots; a reader never observes a half-written
//! entry and never blocks a writer for longer than the clone.
//!
//! Every mutator takes an explicit `now` so freshness scenarios are
//! reproducible in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::domain::entry::{CacheEntry, CachePriority, CacheStatus, SnapshotKind};
use crate::domain::id::{CacheKey, LocationId, RegionId, TypeId};

/// Everything needed to insert or replace one entry.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub key: CacheKey,
    pub kind: SnapshotKind,
    pub payload: String,
    pub ttl: Duration,
    pub region: Option<RegionId>,
    pub type_id: Option<TypeId>,
    pub location: Option<LocationId>,
    pub priority: CachePriority,
    pub auto_refresh: bool,
    pub tags: Vec<String>,
}

impl PutRequest {
    /// Request with defaults: `Normal` priority, auto-refresh on, unscoped.
    #[must_use]
    pub fn new(key: CacheKey, kind: SnapshotKind, payload: String, ttl: Duration) -> Self {
        Self {
            key,
            kind,
            payload,
            ttl,
            region: None,
            type_id: None,
            location: None,
            priority: CachePriority::Normal,
            auto_refresh: true,
            tags: Vec::new(),
        }
    }

    /// Request keyed by the canonical scoped form of its own scope.
    #[must_use]
    pub fn scoped(
        kind: SnapshotKind,
        region: Option<RegionId>,
        type_id: Option<TypeId>,
        location: Option<LocationId>,
        payload: String,
        ttl: Duration,
    ) -> Self {
        let key = CacheKey::scoped(kind, region, type_id, location);
        let mut request = Self::new(key, kind, payload, ttl);
        request.region = region;
        request.type_id = type_id;
        request.location = location;
        request
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
}

/// Point-in-time counter snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

/// Keyed store of cached market snapshots.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: DashMap<CacheKey, CacheEntry>,
    counters: Counters,
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloned snapshot of one entry. Bumps access stats; freshness state
    /// is untouched.
    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.record_access(now);
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace. Replacement re-stamps the freshness clock and
    /// resets failure tracking while access stats survive.
    pub fn put(&self, request: PutRequest, now: DateTime<Utc>) -> CacheEntry {
        let PutRequest {
            key,
            kind,
            payload,
            ttl,
            region,
            type_id,
            location,
            priority,
            auto_refresh,
            tags,
        } = request;
        debug!(key = %key, kind = %kind, bytes = payload.len(), "cache put");
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);

        match self.entries.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.kind = kind;
                entry.region = region;
                entry.type_id = type_id;
                entry.location = location;
                entry.priority = priority;
                entry.auto_refresh = auto_refresh;
                entry.tags = tags;
                entry.refresh_interval = ttl;
                entry.refresh_payload(payload, now);
                entry.clone()
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let entry = CacheEntry::new(key, kind, payload, ttl, now)
                    .with_scope(region, type_id, location)
                    .with_priority(priority)
                    .with_auto_refresh(auto_refresh)
                    .with_tags(tags);
                vacant.insert(entry).clone()
            }
        }
    }

    /// Cloned snapshot without bumping access stats. Policy sweeps use
    /// this so housekeeping never skews usage accounting.
    #[must_use]
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Bump access stats without reading the payload out.
    pub fn touch(&self, key: &CacheKey, now: DateTime<Utc>) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.record_access(now);
                true
            }
            None => false,
        }
    }

    /// Transition an entry's lifecycle status, with the state-machine side
    /// effects each status implies. Unknown keys are a no-op.
    pub fn set_status(&self, key: &CacheKey, status: CacheStatus, now: DateTime<Utc>) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            match status {
                CacheStatus::Refreshing => entry.mark_refreshing(now),
                CacheStatus::Fresh => entry.mark_fresh(now),
                CacheStatus::Error => {
                    entry.status = CacheStatus::Error;
                    entry.failure_count += 1;
                }
                other => entry.status = other,
            }
        }
    }

    /// Atomically claim a due entry for refresh, marking it `Refreshing`.
    ///
    /// The due check and the transition happen under the same shard lock,
    /// so two scheduler ticks racing on one key cannot both claim it.
    /// Returns `false` when the entry is gone, no longer due, or already
    /// claimed.
    pub fn try_begin_refresh(&self, key: &CacheKey, now: DateTime<Utc>) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_due(now) => {
                entry.mark_refreshing(now);
                true
            }
            _ => false,
        }
    }

    /// Record a refresh failure with its message. Unknown keys are a no-op.
    pub fn record_failure(&self, key: &CacheKey, message: impl Into<String>) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.mark_error(message);
        }
    }

    /// Disable background refresh for an entry, keeping it readable.
    pub fn disable_auto_refresh(&self, key: &CacheKey) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.auto_refresh = false;
        }
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.entries.remove(key).map(|(_, entry)| entry);
        if let Some(entry) = &removed {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %entry.key, bytes = entry.payload_bytes, "cache remove");
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Cloned snapshots of every entry, ordered by key.
    #[must_use]
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut all: Vec<CacheEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        all
    }

    /// Entries currently in `status`, ordered by key.
    #[must_use]
    pub fn list_by_status(&self, status: CacheStatus) -> Vec<CacheEntry> {
        let mut matching: Vec<CacheEntry> = self
            .entries
            .iter()
            .filter(|e| e.value().status == status)
            .map(|e| e.value().clone())
            .collect();
        matching.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        matching
    }

    /// Refresh candidates and expired entries, most urgent first: ascending
    /// priority rank, then ascending expiry, then key.
    #[must_use]
    pub fn list_due_for_refresh(&self, now: DateTime<Utc>) -> Vec<CacheEntry> {
        let mut due: Vec<CacheEntry> = self
            .entries
            .iter()
            .filter(|e| e.value().is_due(now))
            .map(|e| e.value().clone())
            .collect();
        due.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.expires_at.cmp(&b.expires_at))
                .then_with(|| a.key.as_str().cmp(b.key.as_str()))
        });
        due
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload bytes currently held.
    #[must_use]
    pub fn total_payload_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| e.value().payload_bytes as u64)
            .sum()
    }

    #[must_use]
    pub fn metrics(&self) -> StoreMetrics {
        StoreMetrics {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    /// Overwrite a payload while leaving the stored checksum stale,
    /// simulating on-disk corruption for integrity tests.
    #[cfg(test)]
    pub(crate) fn tamper_payload(&self, key: &CacheKey, payload: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.payload = payload.to_string();
        }
    }
}
