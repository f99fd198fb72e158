//! Background refresh scheduler.
//!
//! Sweeps the snapshot store every tick, claims due entries most urgent
//! first, and refreshes them from the upstream feed. An entry is marked
//! `Refreshing` before its fetch is dispatched, so overlapping ticks never
//! fetch the same key twice, and every dispatched entry leaves the pass in
//! a terminal state: `Fresh` on success, `Error` on failure or timeout.
//!
//! # Architecture
//!
//! ```text
//! SnapshotStore --(list_due_for_refresh)--> RefreshService
//!                                               |
//!                                               +-- claims entry (Refreshing)
//!                                               +-- MarketFeed::fetch_observations
//!                                               +-- recomputes Statistics payloads
//!                                               |
//!                                               v
//!                                       RefreshReport per tick
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::RefreshConfig;
use crate::domain::entry::{CacheEntry, SnapshotKind};
use crate::domain::id::CacheKey;
use crate::domain::observation::ObservationWindow;
use crate::domain::statistics;
use crate::error::{FeedError, IntelError};
use crate::feed::MarketFeed;

use super::policy::FreshnessPolicy;
use super::store::{PutRequest, SnapshotStore};

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    /// Entries whose payload was replaced and restamped `Fresh`.
    pub refreshed: usize,
    /// Entries whose attempt failed: feed error, timeout, or missing scope.
    pub failed: usize,
    /// Due entries left undispatched: claimed by another tick, opted out
    /// of background refresh, or already at the failure ceiling.
    pub skipped: usize,
    /// Per-entry failure messages, in dispatch order.
    pub errors: Vec<(CacheKey, String)>,
}

impl RefreshReport {
    /// Entries the pass handled in any way.
    #[must_use]
    pub fn total(&self) -> usize {
        self.refreshed + self.failed + self.skipped
    }
}

/// Handle for controlling the refresh scheduler lifecycle.
pub struct RefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Signal the scheduler to shut down gracefully.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Classified outcome of one failed fetch attempt.
struct AttemptFailure {
    message: String,
    fatal: bool,
}

impl AttemptFailure {
    fn transient(message: String) -> Self {
        Self {
            message,
            fatal: false,
        }
    }

    fn fatal(message: String) -> Self {
        Self {
            message,
            fatal: true,
        }
    }
}

/// Background service that keeps cached snapshots fresh.
///
/// Polls the store on an interval and refreshes due entries in priority
/// order, a bounded batch per tick. Failures are isolated per entry:
/// transient feed errors retry on later passes until the configured
/// ceiling, fatal ones disable auto-refresh immediately.
pub struct RefreshService {
    config: RefreshConfig,
    store: Arc<SnapshotStore>,
    policy: Arc<FreshnessPolicy>,
    feed: Arc<dyn MarketFeed>,
}

impl RefreshService {
    /// Create a new refresh service with the given dependencies.
    pub fn new(
        config: RefreshConfig,
        store: Arc<SnapshotStore>,
        policy: Arc<FreshnessPolicy>,
        feed: Arc<dyn MarketFeed>,
    ) -> Self {
        Self {
            config,
            store,
            policy,
            feed,
        }
    }

    /// Start the background scheduler.
    ///
    /// Spawns an async task that runs one refresh pass per tick. Returns a
    /// handle for lifecycle control and a channel carrying one
    /// [`RefreshReport`] per tick. Callers gate on
    /// [`RefreshConfig::enabled`] before starting; `start` always spawns.
    ///
    /// Shutdown is observed between entries: the in-flight attempt runs to
    /// completion or timeout, undispatched entries keep their prior state.
    pub fn start(self) -> (RefreshHandle, mpsc::Receiver<RefreshReport>) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (report_tx, report_rx) = mpsc::channel::<RefreshReport>(16);

        let service = Arc::new(self);
        let tick = service.config.tick();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                tick_secs = service.config.tick_secs,
                batch_size = service.config.batch_size,
                "refresh scheduler started"
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("refresh scheduler shutting down");
                        break;
                    }

                    _ = interval.tick() => {
                        let now = Utc::now();
                        let due = service.store.list_due_for_refresh(now);
                        let mut report = RefreshReport::default();
                        let mut stopping = false;

                        for entry in due.into_iter().take(service.config.batch_size) {
                            if shutdown_rx.try_recv().is_ok() {
                                stopping = true;
                                break;
                            }
                            service.refresh_entry(&entry, now, &mut report).await;
                        }

                        if report.total() > 0 {
                            debug!(
                                refreshed = report.refreshed,
                                failed = report.failed,
                                skipped = report.skipped,
                                "refresh tick complete"
                            );
                        }
                        if report_tx.send(report).await.is_err() {
                            debug!("report receiver dropped, stopping scheduler");
                            return;
                        }
                        if stopping {
                            info!("refresh scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        });

        (RefreshHandle { shutdown_tx }, report_rx)
    }

    /// Run one refresh pass over at most `batch_size` due entries.
    ///
    /// This is the scheduler's per-tick body, exposed so callers can drive
    /// a pass on demand with an explicit clock.
    pub async fn refresh_due_entries(
        &self,
        now: DateTime<Utc>,
        batch_size: usize,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();
        let due = self.store.list_due_for_refresh(now);
        for entry in due.into_iter().take(batch_size) {
            self.refresh_entry(&entry, now, &mut report).await;
        }
        if report.total() > 0 {
            debug!(
                refreshed = report.refreshed,
                failed = report.failed,
                skipped = report.skipped,
                "refresh pass complete"
            );
        }
        report
    }

    /// Claim and refresh one entry, folding the outcome into `report`.
    async fn refresh_entry(
        &self,
        entry: &CacheEntry,
        now: DateTime<Utc>,
        report: &mut RefreshReport,
    ) {
        // Expiry keeps opted-out and ceiling-hit entries in the due list;
        // they are never dispatched, only counted.
        if !entry.auto_refresh || entry.failure_count >= self.policy.failure_ceiling() {
            report.skipped += 1;
            return;
        }
        if !self.store.try_begin_refresh(&entry.key, now) {
            report.skipped += 1;
            return;
        }

        match self.attempt(entry, now).await {
            Ok(()) => report.refreshed += 1,
            Err(failure) => {
                self.store.record_failure(&entry.key, failure.message.clone());
                let failures = self.store.peek(&entry.key).map_or(0, |e| e.failure_count);
                if failure.fatal {
                    self.store.disable_auto_refresh(&entry.key);
                    warn!(
                        key = %entry.key,
                        error = %failure.message,
                        "fatal refresh failure, auto-refresh disabled"
                    );
                } else if failures >= self.policy.failure_ceiling() {
                    self.store.disable_auto_refresh(&entry.key);
                    warn!(
                        key = %entry.key,
                        failures,
                        "refresh failure ceiling reached, auto-refresh disabled"
                    );
                } else {
                    debug!(
                        key = %entry.key,
                        failures,
                        error = %failure.message,
                        "transient refresh failure"
                    );
                }
                report.failed += 1;
                report.errors.push((entry.key.clone(), failure.message));
            }
        }
    }

    /// One fetch-and-store attempt for a claimed entry.
    async fn attempt(&self, entry: &CacheEntry, now: DateTime<Utc>) -> Result<(), AttemptFailure> {
        let (Some(type_id), Some(region)) = (entry.type_id, entry.region) else {
            let err = IntelError::UnscopedEntry {
                key: entry.key.clone(),
            };
            return Err(AttemptFailure::fatal(err.to_string()));
        };

        let window = ObservationWindow::trailing_days(now, i64::from(self.config.window_days));
        let fetch = self.feed.fetch_observations(type_id, region, window);
        let observations = match tokio::time::timeout(self.config.attempt_timeout(), fetch).await {
            Ok(Ok(observations)) => observations,
            Ok(Err(err)) if err.is_transient() => {
                return Err(AttemptFailure::transient(err.to_string()));
            }
            Ok(Err(err)) => return Err(AttemptFailure::fatal(err.to_string())),
            Err(_) => {
                let err = FeedError::Timeout {
                    elapsed_ms: self.config.attempt_timeout_ms,
                };
                return Err(AttemptFailure::transient(err.to_string()));
            }
        };

        let payload = if matches!(entry.kind, SnapshotKind::Statistics) {
            let stats = statistics::compute(type_id, region, window, &observations);
            serde_json::to_string(&stats)
        } else {
            serde_json::to_string(&observations)
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(err) => {
                return Err(AttemptFailure::fatal(format!(
                    "payload serialization failed: {err}"
                )));
            }
        };

        let mut request = PutRequest::new(
            entry.key.clone(),
            entry.kind,
            payload,
            entry.refresh_interval,
        );
        request.region = entry.region;
        request.type_id = entry.type_id;
        request.location = entry.location;
        request.priority = entry.priority;
        request.auto_refresh = entry.auto_refresh;
        request.tags = entry.tags.clone();
        self.store.put(request, now);
        Ok(())
    }
}
