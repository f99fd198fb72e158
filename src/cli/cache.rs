//! Cache maintenance commands over the seeded demo universe.

use chrono::{Duration, Utc};
use serde_json::json;
use tabled::{Table, Tabled};

use crate::application::MarketIntel;
use crate::cli::{demo, output, CacheCommand, InvalidateArgs};
use crate::config::Config;
use crate::domain::id::CacheKey;
use crate::error::{Error, IntelError, Result};

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Bytes")]
    bytes: usize,
    #[tabled(rename = "Reads")]
    reads: u64,
}

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "At")]
    at: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Bytes")]
    bytes: usize,
}

/// Dispatch one cache maintenance subcommand.
pub async fn execute(config: &Config, command: &CacheCommand) -> Result<()> {
    let (intel, feed) = demo::build(config);
    demo::seed_cache(&intel, &feed, config).await;

    match command {
        CacheCommand::Status => status(&intel, config),
        CacheCommand::Cleanup => cleanup(&intel),
        CacheCommand::Evict(args) => {
            evict(&intel, args.max_bytes.unwrap_or(config.cache.max_bytes))
        }
        CacheCommand::Invalidate(args) => invalidate(&intel, args),
        CacheCommand::Log => log(&intel),
    }
}

fn human(duration: Duration) -> String {
    let secs = duration.num_seconds();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3_600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h{}m", secs / 3_600, (secs % 3_600) / 60)
    } else {
        format!("{}d", secs / 86_400)
    }
}

fn status(intel: &MarketIntel, config: &Config) -> Result<()> {
    let now = Utc::now();
    let entries = intel.cache_entries();
    let metrics = intel.cache_metrics();
    let total_bytes = intel.cache_size_bytes();

    if output::is_json() {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                json!({
                    "key": e.key,
                    "kind": e.kind.as_str(),
                    "status": e.effective_status(now).as_str(),
                    "priority": e.priority.as_str(),
                    "bytes": e.payload_bytes,
                    "created_at": e.created_at.to_rfc3339(),
                    "expires_at": e.expires_at.to_rfc3339(),
                    "access_count": e.access_count,
                    "failure_count": e.failure_count,
                    "auto_refresh": e.auto_refresh,
                })
            })
            .collect();
        output::json_output(&json!({
            "type": "cache-status",
            "payload": {
                "entries": rows,
                "total_bytes": total_bytes,
                "max_bytes": config.cache.max_bytes,
                "metrics": metrics,
            },
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("snapshot cache");
    output::field("entries", entries.len());
    output::field(
        "size",
        format!("{total_bytes} / {} bytes", config.cache.max_bytes),
    );
    output::field("hits", metrics.hits);
    output::field("misses", metrics.misses);
    output::field("inserts", metrics.inserts);
    output::field("evictions", metrics.evictions);

    if entries.is_empty() {
        output::note("cache is empty");
        return Ok(());
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            key: e.key.to_string(),
            status: e.effective_status(now).to_string(),
            priority: e.priority.to_string(),
            age: human(now - e.created_at),
            expires: if e.is_expired(now) {
                "expired".to_string()
            } else {
                human(e.expires_at - now)
            },
            bytes: e.payload_bytes,
            reads: e.access_count,
        })
        .collect();

    println!();
    output::table(&Table::new(rows).to_string());
    Ok(())
}

fn cleanup(intel: &MarketIntel) -> Result<()> {
    let report = intel.cleanup_expired();

    if output::is_json() {
        output::json_output(&json!({
            "type": "cache-cleanup",
            "payload": report,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    if report.removed == 0 {
        output::note("nothing expired");
    } else {
        output::success(&format!(
            "removed {} expired entries, freed {} bytes",
            report.removed, report.bytes_freed
        ));
    }
    Ok(())
}

fn evict(intel: &MarketIntel, max_bytes: u64) -> Result<()> {
    let report = intel.evict_to_size_budget(max_bytes);

    if output::is_json() {
        output::json_output(&json!({
            "type": "cache-evict",
            "payload": {
                "max_bytes": max_bytes,
                "evicted": report.evicted,
                "bytes_freed": report.bytes_freed,
                "bytes_remaining": report.bytes_remaining,
            },
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    if report.evicted == 0 {
        output::note(&format!("already within {max_bytes} bytes"));
    } else {
        output::success(&format!(
            "evicted {} entries, freed {} bytes, {} remaining",
            report.evicted, report.bytes_freed, report.bytes_remaining
        ));
    }
    Ok(())
}

fn invalidate(intel: &MarketIntel, args: &InvalidateArgs) -> Result<()> {
    let key = CacheKey::new(args.key.clone());

    let event = match intel.invalidate(&key, args.reason) {
        Ok(event) => event,
        Err(Error::Intel(IntelError::CriticalEntryProtected { key })) => {
            output::error(&format!("{key} is critical and cannot be invalidated"));
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    if output::is_json() {
        output::json_output(&json!({
            "type": "cache-invalidate",
            "payload": event,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    match event {
        Some(event) => output::success(&format!(
            "invalidated {} ({}, {} bytes freed)",
            event.key, event.reason, event.bytes
        )),
        None => output::note(&format!("no entry under {key}")),
    }
    Ok(())
}

fn log(intel: &MarketIntel) -> Result<()> {
    let events = intel.invalidation_log();

    if output::is_json() {
        output::json_output(&json!({
            "type": "cache-log",
            "payload": { "events": events },
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("invalidation log");

    if events.is_empty() {
        output::note("no invalidations recorded");
        return Ok(());
    }

    let rows: Vec<LogRow> = events
        .iter()
        .map(|e| LogRow {
            at: e.at.format("%H:%M:%S").to_string(),
            key: e.key.to_string(),
            reason: e.reason.to_string(),
            bytes: e.bytes,
        })
        .collect();

    println!();
    output::table(&Table::new(rows).to_string());
    Ok(())
}
