//! The long-running watcher: seeded cache, background refresh, signal
//! handling.

use serde_json::json;
use tracing::info;

use crate::cli::{banner, demo, output, RunArgs};
use crate::config::Config;
use crate::error::Result;

/// Run the watcher until interrupted.
pub async fn execute(config: &Config, args: &RunArgs) -> Result<()> {
    let mut config = config.clone();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if let Some(tick_secs) = args.tick_secs {
        config.refresh.tick_secs = tick_secs;
    }
    config.init_logging();

    if !args.no_banner && !output::is_json() && !output::is_quiet() {
        banner::print_banner();
    }

    let (intel, feed) = demo::build(&config);
    let seeded = demo::seed_cache(&intel, &feed, &config).await;
    let graph = intel.graph();

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("hubs", graph.hub_count());
    output::field("routes", graph.route_count());
    output::field("cached", format!("{seeded} entries"));
    output::field("tick", format!("{}s", config.refresh.tick_secs));
    output::field("window", format!("{} days", config.refresh.window_days));
    info!(
        seeded,
        hubs = graph.hub_count(),
        routes = graph.route_count(),
        "watcher online"
    );

    if !config.refresh.enabled {
        output::note("auto-refresh disabled; watching read-only until ctrl-c");
        tokio::signal::ctrl_c().await?;
        return Ok(());
    }

    let (handle, mut reports) = intel.spawn_refresh_loop();
    output::success("background refresh started");

    let mut ticks: u64 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                output::note("interrupt received, shutting down");
                break;
            }
            Some(report) = reports.recv() => {
                ticks += 1;
                if report.total() == 0 {
                    continue;
                }
                if output::is_json() {
                    output::json_output(&json!({
                        "type": "refresh",
                        "payload": {
                            "tick": ticks,
                            "refreshed": report.refreshed,
                            "failed": report.failed,
                            "skipped": report.skipped,
                        },
                    }));
                } else {
                    output::note(&format!(
                        "tick {ticks}: {} refreshed, {} failed, {} skipped",
                        report.refreshed, report.failed, report.skipped
                    ));
                }
                for (key, message) in &report.errors {
                    output::warning(&format!("{key}: {message}"));
                }
            }
        }
    }

    handle.shutdown().await;

    let metrics = intel.cache_metrics();
    output::section("session");
    output::field("ticks", ticks);
    output::field("hits", metrics.hits);
    output::field("misses", metrics.misses);
    output::field("inserts", metrics.inserts);
    output::field("evictions", metrics.evictions);
    info!(ticks, "watcher stopped");

    Ok(())
}
