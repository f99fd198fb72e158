//! Diagnostic checks: configuration validity and data health.

use std::path::Path;

use serde_json::json;

use crate::cli::{demo, output};
use crate::config::Config;
use crate::error::Result;

/// Validate the configuration without starting the watcher.
///
/// Loads the file itself so a broken config is reported, not fatal before
/// dispatch.
pub fn config_report(path: Option<&Path>) -> Result<()> {
    let source = path.map_or_else(
        || "voidwatch.toml or built-in defaults".to_string(),
        |p| p.display().to_string(),
    );

    let config = Config::load_or_default(path)?;

    if output::is_json() {
        output::json_output(&json!({
            "type": "check-config",
            "payload": {
                "valid": true,
                "source": source,
                "cache_max_bytes": config.cache.max_bytes,
                "default_ttl_secs": config.cache.default_ttl_secs,
                "failure_ceiling": config.cache.failure_ceiling,
                "tick_secs": config.refresh.tick_secs,
                "window_days": config.refresh.window_days,
                "refresh_enabled": config.refresh.enabled,
                "min_margin": config.arbitrage.min_margin,
                "types": config.feed.types.len(),
                "regions": config.feed.regions.len(),
                "seed": config.feed.seed,
            },
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::success(&format!("configuration valid ({source})"));
    output::field("cache budget", format!("{} bytes", config.cache.max_bytes));
    output::field("default ttl", format!("{}s", config.cache.default_ttl_secs));
    output::field("failures", format!("ceiling {}", config.cache.failure_ceiling));
    output::field(
        "refresh",
        if config.refresh.enabled {
            format!("every {}s", config.refresh.tick_secs)
        } else {
            "disabled".to_string()
        },
    );
    output::field("window", format!("{} days", config.refresh.window_days));
    output::field("margin floor", config.arbitrage.min_margin);
    output::field(
        "feed",
        format!(
            "{} types x {} regions, seed {}",
            config.feed.types.len(),
            config.feed.regions.len(),
            config.feed.seed
        ),
    );
    Ok(())
}

/// Validate the category hierarchy and sweep the seeded cache for
/// corruption.
pub async fn data_report(config: &Config) -> Result<()> {
    let (intel, feed) = demo::build(config);
    demo::seed_cache(&intel, &feed, config).await;

    let hierarchy = intel.validate_category_hierarchy();
    let integrity = intel.check_integrity();
    let graph = intel.graph();

    if output::is_json() {
        output::json_output(&json!({
            "type": "check-data",
            "payload": {
                "hierarchy": hierarchy,
                "integrity": integrity,
                "hubs": graph.hub_count(),
                "routes": graph.route_count(),
            },
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));

    output::section("category hierarchy");
    output::field("nodes", hierarchy.node_count);
    if hierarchy.is_healthy() {
        output::success("no orphans, cycles, or missing parents");
    } else {
        output::field("orphans", hierarchy.orphan_count);
        output::field("cycles", hierarchy.cycle_count);
        output::field("missing", hierarchy.missing_parent_count);
        for issue in &hierarchy.issues {
            output::warning(issue);
        }
    }

    output::section("cache integrity");
    output::field("checked", integrity.checked);
    if integrity.is_healthy() {
        output::success("all checksums and references intact");
    } else {
        output::field("checksum", integrity.checksum_failures);
        output::field("dangling", integrity.dangling_references);
        for issue in &integrity.issues {
            output::warning(issue);
        }
    }

    output::section("route graph");
    output::field("hubs", graph.hub_count());
    output::field("routes", graph.route_count());
    Ok(())
}
