//! One-shot market statistics for a single (item, region) pair.

use chrono::Utc;
use serde_json::json;

use crate::cli::{demo, output, StatsArgs};
use crate::config::Config;
use crate::domain::id::{RegionId, TypeId};
use crate::domain::observation::ObservationWindow;
use crate::error::Result;
use crate::feed::ReferenceData;

/// Fetch observations, derive statistics, optionally cache them.
pub async fn execute(config: &Config, args: &StatsArgs) -> Result<()> {
    let (intel, _feed) = demo::build(config);
    let reference = demo::reference_set(&config.feed);

    let type_id = TypeId::new(args.type_id);
    let region = RegionId::new(args.region);
    let days = args.days.unwrap_or(config.refresh.window_days);
    let window = ObservationWindow::trailing_days(Utc::now(), i64::from(days));

    let stats = intel.fetch_statistics(type_id, region, window).await?;
    let cached_key = if args.cache {
        Some(intel.cache_statistics(&stats)?.key)
    } else {
        None
    };

    if output::is_json() {
        output::json_output(&json!({
            "type": "statistics",
            "payload": {
                "statistics": stats,
                "cached_key": cached_key,
            },
        }));
        return Ok(());
    }

    let item = reference
        .type_name(type_id)
        .unwrap_or_else(|| format!("Type {type_id}"));
    let region_name = reference
        .region_name(region)
        .unwrap_or_else(|| format!("Region {region}"));

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!("{item} in {region_name}, trailing {days}d"));

    if stats.order_count == 0 {
        output::note("no observations in the window");
        return Ok(());
    }

    output::field("orders", stats.order_count);
    output::field(
        "buy / sell",
        format!("{} / {}", stats.buy_order_count, stats.sell_order_count),
    );
    output::field("min", format!("{} ISK", stats.min_price));
    output::field("max", format!("{} ISK", stats.max_price));
    output::field("median", format!("{} ISK", stats.median_price));
    output::field("mean", format!("{} ISK", stats.mean_price.round_dp(2)));
    output::field("std dev", format!("{:.2}", stats.std_deviation));
    output::field("volatility", format!("{:.4}", stats.volatility));
    output::field("trend", trend_label(stats.trend_slope));
    output::field("volume", stats.total_volume);
    output::field("volume/day", format!("{:.0}", stats.average_daily_volume));
    output::field(
        "isk/day",
        format!("{} ISK", stats.average_daily_isk_volume.round_dp(0)),
    );
    output::field("liquidity", format!("{:.1}", stats.liquidity_score));

    if let Some(key) = cached_key {
        output::success(&format!("cached as {key}"));
    }

    Ok(())
}

fn trend_label(slope: f64) -> String {
    if slope > 0.0 {
        output::positive(format!("rising {slope:+.4}/day"))
    } else if slope < 0.0 {
        output::negative(format!("falling {slope:+.4}/day"))
    } else {
        "flat".to_string()
    }
}
