//! Deterministic demo universe for one-shot commands.
//!
//! The persistence and live-feed collaborators sit outside this crate, so
//! CLI invocations operate on a synthetic universe derived from the
//! configured feed seed: a handful of trade hubs, routes priced off the
//! synthetic feed, a small market-category tree, and a seeded snapshot
//! cache. The same seed always produces the same universe.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::application::{IntelConfig, MarketIntel, PutRequest};
use crate::config::{Config, FeedConfig};
use crate::domain::arbitrage::MIN_VIABLE_MARGIN;
use crate::domain::category::{CategoryNode, CategoryTree};
use crate::domain::entry::{CachePriority, SnapshotKind};
use crate::domain::id::{CategoryId, HubId, RegionId, RouteId, SystemId};
use crate::domain::observation::ObservationWindow;
use crate::domain::route::{
    HubTier, RiskLevel, RouteGraph, RouteItemProfitability, TradeHub, TradeRoute,
};
use crate::domain::statistics;
use crate::feed::{MarketFeed, ReferenceSet, SyntheticFeed};

const HUBS: &[(u32, &str, u32, u32, HubTier, f64)] = &[
    (1, "Jita IV-4 CNAP", 10_000_002, 30_000_142, HubTier::Primary, 97.0),
    (2, "Amarr VIII (Oris) EFA", 10_000_043, 30_002_187, HubTier::Primary, 88.5),
    (3, "Dodixie IX-20 FNAP", 10_000_032, 30_002_659, HubTier::Secondary, 74.0),
    (4, "Rens VI-8 BTT", 10_000_030, 30_002_510, HubTier::Secondary, 66.5),
    (5, "Hek VIII-12 BFW", 10_000_042, 30_002_053, HubTier::Regional, 58.0),
];

const ROUTES: &[(u32, u32, u32, f64, u32, RiskLevel, &str, bool)] = &[
    (101, 1, 2, 35.4, 9, RiskLevel::Low, "0.062", true),
    (102, 2, 1, 35.4, 9, RiskLevel::Low, "0.031", true),
    (103, 1, 3, 28.7, 7, RiskLevel::Minimal, "0.054", true),
    (104, 3, 4, 19.2, 6, RiskLevel::Moderate, "0.078", true),
    (105, 4, 5, 11.8, 3, RiskLevel::Minimal, "0.049", true),
    (106, 5, 1, 24.5, 8, RiskLevel::Elevated, "0.102", true),
    (107, 2, 4, 31.0, 10, RiskLevel::High, "0.124", false),
];

fn region_name(id: u32) -> String {
    match id {
        10_000_002 => "The Forge".to_string(),
        10_000_030 => "Heimatar".to_string(),
        10_000_032 => "Sinq Laison".to_string(),
        10_000_042 => "Metropolis".to_string(),
        10_000_043 => "Domain".to_string(),
        other => format!("Region {other}"),
    }
}

fn type_entry(id: u32) -> (String, u32) {
    match id {
        34 => ("Tritanium".to_string(), 40),
        35 => ("Pyerite".to_string(), 40),
        36 => ("Mexallon".to_string(), 40),
        37 => ("Isogen".to_string(), 40),
        16_264 => ("Heavy Water".to_string(), 41),
        587 => ("Rifter".to_string(), 25),
        638 => ("Raven".to_string(), 27),
        other => (format!("Type {other}"), 40),
    }
}

/// Reference data covering the demo hubs plus everything the feed config
/// names.
pub fn reference_set(feed: &FeedConfig) -> Arc<ReferenceSet> {
    let mut reference = ReferenceSet::new();
    for &(_, _, region, _, _, _) in HUBS {
        reference = reference.with_region(RegionId::new(region), &region_name(region));
    }
    for &region in &feed.regions {
        reference = reference.with_region(region, &region_name(region.value()));
    }
    for category in [4, 6, 25, 27, 40, 41] {
        reference = reference.with_category(CategoryId::new(category));
    }
    for &type_id in &feed.types {
        let (name, category) = type_entry(type_id.value());
        reference = reference.with_type(type_id, &name, CategoryId::new(category));
    }
    Arc::new(reference)
}

/// Small market-category tree: two roots, leaves flagged as item-bearing.
pub fn category_tree() -> CategoryTree {
    let node = |id: u32, name: &str, parent: Option<u32>, has_items: bool| CategoryNode {
        id: CategoryId::new(id),
        name: name.to_string(),
        parent: parent.map(CategoryId::new),
        has_items,
    };
    CategoryTree::from_nodes(vec![
        node(4, "Raw Materials", None, false),
        node(40, "Minerals", Some(4), true),
        node(41, "Ice Products", Some(4), true),
        node(6, "Ships", None, false),
        node(25, "Frigates", Some(6), true),
        node(27, "Battleships", Some(6), true),
    ])
}

/// Deterministic per-(route, item) margin spread around the route's base.
fn item_margin(route: u32, type_id: u32, base: Decimal) -> Decimal {
    let jitter = i64::from((route.wrapping_mul(31).wrapping_add(type_id.wrapping_mul(17))) % 9) - 4;
    base + Decimal::new(jitter, 3)
}

/// Build the hub/route graph, pricing items off the synthetic feed at the
/// route's origin region.
pub fn route_graph(feed: &SyntheticFeed, config: &FeedConfig, now: DateTime<Utc>) -> RouteGraph {
    let hubs: Vec<TradeHub> = HUBS
        .iter()
        .map(|&(id, name, region, system, tier, liquidity)| TradeHub {
            id: HubId::new(id),
            name: name.to_string(),
            region: RegionId::new(region),
            system: SystemId::new(system),
            tier,
            liquidity_score: liquidity,
            accessible: true,
        })
        .collect();

    let window = ObservationWindow::trailing_days(now, 7);
    let mut routes = Vec::with_capacity(ROUTES.len());
    let mut items = Vec::new();

    for &(id, origin, destination, distance_ly, jumps, risk, margin, active) in ROUTES {
        let base: Decimal = margin.parse().unwrap_or(MIN_VIABLE_MARGIN);
        routes.push(TradeRoute {
            id: RouteId::new(id),
            origin: HubId::new(origin),
            destination: HubId::new(destination),
            distance_ly,
            jumps,
            risk,
            average_margin: base,
            realized_margin: base - dec!(0.004),
            daily_volume: 40_000 * u64::from(jumps),
            active,
        });

        let origin_region = HUBS
            .iter()
            .find(|h| h.0 == origin)
            .map_or(RegionId::new(10_000_002), |h| RegionId::new(h.2));
        for &type_id in &config.types {
            let observations = feed.observations(type_id, origin_region, window);
            let stats = statistics::compute(type_id, origin_region, window, &observations);
            let buy_price = stats.mean_price.round_dp(2).max(dec!(0.01));
            let margin = item_margin(id, type_id.value(), base);
            let sell_price = (buy_price * (Decimal::ONE + margin)).round_dp(2);
            items.push(RouteItemProfitability {
                route: RouteId::new(id),
                type_id,
                buy_price,
                sell_price,
                profit_per_unit: sell_price - buy_price,
                margin,
                daily_volume: stats.average_daily_volume.max(0.0) as u64,
                recommended: margin >= MIN_VIABLE_MARGIN,
            });
        }
    }

    RouteGraph::new(hubs, routes, items)
}

/// Build a fully-wired facade over the synthetic universe.
pub fn build(config: &Config) -> (MarketIntel, Arc<SyntheticFeed>) {
    let feed = Arc::new(SyntheticFeed::new(config.feed.seed));
    let intel = MarketIntel::new(
        IntelConfig::from(config),
        Arc::clone(&feed) as Arc<dyn MarketFeed>,
        reference_set(&config.feed),
    );
    intel.replace_categories(category_tree());
    intel.replace_graph(route_graph(&feed, &config.feed, Utc::now()));
    (intel, feed)
}

/// Seed the snapshot cache with statistics, order, and prediction entries
/// for every configured (item, region) pair. Returns how many entries were
/// written.
pub async fn seed_cache(intel: &MarketIntel, feed: &SyntheticFeed, config: &Config) -> usize {
    let now = Utc::now();
    let window = ObservationWindow::trailing_days(now, i64::from(config.refresh.window_days));
    let mut written = 0;

    let fetches = config.feed.types.iter().flat_map(|&type_id| {
        config
            .feed
            .regions
            .iter()
            .map(move |&region| intel.fetch_statistics(type_id, region, window))
    });
    for result in join_all(fetches).await {
        match result {
            Ok(stats) => {
                if intel.cache_statistics(&stats).is_ok() {
                    written += 1;
                }
            }
            Err(err) => warn!(error = %err, "statistics seed failed"),
        }
    }

    for &type_id in &config.feed.types {
        for (index, &region) in config.feed.regions.iter().enumerate() {
            let observations = feed.observations(type_id, region, window);
            let Ok(payload) = serde_json::to_string(&observations) else {
                continue;
            };
            // Secondary regions are watched less closely; let eviction
            // reclaim them first.
            let priority = if index == 0 {
                CachePriority::Normal
            } else {
                CachePriority::Low
            };
            let request = PutRequest::scoped(
                SnapshotKind::Orders,
                Some(region),
                Some(type_id),
                None,
                payload,
                intel.ttl_for(SnapshotKind::Orders),
            )
            .with_priority(priority);
            intel.put_snapshot(request);
            written += 1;
        }
    }

    if let Some(&region) = config.feed.regions.first() {
        for &type_id in &config.feed.types {
            let observations = feed.observations(type_id, region, window);
            let stats = statistics::compute(type_id, region, window, &observations);
            let payload = serde_json::json!({
                "type_id": type_id,
                "region": region,
                "trend_slope": stats.trend_slope,
                "volatility": stats.volatility,
            })
            .to_string();
            let request = PutRequest::scoped(
                SnapshotKind::Predictions,
                Some(region),
                Some(type_id),
                None,
                payload,
                intel.ttl_for(SnapshotKind::Predictions),
            )
            .with_priority(CachePriority::Disposable);
            intel.put_snapshot(request);
            written += 1;
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_tree_is_healthy() {
        let report = category_tree().validate();
        assert!(report.is_healthy(), "issues: {:?}", report.issues);
    }

    #[test]
    fn demo_graph_surfaces_opportunities_at_the_floor() {
        let config = Config::default();
        let feed = SyntheticFeed::new(config.feed.seed);
        let graph = route_graph(&feed, &config.feed, Utc::now());

        assert_eq!(graph.hub_count(), 5);
        assert_eq!(graph.route_count(), 7);
        let found = crate::domain::arbitrage::arbitrage_opportunities(&graph, MIN_VIABLE_MARGIN);
        assert!(!found.is_empty());
    }

    #[tokio::test]
    async fn seeding_writes_all_three_kinds() {
        let config = Config::default();
        let (intel, feed) = build(&config);
        let written = seed_cache(&intel, &feed, &config).await;

        // 4 types x 2 regions for stats and orders, 4 predictions.
        assert_eq!(written, 20);
        let entries = intel.cache_entries();
        assert!(entries
            .iter()
            .any(|e| matches!(e.kind, SnapshotKind::Statistics)));
        assert!(entries.iter().any(|e| matches!(e.kind, SnapshotKind::Orders)));
        assert!(entries
            .iter()
            .any(|e| matches!(e.kind, SnapshotKind::Predictions)));
    }
}
