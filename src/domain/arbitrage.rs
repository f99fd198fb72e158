//! Arbitrage ranking over a route graph snapshot.
//!
//! Pure functions over `&RouteGraph`: no locking, no clock, no feed. The
//! caller hands in a consistent snapshot and gets deterministically ordered
//! results back.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::IntelError;

use super::id::{HubId, RouteId, TypeId};
use super::route::{RiskLevel, RouteGraph, RouteItemProfitability, TradeHub, TradeRoute};

/// Margin floor for the risk-filtered route view. Spreads below this do
/// not cover hauling overhead.
pub const MIN_VIABLE_MARGIN: Decimal = dec!(0.05);

/// Assumed hauling time per gate jump.
pub const TRANSIT_MINUTES_PER_JUMP: i64 = 3;

/// One rankable (route, item) opportunity, self-contained for display
/// and JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub route: RouteId,
    pub type_id: TypeId,
    pub buy_hub: HubId,
    pub buy_hub_name: String,
    pub buy_price: Decimal,
    pub sell_hub: HubId,
    pub sell_hub_name: String,
    pub sell_price: Decimal,
    /// Tradable units per day on this route.
    pub daily_volume: u64,
    pub profit_per_unit: Decimal,
    pub margin: Decimal,
    pub distance_ly: f64,
    pub jumps: u32,
    pub risk: RiskLevel,
    pub estimated_transit_minutes: i64,
}

impl ArbitrageOpportunity {
    fn from_route_item(
        route: &TradeRoute,
        item: &RouteItemProfitability,
        origin: &TradeHub,
        destination: &TradeHub,
    ) -> Self {
        Self {
            route: route.id,
            type_id: item.type_id,
            buy_hub: origin.id,
            buy_hub_name: origin.name.clone(),
            buy_price: item.buy_price,
            sell_hub: destination.id,
            sell_hub_name: destination.name.clone(),
            sell_price: item.sell_price,
            daily_volume: item.daily_volume,
            profit_per_unit: item.profit_per_unit,
            margin: item.margin,
            distance_ly: route.distance_ly,
            jumps: route.jumps,
            risk: route.risk,
            estimated_transit_minutes: route.jumps as i64 * TRANSIT_MINUTES_PER_JUMP,
        }
    }

    #[must_use]
    pub fn estimated_transit(&self) -> Duration {
        Duration::minutes(self.estimated_transit_minutes)
    }

    /// ISK per day if the full daily volume were hauled.
    #[must_use]
    pub fn daily_potential_profit(&self) -> Decimal {
        self.profit_per_unit * Decimal::from(self.daily_volume)
    }
}

/// Outcome of a full graph sweep. Per-route failures are collected here,
/// never raised.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Active routes examined.
    pub routes_considered: usize,
    /// Routes dropped for missing hub endpoints.
    pub routes_skipped: usize,
    pub opportunities: Vec<ArbitrageOpportunity>,
    pub skipped: Vec<String>,
}

/// Active routes worth a look under a risk ceiling: `risk <= max_risk` and
/// `average_margin > MIN_VIABLE_MARGIN`. Ordered by descending margin,
/// ties by ascending risk.
#[must_use]
pub fn opportunities_by_risk(graph: &RouteGraph, max_risk: RiskLevel) -> Vec<&TradeRoute> {
    let mut routes: Vec<&TradeRoute> = graph
        .routes()
        .into_iter()
        .filter(|r| r.active && r.risk <= max_risk && r.average_margin > MIN_VIABLE_MARGIN)
        .collect();
    routes.sort_by(|a, b| {
        b.average_margin
            .cmp(&a.average_margin)
            .then(a.risk.cmp(&b.risk))
    });
    routes
}

/// Expand every qualifying (route, item) pair into an opportunity.
///
/// A route qualifies on `average_margin >= min_margin` and each item on
/// its own `margin >= min_margin`. Routes with missing hub endpoints or
/// no item records contribute nothing.
#[must_use]
pub fn arbitrage_opportunities(
    graph: &RouteGraph,
    min_margin: Decimal,
) -> Vec<ArbitrageOpportunity> {
    scan(graph, min_margin, None).opportunities
}

/// Full sweep behind [`arbitrage_opportunities`], keeping per-route
/// failure accounting. `item_scope` restricts results to the given item
/// types when present.
#[must_use]
pub fn scan(
    graph: &RouteGraph,
    min_margin: Decimal,
    item_scope: Option<&HashSet<TypeId>>,
) -> ScanSummary {
    let mut summary = ScanSummary::default();

    for route in graph.routes() {
        if !route.active {
            continue;
        }
        summary.routes_considered += 1;
        if route.average_margin < min_margin {
            continue;
        }

        let (origin, destination) = match (graph.hub(route.origin), graph.hub(route.destination)) {
            (Some(origin), Some(destination)) => (origin, destination),
            _ => {
                summary.routes_skipped += 1;
                summary.skipped.push(format!(
                    "route {} references a hub missing from the graph ({} -> {})",
                    route.id, route.origin, route.destination
                ));
                continue;
            }
        };

        for item in graph.items_on(route.id) {
            if item.margin < min_margin {
                continue;
            }
            if let Some(scope) = item_scope {
                if !scope.contains(&item.type_id) {
                    continue;
                }
            }
            summary
                .opportunities
                .push(ArbitrageOpportunity::from_route_item(
                    route,
                    item,
                    origin,
                    destination,
                ));
        }
    }

    summary.opportunities.sort_by(rank_ordering);
    summary
}

/// Top-`n` recommended items on one route by descending daily potential
/// profit. Unknown route ids are an error, distinct from a known route
/// with no records.
pub fn top_profitable_items(
    graph: &RouteGraph,
    route: RouteId,
    n: usize,
) -> Result<Vec<RouteItemProfitability>, IntelError> {
    if graph.route(route).is_none() {
        return Err(IntelError::RouteNotFound { route });
    }

    let mut items: Vec<RouteItemProfitability> = graph
        .items_on(route)
        .iter()
        .filter(|item| item.recommended)
        .cloned()
        .collect();
    items.sort_by(|a, b| b.daily_potential_profit().cmp(&a.daily_potential_profit()));
    items.truncate(n);
    Ok(items)
}

/// Descending margin; ties by ascending risk, then ascending distance, so
/// safer and shorter hauls surface first.
fn rank_ordering(a: &ArbitrageOpportunity, b: &ArbitrageOpportunity) -> Ordering {
    b.margin
        .cmp(&a.margin)
        .then(a.risk.cmp(&b.risk))
        .then(
            a.distance_ly
                .partial_cmp(&b.distance_ly)
                .unwrap_or(Ordering::Equal),
        )
}
