//! Trade hubs, routes between them, and per-route item profitability.
//!
//! The [`RouteGraph`] is an immutable snapshot assembled by reference-data
//! sync. Construction validates nothing; lookups are total and return
//! `Option`, and the graph is swapped wholesale when new data lands.

use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::IntelError;

use super::id::{HubId, RegionId, RouteId, SystemId, TypeId};

/// Market importance class of a trade hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HubTier {
    /// The galaxy-scale market center.
    Primary,
    /// Major secondary markets.
    Secondary,
    /// Busiest hub of a single region.
    Regional,
    /// Local gathering points.
    Local,
    /// Niche markets for a specific commodity class.
    Specialized,
}

impl HubTier {
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HubTier::Primary => "primary",
            HubTier::Secondary => "secondary",
            HubTier::Regional => "regional",
            HubTier::Local => "local",
            HubTier::Specialized => "specialized",
        }
    }
}

impl std::fmt::Display for HubTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hauling risk classification for a route.
///
/// Declaration order is severity order, so `risk <= RiskLevel::Moderate`
/// reads the way a route filter means it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Minimal,
    Low,
    Moderate,
    Elevated,
    High,
}

impl RiskLevel {
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Minimal => "minimal",
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::Elevated => "elevated",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(RiskLevel::Minimal),
            "low" => Ok(RiskLevel::Low),
            "moderate" => Ok(RiskLevel::Moderate),
            "elevated" => Ok(RiskLevel::Elevated),
            "high" => Ok(RiskLevel::High),
            other => Err(format!(
                "unknown risk level '{other}' (expected minimal|low|moderate|elevated|high)"
            )),
        }
    }
}

/// A station or citadel that functions as a market center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeHub {
    pub id: HubId,
    pub name: String,
    pub region: RegionId,
    pub system: SystemId,
    pub tier: HubTier,
    pub liquidity_score: f64,
    /// False while the hub is unreachable (wardec, camp, closed citadel).
    pub accessible: bool,
}

/// A directed connection between two hubs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRoute {
    pub id: RouteId,
    pub origin: HubId,
    pub destination: HubId,
    pub distance_ly: f64,
    pub jumps: u32,
    pub risk: RiskLevel,
    /// Margin expected from listed spreads.
    pub average_margin: Decimal,
    /// Margin actually realized by completed hauls.
    pub realized_margin: Decimal,
    pub daily_volume: u64,
    pub active: bool,
}

/// Profitability of hauling one item along one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteItemProfitability {
    pub route: RouteId,
    pub type_id: TypeId,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub profit_per_unit: Decimal,
    pub margin: Decimal,
    pub daily_volume: u64,
    pub recommended: bool,
}

impl RouteItemProfitability {
    /// ISK per day if the full daily volume were hauled.
    #[must_use]
    pub fn daily_potential_profit(&self) -> Decimal {
        self.profit_per_unit * Decimal::from(self.daily_volume)
    }
}

/// Connectivity summary for one hub, from active outbound routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubMetrics {
    pub hub: HubId,
    pub outbound_routes: usize,
    pub mean_outbound_margin: Decimal,
    /// Hubs reachable over active routes, excluding the hub itself.
    pub reachable_hubs: usize,
}

/// Immutable hub/route/profitability snapshot with lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct RouteGraph {
    hubs: HashMap<HubId, TradeHub>,
    routes: HashMap<RouteId, TradeRoute>,
    items: HashMap<RouteId, Vec<RouteItemProfitability>>,
    outbound: HashMap<HubId, Vec<RouteId>>,
}

impl RouteGraph {
    #[must_use]
    pub fn new(
        hubs: Vec<TradeHub>,
        routes: Vec<TradeRoute>,
        items: Vec<RouteItemProfitability>,
    ) -> Self {
        let hub_index: HashMap<HubId, TradeHub> = hubs.into_iter().map(|h| (h.id, h)).collect();

        let mut outbound: HashMap<HubId, Vec<RouteId>> = HashMap::new();
        let mut route_index: HashMap<RouteId, TradeRoute> = HashMap::with_capacity(routes.len());
        for route in routes {
            outbound.entry(route.origin).or_default().push(route.id);
            route_index.insert(route.id, route);
        }
        for ids in outbound.values_mut() {
            ids.sort_unstable();
        }

        let mut item_index: HashMap<RouteId, Vec<RouteItemProfitability>> = HashMap::new();
        for item in items {
            item_index.entry(item.route).or_default().push(item);
        }

        Self {
            hubs: hub_index,
            routes: route_index,
            items: item_index,
            outbound,
        }
    }

    #[must_use]
    pub fn hub(&self, id: HubId) -> Option<&TradeHub> {
        self.hubs.get(&id)
    }

    #[must_use]
    pub fn route(&self, id: RouteId) -> Option<&TradeRoute> {
        self.routes.get(&id)
    }

    /// All hubs, ordered by id.
    #[must_use]
    pub fn hubs(&self) -> Vec<&TradeHub> {
        let mut all: Vec<&TradeHub> = self.hubs.values().collect();
        all.sort_unstable_by_key(|h| h.id);
        all
    }

    /// All routes, ordered by id.
    #[must_use]
    pub fn routes(&self) -> Vec<&TradeRoute> {
        let mut all: Vec<&TradeRoute> = self.routes.values().collect();
        all.sort_unstable_by_key(|r| r.id);
        all
    }

    /// Outbound routes of a hub, ordered by route id.
    #[must_use]
    pub fn routes_from(&self, hub: HubId) -> Vec<&TradeRoute> {
        self.outbound
            .get(&hub)
            .map(|ids| ids.iter().filter_map(|id| self.routes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Item profitability records carried by a route.
    #[must_use]
    pub fn items_on(&self, route: RouteId) -> &[RouteItemProfitability] {
        self.items.get(&route).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn hub_count(&self) -> usize {
        self.hubs.len()
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty() && self.routes.is_empty()
    }

    /// Connectivity metrics for `hub` over active outbound routes.
    ///
    /// An unknown hub id is an error; a known hub with no routes reports
    /// zero metrics. The reachability walk carries a visited set so route
    /// cycles terminate.
    pub fn hub_metrics(&self, hub: HubId) -> Result<HubMetrics, IntelError> {
        if !self.hubs.contains_key(&hub) {
            return Err(IntelError::HubNotFound { hub });
        }

        let active_outbound: Vec<&TradeRoute> = self
            .routes_from(hub)
            .into_iter()
            .filter(|r| r.active)
            .collect();
        let outbound_routes = active_outbound.len();
        let mean_outbound_margin = if active_outbound.is_empty() {
            Decimal::ZERO
        } else {
            active_outbound
                .iter()
                .map(|r| r.average_margin)
                .sum::<Decimal>()
                / Decimal::from(outbound_routes as u64)
        };

        let mut visited: HashSet<HubId> = HashSet::new();
        visited.insert(hub);
        let mut queue: VecDeque<HubId> = VecDeque::new();
        queue.push_back(hub);
        while let Some(current) = queue.pop_front() {
            for route in self.routes_from(current) {
                if route.active && visited.insert(route.destination) {
                    queue.push_back(route.destination);
                }
            }
        }

        Ok(HubMetrics {
            hub,
            outbound_routes,
            mean_outbound_margin,
            reachable_hubs: visited.len() - 1,
        })
    }
}
