//! Pure domain model: identifiers, cached entries, observations, derived
//! statistics, the category tree, and route/arbitrage analytics.
//!
//! Nothing in this layer locks, sleeps, or talks to the network. Stateful
//! orchestration lives in [`crate::application`].

pub mod arbitrage;
pub mod category;
pub mod entry;
pub mod id;
pub mod observation;
pub mod route;
pub mod statistics;

pub use arbitrage::{ArbitrageOpportunity, ScanSummary};
pub use category::{CategoryNode, CategoryTree, HierarchyReport};
pub use entry::{CacheEntry, CachePriority, CacheStatus, SnapshotKind};
pub use id::{CacheKey, CategoryId, HubId, LocationId, RegionId, RouteId, SystemId, TypeId};
pub use observation::{MarketObservation, ObservationWindow, OrderSide};
pub use route::{
    HubMetrics, HubTier, RiskLevel, RouteGraph, RouteItemProfitability, TradeHub, TradeRoute,
};
pub use statistics::MarketStatistics;
