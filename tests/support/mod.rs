#![allow(dead_code)]

//! Shared builders for integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use voidwatch::application::{IntelConfig, MarketIntel};
use voidwatch::domain::category::{CategoryNode, CategoryTree};
use voidwatch::domain::id::{CategoryId, HubId, LocationId, RegionId, RouteId, SystemId, TypeId};
use voidwatch::domain::observation::{MarketObservation, OrderSide};
use voidwatch::domain::route::{
    HubTier, RiskLevel, RouteGraph, RouteItemProfitability, TradeHub, TradeRoute,
};
use voidwatch::feed::{ReferenceSet, SyntheticFeed};

pub const FORGE: u32 = 10_000_002;
pub const DOMAIN: u32 = 10_000_043;
pub const TRITANIUM: u32 = 34;
pub const PYERITE: u32 = 35;

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

pub fn observation(
    price: Decimal,
    volume_remaining: u64,
    side: OrderSide,
    recorded_at: DateTime<Utc>,
) -> MarketObservation {
    MarketObservation {
        type_id: TypeId::new(TRITANIUM),
        region: RegionId::new(FORGE),
        side,
        price,
        volume: volume_remaining.saturating_mul(2),
        volume_remaining,
        issued_at: recorded_at - chrono::Duration::hours(2),
        recorded_at,
        location: Some(LocationId::new(60_003_760)),
    }
}

pub fn hub(id: u32, name: &str, region: u32) -> TradeHub {
    TradeHub {
        id: HubId::new(id),
        name: name.to_string(),
        region: RegionId::new(region),
        system: SystemId::new(30_000_000 + id),
        tier: HubTier::Primary,
        liquidity_score: 90.0,
        accessible: true,
    }
}

pub fn route(id: u32, origin: u32, destination: u32, margin: Decimal, risk: RiskLevel) -> TradeRoute {
    TradeRoute {
        id: RouteId::new(id),
        origin: HubId::new(origin),
        destination: HubId::new(destination),
        distance_ly: 20.0,
        jumps: 6,
        risk,
        average_margin: margin,
        realized_margin: margin,
        daily_volume: 150_000,
        active: true,
    }
}

pub fn item(route: u32, type_id: u32, margin: Decimal) -> RouteItemProfitability {
    let buy = Decimal::from(100);
    let sell = buy * (Decimal::ONE + margin);
    RouteItemProfitability {
        route: RouteId::new(route),
        type_id: TypeId::new(type_id),
        buy_price: buy,
        sell_price: sell,
        profit_per_unit: sell - buy,
        margin,
        daily_volume: 10_000,
        recommended: true,
    }
}

pub fn two_hub_graph(
    routes: Vec<TradeRoute>,
    items: Vec<RouteItemProfitability>,
) -> RouteGraph {
    RouteGraph::new(
        vec![hub(1, "Jita IV-4", FORGE), hub(2, "Amarr VIII", DOMAIN)],
        routes,
        items,
    )
}

pub fn mineral_tree() -> CategoryTree {
    let node = |id: u32, name: &str, parent: Option<u32>, has_items: bool| CategoryNode {
        id: CategoryId::new(id),
        name: name.to_string(),
        parent: parent.map(CategoryId::new),
        has_items,
    };
    CategoryTree::from_nodes(vec![
        node(4, "Raw Materials", None, false),
        node(40, "Minerals", Some(4), true),
        node(6, "Ships", None, false),
        node(25, "Frigates", Some(6), true),
    ])
}

pub fn reference() -> Arc<ReferenceSet> {
    Arc::new(
        ReferenceSet::new()
            .with_region(RegionId::new(FORGE), "The Forge")
            .with_region(RegionId::new(DOMAIN), "Domain")
            .with_type(TypeId::new(TRITANIUM), "Tritanium", CategoryId::new(40))
            .with_type(TypeId::new(PYERITE), "Pyerite", CategoryId::new(40))
            .with_type(TypeId::new(587), "Rifter", CategoryId::new(25)),
    )
}

/// Facade over a seeded synthetic feed and the standard reference set.
pub fn intel() -> MarketIntel {
    MarketIntel::new(
        IntelConfig::default(),
        Arc::new(SyntheticFeed::new(99)),
        reference(),
    )
}
