//! Market intelligence facade.
//!
//! Single entry point collaborators (UI, schedulers, CLI) talk to. Owns
//! the snapshot store, the freshness policy, the route/category holder,
//! and the feed/reference seams, and exposes the query and command
//! surfaces as plain methods. No globals; everything is constructed from
//! an explicit [`IntelConfig`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::config::{ArbitrageConfig, CacheConfig, Config, RefreshConfig};
use crate::domain::arbitrage::{self, ArbitrageOpportunity, ScanSummary};
use crate::domain::category::{CategoryNode, CategoryTree, HierarchyReport};
use crate::domain::entry::{CacheEntry, SnapshotKind};
use crate::domain::id::{CacheKey, CategoryId, HubId, RegionId, RouteId, TypeId};
use crate::domain::observation::{MarketObservation, ObservationWindow};
use crate::domain::route::{HubMetrics, RiskLevel, RouteGraph, RouteItemProfitability, TradeRoute};
use crate::domain::statistics::{self, MarketStatistics};
use crate::error::{IntelError, Result};
use crate::feed::{MarketFeed, ReferenceData};

use super::graph::GraphStore;
use super::policy::{
    CleanupReport, EvictionReport, FreshnessPolicy, IntegrityReport, InvalidationEvent,
    InvalidationReason,
};
use super::refresh::{RefreshHandle, RefreshReport, RefreshService};
use super::store::{PutRequest, SnapshotStore, StoreMetrics};

/// Everything the facade needs from the full [`Config`].
#[derive(Debug, Clone, Default)]
pub struct IntelConfig {
    pub cache: CacheConfig,
    pub refresh: RefreshConfig,
    pub arbitrage: ArbitrageConfig,
}

impl From<&Config> for IntelConfig {
    fn from(config: &Config) -> Self {
        Self {
            cache: config.cache.clone(),
            refresh: config.refresh.clone(),
            arbitrage: config.arbitrage.clone(),
        }
    }
}

/// Facade over the intelligence core.
///
/// Cheap to share behind an `Arc`; all interior state is its own
/// concurrency-safe structure, so methods take `&self`.
pub struct MarketIntel {
    config: IntelConfig,
    store: Arc<SnapshotStore>,
    policy: Arc<FreshnessPolicy>,
    graphs: GraphStore,
    feed: Arc<dyn MarketFeed>,
    reference: Arc<dyn ReferenceData>,
    refresher: RefreshService,
}

impl MarketIntel {
    pub fn new(
        config: IntelConfig,
        feed: Arc<dyn MarketFeed>,
        reference: Arc<dyn ReferenceData>,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let policy = Arc::new(FreshnessPolicy::new(config.cache.clone()));
        let refresher = RefreshService::new(
            config.refresh.clone(),
            Arc::clone(&store),
            Arc::clone(&policy),
            Arc::clone(&feed),
        );
        Self {
            config,
            store,
            policy,
            graphs: GraphStore::new(),
            feed,
            reference,
            refresher,
        }
    }

    #[must_use]
    pub fn config(&self) -> &IntelConfig {
        &self.config
    }

    /// Install a new route graph snapshot; held readers keep the old one.
    pub fn replace_graph(&self, graph: RouteGraph) {
        self.graphs.replace_graph(graph);
    }

    /// Install a new category tree snapshot.
    pub fn replace_categories(&self, categories: CategoryTree) {
        self.graphs.replace_categories(categories);
    }

    #[must_use]
    pub fn graph(&self) -> Arc<RouteGraph> {
        self.graphs.graph()
    }

    #[must_use]
    pub fn categories(&self) -> Arc<CategoryTree> {
        self.graphs.categories()
    }

    // --- query surface ---

    /// Snapshot of one cache entry; unknown keys are an error, not a
    /// default.
    pub fn cache_entry(&self, key: &CacheKey) -> Result<CacheEntry> {
        self.store
            .get(key, Utc::now())
            .ok_or_else(|| IntelError::EntryNotFound { key: key.clone() }.into())
    }

    /// All cache entries ordered by key.
    #[must_use]
    pub fn cache_entries(&self) -> Vec<CacheEntry> {
        self.store.entries()
    }

    #[must_use]
    pub fn cache_metrics(&self) -> StoreMetrics {
        self.store.metrics()
    }

    #[must_use]
    pub fn cache_size_bytes(&self) -> u64 {
        self.store.total_payload_bytes()
    }

    /// Derive statistics from observations already in hand.
    #[must_use]
    pub fn compute_statistics(
        &self,
        type_id: TypeId,
        region: RegionId,
        window: ObservationWindow,
        observations: &[MarketObservation],
    ) -> MarketStatistics {
        statistics::compute(type_id, region, window, observations)
    }

    /// Fetch observations from the feed and derive statistics in one step.
    pub async fn fetch_statistics(
        &self,
        type_id: TypeId,
        region: RegionId,
        window: ObservationWindow,
    ) -> Result<MarketStatistics> {
        let observations = self.feed.fetch_observations(type_id, region, window).await?;
        Ok(statistics::compute(type_id, region, window, &observations))
    }

    /// Write statistics through to the snapshot store as a `Statistics`
    /// entry keyed by its (item, region) scope.
    pub fn cache_statistics(&self, stats: &MarketStatistics) -> Result<CacheEntry> {
        let payload = serde_json::to_string(stats)?;
        let request = PutRequest::scoped(
            SnapshotKind::Statistics,
            Some(stats.region),
            Some(stats.type_id),
            None,
            payload,
            self.policy.ttl_for(SnapshotKind::Statistics),
        );
        Ok(self.store.put(request, Utc::now()))
    }

    /// Ranked opportunities across the whole graph at `min_margin`.
    #[must_use]
    pub fn find_arbitrage_opportunities(&self, min_margin: Decimal) -> Vec<ArbitrageOpportunity> {
        arbitrage::arbitrage_opportunities(&self.graphs.graph(), min_margin)
    }

    /// Full scan with per-route failure accounting.
    #[must_use]
    pub fn scan_routes(&self, min_margin: Decimal) -> ScanSummary {
        arbitrage::scan(&self.graphs.graph(), min_margin, None)
    }

    /// Scan restricted to items under one market category subtree.
    ///
    /// The category tree scopes which categories count; the reference
    /// data resolves each to its item types.
    pub fn scan_category(&self, category: CategoryId, min_margin: Decimal) -> Result<ScanSummary> {
        let categories = self.graphs.categories();
        if categories.node(category).is_none() {
            return Err(IntelError::CategoryNotFound { category }.into());
        }
        let scope: HashSet<TypeId> = categories
            .item_category_ids(category)
            .into_iter()
            .flat_map(|id| self.reference.types_in_category(id))
            .collect();
        Ok(arbitrage::scan(
            &self.graphs.graph(),
            min_margin,
            Some(&scope),
        ))
    }

    /// Viable routes at or below `max_risk`, best margin first.
    #[must_use]
    pub fn opportunities_by_risk(&self, max_risk: RiskLevel) -> Vec<TradeRoute> {
        arbitrage::opportunities_by_risk(&self.graphs.graph(), max_risk)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Top `n` recommended items on a route by daily profit potential.
    pub fn top_profitable_items(
        &self,
        route: RouteId,
        n: usize,
    ) -> Result<Vec<RouteItemProfitability>> {
        Ok(arbitrage::top_profitable_items(
            &self.graphs.graph(),
            route,
            n,
        )?)
    }

    pub fn hub_metrics(&self, hub: HubId) -> Result<HubMetrics> {
        Ok(self.graphs.graph().hub_metrics(hub)?)
    }

    /// Every category under `id`, breadth-first. Unknown ids are an error.
    pub fn category_descendants(&self, id: CategoryId) -> Result<Vec<CategoryNode>> {
        let categories = self.graphs.categories();
        if categories.node(id).is_none() {
            return Err(IntelError::CategoryNotFound { category: id }.into());
        }
        Ok(categories
            .descendants(id)
            .into_iter()
            .cloned()
            .collect())
    }

    #[must_use]
    pub fn validate_category_hierarchy(&self) -> HierarchyReport {
        self.graphs.categories().validate()
    }

    // --- command surface ---

    /// Insert or replace one snapshot now.
    pub fn put_snapshot(&self, request: PutRequest) -> CacheEntry {
        self.store.put(request, Utc::now())
    }

    /// TTL the policy assigns to `kind`.
    #[must_use]
    pub fn ttl_for(&self, kind: SnapshotKind) -> chrono::Duration {
        self.policy.ttl_for(kind)
    }

    /// Run one on-demand refresh pass with an explicit clock.
    pub async fn refresh_due_entries(
        &self,
        now: DateTime<Utc>,
        batch_size: usize,
    ) -> RefreshReport {
        self.refresher.refresh_due_entries(now, batch_size).await
    }

    /// Spawn the background refresh loop over this facade's store.
    #[must_use]
    pub fn spawn_refresh_loop(&self) -> (RefreshHandle, mpsc::Receiver<RefreshReport>) {
        RefreshService::new(
            self.config.refresh.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
            Arc::clone(&self.feed),
        )
        .start()
    }

    /// Evict disposable entries until payload bytes fit `max_bytes`.
    pub fn evict_to_size_budget(&self, max_bytes: u64) -> EvictionReport {
        self.policy
            .evict_to_budget(&self.store, max_bytes, Utc::now())
    }

    /// Remove expired entries below `Critical`. Idempotent.
    pub fn cleanup_expired(&self) -> CleanupReport {
        self.policy.cleanup_expired(&self.store, Utc::now())
    }

    /// Checksum and reference audit over every entry. Reports, never
    /// repairs.
    #[must_use]
    pub fn check_integrity(&self) -> IntegrityReport {
        self.policy
            .check_integrity(&self.store, self.reference.as_ref())
    }

    /// Drop one entry from the cache, recording why.
    ///
    /// Unknown keys are `Ok(None)`; `Critical` entries are rejected.
    pub fn invalidate(
        &self,
        key: &CacheKey,
        reason: InvalidationReason,
    ) -> Result<Option<InvalidationEvent>> {
        self.policy.invalidate(&self.store, key, reason, Utc::now())
    }

    /// Recent invalidation events, oldest first.
    #[must_use]
    pub fn invalidation_log(&self) -> Vec<InvalidationEvent> {
        self.policy.invalidation_log()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::id::SystemId;
    use crate::domain::route::{HubTier, TradeHub};
    use crate::error::Error;
    use crate::feed::{ReferenceSet, SyntheticFeed};

    fn reference() -> Arc<ReferenceSet> {
        Arc::new(
            ReferenceSet::new()
                .with_region(RegionId::new(10_000_002), "The Forge")
                .with_category(CategoryId::new(4))
                .with_category(CategoryId::new(40))
                .with_type(TypeId::new(34), "Tritanium", CategoryId::new(40))
                .with_type(TypeId::new(999), "Exotic Dancers", CategoryId::new(9)),
        )
    }

    fn intel() -> MarketIntel {
        MarketIntel::new(
            IntelConfig::default(),
            Arc::new(SyntheticFeed::new(11)),
            reference(),
        )
    }

    fn hub(id: u32, name: &str) -> TradeHub {
        TradeHub {
            id: HubId::new(id),
            name: name.to_string(),
            region: RegionId::new(10_000_000 + id),
            system: SystemId::new(30_000_000 + id),
            tier: HubTier::Primary,
            liquidity_score: 80.0,
            accessible: true,
        }
    }

    fn route(id: u32, margin: Decimal) -> TradeRoute {
        TradeRoute {
            id: RouteId::new(id),
            origin: HubId::new(1),
            destination: HubId::new(2),
            distance_ly: 10.0,
            jumps: 5,
            risk: RiskLevel::Low,
            average_margin: margin,
            realized_margin: margin,
            daily_volume: 100_000,
            active: true,
        }
    }

    fn item(route: u32, type_id: u32, margin: Decimal) -> RouteItemProfitability {
        RouteItemProfitability {
            route: RouteId::new(route),
            type_id: TypeId::new(type_id),
            buy_price: dec!(100),
            sell_price: dec!(100) * (Decimal::ONE + margin),
            profit_per_unit: dec!(100) * margin,
            margin,
            daily_volume: 50_000,
            recommended: true,
        }
    }

    fn demo_graph() -> RouteGraph {
        RouteGraph::new(
            vec![hub(1, "Jita IV-4"), hub(2, "Amarr VIII")],
            vec![route(101, dec!(0.08))],
            vec![item(101, 34, dec!(0.08)), item(101, 999, dec!(0.09))],
        )
    }

    fn mineral_tree() -> CategoryTree {
        CategoryTree::from_nodes(vec![
            CategoryNode {
                id: CategoryId::new(4),
                name: "Raw Materials".to_string(),
                parent: None,
                has_items: false,
            },
            CategoryNode {
                id: CategoryId::new(40),
                name: "Minerals".to_string(),
                parent: Some(CategoryId::new(4)),
                has_items: true,
            },
        ])
    }

    #[test]
    fn cache_entry_surfaces_not_found() {
        let intel = intel();
        let missing = intel.cache_entry(&CacheKey::from("orders:none"));
        assert!(matches!(
            missing,
            Err(Error::Intel(IntelError::EntryNotFound { .. }))
        ));
    }

    #[test]
    fn statistics_write_through_round_trips() {
        let intel = intel();
        let window = ObservationWindow::trailing_days(Utc::now(), 7);
        let stats = MarketStatistics::empty(TypeId::new(34), RegionId::new(10_000_002), window);

        let entry = intel.cache_statistics(&stats).unwrap();
        let fetched = intel.cache_entry(&entry.key).unwrap();
        let decoded: MarketStatistics = serde_json::from_str(&fetched.payload).unwrap();
        assert_eq!(decoded.type_id, TypeId::new(34));
        assert_eq!(fetched.kind, SnapshotKind::Statistics);
    }

    #[tokio::test]
    async fn fetch_statistics_goes_through_the_feed() {
        let intel = intel();
        let window = ObservationWindow::trailing_days(Utc::now(), 7);
        let stats = intel
            .fetch_statistics(TypeId::new(34), RegionId::new(10_000_002), window)
            .await
            .unwrap();
        assert!(stats.order_count > 0);
        assert!(stats.min_price <= stats.max_price);
    }

    #[test]
    fn category_scoped_scan_keeps_only_in_scope_items() {
        let intel = intel();
        intel.replace_graph(demo_graph());
        intel.replace_categories(mineral_tree());

        let summary = intel.scan_category(CategoryId::new(4), dec!(0.05)).unwrap();
        let types: Vec<TypeId> = summary.opportunities.iter().map(|o| o.type_id).collect();
        assert_eq!(types, vec![TypeId::new(34)]);

        let unscoped = intel.find_arbitrage_opportunities(dec!(0.05));
        assert_eq!(unscoped.len(), 2);
    }

    #[test]
    fn unknown_category_is_an_error() {
        let intel = intel();
        intel.replace_categories(mineral_tree());
        assert!(matches!(
            intel.scan_category(CategoryId::new(77), dec!(0.05)),
            Err(Error::Intel(IntelError::CategoryNotFound { .. }))
        ));
        assert!(matches!(
            intel.category_descendants(CategoryId::new(77)),
            Err(Error::Intel(IntelError::CategoryNotFound { .. }))
        ));
    }

    #[test]
    fn cleanup_with_nothing_expired_is_a_noop() {
        let intel = intel();
        let window = ObservationWindow::trailing_days(Utc::now(), 7);
        let stats = MarketStatistics::empty(TypeId::new(34), RegionId::new(10_000_002), window);
        intel.cache_statistics(&stats).unwrap();

        let first = intel.cleanup_expired();
        let second = intel.cleanup_expired();
        assert_eq!(first.removed, 0);
        assert_eq!(second.removed, 0);
        assert_eq!(intel.cache_entries().len(), 1);
    }

    #[test]
    fn invalidate_then_invalidate_again_is_ok_none() {
        let intel = intel();
        let window = ObservationWindow::trailing_days(Utc::now(), 7);
        let stats = MarketStatistics::empty(TypeId::new(34), RegionId::new(10_000_002), window);
        let entry = intel.cache_statistics(&stats).unwrap();

        let first = intel
            .invalidate(&entry.key, InvalidationReason::Manual)
            .unwrap();
        assert!(first.is_some());
        let second = intel
            .invalidate(&entry.key, InvalidationReason::Manual)
            .unwrap();
        assert!(second.is_none());
        assert_eq!(intel.invalidation_log().len(), 1);
    }

    #[test]
    fn risk_view_and_hub_metrics_read_installed_graph() {
        let intel = intel();
        intel.replace_graph(demo_graph());

        let routes = intel.opportunities_by_risk(RiskLevel::Moderate);
        assert_eq!(routes.len(), 1);

        let metrics = intel.hub_metrics(HubId::new(1)).unwrap();
        assert_eq!(metrics.outbound_routes, 1);
        assert_eq!(metrics.reachable_hubs, 1);

        assert!(matches!(
            intel.hub_metrics(HubId::new(9)),
            Err(Error::Intel(IntelError::HubNotFound { .. }))
        ));
    }
}
