//! End-to-end flows through the `MarketIntel` facade.

mod support;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use voidwatch::application::{InvalidationReason, PutRequest};
use voidwatch::domain::entry::{CachePriority, CacheStatus, SnapshotKind};
use voidwatch::domain::id::{CategoryId, RegionId, TypeId};
use voidwatch::domain::observation::ObservationWindow;
use voidwatch::domain::route::RiskLevel;
use voidwatch::domain::statistics::MarketStatistics;

use support::{intel, item, mineral_tree, route, two_hub_graph, FORGE, TRITANIUM};

fn orders_request(intel: &voidwatch::application::MarketIntel, type_id: u32) -> PutRequest {
    PutRequest::scoped(
        SnapshotKind::Orders,
        Some(RegionId::new(FORGE)),
        Some(TypeId::new(type_id)),
        None,
        "[]".to_string(),
        intel.ttl_for(SnapshotKind::Orders),
    )
}

#[tokio::test]
async fn statistics_fetch_cache_and_read_back() {
    let intel = intel();
    let window = ObservationWindow::trailing_days(Utc::now(), 7);

    let stats = intel
        .fetch_statistics(TypeId::new(TRITANIUM), RegionId::new(FORGE), window)
        .await
        .unwrap();
    assert!(stats.order_count > 0);

    let entry = intel.cache_statistics(&stats).unwrap();
    assert_eq!(entry.kind, SnapshotKind::Statistics);

    let cached = intel.cache_entry(&entry.key).unwrap();
    let decoded: MarketStatistics = serde_json::from_str(&cached.payload).unwrap();
    assert_eq!(decoded, stats);
}

#[tokio::test]
async fn refresh_pass_restamps_expired_entries() {
    let intel = intel();
    let entry = intel.put_snapshot(orders_request(&intel, TRITANIUM));

    let later = entry.expires_at + Duration::seconds(5);
    let report = intel.refresh_due_entries(later, 16).await;
    assert_eq!(report.refreshed, 1);
    assert_eq!(report.failed, 0);

    let refreshed = intel.cache_entry(&entry.key).unwrap();
    assert_eq!(refreshed.status, CacheStatus::Fresh);
    assert!(refreshed.expires_at > later);
    assert_ne!(refreshed.payload, "[]");
}

#[test]
fn category_scoped_scan_keeps_only_that_family() {
    let intel = intel();
    intel.replace_categories(mineral_tree());
    intel.replace_graph(two_hub_graph(
        vec![route(101, 1, 2, dec!(0.08), RiskLevel::Low)],
        vec![item(101, TRITANIUM, dec!(0.08)), item(101, 587, dec!(0.09))],
    ));

    let all = intel.scan_routes(dec!(0.05));
    assert_eq!(all.opportunities.len(), 2);

    let minerals = intel.scan_category(CategoryId::new(4), dec!(0.05)).unwrap();
    let types: Vec<u32> = minerals
        .opportunities
        .iter()
        .map(|o| o.type_id.value())
        .collect();
    assert_eq!(types, vec![TRITANIUM]);
}

#[test]
fn invalidation_is_logged_and_idempotent() {
    let intel = intel();
    let entry = intel.put_snapshot(orders_request(&intel, TRITANIUM));

    let event = intel
        .invalidate(&entry.key, InvalidationReason::Manual)
        .unwrap()
        .expect("first invalidation removes the entry");
    assert_eq!(event.key, entry.key);

    assert!(intel
        .invalidate(&entry.key, InvalidationReason::Manual)
        .unwrap()
        .is_none());

    let log = intel.invalidation_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].reason, InvalidationReason::Manual);
}

#[test]
fn eviction_spares_normal_priority_entries() {
    let intel = intel();
    let payload = "x".repeat(1_000);

    for (type_id, priority) in [
        (100_u32, CachePriority::Normal),
        (101, CachePriority::Low),
        (102, CachePriority::Disposable),
    ] {
        let request = PutRequest::scoped(
            SnapshotKind::Orders,
            Some(RegionId::new(FORGE)),
            Some(TypeId::new(type_id)),
            None,
            payload.clone(),
            intel.ttl_for(SnapshotKind::Orders),
        )
        .with_priority(priority);
        intel.put_snapshot(request);
    }

    let report = intel.evict_to_size_budget(1_500);
    assert_eq!(report.evicted, 2);
    assert!(report.bytes_remaining <= 1_500);

    let kept = intel.cache_entries();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].priority, CachePriority::Normal);
}

#[test]
fn integrity_flags_entries_scoped_to_unknown_ids() {
    let intel = intel();
    intel.put_snapshot(orders_request(&intel, TRITANIUM));
    let dangling = PutRequest::scoped(
        SnapshotKind::Orders,
        Some(RegionId::new(10_999_999)),
        Some(TypeId::new(TRITANIUM)),
        None,
        "[]".to_string(),
        intel.ttl_for(SnapshotKind::Orders),
    );
    intel.put_snapshot(dangling);

    let report = intel.check_integrity();
    assert_eq!(report.checked, 2);
    assert_eq!(report.checksum_failures, 0);
    assert_eq!(report.dangling_references, 1);
    assert!(!report.is_healthy());
}

#[tokio::test]
async fn background_loop_delivers_reports_and_stops_cleanly() {
    let intel = intel();
    let (handle, mut reports) = intel.spawn_refresh_loop();

    // First tick fires immediately; an empty cache reports an empty pass.
    let first = reports.recv().await.expect("first tick report");
    assert_eq!(first.total(), 0);

    handle.shutdown().await;
    while reports.recv().await.is_some() {}
}
