//! Stateful orchestration: the snapshot store, freshness policy,
//! graph/category holder, refresh scheduler, and the facade that ties
//! them together.

pub mod graph;
pub mod intel;
pub mod policy;
pub mod refresh;
pub mod store;

pub use graph::GraphStore;
pub use intel::{IntelConfig, MarketIntel};
pub use policy::{
    CleanupReport, EvictionReport, FreshnessPolicy, IntegrityReport, InvalidationEvent,
    InvalidationReason,
};
pub use refresh::{RefreshHandle, RefreshReport, RefreshService};
pub use store::{PutRequest, SnapshotStore, StoreMetrics};
