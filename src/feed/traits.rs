//! Feed trait definitions.
//!
//! These traits define the contracts collaborators must provide; the core
//! itself never talks to the network directly.

use async_trait::async_trait;

use crate::domain::id::{CategoryId, RegionId, TypeId};
use crate::domain::observation::{MarketObservation, ObservationWindow};
use crate::error::FeedError;

/// Upstream source of market observations.
///
/// Implementations distinguish transient failures (timeouts, rate limits)
/// from fatal ones (malformed or rejected responses) through
/// [`FeedError::is_transient`]; the refresh scheduler retries the former
/// and gives up on the latter.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Fetch every observation for one (item, region) pair within `window`,
    /// ordered by recording time.
    async fn fetch_observations(
        &self,
        type_id: TypeId,
        region: RegionId,
        window: ObservationWindow,
    ) -> Result<Vec<MarketObservation>, FeedError>;
}

/// Static reference data: resolves ids to existence and names.
///
/// Used for integrity validation and for scoping scans to a category;
/// never mutated by this crate.
pub trait ReferenceData: Send + Sync {
    fn region_exists(&self, region: RegionId) -> bool;
    fn type_exists(&self, type_id: TypeId) -> bool;
    fn category_exists(&self, category: CategoryId) -> bool;

    fn region_name(&self, region: RegionId) -> Option<String>;
    fn type_name(&self, type_id: TypeId) -> Option<String>;

    /// Item types listed directly under one category.
    fn types_in_category(&self, category: CategoryId) -> Vec<TypeId>;
}
