//! Deterministic synthetic market data for offline runs and tests.
//!
//! [`SyntheticFeed`] replays a seeded random walk, so two runs with the
//! same seed see the same market. [`ReferenceSet`] is the matching
//! in-memory [`ReferenceData`] implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::domain::id::{CategoryId, LocationId, RegionId, TypeId};
use crate::domain::observation::{MarketObservation, ObservationWindow, OrderSide};
use crate::error::FeedError;

use super::traits::{MarketFeed, ReferenceData};

const OBSERVATIONS_PER_DAY: i64 = 4;

/// Seeded random-walk feed.
#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    seed: u64,
}

impl SyntheticFeed {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Generate the walk synchronously. The trait impl delegates here.
    #[must_use]
    pub fn observations(
        &self,
        type_id: TypeId,
        region: RegionId,
        window: ObservationWindow,
    ) -> Vec<MarketObservation> {
        // One independent walk per (seed, item, region) triple.
        let stream_seed =
            self.seed ^ (u64::from(type_id.value()) << 32) ^ u64::from(region.value());
        let mut rng = StdRng::seed_from_u64(stream_seed);

        let mut price = base_price(type_id);
        let slot_gap = Duration::hours(24 / OBSERVATIONS_PER_DAY);
        let location = LocationId::new(60_000_000 + u64::from(region.value() % 100_000));

        let mut out = Vec::new();
        for day in 0..window.days() {
            for slot in 0..OBSERVATIONS_PER_DAY {
                let recorded_at = window.from + Duration::days(day) + slot_gap * slot as i32;
                if recorded_at > window.to {
                    break;
                }

                let drift: f64 = rng.gen_range(-0.03..=0.03);
                price = (price * (1.0 + drift)).max(0.01);

                let side = if rng.gen_bool(0.5) {
                    OrderSide::Buy
                } else {
                    OrderSide::Sell
                };
                let spread: f64 = rng.gen_range(0.005..0.02);
                let listed = match side {
                    OrderSide::Buy => price * (1.0 - spread),
                    OrderSide::Sell => price * (1.0 + spread),
                };

                let volume = rng.gen_range(5_000..250_000u64);
                let volume_remaining = rng.gen_range(volume / 4..=volume);
                let issued_at = recorded_at - Duration::hours(rng.gen_range(1..=48));

                out.push(MarketObservation {
                    type_id,
                    region,
                    side,
                    price: Decimal::from_f64(listed)
                        .unwrap_or(Decimal::ONE)
                        .round_dp(2),
                    volume,
                    volume_remaining,
                    issued_at,
                    recorded_at,
                    location: Some(location),
                });
            }
        }
        out
    }
}

#[async_trait]
impl MarketFeed for SyntheticFeed {
    async fn fetch_observations(
        &self,
        type_id: TypeId,
        region: RegionId,
        window: ObservationWindow,
    ) -> Result<Vec<MarketObservation>, FeedError> {
        Ok(self.observations(type_id, region, window))
    }
}

/// Anchor price for the walk, spread across the id space so different
/// items trade at visibly different levels.
fn base_price(type_id: TypeId) -> f64 {
    4.0 + f64::from(type_id.value() % 9973) * 0.75
}

/// In-memory reference data for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    regions: HashMap<RegionId, String>,
    types: HashMap<TypeId, String>,
    categories: HashSet<CategoryId>,
    type_categories: HashMap<TypeId, CategoryId>,
}

impl ReferenceSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_region(mut self, id: RegionId, name: &str) -> Self {
        self.regions.insert(id, name.to_string());
        self
    }

    #[must_use]
    pub fn with_category(mut self, id: CategoryId) -> Self {
        self.categories.insert(id);
        self
    }

    #[must_use]
    pub fn with_type(mut self, id: TypeId, name: &str, category: CategoryId) -> Self {
        self.types.insert(id, name.to_string());
        self.type_categories.insert(id, category);
        self.categories.insert(category);
        self
    }
}

impl ReferenceData for ReferenceSet {
    fn region_exists(&self, region: RegionId) -> bool {
        self.regions.contains_key(&region)
    }

    fn type_exists(&self, type_id: TypeId) -> bool {
        self.types.contains_key(&type_id)
    }

    fn category_exists(&self, category: CategoryId) -> bool {
        self.categories.contains(&category)
    }

    fn region_name(&self, region: RegionId) -> Option<String> {
        self.regions.get(&region).cloned()
    }

    fn type_name(&self, type_id: TypeId) -> Option<String> {
        self.types.get(&type_id).cloned()
    }

    fn types_in_category(&self, category: CategoryId) -> Vec<TypeId> {
        let mut types: Vec<TypeId> = self
            .type_categories
            .iter()
            .filter(|(_, c)| **c == category)
            .map(|(t, _)| *t)
            .collect();
        types.sort_unstable();
        types
    }
}
