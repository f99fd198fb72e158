//! Voidwatch - market intelligence core for a space-trading companion.
//!
//! This crate keeps a desktop companion's view of an MMO market economy
//! fresh: it caches market snapshots with per-kind TTLs, refreshes them in
//! the background, derives price statistics from raw order observations,
//! and ranks trade-hub arbitrage opportunities.
//!
//! # Architecture
//!
//! State lives in two places and everything else is pure:
//!
//! - **`application::store`** - Concurrent snapshot cache keyed by
//!   `kind:region:item:location`, with hit/miss accounting
//! - **`application::policy`** - TTL, size-budget eviction, integrity
//!   sweeps, and the invalidation audit log
//! - **`application::refresh`** - Background scheduler that re-fetches due
//!   snapshots through the configured [`feed::MarketFeed`]
//! - **`domain`** - Pure market math: statistics over observation windows,
//!   category-tree validation, route-graph arbitrage ranking
//!
//! The [`application::MarketIntel`] facade ties these together behind one
//! clonable handle.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Market-domain types: entries, observations, statistics,
//!   categories, routes
//! - [`application`] - Stateful orchestration: store, policy, refresh, facade
//! - [`feed`] - Collaborator seams: market feed and reference data traits,
//!   plus the deterministic synthetic feed
//! - [`error`] - Error types for the crate
//! - [`cli`] - The `voidwatch` binary's command-line surface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use voidwatch::application::{IntelConfig, MarketIntel};
//! use voidwatch::feed::{ReferenceSet, SyntheticFeed};
//!
//! let feed = Arc::new(SyntheticFeed::new(2501));
//! let reference = Arc::new(ReferenceSet::new());
//! let intel = MarketIntel::new(IntelConfig::default(), feed, reference);
//! let summary = intel.scan_routes(rust_decimal_macros::dec!(0.05));
//! println!("{} opportunities", summary.opportunities.len());
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;

pub use application::{IntelConfig, MarketIntel};
pub use config::Config;
pub use error::{Error, Result};
