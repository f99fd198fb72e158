//! Collaborator seams: market feed clients and static reference data.

pub mod synthetic;
pub mod traits;

pub use synthetic::{ReferenceSet, SyntheticFeed};
pub use traits::{MarketFeed, ReferenceData};
