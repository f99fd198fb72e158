//! Domain identifier types with proper encapsulation.
//!
//! Numeric newtypes wrap the game's static-data id spaces so an item id can
//! never be passed where a region id is expected. [`CacheKey`] is the string
//! key addressing one cached snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entry::SnapshotKind;

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident, $inner:ty) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Create a new id from the raw game id.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Get the raw id value.
            #[must_use]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Item type identifier from the game's static data.
    TypeId,
    u32
);
numeric_id!(
    /// Region identifier.
    RegionId,
    u32
);
numeric_id!(
    /// Solar system identifier.
    SystemId,
    u32
);
numeric_id!(
    /// Station or structure identifier.
    ///
    /// Player structures live in a 64-bit id space, unlike the other ids.
    LocationId,
    u64
);
numeric_id!(
    /// Market category identifier.
    CategoryId,
    u32
);
numeric_id!(
    /// Trade hub identifier.
    HubId,
    u32
);
numeric_id!(
    /// Trade route identifier.
    RouteId,
    u32
);

/// Cache key - newtype for type safety.
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors. The canonical form is
/// `kind:region:item:location` with `*` for absent scope parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a new `CacheKey` from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build the canonical key for a scoped snapshot.
    #[must_use]
    pub fn scoped(
        kind: SnapshotKind,
        region: Option<RegionId>,
        type_id: Option<TypeId>,
        location: Option<LocationId>,
    ) -> Self {
        fn part<T: fmt::Display>(id: Option<T>) -> String {
            id.map_or_else(|| "*".to_string(), |v| v.to_string())
        }

        Self(format!(
            "{}:{}:{}:{}",
            kind.as_str(),
            part(region),
            part(type_id),
            part(location)
        ))
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
