use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ids::{CollectionId, NftId};

/// A non-negative valuation for an NFT. Units are opaque to the engine and
/// only need to be consistent within a tenant.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Valuation(f64);

impl Valuation {
    pub fn new(value: f64) -> Self {
        debug_assert!(value >= 0.0, "valuation must be non-negative");
        Self(value.max(0.0))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Valuation {
    fn default() -> Self {
        Self(0.0)
    }
}

/// External collaborator (C2): supplies NFT valuations to the Quality
/// Scorer. Stale values only degrade scoring, never correctness, so
/// implementations are free to cache aggressively.
pub trait ValuationResolver: Send + Sync {
    fn value_of(&self, nft: &NftId) -> Valuation;
}

/// External collaborator (C2): expands a collection-level want into the
/// concrete NFTs currently in that collection for the tenant. Must be
/// idempotent per call.
pub trait CollectionResolver: Send + Sync {
    fn members_of(&self, collection: &CollectionId) -> HashSet<NftId>;
}

/// A resolver pair that always returns zero-value NFTs and empty
/// collections. Useful as a default for tests and for tenants that have not
/// wired a real oracle yet; never used to silently mask a missing
/// configuration in production code paths.
#[derive(Default)]
pub struct NullResolver;

impl ValuationResolver for NullResolver {
    fn value_of(&self, _nft: &NftId) -> Valuation {
        Valuation::default()
    }
}

impl CollectionResolver for NullResolver {
    fn members_of(&self, _collection: &CollectionId) -> HashSet<NftId> {
        HashSet::new()
    }
}
