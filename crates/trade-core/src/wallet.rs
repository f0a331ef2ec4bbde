use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trade_types::{CollectionId, NftId};

/// A wallet's inventory, wants, and rejections within a single tenant.
///
/// `expanded_wants` is a cache maintained incrementally by
/// `crate::want_expander`: `specific_wants ∪ members_of(wanted_collections)`,
/// minus `rejections` and minus `owned`. It is the set consulted when
/// building want edges for SCC/cycle discovery; it is never the source of
/// truth on its own, since it can go stale relative to collection
/// membership until the next recompute.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Wallet {
    pub owned: HashSet<NftId>,
    pub specific_wants: HashSet<NftId>,
    pub wanted_collections: HashSet<CollectionId>,
    pub rejections: HashSet<NftId>,
    pub expanded_wants: HashSet<NftId>,
    pub last_mutated: DateTime<Utc>,
}

impl Wallet {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_mutated: now,
            ..Default::default()
        }
    }

    /// A wallet cannot want an NFT it currently owns (spec.md §3 invariant).
    pub fn wants_nft(&self, nft: &NftId) -> bool {
        !self.owned.contains(nft) && !self.rejections.contains(nft) && self.expanded_wants.contains(nft)
    }
}
