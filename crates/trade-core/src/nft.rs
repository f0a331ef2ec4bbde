use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use trade_types::{CollectionId, NftId, WalletId};

/// An NFT's ownership and collection membership within a tenant. Valuation
/// is not stored here; it is sourced on demand from the `ValuationResolver`
/// (C2) supplied by the host, with `valuation_hint` used only as a fallback
/// seed for resolvers that want one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Nft {
    pub owner: WalletId,
    pub collection: CollectionId,
    pub valuation_hint: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Collection {
    pub members: HashSet<NftId>,
}
