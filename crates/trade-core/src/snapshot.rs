use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use trade_types::{CollectionId, EngineConfig, NftId, TradeLoop, WalletId};

use crate::nft::{Collection, Nft};
use crate::wallet::Wallet;

/// Bumped whenever the on-disk shape of `Snapshot` changes in a way that
/// isn't forward-compatible. `TenantGraph::restore` rejects anything whose
/// `format_version` doesn't match exactly; unknown *fields* within a
/// compatible version are ignored by serde's default struct deserialization.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// A versioned, self-describing serialization of a `TenantGraph`, sufficient
/// to restore byte-for-byte equivalent state (same canonical keys will be
/// produced on subsequent computations).
#[derive(Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub version: u64,
    pub config: EngineConfig,
    pub wallets: HashMap<WalletId, Wallet>,
    pub nfts: HashMap<NftId, Nft>,
    pub collections: HashMap<CollectionId, Collection>,
    pub active_loops: HashMap<String, TradeLoop>,
}
