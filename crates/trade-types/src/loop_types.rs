use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{NftId, WalletId};

/// A single leg of a trade loop: `giver` currently owns `nft` and transfers
/// it to `receiver`, who wanted it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub giver: WalletId,
    pub receiver: WalletId,
    pub nft: NftId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopStatus {
    /// Just discovered, not yet surfaced to subscribers.
    Pending,
    /// Surfaced to subscribers and considered currently valid.
    Active,
    /// A premise no longer holds; will be evicted at the next sweep.
    Stale,
}

/// A closed chain of wallet-to-wallet NFT transfers, canonicalized so that
/// rotation and direction do not change identity (see `trade_algo::canonical`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeLoop {
    pub canonical_id: String,
    pub steps: Vec<Step>,
    pub efficiency: f64,
    pub fairness: f64,
    pub quality_score: f64,
    pub discovered_at: DateTime<Utc>,
    pub status: LoopStatus,
}

impl TradeLoop {
    pub fn participant_count(&self) -> usize {
        self.steps.len()
    }

    pub fn participants(&self) -> impl Iterator<Item = &WalletId> {
        self.steps.iter().map(|s| &s.giver)
    }

    pub fn involves(&self, wallet: &WalletId) -> bool {
        self.steps
            .iter()
            .any(|s| &s.giver == wallet || &s.receiver == wallet)
    }
}
