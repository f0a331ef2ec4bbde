use serde::{Deserialize, Serialize};

use crate::ids::{CollectionId, NftId, WalletId};
use crate::valuation::Valuation;

/// A want may target a specific NFT or an entire collection (expanded by
/// `trade_core::want_expander`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WantTarget {
    Nft(NftId),
    Collection(CollectionId),
}

/// A single state change against a `TenantGraph`. Mutations are always
/// applied as a batch (`MutationBatch`) so that, e.g., an NFT can move from
/// one owner to another atomically within one `applyMutation` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    AddNft {
        wallet: WalletId,
        nft: NftId,
        collection: CollectionId,
        valuation_hint: Option<Valuation>,
    },
    RemoveNft {
        wallet: WalletId,
        nft: NftId,
    },
    AddWant {
        wallet: WalletId,
        target: WantTarget,
    },
    RemoveWant {
        wallet: WalletId,
        target: WantTarget,
    },
    AddRejection {
        wallet: WalletId,
        nft: NftId,
    },
    RemoveRejection {
        wallet: WalletId,
        nft: NftId,
    },
    UpsertCollectionMembership {
        collection: CollectionId,
        nft: NftId,
        present: bool,
    },
    DeleteWallet {
        wallet: WalletId,
    },
}

/// One or more mutations that must be applied atomically: either every
/// mutation in the batch lands, or none of them do.
pub type MutationBatch = Vec<Mutation>;
