//! C3 — Want Expander.
//!
//! Translates each wallet's collection-level wants into concrete
//! `(wallet, NFT)` wants against the current ownership map. This module is
//! pure: it reads `TenantGraph`'s maps and returns the new expansion for a
//! wallet without mutating anything, so `TenantGraph::apply_mutation_batch`
//! can compute expansions for a batch of candidate wallets before deciding
//! which of them actually changed.
//!
//! Collection membership is resolved from the tenant's own `Collection`
//! records (populated via `Mutation::UpsertCollectionMembership`), not from
//! an externally injected `CollectionResolver`: canonicalization (C7) must
//! be stable across repeated computations on the same graph state, which an
//! external, possibly time-varying oracle cannot guarantee. Hosts that want
//! an external collection source should materialize it into the graph via
//! `UpsertCollectionMembership` mutations rather than calling the resolver
//! from inside the hot discovery path.

use std::collections::{HashMap, HashSet};

use trade_types::{CollectionId, NftId, WalletId};

use crate::nft::{Collection, Nft};
use crate::wallet::Wallet;

/// `specificWants(W) ∪ ⋃ (membersOf(Ki) ∩ ownedElsewhere) − rejections(W) − owned(W)`
pub fn compute_expanded_wants(
    wallet_id: &WalletId,
    wallets: &HashMap<WalletId, Wallet>,
    collections: &HashMap<CollectionId, Collection>,
    nfts: &HashMap<NftId, Nft>,
) -> HashSet<NftId> {
    let wallet = match wallets.get(wallet_id) {
        Some(w) => w,
        None => return HashSet::new(),
    };

    let mut expanded: HashSet<NftId> = wallet.specific_wants.clone();

    for collection_id in &wallet.wanted_collections {
        let Some(collection) = collections.get(collection_id) else {
            continue;
        };
        for nft_id in &collection.members {
            if let Some(nft) = nfts.get(nft_id) {
                if &nft.owner != wallet_id {
                    expanded.insert(nft_id.clone());
                }
            }
        }
    }

    for rejected in &wallet.rejections {
        expanded.remove(rejected);
    }
    for owned in &wallet.owned {
        expanded.remove(owned);
    }

    expanded
}

/// Wallets whose expansion might need recomputation given a set of directly
/// mutated wallets and a set of collections touched this batch: every
/// directly-touched wallet, plus every wallet whose collection-wants
/// overlap an affected collection.
pub fn candidate_wallets(
    wallets: &HashMap<WalletId, Wallet>,
    directly_touched: &HashSet<WalletId>,
    affected_collections: &HashSet<CollectionId>,
) -> Vec<WalletId> {
    wallets
        .iter()
        .filter(|(id, w)| {
            directly_touched.contains(*id)
                || w.wanted_collections
                    .iter()
                    .any(|c| affected_collections.contains(c))
        })
        .map(|(id, _)| id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn wallet_with(specific: &[&str], collections: &[&str]) -> Wallet {
        let mut w = Wallet::new(Utc::now());
        w.specific_wants = specific.iter().map(|s| NftId::from(*s)).collect();
        w.wanted_collections = collections.iter().map(|s| CollectionId::from(*s)).collect();
        w
    }

    #[test]
    fn expands_collection_want_excluding_self_owned_and_rejected() {
        let alice = WalletId::from("alice");
        let bob = WalletId::from("bob");

        let mut wallets = HashMap::new();
        let mut alice_w = wallet_with(&[], &["k"]);
        alice_w.owned.insert(NftId::from("nft-owned-by-alice"));
        alice_w.rejections.insert(NftId::from("nft-rejected"));
        wallets.insert(alice.clone(), alice_w);
        wallets.insert(bob.clone(), wallet_with(&[], &[]));

        let mut collections = HashMap::new();
        collections.insert(
            CollectionId::from("k"),
            Collection {
                members: [
                    NftId::from("nft-owned-by-alice"),
                    NftId::from("nft-rejected"),
                    NftId::from("nft-owned-by-bob"),
                ]
                .into_iter()
                .collect(),
            },
        );

        let mut nfts = HashMap::new();
        nfts.insert(
            NftId::from("nft-owned-by-alice"),
            Nft {
                owner: alice.clone(),
                collection: CollectionId::from("k"),
                valuation_hint: None,
            },
        );
        nfts.insert(
            NftId::from("nft-rejected"),
            Nft {
                owner: bob.clone(),
                collection: CollectionId::from("k"),
                valuation_hint: None,
            },
        );
        nfts.insert(
            NftId::from("nft-owned-by-bob"),
            Nft {
                owner: bob.clone(),
                collection: CollectionId::from("k"),
                valuation_hint: None,
            },
        );

        let expanded = compute_expanded_wants(&alice, &wallets, &collections, &nfts);
        assert_eq!(expanded, [NftId::from("nft-owned-by-bob")].into_iter().collect());
    }
}
