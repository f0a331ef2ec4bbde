use std::collections::{HashMap, HashSet};

use chrono::Utc;
use trade_types::{
    BloomFilter, CollectionId, EngineConfig, Error, LoopStatus, Mutation, MutationBatch, NftId,
    Result, TradeLoop, WalletId, WantTarget,
};

use crate::nft::{Collection, Nft};
use crate::snapshot::{Snapshot, CURRENT_SNAPSHOT_VERSION};
use crate::wallet::Wallet;
use crate::want_expander;

/// The root per-tenant entity (C1). Owns every `Wallet`, `Nft`, `Collection`
/// and active `TradeLoop` record; everything else references these by id.
#[derive(Debug)]
pub struct TenantGraph {
    pub config: EngineConfig,
    wallets: HashMap<WalletId, Wallet>,
    nfts: HashMap<NftId, Nft>,
    collections: HashMap<CollectionId, Collection>,
    active_loops: HashMap<String, TradeLoop>,
    bloom: BloomFilter,
    version: u64,
}

impl TenantGraph {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            wallets: HashMap::new(),
            nfts: HashMap::new(),
            collections: HashMap::new(),
            active_loops: HashMap::new(),
            bloom: BloomFilter::new(1024, 1.0e-3),
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn wallet(&self, id: &WalletId) -> Option<&Wallet> {
        self.wallets.get(id)
    }

    pub fn wallet_ids_sorted(&self) -> Vec<WalletId> {
        let mut ids: Vec<WalletId> = self.wallets.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn nft(&self, id: &NftId) -> Option<&Nft> {
        self.nfts.get(id)
    }

    pub fn collection(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.get(id)
    }

    pub fn active_loops(&self) -> &HashMap<String, TradeLoop> {
        &self.active_loops
    }

    /// Applies a batch of mutations atomically: either every mutation lands
    /// and the touched-wallet set is returned, or none of them do and an
    /// error is returned. Performed via copy-on-write over scratch copies of
    /// the id-keyed maps so a mid-batch failure never leaves partial state.
    pub fn apply_mutation_batch(&mut self, batch: MutationBatch) -> Result<HashSet<WalletId>> {
        if batch.is_empty() {
            return Ok(HashSet::new());
        }

        let now = Utc::now();
        let mut wallets = self.wallets.clone();
        let mut nfts = self.nfts.clone();
        let mut collections = self.collections.clone();

        let mut removed_this_batch: HashSet<NftId> = HashSet::new();
        let mut directly_touched: HashSet<WalletId> = HashSet::new();
        let mut affected_collections: HashSet<CollectionId> = HashSet::new();

        for mutation in batch {
            apply_one(
                mutation,
                &mut wallets,
                &mut nfts,
                &mut collections,
                &mut removed_this_batch,
                &mut directly_touched,
                &mut affected_collections,
                now,
            )?;
        }

        let candidates =
            want_expander::candidate_wallets(&wallets, &directly_touched, &affected_collections);

        let mut new_expansions = HashMap::with_capacity(candidates.len());
        for wallet_id in &candidates {
            let expanded =
                want_expander::compute_expanded_wants(wallet_id, &wallets, &collections, &nfts);
            new_expansions.insert(wallet_id.clone(), expanded);
        }

        let mut touched = HashSet::new();
        for (wallet_id, new_expanded) in new_expansions {
            let wallet = wallets
                .get_mut(&wallet_id)
                .expect("candidate wallet must exist in scratch map");
            if wallet.expanded_wants != new_expanded {
                wallet.expanded_wants = new_expanded;
                touched.insert(wallet_id);
            }
        }
        // The mutation source wallet is touched regardless of whether its
        // expansion changed (spec.md §4.1: "the mutation source wallet plus
        // any wallet whose expanded wants changed").
        touched.extend(directly_touched);

        self.wallets = wallets;
        self.nfts = nfts;
        self.collections = collections;
        // Every successful batch strictly increases the version (spec.md
        // §8 invariant 5), even one made up entirely of no-op mutations;
        // invariant 7 ("idempotent modulo version counter") is exactly the
        // acknowledgment that the counter itself is not part of the state
        // being compared for idempotence. `touched` stays precise on its
        // own terms: no-op mutations leave it empty regardless.
        self.version += 1;

        Ok(touched)
    }

    /// Directed edges `u -> v` in the wallet projection of the want graph:
    /// `u` owns some NFT that `v` currently wants. Sorted ascending so SCC
    /// identity is stable across recomputation (spec.md §4.4).
    pub fn wallet_projection(&self) -> Vec<(WalletId, WalletId)> {
        let mut edges: HashSet<(WalletId, WalletId)> = HashSet::new();
        for (receiver_id, receiver) in &self.wallets {
            for nft_id in &receiver.expanded_wants {
                if let Some(nft) = self.nfts.get(nft_id) {
                    if &nft.owner != receiver_id {
                        edges.insert((nft.owner.clone(), receiver_id.clone()));
                    }
                }
            }
        }
        let mut edges: Vec<_> = edges.into_iter().collect();
        edges.sort();
        edges
    }

    /// NFTs that can satisfy the edge `giver -> receiver`: owned by `giver`
    /// and in `receiver`'s expanded wants. Smallest id first (spec.md §4.5).
    pub fn nfts_satisfying_edge(&self, giver: &WalletId, receiver: &WalletId) -> Vec<NftId> {
        let (Some(giver_w), Some(receiver_w)) = (self.wallets.get(giver), self.wallets.get(receiver))
        else {
            return Vec::new();
        };
        let mut choices: Vec<NftId> = giver_w
            .owned
            .intersection(&receiver_w.expanded_wants)
            .cloned()
            .collect();
        choices.sort();
        choices
    }

    /// Only `Active` loops are surfaced: a `Stale` one has already had a
    /// premise break (spec.md §3 invariant 2) and is just waiting for the
    /// next sweep to evict it, so it is no longer "active" to a caller.
    pub fn get_active_loops_for_wallet(&self, wallet: &WalletId) -> Vec<TradeLoop> {
        let mut loops: Vec<TradeLoop> = self
            .active_loops
            .values()
            .filter(|l| l.status == LoopStatus::Active && l.involves(wallet))
            .cloned()
            .collect();
        loops.sort_by(|a, b| {
            b.quality_score
                .partial_cmp(&a.quality_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.participant_count().cmp(&b.participant_count()))
                .then_with(|| a.canonical_id.cmp(&b.canonical_id))
        });
        loops
    }

    /// Re-checks invariant 2 (loop validity) directly against current
    /// wallet/NFT state: each giver still owns the stated NFT and each
    /// receiver still wants it and has not rejected it. This is O(steps)
    /// and independent of cycle enumeration, so it stays authoritative even
    /// on a round that never got to re-discover the loop.
    pub fn is_loop_valid(&self, loop_: &TradeLoop) -> bool {
        loop_.steps.iter().all(|s| {
            self.nfts.get(&s.nft).is_some_and(|n| n.owner == s.giver)
                && self.wallets.get(&s.receiver).is_some_and(|w| w.wants_nft(&s.nft))
        })
    }

    /// Diffs a freshly-computed candidate set (covering only the affected
    /// subgraph) against the currently active loops that touch `scope`.
    /// Loops entirely outside `scope` are left untouched by the diff.
    ///
    /// `budget_exhausted` marks a round whose cycle enumeration was cut
    /// short by `maxCyclesPerSCC`: absence from `candidates` then means
    /// only "not re-enumerated in time", not "gone". Removing such a loop
    /// anyway would violate fail-open (spec.md §7/§8 invariant 10), so on a
    /// truncated round a loop is only removed once it is directly
    /// re-validated as no longer satisfying invariant 2.
    /// Returns `(added, removed, reactivated)`. `reactivated` is the set of
    /// canonical ids already in the active-loop map with `Stale` status
    /// that this round's candidates re-confirm: they flip back to `Active`
    /// in place rather than being re-added, since they were never actually
    /// gone (spec.md §4.10 has no "un-stale" event, so this is silent).
    pub fn diff_active_loops(
        &self,
        candidates: &HashMap<String, TradeLoop>,
        scope: &HashSet<WalletId>,
        budget_exhausted: bool,
    ) -> (Vec<TradeLoop>, Vec<TradeLoop>, Vec<String>) {
        let added: Vec<TradeLoop> = candidates
            .iter()
            .filter(|(id, _)| !self.active_loops.contains_key(*id))
            .map(|(_, l)| {
                let mut l = l.clone();
                l.status = LoopStatus::Active;
                l
            })
            .collect();

        let removed: Vec<TradeLoop> = self
            .active_loops
            .values()
            .filter(|l| {
                let in_scope =
                    l.steps.iter().any(|s| scope.contains(&s.giver) || scope.contains(&s.receiver));
                if !in_scope || candidates.contains_key(&l.canonical_id) {
                    return false;
                }
                !budget_exhausted || !self.is_loop_valid(l)
            })
            .cloned()
            .collect();

        let reactivated: Vec<String> = self
            .active_loops
            .values()
            .filter(|l| l.status == LoopStatus::Stale && candidates.contains_key(&l.canonical_id))
            .map(|l| l.canonical_id.clone())
            .collect();

        (added, removed, reactivated)
    }

    /// Used on a cancelled round, where re-enumeration produced nothing
    /// usable at all: directly re-validates every active loop touching
    /// `scope` and flips any whose premises broke to `Stale` instead of
    /// evicting it outright, emitting `loop_stale` so subscribers know not
    /// to rely on it while leaving the actual eviction to the next sweep
    /// that runs a full diff (spec.md §3 lifecycle, §4.10).
    pub fn mark_stale_for_touched(&mut self, scope: &HashSet<WalletId>) -> Vec<TradeLoop> {
        let to_stale: Vec<String> = self
            .active_loops
            .iter()
            .filter(|(_, l)| {
                l.status == LoopStatus::Active
                    && l.steps.iter().any(|s| scope.contains(&s.giver) || scope.contains(&s.receiver))
                    && !self.is_loop_valid(l)
            })
            .map(|(id, _)| id.clone())
            .collect();

        let mut staled = Vec::with_capacity(to_stale.len());
        for id in to_stale {
            if let Some(l) = self.active_loops.get_mut(&id) {
                l.status = LoopStatus::Stale;
                staled.push(l.clone());
            }
        }
        staled
    }

    /// Commits the result of a diff into the active-loop map and refreshes
    /// the Bloom filter atomically (spec.md §5: "readers query an immutable
    /// copy swapped atomically at round end").
    pub fn commit_diff(&mut self, added: Vec<TradeLoop>, removed_ids: &[String], reactivated_ids: &[String]) {
        for id in removed_ids {
            self.active_loops.remove(id);
        }
        for id in reactivated_ids {
            if let Some(l) = self.active_loops.get_mut(id) {
                l.status = LoopStatus::Active;
            }
        }
        for loop_ in added {
            self.active_loops.insert(loop_.canonical_id.clone(), loop_);
        }
        self.bloom = BloomFilter::rebuild(
            self.active_loops.keys().map(|s| s.as_str()),
            self.active_loops.len().max(1),
            self.config.bloom_false_positive_rate,
        );
    }

    pub fn bloom(&self) -> &BloomFilter {
        &self.bloom
    }

    pub fn snapshot(&self) -> Vec<u8> {
        let snapshot = Snapshot {
            format_version: CURRENT_SNAPSHOT_VERSION,
            version: self.version,
            config: self.config.clone(),
            wallets: self.wallets.clone(),
            nfts: self.nfts.clone(),
            collections: self.collections.clone(),
            active_loops: self.active_loops.clone(),
        };
        serde_json::to_vec(&snapshot).expect("snapshot serialization is infallible for owned data")
    }

    pub fn restore(bytes: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)
            .map_err(|e| Error::InvalidMutation(format!("corrupt snapshot: {e}")))?;
        if snapshot.format_version != CURRENT_SNAPSHOT_VERSION {
            return Err(Error::SnapshotIncompatible {
                found: snapshot.format_version,
                supported: CURRENT_SNAPSHOT_VERSION,
            });
        }
        let bloom = BloomFilter::rebuild(
            snapshot.active_loops.keys().map(|s| s.as_str()),
            snapshot.active_loops.len().max(1),
            snapshot.config.bloom_false_positive_rate,
        );
        Ok(Self {
            config: snapshot.config,
            wallets: snapshot.wallets,
            nfts: snapshot.nfts,
            collections: snapshot.collections,
            active_loops: snapshot.active_loops,
            bloom,
            version: snapshot.version,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_one(
    mutation: Mutation,
    wallets: &mut HashMap<WalletId, Wallet>,
    nfts: &mut HashMap<NftId, Nft>,
    collections: &mut HashMap<CollectionId, Collection>,
    removed_this_batch: &mut HashSet<NftId>,
    directly_touched: &mut HashSet<WalletId>,
    affected_collections: &mut HashSet<CollectionId>,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    match mutation {
        Mutation::AddNft {
            wallet,
            nft,
            collection,
            valuation_hint,
        } => {
            let raw_valuation = valuation_hint.map(|v| v.get());
            let already_identical = match nfts.get(&nft) {
                Some(existing) if existing.owner != wallet && !removed_this_batch.contains(&nft) => {
                    return Err(Error::ConflictingOwnership {
                        nft,
                        owner: existing.owner.clone(),
                    });
                }
                Some(existing) => {
                    existing.owner == wallet
                        && existing.collection == collection
                        && existing.valuation_hint == raw_valuation
                        && wallets.get(&wallet).is_some_and(|w| w.owned.contains(&nft))
                }
                None => false,
            };
            removed_this_batch.remove(&nft);
            let w = wallets.entry(wallet.clone()).or_insert_with(|| Wallet::new(now));
            w.owned.insert(nft.clone());
            w.specific_wants.remove(&nft);
            nfts.insert(
                nft.clone(),
                Nft {
                    owner: wallet.clone(),
                    collection: collection.clone(),
                    valuation_hint: raw_valuation,
                },
            );
            collections.entry(collection.clone()).or_default().members.insert(nft);
            affected_collections.insert(collection);
            // Re-adding an NFT a wallet already owns with identical metadata
            // is a no-op replay (spec.md §8, invariant 7): it does not mark
            // the wallet touched, though the batch's version bump still
            // applies per invariant 5.
            if !already_identical {
                w.last_mutated = now;
                directly_touched.insert(wallet);
            }
        }
        Mutation::RemoveNft { wallet, nft } => {
            let existing = nfts.get(&nft).ok_or_else(|| Error::UnknownNft(nft.clone()))?;
            if existing.owner != wallet {
                return Err(Error::InvalidMutation(format!(
                    "wallet {wallet} does not own {nft}"
                )));
            }
            let collection = existing.collection.clone();
            nfts.remove(&nft);
            removed_this_batch.insert(nft.clone());
            if let Some(w) = wallets.get_mut(&wallet) {
                w.owned.remove(&nft);
                w.last_mutated = now;
            }
            if let Some(c) = collections.get_mut(&collection) {
                c.members.remove(&nft);
            }
            directly_touched.insert(wallet);
            affected_collections.insert(collection);
        }
        Mutation::AddWant { wallet, target } => {
            let w = wallets.entry(wallet.clone()).or_insert_with(|| Wallet::new(now));
            let changed = match target {
                WantTarget::Nft(nft) => {
                    if w.owned.contains(&nft) || w.rejections.contains(&nft) {
                        false
                    } else {
                        w.specific_wants.insert(nft)
                    }
                }
                WantTarget::Collection(collection) => {
                    let changed = w.wanted_collections.insert(collection.clone());
                    affected_collections.insert(collection);
                    changed
                }
            };
            // A want the wallet already holds is a no-op replay (spec.md
            // §8, invariant 7): it does not mark the wallet touched.
            if changed {
                w.last_mutated = now;
                directly_touched.insert(wallet);
            }
        }
        Mutation::RemoveWant { wallet, target } => {
            if let Some(w) = wallets.get_mut(&wallet) {
                match target {
                    WantTarget::Nft(nft) => {
                        w.specific_wants.remove(&nft);
                    }
                    WantTarget::Collection(collection) => {
                        w.wanted_collections.remove(&collection);
                        affected_collections.insert(collection);
                    }
                }
                w.last_mutated = now;
            }
            directly_touched.insert(wallet);
        }
        Mutation::AddRejection { wallet, nft } => {
            let w = wallets.entry(wallet.clone()).or_insert_with(|| Wallet::new(now));
            let newly_rejected = w.rejections.insert(nft.clone());
            let had_specific_want = w.specific_wants.remove(&nft);
            // A rejection already on file (and not currently a specific
            // want to clear) is a no-op replay (spec.md §8, invariant 7).
            if newly_rejected || had_specific_want {
                w.last_mutated = now;
                directly_touched.insert(wallet);
            }
        }
        Mutation::RemoveRejection { wallet, nft } => {
            if let Some(w) = wallets.get_mut(&wallet) {
                w.rejections.remove(&nft);
                w.last_mutated = now;
            }
            directly_touched.insert(wallet);
        }
        Mutation::UpsertCollectionMembership {
            collection,
            nft,
            present,
        } => {
            let entry = collections.entry(collection.clone()).or_default();
            if present {
                entry.members.insert(nft);
            } else {
                entry.members.remove(&nft);
            }
            affected_collections.insert(collection);
        }
        Mutation::DeleteWallet { wallet } => {
            let w = wallets
                .remove(&wallet)
                .ok_or_else(|| Error::UnknownWallet(wallet.clone()))?;
            for nft in &w.owned {
                nfts.remove(nft);
            }
            directly_touched.insert(wallet);
        }
    }
    Ok(())
}
