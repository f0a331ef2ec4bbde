//! The public surface named in spec.md §6: mutation endpoints, queries,
//! snapshot/restore, and subscriptions, all scoped by `tenantId`. This is
//! the one type a host embeds; everything else in this crate is an
//! implementation detail reached through it.

use std::sync::Arc;

use trade_types::{
    CollectionId, EngineConfig, Mutation, NftId, Result, TenantId, TradeLoop, Valuation,
    ValuationResolver, WalletId, WantTarget,
};

use crate::registry::Registry;
use crate::subscription::Subscription;

pub struct Engine {
    registry: Registry,
}

/// One entry of `submitInventory` (spec.md §6): an NFT the wallet now owns,
/// with an optional valuation seed for resolvers that want one.
pub struct InventoryItem {
    pub nft: NftId,
    pub collection: CollectionId,
    pub valuation_hint: Option<Valuation>,
}

impl Engine {
    pub fn new(resolver: Arc<dyn ValuationResolver>, default_config: EngineConfig) -> Self {
        Self { registry: Registry::new(resolver, default_config) }
    }

    /// Same as `new`, with a callback invoked for round-level telemetry
    /// (cancelled / budget-exhausted rounds) in addition to the `tracing`
    /// events every round already emits (spec.md §9).
    pub fn with_telemetry_hook(
        resolver: Arc<dyn ValuationResolver>,
        default_config: EngineConfig,
        hook: impl Fn(trade_types::Telemetry) + Send + Sync + 'static,
    ) -> Self {
        Self { registry: Registry::new(resolver, default_config).with_telemetry_hook(hook) }
    }

    pub async fn submit_inventory(
        &self,
        tenant: &TenantId,
        wallet: WalletId,
        items: Vec<InventoryItem>,
    ) -> Result<usize> {
        let batch = items
            .into_iter()
            .map(|item| Mutation::AddNft {
                wallet: wallet.clone(),
                nft: item.nft,
                collection: item.collection,
                valuation_hint: item.valuation_hint,
            })
            .collect();
        self.apply(tenant, batch).await
    }

    pub async fn remove_inventory(
        &self,
        tenant: &TenantId,
        wallet: WalletId,
        nfts: Vec<NftId>,
    ) -> Result<usize> {
        let batch = nfts
            .into_iter()
            .map(|nft| Mutation::RemoveNft { wallet: wallet.clone(), nft })
            .collect();
        self.apply(tenant, batch).await
    }

    pub async fn submit_wants(
        &self,
        tenant: &TenantId,
        wallet: WalletId,
        nfts: Vec<NftId>,
        collections: Vec<CollectionId>,
    ) -> Result<usize> {
        let batch = nfts
            .into_iter()
            .map(|nft| Mutation::AddWant { wallet: wallet.clone(), target: WantTarget::Nft(nft) })
            .chain(collections.into_iter().map(|collection| Mutation::AddWant {
                wallet: wallet.clone(),
                target: WantTarget::Collection(collection),
            }))
            .collect();
        self.apply(tenant, batch).await
    }

    pub async fn remove_wants(
        &self,
        tenant: &TenantId,
        wallet: WalletId,
        nfts: Vec<NftId>,
        collections: Vec<CollectionId>,
    ) -> Result<usize> {
        let batch = nfts
            .into_iter()
            .map(|nft| Mutation::RemoveWant { wallet: wallet.clone(), target: WantTarget::Nft(nft) })
            .chain(collections.into_iter().map(|collection| Mutation::RemoveWant {
                wallet: wallet.clone(),
                target: WantTarget::Collection(collection),
            }))
            .collect();
        self.apply(tenant, batch).await
    }

    pub async fn set_rejections(
        &self,
        tenant: &TenantId,
        wallet: WalletId,
        nfts: Vec<NftId>,
    ) -> Result<usize> {
        let batch = nfts
            .into_iter()
            .map(|nft| Mutation::AddRejection { wallet: wallet.clone(), nft })
            .collect();
        self.apply(tenant, batch).await
    }

    pub async fn delete_wallet(&self, tenant: &TenantId, wallet: WalletId) -> Result<usize> {
        self.apply(tenant, vec![Mutation::DeleteWallet { wallet }]).await
    }

    pub async fn upsert_collection_membership(
        &self,
        tenant: &TenantId,
        collection: CollectionId,
        nft: NftId,
        present: bool,
    ) -> Result<usize> {
        self.apply(tenant, vec![Mutation::UpsertCollectionMembership { collection, nft, present }])
            .await
    }

    async fn apply(&self, tenant: &TenantId, batch: Vec<Mutation>) -> Result<usize> {
        let queue = self.registry.queue_for(tenant);
        let touched = queue.submit(batch).await?;
        Ok(touched.len())
    }

    pub fn get_loops_for_wallet(&self, tenant: &TenantId, wallet: &WalletId) -> Vec<TradeLoop> {
        match self.registry.graph_for(tenant) {
            Some(graph) => graph.read().get_active_loops_for_wallet(wallet),
            None => Vec::new(),
        }
    }

    pub fn get_version(&self, tenant: &TenantId) -> Option<u64> {
        self.registry.graph_for(tenant).map(|g| g.read().version())
    }

    pub fn snapshot(&self, tenant: &TenantId) -> Option<Vec<u8>> {
        self.registry.graph_for(tenant).map(|g| g.read().snapshot())
    }

    pub fn restore(&self, tenant: &TenantId, bytes: &[u8]) -> Result<()> {
        self.registry.restore(tenant, bytes)
    }

    pub fn subscribe(&self, tenant: &TenantId) -> Subscription {
        self.registry.subscribe(tenant)
    }

    pub async fn drain(&self) {
        self.registry.drain().await;
    }
}
