//! The one process-wide, multi-tenant piece of state (spec.md §9): a map
//! from `TenantId` to everything that tenant's worker needs. Each tenant's
//! `TenantGraph` is owned exclusively by its own worker task; the registry
//! only ever hands out read-only handles (`Arc<RwLock<...>>` clones, mutation
//! queue senders, subscription handles) to callers elsewhere in the process.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use trade_core::TenantGraph;
use trade_types::{EngineConfig, Telemetry, TenantId, ValuationResolver};

use crate::mutation_queue::{self, QueueHandle};
use crate::subscription::{Publisher, Subscription};
use crate::tenant_worker;

type TelemetryHook = dyn Fn(Telemetry) + Send + Sync;

struct TenantEntry {
    graph: Arc<RwLock<TenantGraph>>,
    queue: QueueHandle,
    publisher: Arc<Publisher>,
    worker: tokio::task::JoinHandle<()>,
}

/// Owns every tenant's worker task. `init -> serve -> drain -> shutdown`
/// (spec.md §9): construct with `new`, call `mutations`/`queries` while
/// serving, then `drain` to let in-flight rounds finish before dropping.
pub struct Registry {
    tenants: DashMap<TenantId, TenantEntry>,
    resolver: Arc<dyn ValuationResolver>,
    default_config: EngineConfig,
    telemetry_hook: Option<Arc<TelemetryHook>>,
}

impl Registry {
    pub fn new(resolver: Arc<dyn ValuationResolver>, default_config: EngineConfig) -> Self {
        Self { tenants: DashMap::new(), resolver, default_config, telemetry_hook: None }
    }

    /// Attaches a callback invoked for round-level telemetry (cancelled /
    /// budget-exhausted) in addition to the `tracing` events every round
    /// already emits. Not part of the mutation/query contract; purely for
    /// a host that wants programmatic visibility into internal rounds.
    pub fn with_telemetry_hook(
        mut self,
        hook: impl Fn(Telemetry) + Send + Sync + 'static,
    ) -> Self {
        self.telemetry_hook = Some(Arc::new(hook));
        self
    }

    fn get_or_create(&self, tenant: &TenantId) -> QueueHandle {
        if let Some(entry) = self.tenants.get(tenant) {
            return entry.queue.clone();
        }
        self.tenants
            .entry(tenant.clone())
            .or_insert_with(|| self.spawn_tenant(tenant.clone()))
            .queue
            .clone()
    }

    fn spawn_tenant(&self, tenant: TenantId) -> TenantEntry {
        let graph = Arc::new(RwLock::new(TenantGraph::new(self.default_config.clone())));
        let publisher = Arc::new(Publisher::new(self.default_config.subscriber_buffer as usize));
        let (queue, receiver) = mutation_queue::channel(self.default_config.max_queued_mutations);

        let worker = tokio::task::spawn(tenant_worker::run(
            tenant,
            graph.clone(),
            publisher.clone(),
            self.resolver.clone(),
            receiver,
            self.telemetry_hook.clone(),
        ));

        TenantEntry { graph, queue, publisher, worker }
    }

    pub fn queue_for(&self, tenant: &TenantId) -> QueueHandle {
        self.get_or_create(tenant)
    }

    pub fn graph_for(&self, tenant: &TenantId) -> Option<Arc<RwLock<TenantGraph>>> {
        self.tenants.get(tenant).map(|e| e.graph.clone())
    }

    /// Replaces a tenant's live graph with one restored from a snapshot.
    /// Spawns the tenant fresh first if it was not already known, so
    /// `restore` can also be used to rehydrate a tenant the process has not
    /// yet seen a mutation for.
    pub fn restore(&self, tenant: &TenantId, bytes: &[u8]) -> trade_types::Result<()> {
        self.get_or_create(tenant);
        let entry = self.tenants.get(tenant).expect("just created above");
        let restored = TenantGraph::restore(bytes)?;
        *entry.graph.write() = restored;
        Ok(())
    }

    pub fn subscribe(&self, tenant: &TenantId) -> Subscription {
        self.get_or_create(tenant);
        self.tenants.get(tenant).expect("just created above").publisher.subscribe()
    }

    /// Stops accepting new tenants' mutations and waits for every worker to
    /// finish its in-flight round after its queue is closed. Removing each
    /// entry drops its `QueueHandle`, which closes the mpsc channel and lets
    /// the worker's receive loop end on its own.
    pub async fn drain(&self) {
        let keys: Vec<TenantId> = self.tenants.iter().map(|e| e.key().clone()).collect();
        let mut handles = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((_, entry)) = self.tenants.remove(&key) {
                drop(entry.queue);
                handles.push(entry.worker);
            }
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_types::NullResolver;

    #[tokio::test]
    async fn distinct_tenants_get_independent_queues() {
        let registry = Registry::new(Arc::new(NullResolver), EngineConfig::default());
        let a = registry.queue_for(&TenantId::from("a"));
        let b = registry.queue_for(&TenantId::from("b"));
        a.submit(vec![]).await.unwrap();
        b.submit(vec![]).await.unwrap();
        assert!(registry.graph_for(&TenantId::from("a")).is_some());
        assert!(registry.graph_for(&TenantId::from("b")).is_some());
    }

    #[tokio::test]
    async fn telemetry_hook_is_wired_into_spawned_workers() {
        use std::sync::atomic::{AtomicBool, Ordering};
        let seen = Arc::new(AtomicBool::new(false));
        let seen_for_hook = seen.clone();
        let registry = Registry::new(Arc::new(NullResolver), EngineConfig::default())
            .with_telemetry_hook(move |_event| seen_for_hook.store(true, Ordering::SeqCst));
        // Spawning a tenant does not by itself produce a round; this only
        // confirms the hook is accepted and the tenant still comes up.
        let queue = registry.queue_for(&TenantId::from("a"));
        queue.submit(vec![]).await.unwrap();
        assert!(registry.graph_for(&TenantId::from("a")).is_some());
        assert!(!seen.load(Ordering::SeqCst));
    }
}
