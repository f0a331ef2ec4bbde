//! The per-tenant ordered mutation queue (spec.md §5): a bounded channel so
//! a slow or backed-up tenant writer applies backpressure instead of
//! growing memory without bound.

use std::collections::HashSet;

use tokio::sync::{mpsc, oneshot};
use trade_types::{MutationBatch, Result, WalletId};

pub struct QueuedMutation {
    pub batch: MutationBatch,
    pub respond_to: oneshot::Sender<Result<HashSet<WalletId>>>,
}

#[derive(Clone)]
pub struct QueueHandle {
    sender: mpsc::Sender<QueuedMutation>,
}

pub fn channel(capacity: u32) -> (QueueHandle, mpsc::Receiver<QueuedMutation>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1) as usize);
    (QueueHandle { sender }, receiver)
}

impl QueueHandle {
    /// Enqueues a batch and awaits its result. Fails synchronously with
    /// `TenantBackpressured` if the queue is already at `maxQueuedMutations`
    /// rather than waiting for room (spec.md §5, §7).
    pub async fn submit(&self, batch: MutationBatch) -> Result<HashSet<WalletId>> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .try_send(QueuedMutation { batch, respond_to })
            .map_err(|_| trade_types::Error::TenantBackpressured)?;
        response.await.map_err(|_| trade_types::Error::EngineUnavailable)?
    }
}
