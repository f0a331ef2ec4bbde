//! C10 — the change-subscription half of the Query & Subscription API.
//!
//! Backed by `tokio::sync::broadcast`, which already gives us exactly the
//! semantics spec.md §4.10 asks for: a bounded per-subscriber buffer, and a
//! subscriber that falls too far behind is not buffered unboundedly but
//! instead told it missed events (`RecvError::Lagged`) so it can be dropped
//! with a terminal event instead of silently growing memory.

use tokio::sync::broadcast;
use trade_types::TradeLoop;

#[derive(Clone, Debug)]
pub enum LoopEvent {
    LoopAdded { loop_: TradeLoop, version: u64 },
    LoopRemoved { loop_: TradeLoop, version: u64 },
    /// A premise of a still-present active loop broke but eviction was
    /// deferred to the next sweep, e.g. a cancelled round that could only
    /// afford a direct re-validation, not a full re-diff (spec.md §3
    /// lifecycle, §4.10). A loop that reaches this state without later
    /// being evicted is reactivated silently — there is no "un-stale" event.
    LoopStale { loop_: TradeLoop, version: u64 },
    /// Delivered once, as the last event a subscriber ever receives, when it
    /// fell behind the broadcast buffer (spec.md §4.10, §7).
    SubscriberLagged,
}

pub struct Publisher {
    sender: broadcast::Sender<LoopEvent>,
}

impl Publisher {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription { receiver: self.sender.subscribe(), terminated: false }
    }

    /// Best-effort: a channel with no subscribers returns `Err` from `send`,
    /// which is not an error condition here — there is simply no one
    /// listening yet.
    pub fn publish(&self, event: LoopEvent) {
        let _ = self.sender.send(event);
    }
}

/// A single subscriber's view of the event stream. Once a lag or a closed
/// channel is observed, every subsequent call returns `None`: the
/// subscription is dead and the caller should re-subscribe if it wants a
/// fresh one.
pub struct Subscription {
    receiver: broadcast::Receiver<LoopEvent>,
    terminated: bool,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<LoopEvent> {
        if self.terminated {
            return None;
        }
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => {
                self.terminated = true;
                Some(LoopEvent::SubscriberLagged)
            }
            Err(broadcast::error::RecvError::Closed) => {
                self.terminated = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trade_types::{LoopStatus, Step};

    fn sample_loop() -> TradeLoop {
        TradeLoop {
            canonical_id: "a|x,b|y".into(),
            steps: vec![Step { giver: "a".into(), receiver: "b".into(), nft: "x".into() }],
            efficiency: 1.0,
            fairness: 1.0,
            quality_score: 1.0,
            discovered_at: Utc::now(),
            status: LoopStatus::Active,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let publisher = Publisher::new(16);
        let mut sub = publisher.subscribe();
        publisher.publish(LoopEvent::LoopAdded { loop_: sample_loop(), version: 1 });
        let event = sub.next().await.unwrap();
        assert!(matches!(event, LoopEvent::LoopAdded { version: 1, .. }));
    }

    #[tokio::test]
    async fn lagging_subscriber_gets_terminal_event_then_none() {
        let publisher = Publisher::new(1);
        let mut sub = publisher.subscribe();
        for _ in 0..5 {
            publisher.publish(LoopEvent::LoopAdded { loop_: sample_loop(), version: 1 });
        }
        let event = sub.next().await.unwrap();
        assert!(matches!(event, LoopEvent::SubscriberLagged));
        assert!(sub.next().await.is_none());
    }
}
