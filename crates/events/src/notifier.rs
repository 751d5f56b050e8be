//! Per-owner progress subscriber registry.
//!
//! [`ProgressNotifier`] maps each owner to the set of live channels that
//! want that owner's job events. Delivery is best-effort: nothing is
//! buffered for owners without subscribers, and a dead channel never stops
//! delivery to the rest.

use std::collections::HashMap;

use reelgen_core::types::DbId;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::event::ProgressEvent;

/// Identifies one subscription within an owner's channel set.
pub type SubscriptionId = Uuid;

/// Sender half registered for one subscriber.
type EventSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving side handed to whoever attached (usually a WebSocket task).
pub struct Subscription {
    pub id: SubscriptionId,
    pub owner_id: DbId,
    receiver: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl Subscription {
    /// Wait for the next event. `None` once the notifier dropped the channel.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Fan-out of job progress events keyed by owner.
///
/// Thread-safe via interior `RwLock`; share it as `Arc<ProgressNotifier>`.
pub struct ProgressNotifier {
    channels: RwLock<HashMap<DbId, HashMap<SubscriptionId, EventSender>>>,
}

impl ProgressNotifier {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a new subscriber to `owner_id`'s channel.
    pub async fn subscribe(&self, owner_id: DbId) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.channels
            .write()
            .await
            .entry(owner_id)
            .or_default()
            .insert(id, tx);
        tracing::debug!(owner_id, subscription_id = %id, "Progress subscriber attached");

        Subscription {
            id,
            owner_id,
            receiver: rx,
        }
    }

    /// Detach a subscriber. Unknown ids are a no-op.
    pub async fn unsubscribe(&self, owner_id: DbId, subscription_id: SubscriptionId) {
        let mut channels = self.channels.write().await;
        if let Some(subs) = channels.get_mut(&owner_id) {
            subs.remove(&subscription_id);
            if subs.is_empty() {
                channels.remove(&owner_id);
            }
        }
    }

    /// Push `event` to every subscriber of `owner_id`.
    ///
    /// Returns how many subscribers received it. With no subscribers the
    /// event is dropped and `0` is returned. Subscribers whose receiver is
    /// gone are logged and pruned.
    pub async fn publish(&self, owner_id: DbId, event: ProgressEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        {
            let channels = self.channels.read().await;
            let Some(subs) = channels.get(&owner_id) else {
                tracing::trace!(owner_id, job_id = %event.job_id, "No progress subscribers");
                return 0;
            };

            for (id, sender) in subs {
                match sender.send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(_) => {
                        tracing::warn!(
                            owner_id,
                            subscription_id = %id,
                            job_id = %event.job_id,
                            "Progress delivery failed, subscriber closed"
                        );
                        dead.push(*id);
                    }
                }
            }
        }

        for id in dead {
            self.unsubscribe(owner_id, id).await;
        }

        delivered
    }

    /// Number of live subscribers for one owner.
    pub async fn subscriber_count(&self, owner_id: DbId) -> usize {
        self.channels
            .read()
            .await
            .get(&owner_id)
            .map_or(0, HashMap::len)
    }

    /// Number of owners with at least one subscriber.
    pub async fn owner_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Drop every channel. Receivers observe `None` after draining.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut channels = self.channels.write().await;
        let count: usize = channels.values().map(HashMap::len).sum();
        channels.clear();
        tracing::info!(count, "Closed all progress subscriptions");
    }
}

impl Default for ProgressNotifier {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use reelgen_core::job::JobKind;

    use super::*;

    fn sample(percent: i16) -> ProgressEvent {
        ProgressEvent::progress(Uuid::nil(), JobKind::Video, percent, "working")
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let notifier = ProgressNotifier::new();

        assert_eq!(notifier.publish(42, sample(10)).await, 0);
        assert_eq!(notifier.owner_count().await, 0);
    }

    #[tokio::test]
    async fn every_subscriber_of_the_owner_receives() {
        let notifier = ProgressNotifier::new();
        let mut a = notifier.subscribe(1).await;
        let mut b = notifier.subscribe(1).await;

        assert_eq!(notifier.publish(1, sample(30)).await, 2);

        assert_eq!(a.recv().await.unwrap().percent, 30);
        assert_eq!(b.recv().await.unwrap().percent, 30);
    }

    #[tokio::test]
    async fn other_owners_do_not_receive() {
        let notifier = ProgressNotifier::new();
        let mut mine = notifier.subscribe(1).await;
        let mut theirs = notifier.subscribe(2).await;

        notifier.publish(1, sample(10)).await;

        assert!(mine.recv().await.is_some());
        assert!(theirs.try_recv().is_none());
    }

    #[tokio::test]
    async fn closed_subscriber_is_pruned_and_others_still_receive() {
        let notifier = ProgressNotifier::new();
        let gone = notifier.subscribe(1).await;
        let mut alive = notifier.subscribe(1).await;
        drop(gone);

        assert_eq!(notifier.publish(1, sample(60)).await, 1);
        assert_eq!(alive.recv().await.unwrap().percent, 60);
        assert_eq!(notifier.subscriber_count(1).await, 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_owner_when_last_channel_leaves() {
        let notifier = ProgressNotifier::new();
        let sub = notifier.subscribe(9).await;
        assert_eq!(notifier.subscriber_count(9).await, 1);

        notifier.unsubscribe(9, Uuid::new_v4()).await;
        assert_eq!(notifier.subscriber_count(9).await, 1);

        notifier.unsubscribe(9, sub.id).await;
        assert_eq!(notifier.subscriber_count(9).await, 0);
        assert_eq!(notifier.owner_count().await, 0);
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let notifier = ProgressNotifier::new();
        let mut sub = notifier.subscribe(3).await;

        for percent in [10, 30, 60, 80, 100] {
            notifier.publish(3, sample(percent)).await;
        }

        let mut seen = Vec::new();
        while let Some(event) = sub.try_recv() {
            seen.push(event.percent);
        }
        assert_eq!(seen, vec![10, 30, 60, 80, 100]);
    }

    #[tokio::test]
    async fn shutdown_all_closes_channels() {
        let notifier = ProgressNotifier::new();
        let mut a = notifier.subscribe(1).await;
        let mut b = notifier.subscribe(2).await;

        notifier.shutdown_all().await;

        assert_eq!(notifier.owner_count().await, 0);
        assert!(a.recv().await.is_none());
        assert!(b.recv().await.is_none());
    }
}
