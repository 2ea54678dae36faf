//! Update publishing and the live observer relay.
//!
//! Delivery is best-effort and at-most-once: events go to whoever is
//! subscribed to the order at publish time and are otherwise dropped. There
//! is no buffering or replay for late subscribers.

mod ws;

pub use ws::{relay_router, serve, RelayState};

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::domain::OrderUpdate;

const CHANNEL_CAPACITY: usize = 32;

/// Per-order broadcast channels keyed by order id
#[derive(Default)]
pub struct UpdateBus {
    channels: DashMap<Uuid, broadcast::Sender<OrderUpdate>>,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to the order's current observers, if any.
    pub fn publish(&self, update: OrderUpdate) {
        if let Some(tx) = self.channels.get(&update.order_id) {
            // send errs only when every receiver is gone; the event is lost.
            let delivered = tx.send(update.clone()).unwrap_or(0);
            debug!(
                order_id = %update.order_id,
                status = %update.status,
                delivered,
                "published order update"
            );
        }
    }

    /// Subscribe one observer to one order for the subscription's lifetime.
    pub fn subscribe(self: Arc<Self>, order_id: Uuid) -> OrderSubscription {
        let rx = self
            .channels
            .entry(order_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        OrderSubscription {
            bus: self,
            order_id,
            rx: Some(rx),
        }
    }

    /// Number of live channels (observability, leak checks in tests).
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn release(&self, order_id: Uuid) {
        // Drop the channel once the last receiver is gone so repeated
        // connect/disconnect cycles do not accumulate entries.
        self.channels
            .remove_if(&order_id, |_, tx| tx.receiver_count() == 0);
    }
}

/// Handle owned by one observer connection.
///
/// Dropping it releases the underlying subscription exactly once.
pub struct OrderSubscription {
    bus: Arc<UpdateBus>,
    order_id: Uuid,
    rx: Option<broadcast::Receiver<OrderUpdate>>,
}

impl OrderSubscription {
    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    /// Next update for this order; `None` once the channel is closed.
    /// An observer that falls behind skips the overwritten events.
    pub async fn recv(&mut self) -> Option<OrderUpdate> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(order_id = %self.order_id, skipped, "observer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for OrderSubscription {
    fn drop(&mut self) {
        // Receiver must go first so the release sees an accurate count.
        self.rx.take();
        self.bus.release(self.order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;

    #[tokio::test]
    async fn subscriber_receives_published_updates() {
        let bus = Arc::new(UpdateBus::new());
        let order_id = Uuid::new_v4();
        let mut sub = bus.clone().subscribe(order_id);

        bus.publish(OrderUpdate::new(order_id, OrderStatus::Routing));

        let update = sub.recv().await.unwrap();
        assert_eq!(update.order_id, order_id);
        assert_eq!(update.status, OrderStatus::Routing);
    }

    #[tokio::test]
    async fn publish_without_subscriber_is_dropped() {
        let bus = Arc::new(UpdateBus::new());
        let order_id = Uuid::new_v4();

        // No channel is created, nothing is retained for replay.
        bus.publish(OrderUpdate::new(order_id, OrderStatus::Confirmed));
        assert_eq!(bus.channel_count(), 0);

        let mut sub = bus.clone().subscribe(order_id);
        bus.publish(OrderUpdate::new(order_id, OrderStatus::Failed));
        let update = sub.recv().await.unwrap();
        assert_eq!(update.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn updates_are_scoped_to_their_order() {
        let bus = Arc::new(UpdateBus::new());
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut sub = bus.clone().subscribe(watched);

        bus.publish(OrderUpdate::new(other, OrderStatus::Confirmed));
        bus.publish(OrderUpdate::new(watched, OrderStatus::Routing));

        let update = sub.recv().await.unwrap();
        assert_eq!(update.order_id, watched);
    }

    #[tokio::test]
    async fn connect_disconnect_cycles_do_not_leak_channels() {
        let bus = Arc::new(UpdateBus::new());
        let order_id = Uuid::new_v4();

        for _ in 0..8 {
            let sub = bus.clone().subscribe(order_id);
            assert_eq!(bus.channel_count(), 1);
            drop(sub);
        }

        assert_eq!(bus.channel_count(), 0);
    }

    #[tokio::test]
    async fn channel_survives_while_another_observer_remains() {
        let bus = Arc::new(UpdateBus::new());
        let order_id = Uuid::new_v4();

        let mut first = bus.clone().subscribe(order_id);
        let second = bus.clone().subscribe(order_id);
        drop(second);
        assert_eq!(bus.channel_count(), 1);

        bus.publish(OrderUpdate::new(order_id, OrderStatus::Submitted));
        assert_eq!(first.recv().await.unwrap().status, OrderStatus::Submitted);
    }
}
