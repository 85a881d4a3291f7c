//! Change notifications
//!
//! Every mutation of the local store broadcasts which collection
//! changed so views can re-read it. Delivery is fire-and-forget: a
//! send with no live subscribers is not an error, and dropping a
//! receiver unsubscribes it.

use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Which persisted collection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    OrdersChanged,
    StockChanged,
    CartChanged,
}

/// Broadcast hub owned by the local store
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to change notifications. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Emit a notification, ignoring the no-subscribers case
    pub fn emit(&self, event: StoreEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
