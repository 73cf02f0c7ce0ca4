//! Status broadcast fan-out
//!
//! Every subscriber gets its own receiver over a tokio broadcast
//! channel, so a slow subscriber lags (and drops) on its own queue
//! without blocking emission to the others. The broadcaster also tracks
//! the current status value so late joiners can be caught up immediately
//! on subscribe, the only "history" the stream offers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use robin_core::events::{StatusEvent, SystemStatus};

const CHANNEL_CAPACITY: usize = 64;

/// One broadcast envelope. `origin` identifies the subscriber a client
/// override came from, so it is not echoed back to its sender.
#[derive(Debug, Clone)]
pub struct Published {
    pub origin: Option<u64>,
    pub event: StatusEvent,
}

/// A subscriber handle: the catch-up status plus a private event queue.
pub struct Subscription {
    pub id: u64,
    pub current: SystemStatus,
    pub receiver: broadcast::Receiver<Published>,
}

/// Fan-out point for [`StatusEvent`]s.
#[derive(Debug, Clone)]
pub struct StatusBroadcaster {
    tx: broadcast::Sender<Published>,
    current: Arc<RwLock<SystemStatus>>,
    next_subscriber_id: Arc<AtomicU64>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            current: Arc::new(RwLock::new(SystemStatus::Stopped)),
            next_subscriber_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Broadcast an event to all subscribers.
    pub fn publish(&self, event: StatusEvent) {
        self.publish_from(None, event);
    }

    /// Broadcast an event originating from a specific subscriber.
    pub fn publish_from(&self, origin: Option<u64>, event: StatusEvent) {
        if let StatusEvent::SystemStatus(status) = &event {
            *self.current.write().unwrap_or_else(|e| e.into_inner()) = *status;
        }
        // Ignore send errors (no subscribers is fine)
        let _ = self.tx.send(Published { origin, event });
    }

    /// Register a subscriber. The returned snapshot is taken under the
    /// same ordering as event emission, so the caller can deliver it
    /// before draining the receiver without missing a transition.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        Subscription {
            id,
            current: self.current(),
            receiver: self.tx.subscribe(),
        }
    }

    /// The status a late joiner is caught up with.
    pub fn current(&self) -> SystemStatus {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
