//! Live-update subscriber registry
//!
//! Each subscriber owns a bounded queue of notification batches. A batch is
//! delivered whole, so the order inside one logical update is the same for
//! every subscriber. Delivery is best-effort: a full queue drops the batch
//! for that subscriber only, and a closed queue unregisters it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::models::notification::Notification;

/// Ordered notifications belonging to one state change
pub type Batch = Arc<[Notification]>;

struct HubInner {
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<Batch>>>,
    buffer: usize,
}

impl HubInner {
    fn subscribers(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<Batch>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a subscriber; dropping the handle unregisters it
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.inner.buffer);
        let id = Uuid::new_v4();
        self.inner.subscribers().insert(id, sender);
        tracing::debug!(subscriber = %id, "Subscriber registered");

        Subscription {
            id,
            receiver,
            hub: Arc::clone(&self.inner),
        }
    }

    /// Deliver `notifications` as one batch to every subscriber; returns how
    /// many subscribers accepted it
    pub fn broadcast(&self, notifications: Vec<Notification>) -> usize {
        if notifications.is_empty() {
            return 0;
        }
        let batch: Batch = notifications.into();
        let mut subscribers = self.inner.subscribers();
        let mut delivered = 0;

        subscribers.retain(|id, sender| match sender.try_send(Arc::clone(&batch)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber = %id, "Subscriber queue full, dropping update");
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(subscriber = %id, "Subscriber gone, unregistering");
                false
            }
        });

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }

    /// Drop every subscriber; their receivers end after draining
    pub fn close(&self) {
        let count = {
            let mut subscribers = self.inner.subscribers();
            let count = subscribers.len();
            subscribers.clear();
            count
        };
        tracing::info!("Closed {} live subscriber(s)", count);
    }
}

/// Receiving side of one live subscriber
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::Receiver<Batch>,
    hub: Arc<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next batch, or `None` once the hub has dropped this subscriber
    pub async fn recv(&mut self) -> Option<Batch> {
        self.receiver.recv().await
    }

    /// Next batch if one is already queued
    pub fn try_recv(&mut self) -> Option<Batch> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.subscribers().remove(&self.id);
    }
}
