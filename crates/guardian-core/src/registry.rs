//! Subscription registry: fan-out of stream events to a dynamic consumer set.
//!
//! Each subscriber owns a bounded channel. `publish` offers the event to every
//! channel with `try_send`, so a slow consumer only ever loses its own events
//! and never delays the others or the driver. A consumer whose receiver has
//! been dropped is removed on the next publish.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use guardian_contracts::stream::StreamEvent;

/// Handle naming one registered consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// The receiving end handed to a consumer by `subscribe`.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<StreamEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event. `None` once the subscription was removed
    /// and every buffered event has been drained.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Take a buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<StreamEvent> {
        self.receiver.try_recv().ok()
    }
}

struct RegistryInner {
    next_id: u64,
    senders: HashMap<SubscriptionId, mpsc::Sender<StreamEvent>>,
}

/// The set of live consumers, keyed by subscription handle.
pub struct SubscriptionRegistry {
    buffer: usize,
    inner: Mutex<RegistryInner>,
}

impl SubscriptionRegistry {
    /// `buffer` is the number of undelivered events each consumer may hold
    /// before further events are dropped for it.
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            inner: Mutex::new(RegistryInner {
                next_id: 0,
                senders: HashMap::new(),
            }),
        }
    }

    // The registry holds no invariant a panicking holder could break, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.senders.insert(id, tx);
        debug!(subscription = id.0, "subscriber registered");
        Subscription { id, receiver: rx }
    }

    /// Remove a consumer. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.lock().senders.remove(&id).is_some();
        if removed {
            debug!(subscription = id.0, "subscriber removed");
        }
        removed
    }

    /// Offer `event` to every current consumer and return how many accepted it.
    ///
    /// Holds the registry lock for the whole pass, so a concurrent
    /// `unsubscribe` lands either before or after it, never in the middle.
    pub fn publish(&self, event: &StreamEvent) -> usize {
        let mut inner = self.lock();
        let mut delivered = 0;
        let mut disconnected = Vec::new();

        for (id, sender) in inner.senders.iter() {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(subscription = id.0, "subscriber lagging; event dropped");
                }
                Err(TrySendError::Closed(_)) => disconnected.push(*id),
            }
        }

        for id in disconnected {
            inner.senders.remove(&id);
            debug!(subscription = id.0, "subscriber disconnected");
        }

        delivered
    }

    pub fn len(&self) -> usize {
        self.lock().senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
