//! Concurrent presence store
//!
//! A reader-writer-locked map of the latest presence per user. The lock
//! is never held across anything that can block: subscriber delivery is
//! a non-blocking `try_send` (full channels drop), and replicator
//! dispatch happens on isolated tasks after the lock is released.

use crate::event::PresenceEvent;
use crate::replicator::Replicator;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tether_common::spawn_logged;
use tether_core::Presence;
use tokio::sync::mpsc;

/// Buffer depth of each subscriber channel.
///
/// A slow consumer loses events past this depth instead of stalling the
/// store; the store remains the source of truth and can be re-read.
pub const SUBSCRIBER_BUFFER: usize = 16;

/// Identifies one subscriber registration
pub type SubscriberId = u64;

/// A live subscription to store events
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub events: mpsc::Receiver<PresenceEvent>,
}

/// Concurrency-safe repository of the latest presence per user.
///
/// All methods are safe for arbitrary concurrent callers.
#[derive(Default)]
pub struct PresenceStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Presence>,
    watchers: HashMap<SubscriberId, mpsc::Sender<PresenceEvent>>,
    replicators: Vec<Arc<dyn Replicator>>,
    next_watcher_id: SubscriberId,
}

impl PresenceStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in [`Arc`]
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Look up the presence for `user_id`
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<Presence> {
        self.read().data.get(user_id).cloned()
    }

    /// A copy of every tracked presence
    #[must_use]
    pub fn get_all(&self) -> HashMap<String, Presence> {
        self.read().data.clone()
    }

    /// Number of tracked presences
    #[must_use]
    pub fn count(&self) -> usize {
        self.read().data.len()
    }

    /// Insert or replace the presence for `user_id` and emit an update
    /// event. The snapshot is normalized first so the cached public
    /// projection can never drift from the fields that produced it.
    pub fn set(&self, user_id: &str, mut presence: Presence) {
        presence.normalize();
        {
            let mut inner = self.write();
            inner.data.insert(user_id.to_string(), presence.clone());
        }
        self.emit(PresenceEvent::updated(user_id, presence));
    }

    /// Insert or replace without emitting. Used for staged imports where
    /// the caller broadcasts once the write is visible.
    pub fn set_quiet(&self, user_id: &str, mut presence: Presence) {
        presence.normalize();
        self.write().data.insert(user_id.to_string(), presence);
    }

    /// Read-modify-write under the write lock, without emitting.
    ///
    /// An absent id starts from the offline default snapshot.
    pub fn update_quiet(&self, user_id: &str, update: impl FnOnce(Presence) -> Presence) {
        let mut inner = self.write();
        let current = inner
            .data
            .get(user_id)
            .cloned()
            .unwrap_or_else(Presence::offline);
        let mut updated = update(current);
        updated.normalize();
        inner.data.insert(user_id.to_string(), updated);
    }

    /// Delete the entry for `user_id` and emit a removal event
    pub fn remove(&self, user_id: &str) {
        self.write().data.remove(user_id);
        self.emit(PresenceEvent::removed(user_id));
    }

    /// Emit an update event for the current value, if present
    pub fn broadcast(&self, user_id: &str) {
        let Some(presence) = self.get(user_id) else {
            return;
        };
        self.emit(PresenceEvent::updated(user_id, presence));
    }

    /// Register a subscriber with a bounded event buffer.
    ///
    /// Cancel with [`PresenceStore::cancel`]; after it returns no
    /// further events are delivered and the channel is closed.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut inner = self.write();
        let id = inner.next_watcher_id;
        inner.next_watcher_id += 1;
        inner.watchers.insert(id, tx);
        Subscription { id, events: rx }
    }

    /// Deregister a subscriber and close its channel. Idempotent —
    /// cancelling an unknown or already-cancelled id is a no-op.
    pub fn cancel(&self, id: SubscriberId) {
        // Dropping the sender outside the lock closes the channel.
        let _sender = self.write().watchers.remove(&id);
    }

    /// Register a best-effort replicator for cross-node fan-out
    pub fn add_replicator(&self, replicator: Arc<dyn Replicator>) {
        self.write().replicators.push(replicator);
    }

    /// Deliver an event to every subscriber (non-blocking; full buffers
    /// drop) and schedule replicator publishes on isolated tasks.
    fn emit(&self, event: PresenceEvent) {
        let replicators: Vec<Arc<dyn Replicator>> = {
            let inner = self.read();
            for sender in inner.watchers.values() {
                // A full or closed channel drops the event for that
                // subscriber only.
                let _ = sender.try_send(event.clone());
            }
            inner.replicators.clone()
        };

        for replicator in replicators {
            let event = event.clone();
            spawn_logged("replicator-publish", async move {
                if let Err(err) = replicator.publish(&event).await {
                    tracing::warn!(
                        error = %err,
                        user_id = %event.user_id,
                        "replicator publish failed"
                    );
                }
            });
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PresenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("PresenceStore")
            .field("presences", &inner.data.len())
            .field("watchers", &inner.watchers.len())
            .field("replicators", &inner.replicators.len())
            .finish()
    }
}
