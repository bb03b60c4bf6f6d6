//! Event dispatcher
//!
//! Consumes the server's single store subscription and fans each event
//! out to the connections whose subscription set contains the event's
//! user id.

use crate::connection::ConnectionManager;
use crate::protocol::{PresenceEnvelope, SocketMessage, EVENT_PRESENCE_UPDATE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tether_store::{PresenceEvent, Subscription};

/// Routes store events to subscribed connections
pub struct EventDispatcher {
    connections: Arc<ConnectionManager>,
    sequence: Arc<AtomicU64>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new(connections: Arc<ConnectionManager>, sequence: Arc<AtomicU64>) -> Self {
        Self {
            connections,
            sequence,
        }
    }

    /// Consume store events until the subscription is cancelled.
    pub async fn run(self, mut subscription: Subscription) {
        while let Some(event) = subscription.events.recv().await {
            self.dispatch(event).await;
        }
        tracing::info!("store subscription closed, broadcast consumer stopped");
    }

    /// Fan one event out to every subscribed connection.
    pub async fn dispatch(&self, event: PresenceEvent) {
        let targets = self.connections.subscribed_to(&event.user_id).await;
        if targets.is_empty() {
            return;
        }

        tracing::info!(
            user_id = %event.user_id,
            subs = targets.len(),
            removed = event.removed,
            "gateway event broadcast"
        );

        let envelope = if event.removed {
            PresenceEnvelope::removal(&event.user_id)
        } else {
            match event.presence {
                Some(presence) => PresenceEnvelope::update(&event.user_id, presence.public),
                None => return,
            }
        };

        for connection in targets {
            let seq = self.next_sequence();
            let frame = SocketMessage::event(EVENT_PRESENCE_UPDATE, seq, &envelope);
            if connection.send(frame).await.is_err() {
                // Writer is gone; drop the registry entry so future
                // events skip this connection.
                self.connections.remove(connection.id());
            }
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Outbound;
    use crate::protocol::OpCode;
    use tether_core::{Presence, Status};

    fn online(id: &str) -> Presence {
        let mut presence = Presence {
            discord_status: Status::Online,
            ..Default::default()
        };
        presence.discord_user.id = id.to_string();
        presence.normalize();
        presence
    }

    fn envelope_of(outbound: Outbound) -> (u64, String, PresenceEnvelope) {
        match outbound {
            Outbound::Frame(frame) => {
                assert_eq!(frame.op, OpCode::Event);
                let envelope = serde_json::from_value(frame.d.unwrap()).unwrap();
                (frame.seq.unwrap(), frame.t.unwrap(), envelope)
            }
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_filters_by_subscription() {
        let manager = ConnectionManager::new_shared();
        let dispatcher = EventDispatcher::new(manager.clone(), Arc::new(AtomicU64::new(0)));

        let (conn_a, mut rx_a) = manager.register(false);
        let (conn_b, mut rx_b) = manager.register(false);
        conn_a.set_subscriptions(vec!["1".to_string()]).await;
        conn_b.set_subscriptions(vec!["2".to_string()]).await;

        dispatcher
            .dispatch(PresenceEvent::updated("1", online("1")))
            .await;

        let (_, name, envelope) = envelope_of(rx_a.try_recv().unwrap());
        assert_eq!(name, EVENT_PRESENCE_UPDATE);
        assert_eq!(envelope.user_id, "1");
        assert!(envelope.data.is_some());
        // B subscribed elsewhere: nothing delivered.
        assert!(rx_b.try_recv().is_err());

        dispatcher
            .dispatch(PresenceEvent::updated("2", online("2")))
            .await;
        assert!(rx_a.try_recv().is_err());
        let (_, _, envelope) = envelope_of(rx_b.try_recv().unwrap());
        assert_eq!(envelope.user_id, "2");
    }

    #[tokio::test]
    async fn test_dispatch_removal_envelope() {
        let manager = ConnectionManager::new_shared();
        let dispatcher = EventDispatcher::new(manager.clone(), Arc::new(AtomicU64::new(0)));

        let (conn, mut rx) = manager.register(false);
        conn.set_subscriptions(vec!["1".to_string()]).await;

        dispatcher.dispatch(PresenceEvent::removed("1")).await;

        let (_, _, envelope) = envelope_of(rx.try_recv().unwrap());
        assert!(envelope.removed);
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_sequence_is_monotonic() {
        let manager = ConnectionManager::new_shared();
        let dispatcher = EventDispatcher::new(manager.clone(), Arc::new(AtomicU64::new(0)));

        let (conn, mut rx) = manager.register(false);
        conn.set_subscriptions(vec!["1".to_string()]).await;

        dispatcher
            .dispatch(PresenceEvent::updated("1", online("1")))
            .await;
        dispatcher
            .dispatch(PresenceEvent::updated("1", online("1")))
            .await;

        let (seq_one, _, _) = envelope_of(rx.try_recv().unwrap());
        let (seq_two, _, _) = envelope_of(rx.try_recv().unwrap());
        assert!(seq_two > seq_one);
    }

    #[tokio::test]
    async fn test_dead_connection_is_pruned() {
        let manager = ConnectionManager::new_shared();
        let dispatcher = EventDispatcher::new(manager.clone(), Arc::new(AtomicU64::new(0)));

        let (conn, rx) = manager.register(false);
        conn.set_subscriptions(vec!["1".to_string()]).await;
        drop(rx);

        dispatcher
            .dispatch(PresenceEvent::updated("1", online("1")))
            .await;
        assert_eq!(manager.count(), 0);
    }
}
