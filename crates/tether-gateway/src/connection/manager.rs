//! Connection registry
//!
//! Tracks every live connection. Broadcast snapshots the candidate list
//! first and filters by subscription outside the map access, so sends
//! never happen while a registry shard is held.

use super::{Connection, Outbound, OUTBOUND_BUFFER};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Registry of live socket connections
#[derive(Default)]
pub struct ConnectionManager {
    connections: DashMap<u64, Arc<Connection>>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection and create its outbound channel.
    ///
    /// Returns the connection and the receiver its writer task drains.
    pub fn register(&self, compressed: bool) -> (Arc<Connection>, mpsc::Receiver<Outbound>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let connection = Connection::new(id, tx, compressed);
        self.connections.insert(id, connection.clone());
        tracing::debug!(conn = id, compressed = compressed, "connection registered");
        (connection, rx)
    }

    /// Remove a connection from the registry
    pub fn remove(&self, id: u64) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(&id).map(|(_, conn)| conn);
        if removed.is_some() {
            tracing::debug!(conn = id, "connection removed");
        }
        removed
    }

    /// Whether `id` is still registered
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.connections.contains_key(&id)
    }

    /// Number of live connections
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Snapshot the connections subscribed to `user_id`.
    ///
    /// The registry is only touched to copy out the candidates; the
    /// subscription check and any sends happen on the snapshot.
    pub async fn subscribed_to(&self, user_id: &str) -> Vec<Arc<Connection>> {
        let candidates: Vec<Arc<Connection>> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut targets = Vec::new();
        for connection in candidates {
            if connection.is_subscribed(user_id).await {
                targets.push(connection);
            }
        }
        targets
    }

    /// Ask every connection to close and clear the registry
    pub fn close_all(&self) {
        for entry in self.connections.iter() {
            entry.value().shutdown(None);
        }
        self.connections.clear();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_remove() {
        let manager = ConnectionManager::new();
        let (conn, _rx) = manager.register(false);
        assert_eq!(manager.count(), 1);
        assert!(manager.contains(conn.id()));

        let removed = manager.remove(conn.id()).unwrap();
        assert_eq!(removed.id(), conn.id());
        assert_eq!(manager.count(), 0);
        assert!(manager.remove(conn.id()).is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let manager = ConnectionManager::new();
        let (a, _rx_a) = manager.register(false);
        let (b, _rx_b) = manager.register(true);
        assert_ne!(a.id(), b.id());
        assert!(b.is_compressed());
    }

    #[tokio::test]
    async fn test_subscribed_to_filters() {
        let manager = ConnectionManager::new();
        let (a, _rx_a) = manager.register(false);
        let (b, _rx_b) = manager.register(false);

        a.set_subscriptions(vec!["1".to_string()]).await;
        b.set_subscriptions(vec!["2".to_string()]).await;

        let targets = manager.subscribed_to("1").await;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id(), a.id());

        let targets = manager.subscribed_to("2").await;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id(), b.id());

        assert!(manager.subscribed_to("3").await.is_empty());
    }

    #[tokio::test]
    async fn test_close_all() {
        let manager = ConnectionManager::new();
        let (_a, mut rx_a) = manager.register(false);
        let (_b, mut rx_b) = manager.register(false);

        manager.close_all();
        assert_eq!(manager.count(), 0);

        assert!(matches!(rx_a.recv().await, Some(Outbound::Close(None))));
        assert!(matches!(rx_b.recv().await, Some(Outbound::Close(None))));
    }
}
