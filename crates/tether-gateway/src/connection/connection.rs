//! Individual socket connection
//!
//! Holds the subscription set, heartbeat accounting, and the outbound
//! frame channel. The single writer task draining that channel is what
//! serializes frames on the socket — no two frames can interleave.

use crate::protocol::{CloseCode, SocketMessage};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};

/// Outbound channel depth per connection
pub const OUTBOUND_BUFFER: usize = 64;

/// What the writer task is asked to do next
#[derive(Debug)]
pub enum Outbound {
    /// Send one frame
    Frame(SocketMessage),
    /// Send a close frame (with an optional protocol code) and stop
    Close(Option<CloseCode>),
}

/// Heartbeat accounting after one watcher tick
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatStatus {
    /// Consecutive missed beats
    pub misses: u32,
    /// Time since the last beat
    pub elapsed: Duration,
}

struct HeartbeatState {
    last_beat: Instant,
    misses: u32,
}

/// One live socket connection
pub struct Connection {
    id: u64,
    sender: mpsc::Sender<Outbound>,
    subscriptions: RwLock<HashSet<String>>,
    heartbeat: Mutex<HeartbeatState>,
    compressed: bool,
}

impl Connection {
    /// Create a new connection around its outbound channel
    pub fn new(id: u64, sender: mpsc::Sender<Outbound>, compressed: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            sender,
            subscriptions: RwLock::new(HashSet::new()),
            heartbeat: Mutex::new(HeartbeatState {
                last_beat: Instant::now(),
                misses: 0,
            }),
            compressed,
        })
    }

    /// Connection id (process-local)
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether zlib_json compression was negotiated at upgrade
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Replace the subscription set
    pub async fn set_subscriptions(&self, user_ids: impl IntoIterator<Item = String>) {
        *self.subscriptions.write().await = user_ids.into_iter().collect();
    }

    /// Whether this connection subscribed to `user_id`
    pub async fn is_subscribed(&self, user_id: &str) -> bool {
        self.subscriptions.read().await.contains(user_id)
    }

    /// Number of subscribed users
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Record a client heartbeat
    pub fn record_heartbeat(&self) {
        let mut heartbeat = self.lock_heartbeat();
        heartbeat.last_beat = Instant::now();
    }

    /// One watcher tick: count a miss when the last beat is older than
    /// `expected`, reset the counter otherwise.
    pub fn heartbeat_tick(&self, expected: Duration) -> HeartbeatStatus {
        let mut heartbeat = self.lock_heartbeat();
        let elapsed = heartbeat.last_beat.elapsed();
        if elapsed > expected {
            heartbeat.misses += 1;
        } else {
            heartbeat.misses = 0;
        }
        HeartbeatStatus {
            misses: heartbeat.misses,
            elapsed,
        }
    }

    /// Queue one frame for the writer task.
    pub async fn send(&self, frame: SocketMessage) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Frame(frame)).await
    }

    /// Ask the writer task to close the socket. Never blocks; losing the
    /// message is fine because the writer also exits when the channel
    /// closes.
    pub fn shutdown(&self, code: Option<CloseCode>) {
        let _ = self.sender.try_send(Outbound::Close(code));
    }

    /// Whether the writer side is gone
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn lock_heartbeat(&self) -> std::sync::MutexGuard<'_, HeartbeatState> {
        self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("compressed", &self.compressed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriptions() {
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new(1, tx, false);

        assert!(!conn.is_subscribed("1").await);
        conn.set_subscriptions(vec!["1".to_string(), "2".to_string()]).await;
        assert!(conn.is_subscribed("1").await);
        assert!(conn.is_subscribed("2").await);
        assert!(!conn.is_subscribed("3").await);
        assert_eq!(conn.subscription_count().await, 2);

        // Re-initialize replaces, not extends.
        conn.set_subscriptions(vec!["3".to_string()]).await;
        assert!(!conn.is_subscribed("1").await);
        assert!(conn.is_subscribed("3").await);
    }

    #[tokio::test]
    async fn test_heartbeat_accounting() {
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new(1, tx, false);

        // Fresh beat: no misses.
        let status = conn.heartbeat_tick(Duration::from_secs(60));
        assert_eq!(status.misses, 0);

        // Expected window of zero: every tick is a miss.
        let status = conn.heartbeat_tick(Duration::ZERO);
        assert_eq!(status.misses, 1);
        let status = conn.heartbeat_tick(Duration::ZERO);
        assert_eq!(status.misses, 2);

        // A beat resets the counter.
        conn.record_heartbeat();
        let status = conn.heartbeat_tick(Duration::from_secs(60));
        assert_eq!(status.misses, 0);
    }

    #[tokio::test]
    async fn test_send_and_shutdown() {
        let (tx, mut rx) = mpsc::channel(4);
        let conn = Connection::new(1, tx, false);

        conn.send(SocketMessage::heartbeat_ack()).await.unwrap();
        conn.shutdown(Some(CloseCode::UnknownOpcode));

        match rx.recv().await.unwrap() {
            Outbound::Frame(frame) => assert_eq!(frame.op, crate::protocol::OpCode::Heartbeat),
            other => panic!("expected frame, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            Outbound::Close(Some(code)) => assert_eq!(code, CloseCode::UnknownOpcode),
            other => panic!("expected close, got {other:?}"),
        }

        drop(rx);
        assert!(conn.is_closed());
        // Shutdown after close is a no-op, not a panic.
        conn.shutdown(None);
    }
}
