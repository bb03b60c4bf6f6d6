//! Shared gateway state

use crate::broadcast::EventDispatcher;
use crate::connection::ConnectionManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tether_common::{spawn_logged, LatencyRing};
use tether_store::{PresenceStore, SubscriberId};

/// Heartbeat policy for socket connections
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Expected beat interval
    pub interval: Duration,
    /// Tolerance on top of the interval before a tick counts as a miss
    pub jitter: Duration,
    /// Consecutive misses before the connection is dropped
    pub max_misses: u32,
}

impl HeartbeatConfig {
    /// Total silence past this duration drops the connection regardless
    /// of the miss counter.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.interval * 2
    }

    /// The window a beat must land in to reset the miss counter
    #[must_use]
    pub fn expected(&self) -> Duration {
        self.interval + self.jitter
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(30_000),
            jitter: Duration::from_millis(1_000),
            max_misses: 3,
        }
    }
}

/// Shared state of the fan-out socket server.
///
/// Cheap to clone; used directly as the axum handler state.
#[derive(Clone)]
pub struct GatewayServer {
    store: Arc<PresenceStore>,
    connections: Arc<ConnectionManager>,
    sequence: Arc<AtomicU64>,
    send_latency: Arc<LatencyRing>,
    heartbeat: HeartbeatConfig,
    subscriber: Arc<Mutex<Option<SubscriberId>>>,
}

impl GatewayServer {
    #[must_use]
    pub fn new(store: Arc<PresenceStore>, heartbeat: HeartbeatConfig) -> Self {
        Self {
            store,
            connections: ConnectionManager::new_shared(),
            sequence: Arc::new(AtomicU64::new(0)),
            send_latency: Arc::new(LatencyRing::new()),
            heartbeat,
            subscriber: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to the store and start the broadcast consumer.
    pub fn start(&self) {
        let subscription = self.store.subscribe();
        {
            let mut slot = self.lock_subscriber();
            if slot.is_some() {
                tracing::warn!("gateway broadcast consumer already running");
                self.store.cancel(subscription.id);
                return;
            }
            *slot = Some(subscription.id);
        }

        let dispatcher = EventDispatcher::new(self.connections.clone(), self.sequence.clone());
        spawn_logged("gateway-broadcast", dispatcher.run(subscription));
        tracing::info!("gateway broadcast consumer started");
    }

    /// Cancel the store subscription, then close every connection.
    /// In-flight writers observe their closed sockets and exit.
    pub fn close(&self) {
        if let Some(id) = self.lock_subscriber().take() {
            self.store.cancel(id);
        }
        self.connections.close_all();
        tracing::info!("gateway closed");
    }

    #[must_use]
    pub fn store(&self) -> &Arc<PresenceStore> {
        &self.store
    }

    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    #[must_use]
    pub fn heartbeat(&self) -> HeartbeatConfig {
        self.heartbeat
    }

    /// Next event sequence number (monotonic per server instance)
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Ring recording socket send latencies
    #[must_use]
    pub fn send_latency(&self) -> &Arc<LatencyRing> {
        &self.send_latency
    }

    /// p99 of recent socket send latencies
    #[must_use]
    pub fn send_p99(&self) -> Duration {
        self.send_latency.p99()
    }

    fn lock_subscriber(&self) -> std::sync::MutexGuard<'_, Option<SubscriberId>> {
        self.subscriber.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("connections", &self.connections.count())
            .field("heartbeat", &self.heartbeat)
            .finish()
    }
}
