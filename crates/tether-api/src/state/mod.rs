//! Application state

use axum::extract::FromRef;
use std::sync::Arc;
use tether_common::{Config, LatencyRing};
use tether_gateway::GatewayServer;
use tether_store::PresenceStore;

/// Shared state of the HTTP application
#[derive(Clone)]
pub struct AppState {
    store: Arc<PresenceStore>,
    gateway: GatewayServer,
    config: Arc<Config>,
    api_latency: Arc<LatencyRing>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<PresenceStore>, gateway: GatewayServer, config: Config) -> Self {
        Self {
            store,
            gateway,
            config: Arc::new(config),
            api_latency: Arc::new(LatencyRing::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<PresenceStore> {
        &self.store
    }

    #[must_use]
    pub fn gateway(&self) -> &GatewayServer {
        &self.gateway
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ring recording HTTP request latencies
    #[must_use]
    pub fn api_latency(&self) -> &Arc<LatencyRing> {
        &self.api_latency
    }
}

// Lets the socket upgrade handler extract its own state from ours.
impl FromRef<AppState> for GatewayServer {
    fn from_ref(state: &AppState) -> GatewayServer {
        state.gateway.clone()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("presences", &self.store.count())
            .finish()
    }
}
