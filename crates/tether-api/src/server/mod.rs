//! Server setup and lifecycle
//!
//! Wires the store, gateway, ingest seam, and HTTP router together and
//! runs the process until shutdown. Only startup failures terminate;
//! everything after the listener is bound is log-and-continue.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tether_common::{AppError, Config};
use tether_gateway::{GatewayServer, HeartbeatConfig};
use tether_ingest::Ingestor;
use tether_store::PresenceStore;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;

/// How long in-flight requests get to drain after a shutdown signal
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

/// Build the complete application with all routes and middleware.
///
/// Must run inside the runtime (background sweeps are spawned here).
pub fn create_app(state: AppState) -> Router {
    let router = create_router();
    let router = apply_middleware(router, &state);
    router.with_state(state)
}

/// Run the relay: store, gateway fan-out, ingest seam, HTTP server.
pub async fn run(config: Config) -> Result<(), AppError> {
    let store = PresenceStore::new_shared();

    let gateway = GatewayServer::new(store.clone(), HeartbeatConfig::default());
    gateway.start();

    // The upstream client is an external collaborator; it feeds events
    // into this handle's channel. Without a token there is nothing to
    // connect, so ingest stays off and the store only serves what other
    // nodes replicate into it.
    let ingestor = Ingestor::new(store.clone());
    let _ingest_handle = if config.ingest_enabled() {
        let handle = ingestor.spawn();
        info!(guild_id = %config.guild_id, "upstream ingest enabled");
        Some(handle)
    } else {
        warn!("upstream ingest disabled: DISCORD_TOKEN not set");
        None
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(store, gateway.clone(), config);
    let app = create_app(state);

    let result = serve(app, addr).await;
    gateway.close();
    result
}

/// Serve the application with bounded-drain graceful shutdown.
pub async fn serve(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Listen(format!("{addr}: {err}")))?;

    info!(addr = %addr, "server listening");

    let shutdown = Arc::new(Notify::new());
    let signalled = shutdown.clone();

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::internal(err))?;
        }
        () = async {
            signalled.notified().await;
            tokio::time::sleep(SHUTDOWN_DRAIN).await;
        } => {
            warn!(drain_secs = SHUTDOWN_DRAIN.as_secs(), "drain window elapsed, forcing shutdown");
        }
    }

    info!("server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM; notifies the drain watchdog.
async fn shutdown_signal(notify: Arc<Notify>) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler available; wait forever instead of
            // shutting down immediately.
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutting down...");
    notify.notify_waiters();
}
