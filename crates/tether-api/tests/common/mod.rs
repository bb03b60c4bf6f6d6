//! Shared helpers for integration tests
//!
//! Spawns the full application (store + gateway + router) on an
//! ephemeral port, with direct handles to the store and gateway for
//! driving state from the test.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tether_api::{create_app, AppState};
use tether_common::Config;
use tether_core::{Presence, Status};
use tether_gateway::{GatewayServer, HeartbeatConfig};
use tether_store::PresenceStore;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A running relay instance under test
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<PresenceStore>,
    pub gateway: GatewayServer,
}

impl TestServer {
    /// Start with defaults
    pub async fn start() -> Self {
        Self::start_with(Config::default(), HeartbeatConfig::default()).await
    }

    /// Start with explicit config and heartbeat policy
    pub async fn start_with(config: Config, heartbeat: HeartbeatConfig) -> Self {
        let store = PresenceStore::new_shared();
        let gateway = GatewayServer::new(store.clone(), heartbeat);
        gateway.start();

        let state = AppState::new(store.clone(), gateway.clone(), config);
        let app = create_app(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        Self {
            addr,
            store,
            gateway,
        }
    }

    /// URL of an HTTP path on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// URL of the socket endpoint, with an optional query string
    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/socket{query}", self.addr)
    }

    /// Open a socket connection and consume the Hello frame
    pub async fn connect_socket(&self) -> WsStream {
        let (mut ws, _) = connect_async(self.ws_url("")).await.expect("ws connect");
        let hello = next_json(&mut ws, Duration::from_secs(2))
            .await
            .expect("hello frame");
        assert_eq!(hello["op"], 1);
        assert_eq!(hello["d"]["heartbeat_interval"], 30_000);
        ws
    }
}

/// A minimal online presence for `id`
pub fn online_presence(id: &str, username: &str) -> Presence {
    let mut presence = Presence {
        discord_status: Status::Online,
        ..Default::default()
    };
    presence.discord_user.id = id.to_string();
    presence.discord_user.username = username.to_string();
    presence.discord_user.recompute_avatar_url();
    presence
}

/// Next message within `timeout`, or `None`
pub async fn next_message(ws: &mut WsStream, timeout: Duration) -> Option<Message> {
    tokio::time::timeout(timeout, ws.next())
        .await
        .ok()
        .flatten()
        .and_then(Result::ok)
}

/// Next text frame decoded as JSON within `timeout`, or `None`
pub async fn next_json(ws: &mut WsStream, timeout: Duration) -> Option<serde_json::Value> {
    match next_message(ws, timeout).await? {
        Message::Text(text) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

/// Wait for the close frame and return its code
pub async fn expect_close(ws: &mut WsStream, timeout: Duration) -> Option<u16> {
    loop {
        match next_message(ws, timeout).await? {
            Message::Close(frame) => return frame.map(|f| u16::from(f.code)),
            _ => continue,
        }
    }
}

/// Send one JSON frame
pub async fn send_json(ws: &mut WsStream, value: serde_json::Value) {
    use futures_util::SinkExt;
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("ws send");
}
