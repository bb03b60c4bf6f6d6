//! Socket connection handler
//!
//! One reader loop per connection, one writer task draining the
//! outbound channel, and one heartbeat watcher. The writer task is the
//! only place that touches the sink, so frames never interleave.

use crate::connection::{Connection, Outbound};
use crate::protocol::{
    CloseCode, HelloPayload, PresenceEnvelope, SocketMessage, EVENT_INIT_STATE,
};
use crate::server::GatewayServer;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tether_common::{spawn_logged, LatencyRing};
use tokio::sync::mpsc;

/// Inbound frames are capped to bound decompression/processing work
const MAX_FRAME_BYTES: usize = 1 << 20; // 1 MiB

/// Upgrade query parameters
#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    #[serde(default)]
    compression: Option<String>,
}

/// Why frame processing stopped
enum FrameError {
    /// Close the socket with a protocol code
    Close(CloseCode),
    /// Drop the connection without a code
    Terminate,
}

/// `GET /socket` — upgrade and run the connection.
pub async fn socket_handler(
    State(gateway): State<GatewayServer>,
    Query(query): Query<SocketQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let compressed = query.compression.as_deref() == Some("zlib_json");
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_socket(gateway, socket, compressed))
}

/// Run one upgraded connection to completion.
async fn handle_socket(gateway: GatewayServer, socket: WebSocket, compressed: bool) {
    let (sink, stream) = socket.split();
    let (connection, outbound) = gateway.connections().register(compressed);

    spawn_logged(
        "socket-writer",
        writer_task(sink, outbound, compressed, gateway.send_latency().clone()),
    );
    let watcher = spawn_logged(
        "heartbeat-watcher",
        heartbeat_task(gateway.clone(), connection.clone()),
    );

    let hello = SocketMessage::hello(HelloPayload::new(
        gateway.heartbeat().interval.as_millis() as u64,
    ));
    if connection.send(hello).await.is_ok() {
        if let Some(code) = read_loop(&gateway, &connection, stream).await {
            tracing::debug!(conn = connection.id(), code = %code, "closing connection");
            connection.shutdown(Some(code));
        }
    }

    gateway.connections().remove(connection.id());
    connection.shutdown(None);
    watcher.abort();
}

/// Process inbound frames until the client goes away or violates the
/// protocol. Returns the close code to send, if any.
async fn read_loop(
    gateway: &GatewayServer,
    connection: &Arc<Connection>,
    mut stream: SplitStream<WebSocket>,
) -> Option<CloseCode> {
    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(conn = connection.id(), error = %err, "socket read failed");
                return None;
            }
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => return None,
            },
            Message::Close(_) => return None,
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        match handle_frame(gateway, connection, &text).await {
            Ok(()) => {}
            Err(FrameError::Close(code)) => return Some(code),
            Err(FrameError::Terminate) => return None,
        }
    }
    None
}

/// Decode and route one inbound frame.
async fn handle_frame(
    gateway: &GatewayServer,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), FrameError> {
    let message = match SocketMessage::from_json(text) {
        Ok(message) => message,
        // Valid JSON with an op outside the protocol closes with 4004;
        // garbage that isn't JSON just drops the connection.
        Err(_) => {
            return if serde_json::from_str::<serde_json::Value>(text).is_ok() {
                Err(FrameError::Close(CloseCode::UnknownOpcode))
            } else {
                Err(FrameError::Terminate)
            };
        }
    };

    if !message.op.is_client_op() {
        return Err(FrameError::Close(CloseCode::UnknownOpcode));
    }

    match message.op {
        crate::protocol::OpCode::Initialize => {
            handle_initialize(gateway, connection, &message).await
        }
        crate::protocol::OpCode::Heartbeat => {
            connection.record_heartbeat();
            connection
                .send(SocketMessage::heartbeat_ack())
                .await
                .map_err(|_| FrameError::Terminate)
        }
        _ => Err(FrameError::Close(CloseCode::UnknownOpcode)),
    }
}

/// Op 2: replace the subscription set and push INIT_STATE for every
/// subscribed user currently in the store.
async fn handle_initialize(
    gateway: &GatewayServer,
    connection: &Arc<Connection>,
    message: &SocketMessage,
) -> Result<(), FrameError> {
    let Some(payload) = message.as_initialize() else {
        return Err(FrameError::Close(CloseCode::RequiresDataObject));
    };

    let user_ids = payload.subscription_set();
    if user_ids.is_empty() {
        return Err(FrameError::Close(CloseCode::InvalidPayload));
    }

    connection.set_subscriptions(user_ids.clone()).await;
    tracing::debug!(
        conn = connection.id(),
        subs = user_ids.len(),
        "connection initialized"
    );

    for user_id in &user_ids {
        let Some(presence) = gateway.store().get(user_id) else {
            continue;
        };
        let envelope = PresenceEnvelope::update(user_id, presence.public);
        let frame = SocketMessage::event(EVENT_INIT_STATE, gateway.next_seq(), envelope);
        connection
            .send(frame)
            .await
            .map_err(|_| FrameError::Terminate)?;
    }
    Ok(())
}

/// Drain the outbound channel onto the sink.
async fn writer_task(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
    compressed: bool,
    latency: Arc<LatencyRing>,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                let Some(message) = encode_frame(&frame, compressed) else {
                    continue;
                };
                let start = Instant::now();
                let sent = sink.send(message).await;
                latency.record(start.elapsed());
                if let Err(err) = sent {
                    tracing::debug!(error = %err, "socket write failed");
                    break;
                }
            }
            Outbound::Close(code) => {
                let frame = code.map(|code| CloseFrame {
                    code: code.as_u16(),
                    reason: code.reason().into(),
                });
                let _ = sink.send(Message::Close(frame)).await;
                break;
            }
        }
    }
    let _ = sink.close().await;
}

/// Serialize one frame; zlib_json connections get zlib-compressed
/// binary frames.
fn encode_frame(frame: &SocketMessage, compressed: bool) -> Option<Message> {
    let json = match frame.to_json() {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode socket frame");
            return None;
        }
    };

    if !compressed {
        return Some(Message::Text(json));
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    if encoder.write_all(json.as_bytes()).is_err() {
        return None;
    }
    match encoder.finish() {
        Ok(bytes) => Some(Message::Binary(bytes)),
        Err(err) => {
            tracing::warn!(error = %err, "failed to compress socket frame");
            None
        }
    }
}

/// Wake every interval; count misses and drop dead connections.
async fn heartbeat_task(gateway: GatewayServer, connection: Arc<Connection>) {
    let config = gateway.heartbeat();
    let mut ticker = tokio::time::interval(config.interval);
    // The first tick resolves immediately; the watch starts one
    // interval out.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if !gateway.connections().contains(connection.id()) {
            return;
        }

        let status = connection.heartbeat_tick(config.expected());
        if status.misses >= config.max_misses || status.elapsed > config.timeout() {
            tracing::warn!(
                conn = connection.id(),
                misses = status.misses,
                silent_ms = status.elapsed.as_millis() as u64,
                "socket heartbeat timeout"
            );
            gateway.connections().remove(connection.id());
            connection.shutdown(None);
            return;
        }
    }
}
