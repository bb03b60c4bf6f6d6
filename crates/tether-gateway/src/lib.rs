//! # tether-gateway
//!
//! The fan-out socket server: a framed JSON protocol over one long-lived
//! WebSocket per client. The server pushes `INIT_STATE` on subscription
//! and `PRESENCE_UPDATE` frames as the store mutates, scoped to each
//! connection's subscription set.

pub mod broadcast;
pub mod connection;
pub mod protocol;
pub mod server;

pub use server::{socket_handler, GatewayServer, HeartbeatConfig};
