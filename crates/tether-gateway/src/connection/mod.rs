//! Per-connection state and the connection registry

mod connection;
mod manager;

pub use connection::{Connection, HeartbeatStatus, Outbound, OUTBOUND_BUFFER};
pub use manager::ConnectionManager;
