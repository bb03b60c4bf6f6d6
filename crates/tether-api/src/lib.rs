//! # tether-api
//!
//! The HTTP surface of the presence relay: the point-in-time snapshot
//! endpoint, the readiness probe, the WebSocket upgrade route, and the
//! middleware stack (CORS, panic recovery, latency tracking, per-IP
//! rate limiting).

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, run, serve};
pub use state::AppState;
