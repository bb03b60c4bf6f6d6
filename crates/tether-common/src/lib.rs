//! # tether-common
//!
//! Shared utilities for the Tether presence relay: configuration, error
//! handling, telemetry, panic-contained task spawning, and latency metrics.

pub mod config;
pub mod error;
pub mod metrics;
pub mod task;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{Config, ConfigError, Environment};
pub use error::{AppError, AppResult, ErrorResponse};
pub use metrics::LatencyRing;
pub use task::spawn_logged;
pub use telemetry::init_tracing;
