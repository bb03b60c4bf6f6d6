//! Tracing and logging setup
//!
//! Level and format are resolved from the configuration: production logs
//! JSON at `warn`, development logs pretty text at `info`, debug logs
//! pretty text at `debug`. `LOG_LEVEL` overrides the environment default,
//! and `RUST_LOG` (via `EnvFilter`) overrides everything.

use crate::config::{Config, Environment};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize the global tracing subscriber
///
/// # Panics
/// Panics if a subscriber is already installed.
pub fn init_tracing(config: &Config) {
    try_init_tracing(config).expect("tracing subscriber already initialized");
}

/// Try to initialize tracing, returning an error instead of panicking when
/// a subscriber is already installed (useful in tests).
pub fn try_init_tracing(config: &Config) -> Result<(), TracingError> {
    let (default_level, pretty) = match (&config.log_level, config.env) {
        (Some(level), _) => (normalize_level(level), !config.env.is_production()),
        (None, Environment::Production) => ("warn".to_string(), false),
        (None, Environment::Development) => ("info".to_string(), true),
        (None, Environment::Debug) => ("debug".to_string(), true),
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if pretty {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .try_init()
            .map_err(|_| TracingError::AlreadyInitialized)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init()
            .map_err(|_| TracingError::AlreadyInitialized)
    }
}

/// Map arbitrary level strings onto the set `tracing` understands
fn normalize_level(level: &str) -> String {
    match level.trim().to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "fatal" | "panic" => "error",
        _ => "info",
    }
    .to_string()
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
