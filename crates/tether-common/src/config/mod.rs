//! Application configuration
//!
//! Loads configuration from environment variables (optionally via a `.env`
//! file).

mod app_config;

pub use app_config::{Config, ConfigError, Environment, RateLimitConfig};
