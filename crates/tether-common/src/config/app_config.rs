//! Application configuration structs
//!
//! All configuration comes from environment variables; a `.env` file is
//! honored when present.

use std::collections::HashSet;
use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,
    /// Trust proxy-supplied client IP headers
    pub behind_proxy: bool,
    /// Upstream gateway token; empty disables ingest
    pub discord_token: String,
    /// Guild scope for member/presence requests
    pub guild_id: String,
    /// User ids allowed to issue admin commands on the upstream client
    pub admin_user_ids: HashSet<String>,
    /// Deployment environment, governs logger defaults
    pub env: Environment,
    /// Explicit log level override (takes precedence over `env`)
    pub log_level: Option<String>,
    /// HTTP rate limiting
    pub rate_limit: RateLimitConfig,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Debug,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "debug" => Self::Debug,
            _ => Self::Development,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    10
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error when a variable is present but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT", raw))?,
            Err(_) => default_port(),
        };

        Ok(Self {
            port,
            behind_proxy: env::var("BEHIND_PROXY")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            discord_token: env::var("DISCORD_TOKEN").unwrap_or_default(),
            guild_id: env::var("GUILD_ID").unwrap_or_default(),
            admin_user_ids: parse_id_list(&env::var("ADMIN_USER_IDS").unwrap_or_default()),
            env: env::var("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or_default(),
            log_level: env::var("LOG_LEVEL").ok().filter(|v| !v.trim().is_empty()),
            rate_limit: RateLimitConfig {
                requests_per_second: env::var("RATE_LIMIT_REQUESTS_PER_SECOND")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_requests_per_second),
                burst: env::var("RATE_LIMIT_BURST")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_burst),
            },
        })
    }

    /// Whether upstream ingest should run at all
    #[must_use]
    pub fn ingest_enabled(&self) -> bool {
        !self.discord_token.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            behind_proxy: false,
            discord_token: String::new(),
            guild_id: String::new(),
            admin_user_ids: HashSet::new(),
            env: Environment::default(),
            log_level: None,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Parse a comma-separated id list, ignoring empty entries
fn parse_id_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
