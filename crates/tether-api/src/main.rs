//! Tether server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p tether-api
//! ```
//!
//! Configuration comes from environment variables (see `Config`); a
//! `.env` file is honored when present.

use tether_common::telemetry::try_init_tracing;
use tether_common::Config;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = try_init_tracing(&config) {
        eprintln!("warning: failed to initialize tracing: {err}");
    }

    info!(
        port = config.port,
        env = ?config.env,
        behind_proxy = config.behind_proxy,
        ingest = config.ingest_enabled(),
        "starting tether"
    );

    if let Err(err) = tether_api::run(config).await {
        error!(error = %err, "server failed");
        std::process::exit(1);
    }
}
