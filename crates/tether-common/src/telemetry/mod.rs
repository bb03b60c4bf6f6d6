//! Tracing and logging setup
//!
//! Configures the `tracing` subscriber from `APP_ENV` / `LOG_LEVEL`.

mod tracing_setup;

pub use tracing_setup::{init_tracing, try_init_tracing, TracingError};
