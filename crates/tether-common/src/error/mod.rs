//! Application error types
//!
//! Unified error handling shared by the HTTP and socket servers.

mod app_error;

pub use app_error::{AppError, AppResult, ErrorResponse};
