//! API endpoint handlers

pub mod health;
pub mod users;

use crate::response::ApiError;
use tether_common::AppError;

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    AppError::PageNotFound.into()
}
