//! Presence snapshot handler
//!
//! GET /v1/users/:user_id

use crate::response::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use tether_common::AppError;
use tether_core::PublicPresence;

/// Serve the public projection of one user's presence.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<PublicPresence>> {
    if !is_snowflake(&user_id) {
        return Err(AppError::InvalidUserId.into());
    }

    let presence = state.store().get(&user_id).ok_or(AppError::UserNotFound)?;
    Ok(Json(presence.public))
}

/// A non-empty decimal string of digits
fn is_snowflake(user_id: &str) -> bool {
    !user_id.is_empty() && user_id.bytes().all(|b| b.is_ascii_digit())
}
