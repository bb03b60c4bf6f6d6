//! Route definitions

use axum::routing::get;
use axum::Router;

use crate::handlers::{self, health, users};
use crate::state::AppState;

/// All routes of the relay's HTTP surface
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/v1/users/:user_id", get(users::get_user))
        .route("/healthz", get(health::healthz))
        .route("/socket", get(tether_gateway::socket_handler))
        .fallback(handlers::not_found)
}
