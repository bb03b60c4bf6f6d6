//! Middleware stack for the API server
//!
//! CORS, panic recovery, request tracing, timeouts, latency tracking,
//! and per-IP rate limiting.

mod rate_limit;

pub use rate_limit::{rate_limit_middleware, IpRateLimiter};

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use std::time::{Duration, Instant};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Per-request timeout; bounds slow-client work the way the original's
/// per-phase socket timeouts did.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Apply the middleware stack.
///
/// Spawns the rate limiter's eviction sweep, so this must run inside
/// the runtime.
pub fn apply_middleware(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    let limiter = IpRateLimiter::new(
        &state.config().rate_limit,
        state.config().behind_proxy,
    );
    limiter.spawn_eviction();

    // Layers wrap bottom-up: the last layer added sees the request
    // first. Order: CORS -> panic recovery -> trace -> timeout ->
    // rate limit -> latency -> handler.
    router
        .layer(
            axum::middleware::from_fn_with_state(state.clone(), track_latency),
        )
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(cors_layer())
}

/// Permissive CORS so browsers can consume snapshots from anywhere.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Record request duration into the API latency ring.
async fn track_latency(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.api_latency().record(start.elapsed());
    response
}
