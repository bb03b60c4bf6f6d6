//! Readiness probe
//!
//! GET /healthz

use axum::Json;
use serde::Serialize;

/// Health probe response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// All state is in-memory, so "running" is "ready".
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_healthz_shape() {
        let Json(body) = healthz().await;
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, serde_json::json!({"status": "ok"}));
    }
}
