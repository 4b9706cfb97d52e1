//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::warn;

use crate::dto::response::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health/ready
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let store = state
        .stores
        .status
        .health_check()
        .await
        .unwrap_or_else(|e| {
            warn!("Store health check failed: {}", e);
            false
        });
    let broker = state.queue.health_check().await.unwrap_or_else(|e| {
        warn!("Broker health check failed: {}", e);
        false
    });

    let (code, status) = if store && broker {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    (
        code,
        Json(ReadinessResponse {
            status: status.to_string(),
            store,
            broker,
        }),
    )
}
