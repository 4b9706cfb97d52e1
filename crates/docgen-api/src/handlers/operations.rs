//! Provider operation handlers.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use docgen_core::error::AppError;
use docgen_provider::{DriveOutcome, OperationSnapshot};

use crate::dto::request::{OperationPollRequest, OperationStatusRequest};
use crate::dto::response::PollTimeoutResponse;
use crate::extractors::ApiJson;
use crate::state::AppState;

/// POST /api/operations/status
pub async fn check_operation(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<OperationStatusRequest>,
) -> Result<Json<OperationSnapshot>, AppError> {
    let snapshot = state
        .operation_service
        .check(&req.operation_handle)
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/operations/poll
///
/// Blocks up to `maxWaitTime`. Polling stops as soon as the client goes
/// away: dropping this future fires the cancellation token.
pub async fn poll_operation(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<OperationPollRequest>,
) -> Result<Response, AppError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = state
        .operation_service
        .wait(
            &req.operation_handle,
            req.max_wait_time.map(Duration::from_millis),
            &cancel,
        )
        .await?;

    let response = match outcome {
        DriveOutcome::Completed(snapshot) | DriveOutcome::Failed { snapshot, .. } => {
            Json(snapshot).into_response()
        }
        DriveOutcome::TimedOut { last, elapsed } => (
            StatusCode::REQUEST_TIMEOUT,
            Json(PollTimeoutResponse {
                error: "TIMEOUT".to_string(),
                message: format!(
                    "Operation {} still running after {} ms",
                    req.operation_handle.trim(),
                    elapsed.as_millis()
                ),
                snapshot: last,
                elapsed_ms: elapsed.as_millis() as u64,
            }),
        )
            .into_response(),
    };
    Ok(response)
}
