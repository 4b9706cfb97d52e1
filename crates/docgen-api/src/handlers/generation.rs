//! Generation intake and status handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use docgen_core::error::AppError;
use docgen_entity::generation::GenerationStatus;
use docgen_entity::job::GenerationParams;
use docgen_service::IntakeOutcome;

use crate::dto::request::{CreateGenerationRequest, StatusQuery, parse_thesis_id};
use crate::dto::response::{GenerationAccepted, StatusResponse};
use crate::extractors::ApiJson;
use crate::state::AppState;

/// POST /api/generations
pub async fn create_generation(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateGenerationRequest>,
) -> Result<(StatusCode, Json<GenerationAccepted>), AppError> {
    let thesis_id = parse_thesis_id(req.domain_id.as_deref())?;
    let payload = req
        .generation_payload
        .ok_or_else(|| AppError::validation("generationPayload is required"))?;
    let params: GenerationParams = serde_json::from_value(payload)
        .map_err(|e| AppError::validation(format!("Invalid generationPayload: {e}")))?;

    let outcome = state
        .generation_service
        .request_generation(thesis_id, params)
        .await?;

    let response = match outcome {
        IntakeOutcome::Enqueued { job_id, status } => (
            StatusCode::ACCEPTED,
            GenerationAccepted {
                job_id: Some(job_id),
                status: status.status,
                record: None,
                current_version: None,
            },
        ),
        IntakeOutcome::AlreadyInProgress(record) => (
            StatusCode::OK,
            GenerationAccepted {
                job_id: None,
                status: record.status,
                record: Some(record.into()),
                current_version: None,
            },
        ),
        IntakeOutcome::AlreadyCompleted { current_version } => (
            StatusCode::OK,
            GenerationAccepted {
                job_id: None,
                status: GenerationStatus::Completed,
                record: None,
                current_version,
            },
        ),
    };
    Ok((response.0, Json(response.1)))
}

/// GET /api/generations/status?id=
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, AppError> {
    let thesis_id = parse_thesis_id(query.id.as_deref())?;
    let record = state.status_service.get_status(thesis_id).await?;
    Ok(Json(record.into()))
}
