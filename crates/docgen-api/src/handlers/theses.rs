//! Thesis version, artifact and passage handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use docgen_core::error::AppError;
use docgen_entity::job::{QuizParams, SearchQueryParams};
use docgen_entity::thesis::Passage;
use docgen_service::ArtifactOutcome;

use crate::dto::request::{
    PassageSearchRequest, QuizRequest, RollbackRequest, SearchQueriesRequest, parse_thesis_id,
};
use crate::dto::response::{ArtifactResponse, ThesisResponse, VersionResponse};
use crate::extractors::ApiJson;
use crate::state::AppState;

/// POST /api/theses/rollback
pub async fn rollback(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RollbackRequest>,
) -> Result<Json<ThesisResponse>, AppError> {
    let thesis_id = parse_thesis_id(req.domain_id.as_deref())?;
    let version = req
        .version_number
        .ok_or_else(|| AppError::validation("versionNumber is required"))?;
    let thesis = state.version_service.rollback(thesis_id, version).await?;
    Ok(Json(thesis.into()))
}

/// GET /api/theses/{id}/versions
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<VersionResponse>>, AppError> {
    let thesis_id = parse_thesis_id(Some(&id))?;
    let versions = state.version_service.list(thesis_id).await?;
    Ok(Json(versions.into_iter().map(Into::into).collect()))
}

/// POST /api/theses/quiz
pub async fn request_quiz(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<QuizRequest>,
) -> Result<(StatusCode, Json<ArtifactResponse>), AppError> {
    let thesis_id = parse_thesis_id(req.domain_id.as_deref())?;
    let mut params = QuizParams::default();
    if let Some(count) = req.question_count {
        params.question_count = count;
    }
    let outcome = state
        .generation_service
        .request_quiz(thesis_id, params)
        .await?;
    Ok(artifact_response(outcome))
}

/// POST /api/theses/search-queries
pub async fn request_search_queries(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SearchQueriesRequest>,
) -> Result<(StatusCode, Json<ArtifactResponse>), AppError> {
    let thesis_id = parse_thesis_id(req.domain_id.as_deref())?;
    let mut params = SearchQueryParams::default();
    if let Some(count) = req.query_count {
        params.query_count = count;
    }
    let outcome = state
        .generation_service
        .request_search_queries(thesis_id, params)
        .await?;
    Ok(artifact_response(outcome))
}

/// POST /api/theses/passages
pub async fn search_passages(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PassageSearchRequest>,
) -> Result<Json<Vec<Passage>>, AppError> {
    let thesis_id = parse_thesis_id(req.domain_id.as_deref())?;
    let passages = state
        .passage_service
        .search(thesis_id, &req.query, req.limit, req.threshold)
        .await?;
    Ok(Json(passages))
}

fn artifact_response(outcome: ArtifactOutcome) -> (StatusCode, Json<ArtifactResponse>) {
    match outcome {
        ArtifactOutcome::Existing(data) => (
            StatusCode::OK,
            Json(ArtifactResponse {
                job_id: None,
                data: Some(data),
            }),
        ),
        ArtifactOutcome::Enqueued(job_id) => (
            StatusCode::ACCEPTED,
            Json(ArtifactResponse {
                job_id: Some(job_id),
                data: None,
            }),
        ),
    }
}
