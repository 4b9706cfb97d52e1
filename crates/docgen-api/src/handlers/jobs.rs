//! Job inspection handlers.

use axum::Json;
use axum::extract::{Path, State};

use docgen_core::error::AppError;
use docgen_core::types::JobId;
use docgen_entity::job::Job;
use docgen_worker::QueueStats;

use crate::state::AppState;

/// GET /api/jobs/stats
pub async fn queue_stats(State(state): State<AppState>) -> Result<Json<QueueStats>, AppError> {
    Ok(Json(state.queue.stats().await?))
}

/// GET /api/jobs/{queue}/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path((queue, id)): Path<(String, String)>,
) -> Result<Json<Job>, AppError> {
    if !state.queue.queue_names().contains(&queue) {
        return Err(AppError::not_found(format!("Unknown queue: {queue}")));
    }
    let job_id: JobId = id
        .parse()
        .map_err(|_| AppError::validation(format!("Invalid job id: {id}")))?;
    let job = state
        .queue
        .get(&queue, job_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job {job_id} not found in {queue}")))?;
    Ok(Json(job))
}
