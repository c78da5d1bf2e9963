//! Queue statistics and job lookup handlers.

use super::JobResponse;
use crate::api::AppState;
use crate::error::Error;
use crate::types::JobId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /queue/stats - Job counts per status
#[utoipa::path(
    get,
    path = "/queue/stats",
    tag = "queue",
    responses(
        (status = 200, description = "Queue statistics", body = crate::types::QueueStats),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn queue_stats(State(state): State<AppState>) -> Response {
    match state.pipeline.db.queue_stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get queue statistics");
            e.into_response()
        }
    }
}

/// GET /jobs/:id - Get a single job
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "queue",
    params(("id" = i64, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job details", body = JobResponse),
        (status = 404, description = "Job not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.pipeline.db.get_job(JobId(id)).await {
        Ok(Some(job)) => (StatusCode::OK, Json(JobResponse::from(job))).into_response(),
        Ok(None) => Error::NotFound(format!("job {}", id)).into_response(),
        Err(e) => {
            tracing::error!(job_id = id, error = %e, "Failed to get job");
            e.into_response()
        }
    }
}
