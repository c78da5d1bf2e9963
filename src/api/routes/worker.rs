//! Worker trigger handler.

use super::{WorkerRunQuery, WorkerRunResponse};
use crate::api::AppState;
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};

/// GET|POST /worker/run - Process a batch of queued jobs
///
/// Authorization is checked by `require_worker_auth` before this runs.
#[utoipa::path(
    post,
    path = "/worker/run",
    tag = "worker",
    params(WorkerRunQuery),
    responses(
        (status = 200, description = "Run finished", body = WorkerRunResponse),
        (status = 401, description = "Missing or wrong worker secret"),
        (status = 503, description = "No worker secret configured"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn run_worker(
    State(state): State<AppState>,
    Query(query): Query<WorkerRunQuery>,
) -> Response {
    match state.pipeline.run_worker(query.limit).await {
        Ok(summary) => Json(WorkerRunResponse { ok: true, summary }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Worker run failed");
            e.into_response()
        }
    }
}
