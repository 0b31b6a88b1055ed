//! Script API Handlers
//!
//! HTTP endpoints for submitting, inspecting and cancelling script jobs.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use scriptor_core::domain::job::ScriptJob;
use scriptor_core::dto::job::{
    CleanupRequest, CleanupResponse, ListJobsQuery, StopResponse, SubmitQuery,
};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::JobService;

/// POST /api/scripts/execute?blocking=<bool>
///
/// The body is the raw script text. Returns the new job id, or the job
/// snapshot when `blocking` is set.
pub async fn execute_script(
    State(service): State<JobService>,
    Query(query): Query<SubmitQuery>,
    script: String,
) -> Response {
    if query.blocking {
        tracing::debug!("Blocking submission of {} byte script", script.len());
        Json(service.submit_blocking(script).await).into_response()
    } else {
        Json(service.submit(script)).into_response()
    }
}

/// GET /api/scripts?status=<s1,s2>&orderBy=<asc|desc>
pub async fn list_scripts(
    State(service): State<JobService>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<ScriptJob>>> {
    let statuses = query.statuses()?;
    let order = query.order()?.unwrap_or_default();

    tracing::debug!("Listing jobs (status: {:?}, order: {})", statuses, order);

    Ok(Json(service.list(statuses.as_deref(), order)))
}

/// GET /api/scripts/{id}
pub async fn get_script(
    State(service): State<JobService>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ScriptJob>> {
    Ok(Json(service.get(id)?))
}

/// POST /api/scripts/{id}/stop
pub async fn stop_script(
    State(service): State<JobService>,
    Path(id): Path<Uuid>,
) -> Json<StopResponse> {
    Json(StopResponse {
        stopped: service.stop(id),
    })
}

/// DELETE /api/scripts/cleanup
pub async fn cleanup_scripts(
    State(service): State<JobService>,
    Json(req): Json<CleanupRequest>,
) -> Json<CleanupResponse> {
    Json(CleanupResponse {
        removed: service.cleanup(&req.ids),
    })
}
