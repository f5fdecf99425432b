//! Job submission and polling endpoints.
//!
//! POST /jobs accepts a domain, validates it, and enqueues an analysis job.
//! GET /jobs/:job_id reports job state; the HTTP status encodes the phase:
//! 202 while in flight, 200 on completion, 500 on failure, 404 for unknown
//! or expired jobs.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::domain::is_valid_domain;
use crate::kernel::jobs::JobStatus;
use crate::server::app::AppState;

#[derive(Deserialize)]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub message: String,
    pub job_id: Uuid,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// POST /jobs - submit a domain for analysis.
pub async fn submit_job(
    Extension(state): Extension<AppState>,
    Json(payload): Json<SubmitJobRequest>,
) -> Response {
    let domain = payload
        .domain
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_lowercase();

    if domain.is_empty() || !is_valid_domain(&domain) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid or missing domain. Expected a bare domain like example.com",
        );
    }

    // Reject before enqueueing: jobs cannot succeed without an LLM credential
    if !state.llm_configured {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Analysis service is not configured",
        );
    }

    let result = match state.job_queue.enqueue(&domain, Some(domain.clone())).await {
        Ok(result) => result,
        Err(e) => {
            warn!(domain = %domain, error = %e, "failed to enqueue job");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to enqueue job");
        }
    };

    // Submissions for a domain with a live job return that job's id; the
    // message tells the caller which case they hit.
    let message = if result.is_created() {
        info!(job_id = %result.job_id(), domain = %domain, "accepted analysis job");
        "Analysis started"
    } else {
        "Analysis already in progress"
    };

    (
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            message: message.to_string(),
            job_id: result.job_id(),
        }),
    )
        .into_response()
}

/// GET /jobs/:job_id - poll job state.
pub async fn poll_job(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
) -> Response {
    let job = match state.job_store.get(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Job not found"),
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "failed to read job");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read job");
        }
    };

    match job.status {
        JobStatus::Pending | JobStatus::Running => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": job.status.api_status(),
                "progress": job.progress,
                "logs": job.logs,
            })),
        )
            .into_response(),
        JobStatus::Succeeded => (
            StatusCode::OK,
            Json(json!({
                "status": job.status.api_status(),
                "progress": job.progress,
                "logs": job.logs,
                "result": job.result,
            })),
        )
            .into_response(),
        JobStatus::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": job.status.api_status(),
                "error": job.error_message.unwrap_or_else(|| "Analysis failed".to_string()),
            })),
        )
            .into_response(),
    }
}

/// GET /jobs without an id is a client error, not a listing endpoint.
pub async fn missing_job_id() -> Response {
    error_response(StatusCode::BAD_REQUEST, "Missing jobId")
}
