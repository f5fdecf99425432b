//! Application setup and router configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::jobs::{JobQueue, JobStore};
use crate::server::routes::{health_handler, missing_job_id, poll_job, submit_job};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Pool for health checks. Absent when the backends are not Postgres
    /// (tests run against in-memory backends).
    pub db_pool: Option<PgPool>,
    pub job_queue: Arc<dyn JobQueue>,
    pub job_store: Arc<dyn JobStore>,
    /// Whether an LLM credential is configured. Submissions are rejected
    /// up front when it is not, rather than enqueueing doomed jobs.
    pub llm_configured: bool,
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    // CORS configuration - allow any origin, the API is same-site in practice
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/jobs", post(submit_job).get(missing_job_id))
        .route("/jobs/:job_id", get(poll_job))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
