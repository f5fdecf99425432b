//! Job model for background domain analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

/// Stored job state. The API maps these to the client-facing vocabulary via
/// [`JobStatus::api_status`]; the status is explicit rather than derived from
/// which payload fields happen to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Client-facing status string.
    pub fn api_status(&self) -> &'static str {
        match self {
            JobStatus::Pending => "queued",
            JobStatus::Running => "processing",
            JobStatus::Succeeded => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

// ============================================================================
// Job Model
// ============================================================================

/// One analysis request. A single row serves as both the queue entry and the
/// state record read by pollers.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    /// Validated target domain.
    pub domain: String,

    // State
    #[builder(default)]
    pub status: JobStatus,
    #[builder(default = 0)]
    pub progress: i32,
    #[builder(default)]
    pub logs: Vec<String>,

    // Exactly one of these is set once the job is terminal
    #[builder(default, setter(strip_option))]
    pub result: Option<serde_json::Value>,
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,

    // Delivery accounting
    #[builder(default = 0)]
    pub attempt: i32,
    #[builder(default = 1)]
    pub max_attempts: i32,

    // Lease management
    #[builder(default, setter(strip_option))]
    pub worker_id: Option<String>,
    #[builder(default, setter(strip_option))]
    pub lease_expires_at: Option<DateTime<Utc>>,

    // Enqueue idempotency
    #[builder(default, setter(strip_option))]
    pub idempotency_key: Option<String>,

    // Timestamps
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default, setter(strip_option))]
    pub completed_at: Option<DateTime<Utc>>,
    /// Retention boundary; a terminal row past this instant reads as absent.
    #[builder(default, setter(strip_option))]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a fresh queued job for a domain.
    pub fn for_domain(
        domain: impl Into<String>,
        max_attempts: i32,
        idempotency_key: Option<String>,
    ) -> Self {
        let mut job = Self::builder()
            .domain(domain.into())
            .max_attempts(max_attempts)
            .build();
        job.idempotency_key = idempotency_key;
        job
    }
}
