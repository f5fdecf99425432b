//! Poller-facing job state storage.
//!
//! The store is the read side for the polling API and the write side for the
//! worker's progress, log, and terminal-state updates. Terminal writes stamp
//! an expiry; an expired row reads as absent so stale jobs reclaim themselves
//! without manual cleanup.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::job::Job;

/// Trait for job state reads and writes.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Read a job's state. Returns `None` for unknown ids and for terminal
    /// rows past their retention window.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Advance progress. Never decreases: pollers must observe monotonically
    /// non-decreasing progress.
    async fn set_progress(&self, job_id: Uuid, progress: i32) -> Result<()>;

    /// Append one human-readable log line.
    async fn append_log(&self, job_id: Uuid, line: &str) -> Result<()>;

    /// Record a successful result and start the retention window.
    async fn write_result(&self, job_id: Uuid, result: serde_json::Value) -> Result<()>;

    /// Record a failure and start the retention window.
    async fn write_error(&self, job_id: Uuid, error: &str) -> Result<()>;
}

/// PostgreSQL-backed job store implementation.
pub struct PostgresJobStore {
    pool: PgPool,
    result_ttl: Duration,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool, result_ttl: Duration) -> Self {
        Self { pool, result_ttl }
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, domain, status, progress, logs, result, error_message,
                   attempt, max_attempts, worker_id, lease_expires_at,
                   idempotency_key, created_at, completed_at, expires_at
            FROM jobs
            WHERE id = $1
              AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn set_progress(&self, job_id: Uuid, progress: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET progress = GREATEST(progress, $2)
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(progress)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_log(&self, job_id: Uuid, line: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET logs = array_append(logs, $2)
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(line)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn write_result(&self, job_id: Uuid, result: serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'succeeded',
                progress = 100,
                result = $2,
                error_message = NULL,
                completed_at = NOW(),
                expires_at = NOW() + ($3 || ' seconds')::INTERVAL
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(result)
        .bind(self.result_ttl.as_secs().to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn write_error(&self, job_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_message = $2,
                result = NULL,
                completed_at = NOW(),
                expires_at = NOW() + ($3 || ' seconds')::INTERVAL
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error)
        .bind(self.result_ttl.as_secs().to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
