//! PostgreSQL-backed job queue implementation.
//!
//! Stores and hands off analysis jobs. Claims use `FOR UPDATE SKIP LOCKED`
//! so concurrent workers never double-claim, and a per-claim lease makes
//! jobs from crashed workers reclaimable while delivery attempts remain.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::job::Job;

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone)]
pub enum EnqueueResult {
    /// Job was enqueued, returns new job ID
    Created(Uuid),
    /// A live job already exists for the idempotency key, returns its ID
    Duplicate(Uuid),
}

impl EnqueueResult {
    /// Get the job ID regardless of whether it was created or duplicate
    pub fn job_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    /// Returns true if this was a newly created job
    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// Trait for job queue operations.
///
/// FIFO hand-off between the submission API and workers. No priorities or
/// scheduling; ordering is by creation time.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a domain for analysis.
    ///
    /// If an idempotency key is given and a pending/running job already
    /// carries it, returns `EnqueueResult::Duplicate` with the existing job
    /// ID instead of creating duplicate work.
    async fn enqueue(&self, domain: &str, idempotency_key: Option<String>)
        -> Result<EnqueueResult>;

    /// Claim up to `limit` jobs for processing.
    ///
    /// Takes pending jobs plus running jobs whose lease has expired (crash
    /// redelivery), as long as delivery attempts remain. A claim resets
    /// progress, logs, and any partial result from a crashed attempt so
    /// pollers never observe stale partial writes.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<Job>>;

    /// Release a job that completed successfully.
    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()>;

    /// Release a job that failed. Keeps the error message and retention
    /// window the store already wrote, stamping them otherwise so a failed
    /// row always expires.
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Extend the lease for a running job.
    async fn heartbeat(&self, job_id: Uuid) -> Result<()>;

    /// Fail running jobs whose lease expired with no delivery attempts left.
    /// Returns the number of jobs reaped.
    async fn reap_expired(&self) -> Result<u64>;

    /// Number of jobs waiting to be claimed.
    async fn pending_count(&self) -> Result<i64>;
}

/// PostgreSQL-backed job queue implementation.
pub struct PostgresJobQueue {
    pool: PgPool,
    max_attempts: i32,
    lease_ms: i64,
    result_ttl: Duration,
}

impl PostgresJobQueue {
    /// Default claim lease. Long enough to cover the bounded pipeline
    /// (5s fetch + 30s per LLM step) with headroom.
    const DEFAULT_LEASE_MS: i64 = 300_000;

    pub fn new(pool: PgPool, max_attempts: i32, result_ttl: Duration) -> Self {
        Self {
            pool,
            max_attempts,
            lease_ms: Self::DEFAULT_LEASE_MS,
            result_ttl,
        }
    }

    /// Override the claim lease duration.
    pub fn with_lease_duration(mut self, lease_ms: i64) -> Self {
        self.lease_ms = lease_ms;
        self
    }

    /// Check if a live job with the given idempotency key already exists.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Uuid>> {
        let id: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM jobs
            WHERE idempotency_key = $1
              AND status IN ('pending', 'running')
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id.map(|(id,)| id))
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue(
        &self,
        domain: &str,
        idempotency_key: Option<String>,
    ) -> Result<EnqueueResult> {
        // Check idempotency first
        if let Some(key) = &idempotency_key {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                return Ok(EnqueueResult::Duplicate(existing));
            }
        }

        let job = Job::for_domain(domain, self.max_attempts, idempotency_key);

        sqlx::query(
            r#"
            INSERT INTO jobs (id, domain, status, progress, logs, result, error_message,
                              attempt, max_attempts, worker_id, lease_expires_at,
                              idempotency_key, created_at, completed_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(job.id)
        .bind(&job.domain)
        .bind(job.status)
        .bind(job.progress)
        .bind(&job.logs)
        .bind(&job.result)
        .bind(&job.error_message)
        .bind(job.attempt)
        .bind(job.max_attempts)
        .bind(&job.worker_id)
        .bind(job.lease_expires_at)
        .bind(&job.idempotency_key)
        .bind(job.created_at)
        .bind(job.completed_at)
        .bind(job.expires_at)
        .execute(&self.pool)
        .await?;

        info!(job_id = %job.id, domain = %domain, "enqueued analysis job");

        Ok(EnqueueResult::Created(job.id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = 'running',
                worker_id = $1,
                attempt = attempt + 1,
                lease_expires_at = NOW() + ($2 || ' milliseconds')::INTERVAL,
                progress = 0,
                logs = '{}',
                result = NULL,
                error_message = NULL
            WHERE id IN (
                SELECT id
                FROM jobs
                WHERE (status = 'pending'
                       OR (status = 'running' AND lease_expires_at < NOW()))
                  AND attempt < max_attempts
                ORDER BY created_at
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, domain, status, progress, logs, result, error_message,
                      attempt, max_attempts, worker_id, lease_expires_at,
                      idempotency_key, created_at, completed_at, expires_at
            "#,
        )
        .bind(worker_id)
        .bind(self.lease_ms.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'succeeded',
                worker_id = NULL,
                lease_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<()> {
        // The store normally writes the error and retention window first;
        // the COALESCEs keep those writes and backstop them when the store
        // write did not happen, so a failed row always expires.
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_message = COALESCE(error_message, $2),
                worker_id = NULL,
                lease_expires_at = NULL,
                completed_at = COALESCE(completed_at, NOW()),
                expires_at = COALESCE(expires_at, NOW() + ($3 || ' seconds')::INTERVAL)
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

    async fn heartbeat(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET lease_expires_at = NOW() + ($1 || ' milliseconds')::INTERVAL
            WHERE id = $2 AND status = 'running'
            "#,
        )
        .bind(self.lease_ms.to_string())
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reap_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_message = COALESCE(error_message, 'worker lease expired'),
                worker_id = NULL,
                lease_expires_at = NULL,
                completed_at = NOW(),
                expires_at = NOW() + ($1 || ' seconds')::INTERVAL
            WHERE status = 'running'
              AND lease_expires_at < NOW()
              AND attempt >= max_attempts
            "#,
        )
        .bind(self.result_ttl.as_secs().to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn pending_count(&self) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
