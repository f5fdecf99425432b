//! In-memory job backend for tests.
//!
//! Implements both [`JobQueue`] and [`JobStore`] over one map, mirroring the
//! production design where a single row backs the queue entry and the polled
//! state. Supports short retention windows and leases so TTL and redelivery
//! behavior can be exercised without a database.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::job::{Job, JobStatus};
use super::queue::{EnqueueResult, JobQueue};
use super::store::JobStore;

/// Shared in-memory job table.
pub struct InMemoryJobs {
    jobs: Mutex<HashMap<Uuid, Job>>,
    result_ttl: chrono::Duration,
    lease: chrono::Duration,
    max_attempts: i32,
}

impl InMemoryJobs {
    pub fn new(result_ttl: Duration, max_attempts: i32, lease: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            result_ttl: chrono::Duration::from_std(result_ttl)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
            lease: chrono::Duration::from_std(lease)
                .unwrap_or_else(|_| chrono::Duration::minutes(5)),
            max_attempts,
        }
    }

    /// Defaults matching production: 1 hour retention, at-most-once delivery.
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(3600), 1, Duration::from_secs(300))
    }

    /// Snapshot a job regardless of expiry (test assertions).
    pub async fn raw(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.lock().await.get(&job_id).cloned()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobs {
    async fn enqueue(
        &self,
        domain: &str,
        idempotency_key: Option<String>,
    ) -> Result<EnqueueResult> {
        let mut jobs = self.jobs.lock().await;

        if let Some(key) = &idempotency_key {
            let existing = jobs.values().find(|job| {
                job.idempotency_key.as_deref() == Some(key.as_str())
                    && matches!(job.status, JobStatus::Pending | JobStatus::Running)
            });
            if let Some(job) = existing {
                return Ok(EnqueueResult::Duplicate(job.id));
            }
        }

        let job = Job::for_domain(domain, self.max_attempts, idempotency_key);
        let id = job.id;
        jobs.insert(id, job);

        Ok(EnqueueResult::Created(id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<Job>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;

        let mut candidates: Vec<Uuid> = jobs
            .values()
            .filter(|job| {
                let claimable = match job.status {
                    JobStatus::Pending => true,
                    JobStatus::Running => {
                        job.lease_expires_at.map(|t| t < now).unwrap_or(false)
                    }
                    _ => false,
                };
                claimable && job.attempt < job.max_attempts
            })
            .map(|job| job.id)
            .collect();
        candidates.sort_by_key(|id| jobs[id].created_at);
        candidates.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(candidates.len());
        for id in candidates {
            let job = jobs.get_mut(&id).ok_or_else(|| anyhow!("job vanished"))?;
            job.status = JobStatus::Running;
            job.worker_id = Some(worker_id.to_string());
            job.attempt += 1;
            job.lease_expires_at = Some(now + self.lease);
            // Fresh attempt: clear any partial writes from a crashed claim
            job.progress = 0;
            job.logs.clear();
            job.result = None;
            job.error_message = None;
            claimed.push(job.clone());
        }

        Ok(claimed)
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.status = JobStatus::Succeeded;
            job.worker_id = None;
            job.lease_expires_at = None;
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.status = JobStatus::Failed;
            if job.error_message.is_none() {
                job.error_message = Some(error.to_string());
            }
            job.worker_id = None;
            job.lease_expires_at = None;
            // Backstop the retention window if the store never wrote one
            job.completed_at.get_or_insert(now);
            if job.expires_at.is_none() {
                job.expires_at = Some(now + self.result_ttl);
            }
        }
        Ok(())
    }

    async fn heartbeat(&self, job_id: Uuid) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            if job.status == JobStatus::Running {
                job.lease_expires_at = Some(Utc::now() + self.lease);
            }
        }
        Ok(())
    }

    async fn reap_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        let mut reaped = 0;

        for job in jobs.values_mut() {
            let expired = job.status == JobStatus::Running
                && job.lease_expires_at.map(|t| t < now).unwrap_or(false)
                && job.attempt >= job.max_attempts;
            if expired {
                job.status = JobStatus::Failed;
                if job.error_message.is_none() {
                    job.error_message = Some("worker lease expired".to_string());
                }
                job.worker_id = None;
                job.lease_expires_at = None;
                job.completed_at = Some(now);
                job.expires_at = Some(now + self.result_ttl);
                reaped += 1;
            }
        }

        Ok(reaped)
    }

    async fn pending_count(&self) -> Result<i64> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .count() as i64)
    }
}

#[async_trait]
impl JobStore for InMemoryJobs {
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let now = Utc::now();
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .get(&job_id)
            .filter(|job| job.expires_at.map(|t| t > now).unwrap_or(true))
            .cloned())
    }

    async fn set_progress(&self, job_id: Uuid, progress: i32) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.progress = job.progress.max(progress);
        }
        Ok(())
    }

    async fn append_log(&self, job_id: Uuid, line: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.logs.push(line.to_string());
        }
        Ok(())
    }

    async fn write_result(&self, job_id: Uuid, result: serde_json::Value) -> Result<()> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.status = JobStatus::Succeeded;
            job.progress = 100;
            job.result = Some(result);
            job.error_message = None;
            job.completed_at = Some(now);
            job.expires_at = Some(now + self.result_ttl);
        }
        Ok(())
    }

    async fn write_error(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.status = JobStatus::Failed;
            job.error_message = Some(error.to_string());
            job.result = None;
            job.completed_at = Some(now);
            job.expires_at = Some(now + self.result_ttl);
        }
        Ok(())
    }
}
