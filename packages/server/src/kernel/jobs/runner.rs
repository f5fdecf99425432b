//! Job runner service for processing analysis jobs.
//!
//! The `JobRunner` is a long-running consumer that:
//! - Reaps jobs whose workers died with no delivery attempts left
//! - Claims a batch of ready jobs from the queue
//! - Runs the analysis pipeline per job, checkpointing progress and logs
//! - Writes the result or error to the store and releases the queue entry
//!
//! One failing job is recorded and isolated; it never exits the loop.
//!
//! # Example
//!
//! ```ignore
//! let runner = JobRunner::new(Arc::new(deps));
//!
//! // Spawn as background task
//! tokio::spawn(runner.run());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::job::Job;
use crate::kernel::analysis::AnalysisEngine;
use crate::kernel::ServerDeps;

/// Configuration for the job runner.
#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// Maximum number of jobs to claim at once
    pub batch_size: i64,
    /// How long to wait when no jobs are available
    pub poll_interval: Duration,
    /// How often to extend the lease while a job is running
    pub heartbeat_interval: Duration,
    /// Worker ID for this instance
    pub worker_id: String,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

impl JobRunnerConfig {
    /// Create a new config with a specific worker ID.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// Background service that processes analysis jobs from the queue.
pub struct JobRunner {
    deps: Arc<ServerDeps>,
    engine: AnalysisEngine,
    config: JobRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl JobRunner {
    /// Create a new job runner.
    pub fn new(deps: Arc<ServerDeps>) -> Self {
        Self::with_config(deps, JobRunnerConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(deps: Arc<ServerDeps>, config: JobRunnerConfig) -> Self {
        let engine = AnalysisEngine::new(deps.chat_model.clone());
        Self {
            deps,
            engine,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run the job runner until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "job runner starting"
        );

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            // Fail jobs from crashed workers that are out of attempts
            match self.deps.job_queue.reap_expired().await {
                Ok(0) => {}
                Ok(count) => warn!(count, "reaped jobs with expired leases"),
                Err(e) => error!(error = %e, "failed to reap expired jobs"),
            }

            // Claim jobs
            let jobs = match self
                .deps
                .job_queue
                .claim(&self.config.worker_id, self.config.batch_size)
                .await
            {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(error = %e, "failed to claim jobs");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            if jobs.is_empty() {
                tokio::time::sleep(self.config.poll_interval).await;
                continue;
            }

            debug!(count = jobs.len(), "claimed jobs");

            for job in jobs {
                if self.is_shutdown_requested() {
                    break;
                }
                self.process_job(job).await;
            }
        }

        info!(worker_id = %self.config.worker_id, "job runner stopped");
        Ok(())
    }

    /// Run until a shutdown signal is received.
    ///
    /// Convenience method that listens for Ctrl+C.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }

    /// Process one claimed job, recording the outcome in the store.
    async fn process_job(&self, job: Job) {
        let job_id = job.id;
        let domain = job.domain.clone();

        info!(job_id = %job_id, domain = %domain, attempt = job.attempt, "processing analysis job");

        let heartbeat = self.spawn_heartbeat(job_id);

        let outcome = self.run_pipeline(&job).await;

        heartbeat.abort();

        match outcome {
            Ok(result) => {
                let payload = match serde_json::to_value(&result) {
                    Ok(payload) => payload,
                    Err(e) => {
                        self.record_failure(job_id, &format!("failed to serialize result: {}", e))
                            .await;
                        return;
                    }
                };

                if let Err(e) = self.deps.job_store.write_result(job_id, payload).await {
                    error!(job_id = %job_id, error = %e, "failed to write job result");
                    self.record_failure(job_id, "failed to persist result").await;
                    return;
                }
                if let Err(e) = self.deps.job_queue.mark_succeeded(job_id).await {
                    error!(job_id = %job_id, error = %e, "failed to mark job as succeeded");
                }

                info!(job_id = %job_id, domain = %domain, "job succeeded");
            }
            Err(e) => {
                warn!(job_id = %job_id, domain = %domain, error = %e, "job failed");
                self.record_failure(job_id, &e.to_string()).await;
            }
        }
    }

    /// The per-job pipeline: fetch content, generate keywords, score the top
    /// prompts. Progress checkpoints after each step so pollers observe
    /// forward motion.
    async fn run_pipeline(&self, job: &Job) -> Result<crate::kernel::AnalysisResult> {
        let job_id = job.id;
        let domain = &job.domain;
        let store = &self.deps.job_store;

        store
            .append_log(job_id, &format!("Claimed by {}", self.config.worker_id))
            .await?;
        store.set_progress(job_id, 10).await?;

        let content = self.deps.content_fetcher.fetch(domain).await?;
        store
            .append_log(job_id, &format!("Fetched site content ({} chars)", content.len()))
            .await?;
        store.set_progress(job_id, 25).await?;

        let keyword_prompts = self.engine.generate_keyword_prompts(domain, &content).await?;
        store
            .append_log(
                job_id,
                &format!("Generated {} keyword prompts", keyword_prompts.len()),
            )
            .await?;
        store.set_progress(job_id, 50).await?;

        let top_prompts_results = self.engine.score_top_prompts(domain, &keyword_prompts).await?;
        store
            .append_log(
                job_id,
                &format!("Scored top {} prompts", top_prompts_results.len()),
            )
            .await?;
        store.set_progress(job_id, 90).await?;

        Ok(crate::kernel::AnalysisResult {
            domain: domain.clone(),
            keyword_prompts,
            top_prompts_results,
        })
    }

    /// Record a terminal failure in both store and queue. The error message
    /// is what pollers see; no stack traces.
    async fn record_failure(&self, job_id: Uuid, message: &str) {
        if let Err(e) = self.deps.job_store.write_error(job_id, message).await {
            error!(job_id = %job_id, error = %e, "failed to write job error");
        }
        if let Err(e) = self.deps.job_queue.mark_failed(job_id, message).await {
            error!(job_id = %job_id, error = %e, "failed to mark job as failed");
        }
    }

    /// Extend the claim lease periodically while a job runs.
    fn spawn_heartbeat(&self, job_id: Uuid) -> tokio::task::JoinHandle<()> {
        let queue = self.deps.job_queue.clone();
        let interval = self.config.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // Skip first immediate tick

            loop {
                ticker.tick().await;
                if let Err(e) = queue.heartbeat(job_id).await {
                    warn!(job_id = %job_id, error = %e, "heartbeat failed");
                }
            }
        })
    }
}
