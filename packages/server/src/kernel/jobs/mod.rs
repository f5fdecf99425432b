//! Job infrastructure for background domain analysis.
//!
//! This module provides the kernel-level job subsystem:
//! - [`PostgresJobQueue`] - Database-backed work queue (claim/ack/redeliver)
//! - [`PostgresJobStore`] - Poller-facing job state (progress, logs, result)
//! - [`JobRunner`] - Long-running consumer that executes the analysis pipeline
//! - [`Job`] - Job row model shared by queue and store
//!
//! # Architecture
//!
//! ```text
//! POST /jobs
//!     └─► JobQueue.enqueue({jobId, domain})     [202 + jobId to caller]
//!
//! JobRunner (separate process)
//!     ├─► JobQueue.claim (FOR UPDATE SKIP LOCKED, lease)
//!     ├─► fetch content → generate keywords → score prompts
//!     ├─► JobStore.set_progress / append_log per step
//!     └─► JobStore.write_result | write_error, then mark succeeded/failed
//!
//! GET /jobs/{id}
//!     └─► JobStore.get                          [202 | 200 | 500 | 404]
//! ```
//!
//! A single `jobs` row backs both the queue entry and the polled state, so a
//! claim and its progress updates can never disagree about which job they
//! describe. Crash recovery goes through lease expiry: an unacked running
//! job becomes reclaimable while delivery attempts remain, and a reclaim
//! clears any partial writes before re-running.

mod job;
mod queue;
mod runner;
mod store;
pub mod testing;

pub use job::{Job, JobStatus};
pub use queue::{EnqueueResult, JobQueue, PostgresJobQueue};
pub use runner::{JobRunner, JobRunnerConfig};
pub use store::{JobStore, PostgresJobStore};
