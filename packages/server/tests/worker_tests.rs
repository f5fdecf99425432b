//! Queue hand-off and delivery-semantics tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use server_core::kernel::jobs::testing::InMemoryJobs;
use server_core::kernel::jobs::{JobQueue, JobStatus, JobStore};

use common::{HarnessConfig, TestHarness};

#[tokio::test]
async fn test_concurrent_claims_deliver_each_job_once() {
    let queue = Arc::new(InMemoryJobs::with_defaults());
    for i in 0..5 {
        queue.enqueue(&format!("site{}.example", i), None).await.unwrap();
    }

    let (a, b) = tokio::join!(queue.claim("worker-a", 10), queue.claim("worker-b", 10));
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.len() + b.len(), 5);

    let mut ids: Vec<_> = a.iter().chain(b.iter()).map(|job| job.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5, "a job was delivered to both workers");
}

#[tokio::test]
async fn test_resubmission_reuses_live_job() {
    // No worker, so the first job stays pending across both submissions
    let harness = TestHarness::spawn_with(HarnessConfig {
        run_worker: false,
        ..Default::default()
    })
    .await;

    let first = harness.submit(json!({ "domain": "example.com" })).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let first: serde_json::Value = first.json().await.unwrap();

    let second = harness.submit(json!({ "domain": "example.com" })).await;
    assert_eq!(second.status(), StatusCode::ACCEPTED);
    let second: serde_json::Value = second.json().await.unwrap();

    assert_eq!(first["jobId"], second["jobId"]);
    assert_eq!(harness.jobs.pending_count().await.unwrap(), 1);

    // The caller can tell the reused case apart from a fresh submission
    assert_eq!(first["message"], "Analysis started");
    assert_eq!(second["message"], "Analysis already in progress");
}

#[tokio::test]
async fn test_resubmission_after_completion_creates_new_job() {
    let harness = TestHarness::spawn().await;

    let first = harness.submit(json!({ "domain": "example.com" })).await;
    let first: serde_json::Value = first.json().await.unwrap();
    let first_id = first["jobId"].as_str().unwrap().parse().unwrap();

    let (status, _) = harness.poll_until_terminal(first_id).await;
    assert_eq!(status, StatusCode::OK);

    let second = harness.submit(json!({ "domain": "example.com" })).await;
    let second: serde_json::Value = second.json().await.unwrap();

    assert_ne!(first["jobId"], second["jobId"]);
}

#[tokio::test]
async fn test_lease_expiry_fails_job_out_of_attempts() {
    let jobs = Arc::new(InMemoryJobs::new(
        Duration::from_secs(3600),
        1,
        Duration::from_millis(5),
    ));

    let id = jobs.enqueue("example.com", None).await.unwrap().job_id();
    let claimed = jobs.claim("crashed-worker", 1).await.unwrap();
    assert_eq!(claimed.len(), 1);

    // Worker "crashes": no heartbeat, no ack
    tokio::time::sleep(Duration::from_millis(20)).await;
    let reaped = jobs.reap_expired().await.unwrap();
    assert_eq!(reaped, 1);

    let job = jobs.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.is_some());
}

#[tokio::test]
async fn test_heartbeat_keeps_lease_alive() {
    let jobs = Arc::new(InMemoryJobs::new(
        Duration::from_secs(3600),
        1,
        Duration::from_millis(50),
    ));

    let id = jobs.enqueue("example.com", None).await.unwrap().job_id();
    jobs.claim("worker-a", 1).await.unwrap();

    // Heartbeat faster than the lease; the job must stay claimed
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        jobs.heartbeat(id).await.unwrap();
        assert_eq!(jobs.reap_expired().await.unwrap(), 0);
        assert!(jobs.claim("worker-b", 1).await.unwrap().is_empty());
    }

    let job = jobs.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.worker_id.as_deref(), Some("worker-a"));
}

#[tokio::test]
async fn test_mark_failed_alone_still_expires() {
    // The store write can fail before the queue release; the failed row must
    // still pick up a retention window rather than answering 500 forever.
    let jobs = Arc::new(InMemoryJobs::new(
        Duration::from_millis(50),
        1,
        Duration::from_secs(300),
    ));

    let id = jobs.enqueue("example.com", None).await.unwrap().job_id();
    jobs.claim("worker-a", 1).await.unwrap();
    jobs.mark_failed(id, "pipeline failed").await.unwrap();

    let job = jobs.get(id).await.unwrap().expect("failed job still readable");
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.completed_at.is_some());
    assert!(job.expires_at.is_some());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(jobs.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_error_wins_over_queue_error() {
    let jobs = Arc::new(InMemoryJobs::with_defaults());

    let id = jobs.enqueue("example.com", None).await.unwrap().job_id();
    jobs.claim("worker-a", 1).await.unwrap();

    // The runner writes the store error first, then releases the queue entry
    jobs.write_error(id, "Error fetching content for example.com: timeout")
        .await
        .unwrap();
    jobs.mark_failed(id, "pipeline failed").await.unwrap();

    let job = jobs.get(id).await.unwrap().unwrap();
    assert_eq!(
        job.error_message.as_deref(),
        Some("Error fetching content for example.com: timeout")
    );
}
