//! Shared test harness.
//!
//! Spins up the HTTP app on an ephemeral port against in-memory job backends
//! and a scripted chat model, with the job runner spawned in-process on a
//! short poll interval. No database or network access required.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use openai_client::Message;
use server_core::kernel::jobs::testing::InMemoryJobs;
use server_core::kernel::jobs::{JobRunner, JobRunnerConfig};
use server_core::kernel::{BaseChatModel, ServerDeps};
use server_core::kernel::fetcher::BaseContentFetcher;
use server_core::server::{build_app, AppState};

/// Chat model scripted for the two pipeline prompts: keyword generation gets
/// a numbered list, scoring gets an answer with a score marker.
pub struct ScriptedChatModel {
    pub delay: Duration,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl BaseChatModel for ScriptedChatModel {
    async fn complete(&self, messages: Vec<Message>, _max_tokens: u32) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let system = messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if system.contains("keyword phrases") {
            Ok((1..=10)
                .map(|i| format!("{}. widget keyword {}", i, i))
                .collect::<Vec<_>>()
                .join("\n"))
        } else {
            Ok("The domain shows up prominently in results.\nScore: 8".to_string())
        }
    }
}

/// Content fetcher returning canned text, or failing like the real one.
pub struct ScriptedFetcher {
    pub failure: Option<String>,
}

impl ScriptedFetcher {
    pub fn ok() -> Self {
        Self { failure: None }
    }

    pub fn failing(cause: impl Into<String>) -> Self {
        Self {
            failure: Some(cause.into()),
        }
    }
}

#[async_trait]
impl BaseContentFetcher for ScriptedFetcher {
    async fn fetch(&self, domain: &str) -> Result<String> {
        match &self.failure {
            Some(cause) => bail!("Error fetching content for {}: {}", domain, cause),
            None => Ok(format!("Welcome to {}. We sell quality widgets.", domain)),
        }
    }
}

pub struct HarnessConfig {
    pub llm_configured: bool,
    pub fetch_failure: Option<String>,
    pub chat_delay: Duration,
    pub result_ttl: Duration,
    pub run_worker: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            llm_configured: true,
            fetch_failure: None,
            chat_delay: Duration::ZERO,
            result_ttl: Duration::from_secs(3600),
            run_worker: true,
        }
    }
}

pub struct TestHarness {
    pub base_url: String,
    pub client: reqwest::Client,
    pub jobs: Arc<InMemoryJobs>,
}

impl TestHarness {
    pub async fn spawn() -> Self {
        Self::spawn_with(HarnessConfig::default()).await
    }

    pub async fn spawn_with(config: HarnessConfig) -> Self {
        let jobs = Arc::new(InMemoryJobs::new(
            config.result_ttl,
            1,
            Duration::from_secs(300),
        ));

        let chat_model = Arc::new(ScriptedChatModel::with_delay(config.chat_delay));
        let fetcher: Arc<dyn BaseContentFetcher> = match config.fetch_failure {
            Some(cause) => Arc::new(ScriptedFetcher::failing(cause)),
            None => Arc::new(ScriptedFetcher::ok()),
        };

        if config.run_worker {
            let deps = Arc::new(ServerDeps::new(
                chat_model,
                fetcher,
                jobs.clone(),
                jobs.clone(),
            ));
            let runner_config = JobRunnerConfig {
                poll_interval: Duration::from_millis(10),
                ..JobRunnerConfig::with_worker_id("test-worker")
            };
            tokio::spawn(JobRunner::with_config(deps, runner_config).run());
        }

        let app = build_app(AppState {
            db_pool: None,
            job_queue: jobs.clone(),
            job_store: jobs.clone(),
            llm_configured: config.llm_configured,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            jobs,
        }
    }

    pub async fn submit(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/jobs", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("submit request")
    }

    pub async fn poll(&self, job_id: Uuid) -> reqwest::Response {
        self.client
            .get(format!("{}/jobs/{}", self.base_url, job_id))
            .send()
            .await
            .expect("poll request")
    }

    /// Poll until the job reaches a terminal HTTP status (200, 404, or 500).
    pub async fn poll_until_terminal(&self, job_id: Uuid) -> (reqwest::StatusCode, Value) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);

        loop {
            let response = self.poll(job_id).await;
            let status = response.status();
            if status != reqwest::StatusCode::ACCEPTED {
                let body = response.json().await.expect("response body");
                return (status, body);
            }
            if tokio::time::Instant::now() > deadline {
                panic!("job {} did not reach a terminal state in time", job_id);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
