//! Shared dependency bundle for the worker.

use std::sync::Arc;

use super::fetcher::BaseContentFetcher;
use super::jobs::{JobQueue, JobStore};
use super::traits::BaseChatModel;

/// Dependencies injected into the job runner.
///
/// Everything behind a trait object so tests can substitute in-memory or
/// scripted implementations.
#[derive(Clone)]
pub struct ServerDeps {
    pub chat_model: Arc<dyn BaseChatModel>,
    pub content_fetcher: Arc<dyn BaseContentFetcher>,
    pub job_queue: Arc<dyn JobQueue>,
    pub job_store: Arc<dyn JobStore>,
}

impl ServerDeps {
    pub fn new(
        chat_model: Arc<dyn BaseChatModel>,
        content_fetcher: Arc<dyn BaseContentFetcher>,
        job_queue: Arc<dyn JobQueue>,
        job_store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            chat_model,
            content_fetcher,
            job_queue,
            job_store,
        }
    }
}
