// Main entry point for the analysis worker

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use server_core::kernel::jobs::{JobRunner, PostgresJobQueue, PostgresJobStore};
use server_core::kernel::{HttpContentFetcher, OpenAIChatModel, ServerDeps};
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting domain analysis worker");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // The worker cannot run without an LLM credential
    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY must be set for the worker")?;

    // Connect to database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let result_ttl = Duration::from_secs(config.job_result_ttl_secs);
    let job_queue = Arc::new(PostgresJobQueue::new(
        pool.clone(),
        config.job_max_attempts,
        result_ttl,
    ));
    let job_store = Arc::new(PostgresJobStore::new(pool, result_ttl));

    let chat_model = Arc::new(OpenAIChatModel::new(api_key, config.openai_model.clone()));
    let content_fetcher = Arc::new(HttpContentFetcher::new()?);

    let deps = Arc::new(ServerDeps::new(
        chat_model,
        content_fetcher,
        job_queue,
        job_store,
    ));

    JobRunner::new(deps).run_until_shutdown().await
}
