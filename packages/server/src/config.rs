use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// LLM credential. Optional so the API server can start without it and
    /// fail submissions fast; the worker refuses to start without it.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// Retention window for terminal job records, in seconds.
    pub job_result_ttl_secs: u64,
    /// Delivery attempts per job. 1 means at-most-once.
    pub job_max_attempts: i32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            job_result_ttl_secs: env::var("JOB_RESULT_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("JOB_RESULT_TTL_SECS must be a valid number")?,
            job_max_attempts: env::var("JOB_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("JOB_MAX_ATTEMPTS must be a valid number")?,
        })
    }
}
