//! Core library for the domain SEO-ranking analysis service.
//!
//! The service accepts a domain for analysis over HTTP, queues it for
//! background processing, and lets clients poll for progress and results.
//! The `server` binary hosts the submission/polling API; the `worker` binary
//! consumes the job queue and runs the analysis pipeline.

pub mod common;
pub mod config;
pub mod kernel;
pub mod server;

pub use config::Config;
