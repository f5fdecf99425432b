pub mod health;
pub mod jobs;

pub use health::health_handler;
pub use jobs::{missing_job_id, poll_job, submit_job};
