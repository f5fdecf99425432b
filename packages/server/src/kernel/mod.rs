//! Kernel-level infrastructure: LLM access, content fetching, and the job
//! subsystem. Business semantics live in [`analysis`]; everything else here
//! is plumbing.

mod ai;
pub mod analysis;
pub mod deps;
pub mod fetcher;
pub mod jobs;
pub mod traits;

pub use ai::OpenAIChatModel;
pub use analysis::{AnalysisEngine, AnalysisResult, PromptResult};
pub use deps::ServerDeps;
pub use fetcher::{BaseContentFetcher, HttpContentFetcher};
pub use traits::BaseChatModel;
