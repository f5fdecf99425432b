// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "score a prompt") lives in the analysis engine and
// uses these traits.
//
// Naming convention: Base* for trait names (e.g., BaseChatModel)

use anyhow::Result;
use async_trait::async_trait;

use openai_client::Message;

// =============================================================================
// Chat Model Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseChatModel: Send + Sync {
    /// Run one chat completion and return the raw text response.
    async fn complete(&self, messages: Vec<Message>, max_tokens: u32) -> Result<String>;
}
