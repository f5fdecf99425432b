//! OpenAI-backed implementation of the chat model trait.

use anyhow::Result;
use async_trait::async_trait;

use openai_client::{ChatRequest, Message, OpenAIClient};

use super::traits::BaseChatModel;

/// Chat model backed by the OpenAI chat completions API.
///
/// The analysis pipeline expects deterministic parsing, so requests are sent
/// with temperature 0. The underlying client enforces a 30 second request
/// timeout so a stalled completion fails the job instead of holding it.
pub struct OpenAIChatModel {
    client: OpenAIClient,
    model: String,
}

impl OpenAIChatModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: OpenAIClient::new(api_key),
            model: model.into(),
        }
    }

    /// Wrap an existing client (used to point at a stub server in tests).
    pub fn with_client(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl BaseChatModel for OpenAIChatModel {
    async fn complete(&self, messages: Vec<Message>, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.0),
            max_tokens: Some(max_tokens),
        };

        let response = self.client.chat_completion(request).await?;
        Ok(response.content)
    }
}
