//! Prompt/analysis engine.
//!
//! Given the fetched site content, the engine issues one completion to
//! generate keyword phrases the domain should rank for, then scores a bounded
//! prefix of those phrases with one completion each. Scoring calls are
//! independent and issued concurrently; the fan-out is bounded by the top-N
//! slice itself.

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use openai_client::Message;

use super::traits::BaseChatModel;

/// Number of keyword phrases requested from the model.
pub const KEYWORD_PROMPT_COUNT: usize = 10;

/// How many of the generated phrases get scored.
pub const TOP_PROMPT_COUNT: usize = 5;

const KEYWORD_MAX_TOKENS: u32 = 256;
const SCORE_MAX_TOKENS: u32 = 200;

lazy_static! {
    /// Leading "<digits>. " list marker on a keyword line.
    static ref LIST_MARKER_RE: Regex = Regex::new(r"^\d+\.\s*").unwrap();

    /// Self-reported ranking score embedded in a scoring response.
    static ref SCORE_RE: Regex = Regex::new(r"(?i)Score:\s*(\d+)").unwrap();
}

/// One scored prompt: the model's answer plus its self-reported 0-10 score
/// for how well the target domain ranks in that answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptResult {
    pub prompt: String,
    pub response: String,
    pub score: u8,
}

/// Final analysis payload stored for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub domain: String,
    pub keyword_prompts: Vec<String>,
    pub top_prompts_results: Vec<PromptResult>,
}

/// Runs the LLM steps of the pipeline.
pub struct AnalysisEngine {
    chat_model: Arc<dyn BaseChatModel>,
}

impl AnalysisEngine {
    pub fn new(chat_model: Arc<dyn BaseChatModel>) -> Self {
        Self { chat_model }
    }

    /// Generate keyword phrases the domain should rank for, based on its
    /// fetched content.
    pub async fn generate_keyword_prompts(
        &self,
        domain: &str,
        web_content: &str,
    ) -> Result<Vec<String>> {
        let messages = vec![
            Message::system(format!(
                "You are an SEO expert. Generate {} keyword phrases (2-5 words each) \
                 that this website should rank for, based on its content.",
                KEYWORD_PROMPT_COUNT
            )),
            Message::user(format!("Website: {}\n\nContent: {}", domain, web_content)),
        ];

        let completion = self.chat_model.complete(messages, KEYWORD_MAX_TOKENS).await?;
        Ok(Self::parse_keyword_list(&completion))
    }

    /// Score the top generated prompts concurrently.
    ///
    /// Each call asks the model to answer the prompt and self-report a 0-10
    /// ranking score. A missing or malformed score degrades to 0 rather than
    /// failing the job; a failed LLM call propagates.
    pub async fn score_top_prompts(
        &self,
        domain: &str,
        prompts: &[String],
    ) -> Result<Vec<PromptResult>> {
        let futures = prompts
            .iter()
            .take(TOP_PROMPT_COUNT)
            .map(|prompt| self.score_prompt(domain, prompt.clone()));

        join_all(futures).await.into_iter().collect()
    }

    /// Run the full analysis: keyword generation, then scoring.
    pub async fn analyze(&self, domain: &str, web_content: &str) -> Result<AnalysisResult> {
        let keyword_prompts = self.generate_keyword_prompts(domain, web_content).await?;
        let top_prompts_results = self.score_top_prompts(domain, &keyword_prompts).await?;

        Ok(AnalysisResult {
            domain: domain.to_string(),
            keyword_prompts,
            top_prompts_results,
        })
    }

    async fn score_prompt(&self, domain: &str, prompt: String) -> Result<PromptResult> {
        let messages = vec![
            Message::system(format!(
                "You are an SEO expert assistant. Provide a response to the following \
                 prompt. Then, on a new line, write \"Score: X\" where X is how well \
                 the domain \"{}\" ranks in this response on a scale of 0 to 10.",
                domain
            )),
            Message::user(prompt.clone()),
        ];

        let completion = self.chat_model.complete(messages, SCORE_MAX_TOKENS).await?;
        let (response, score) = Self::parse_score(&completion);

        Ok(PromptResult {
            prompt,
            response,
            score,
        })
    }

    /// Parse a numbered-list completion into trimmed phrases, dropping empty
    /// lines.
    fn parse_keyword_list(completion: &str) -> Vec<String> {
        completion
            .lines()
            .map(|line| LIST_MARKER_RE.replace(line.trim(), "").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Extract the `Score: N` marker from a scoring response.
    ///
    /// Returns the response text with the marker stripped and the parsed
    /// score, defaulting to 0 when the marker is absent or unparseable.
    fn parse_score(completion: &str) -> (String, u8) {
        let score = SCORE_RE
            .captures(completion)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok())
            .unwrap_or(0);

        let response = SCORE_RE.replace(completion, "").trim().to_string();
        (response, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    struct FixedChatModel {
        response: String,
    }

    #[async_trait]
    impl BaseChatModel for FixedChatModel {
        async fn complete(&self, _messages: Vec<Message>, _max_tokens: u32) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    #[test]
    fn test_parse_keyword_list_strips_markers() {
        let completion = "1. best running shoes\n2. trail running gear\n\n3.  marathon training plan  \nplain phrase";
        let keywords = AnalysisEngine::parse_keyword_list(completion);

        assert_eq!(
            keywords,
            vec![
                "best running shoes",
                "trail running gear",
                "marathon training plan",
                "plain phrase",
            ]
        );
    }

    #[test]
    fn test_parse_keyword_list_drops_empty_lines() {
        let keywords = AnalysisEngine::parse_keyword_list("1. \n\n2. keyword\n   \n");
        assert_eq!(keywords, vec!["keyword"]);
    }

    #[test]
    fn test_parse_score_extracts_marker() {
        let (response, score) =
            AnalysisEngine::parse_score("Acme is a known widget vendor.\nScore: 7");
        assert_eq!(score, 7);
        assert_eq!(response, "Acme is a known widget vendor.");
    }

    #[test]
    fn test_parse_score_is_case_insensitive() {
        let (_, score) = AnalysisEngine::parse_score("Decent visibility.\nscore: 4");
        assert_eq!(score, 4);
    }

    #[test]
    fn test_parse_score_defaults_to_zero() {
        let (response, score) = AnalysisEngine::parse_score("No marker in this answer.");
        assert_eq!(score, 0);
        assert_eq!(response, "No marker in this answer.");
    }

    #[test]
    fn test_parse_score_unparseable_defaults_to_zero() {
        let (_, score) = AnalysisEngine::parse_score("Score: 999999999999999999999");
        assert_eq!(score, 0);
    }

    #[tokio::test]
    async fn test_fallback_scoring_yields_zero_and_response() {
        let engine = AnalysisEngine::new(Arc::new(FixedChatModel {
            response: "The domain appears frequently in results.".to_string(),
        }));

        let results = engine
            .score_top_prompts("example.com", &["best widgets".to_string()])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 0);
        assert!(!results[0].response.is_empty());
    }

    #[tokio::test]
    async fn test_score_top_prompts_bounded_to_top_n() {
        let engine = AnalysisEngine::new(Arc::new(FixedChatModel {
            response: "Fine.\nScore: 5".to_string(),
        }));

        let prompts: Vec<String> = (0..10).map(|i| format!("prompt {}", i)).collect();
        let results = engine.score_top_prompts("example.com", &prompts).await.unwrap();

        assert_eq!(results.len(), TOP_PROMPT_COUNT);
        assert!(results.iter().all(|r| r.score == 5));
    }
}
