//! Content fetcher - retrieves and flattens a target site's root page.
//!
//! The worker prompts the LLM with a plain-text excerpt of the site, so the
//! fetcher strips markup and truncates to a fixed character budget to bound
//! prompt cost.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

/// Timeout for the root page fetch. A site that cannot answer within this
/// window fails the job rather than stalling the worker.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Character budget for the flattened page text.
const MAX_CONTENT_CHARS: usize = 6000;

/// Retrieves site content for prompting.
#[async_trait]
pub trait BaseContentFetcher: Send + Sync {
    /// Fetch the domain's root page over HTTPS and return plain text,
    /// truncated to the content budget.
    ///
    /// Any failure (timeout, DNS, non-2xx) returns an error carrying the
    /// message `Error fetching content for {domain}: {cause}`.
    async fn fetch(&self, domain: &str) -> Result<String>;
}

/// HTTP implementation of [`BaseContentFetcher`] using reqwest + scraper.
pub struct HttpContentFetcher {
    client: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new() -> Result<Self> {
        // Browser-like User-Agent to avoid trivial bot blocks
        let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {}", status);
        }

        Ok(response.text().await?)
    }

    /// Strip markup to plain text, dropping script/style content.
    fn strip_markup(html: &str) -> String {
        let document = Html::parse_document(html);

        let mut cleaned = html.to_string();
        for selector_str in ["script", "style", "noscript"] {
            if let Ok(selector) = Selector::parse(selector_str) {
                for element in document.select(&selector) {
                    cleaned = cleaned.replace(&element.html(), "");
                }
            }
        }

        let document = Html::parse_document(&cleaned);
        let text: String = document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");

        // Collapse runs of whitespace left behind by removed tags
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Truncate to the character budget on a char boundary.
    fn truncate_content(text: &str, max_chars: usize) -> String {
        text.chars().take(max_chars).collect()
    }
}

#[async_trait]
impl BaseContentFetcher for HttpContentFetcher {
    async fn fetch(&self, domain: &str) -> Result<String> {
        let url = format!("https://{}", domain);
        debug!(url = %url, "fetching site content");

        match self.fetch_body(&url).await {
            Ok(body) => {
                let text = Self::strip_markup(&body);
                Ok(Self::truncate_content(&text, MAX_CONTENT_CHARS))
            }
            Err(e) => bail!("Error fetching content for {}: {}", domain, e),
        }
    }
}
