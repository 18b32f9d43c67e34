//! Remote page rendering for JavaScript-heavy career sites.
//!
//! Uses the Firecrawl scrape endpoint to get the fully rendered HTML of a
//! page, which then goes through the same selector extraction as a static
//! fetch.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CrawlError, CrawlResult, SourceResult};

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

/// Client for the rendering API. The API key is passed in by the caller.
#[derive(Clone)]
pub struct Renderer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    /// Milliseconds the renderer waits for scripts before capturing
    wait_for_ms: u64,
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'static str>,
    #[serde(rename = "waitFor")]
    wait_for: u64,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    #[serde(rename = "rawHtml")]
    raw_html: Option<String>,
}

impl Renderer {
    pub fn new(api_key: impl Into<String>) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: FIRECRAWL_API_URL.to_string(),
            wait_for_ms: 10_000,
        })
    }

    /// Point at a different API host (self-hosted instance).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_wait_for(mut self, ms: u64) -> Self {
        self.wait_for_ms = ms;
        self
    }

    /// Render `url` and return its HTML.
    pub async fn render(&self, url: &str) -> CrawlResult<String> {
        let endpoint = format!("{}/scrape", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&ScrapeRequest {
                url,
                formats: vec!["rawHtml"],
                wait_for: self.wait_for_ms,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrawlError::Render {
                url: url.to_string(),
                reason: format!("HTTP {} - {}", status, body),
            });
        }

        let parsed: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| CrawlError::Decode(e.to_string()))?;

        if !parsed.success {
            return Err(CrawlError::Render {
                url: url.to_string(),
                reason: parsed.error.unwrap_or_else(|| "unsuccessful scrape".to_string()),
            });
        }

        parsed
            .data
            .and_then(|d| d.raw_html)
            .ok_or_else(|| CrawlError::Render {
                url: url.to_string(),
                reason: "no rawHtml in response".to_string(),
            })
    }
}
