//! The capability set every listing source provides.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CrawlResult, NormalizeResult};
use crate::types::{FetchOptions, Page, PageRequest, ScrapedListing};

/// A configured source of job listings for one employer.
///
/// Sources only know how to fetch a single page and how to normalize a
/// single record. Draining pagination and isolating failures is done once,
/// in [`crate::fetch_listings`].
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Employer this source produces listings for.
    fn employer(&self) -> &str;

    /// Request for the first page.
    fn first_request(&self) -> PageRequest;

    /// Fetch one page and report where the next one starts.
    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions)
        -> CrawlResult<Page>;

    /// Map one raw record to the canonical listing shape.
    fn normalize(&self, raw: &Value) -> NormalizeResult<ScrapedListing>;

    /// Short label for logs (e.g. "json_api", "html").
    fn kind(&self) -> &str;
}
