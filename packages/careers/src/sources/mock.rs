//! Mock source for testing.
//!
//! Serves canned pages in order and records every request it receives.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::error::{CrawlError, CrawlResult, NormalizeResult};
use crate::normalize::FieldMap;
use crate::traits::PageSource;
use crate::types::{FetchOptions, Page, PageRequest, ScrapedListing};

/// One canned page.
#[derive(Debug, Clone)]
pub enum MockPage {
    Records(Vec<Value>),
    /// Fetching this page fails with the given message
    Failure(String),
}

impl MockPage {
    pub fn records(records: Vec<Value>) -> Self {
        MockPage::Records(records)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        MockPage::Failure(message.into())
    }
}

/// Mock source for testing.
///
/// Pages are addressed by number; the default field map reads `/id`,
/// `/title`, `/department`, `/location`, `/description`, `/posted_at`
/// and `/url`.
///
/// # Example
///
/// ```rust
/// use careers::sources::mock::{MockPage, MockSource};
/// use serde_json::json;
///
/// let source = MockSource::new("Acme")
///     .with_page(MockPage::records(vec![json!({"id": "1", "title": "Engineer"})]));
/// ```
#[derive(Clone)]
pub struct MockSource {
    employer: String,
    pages: Arc<RwLock<Vec<MockPage>>>,
    field_map: FieldMap,
    fetch_calls: Arc<RwLock<Vec<PageRequest>>>,
}

impl MockSource {
    pub fn new(employer: impl Into<String>) -> Self {
        Self {
            employer: employer.into(),
            pages: Arc::new(RwLock::new(Vec::new())),
            field_map: Self::default_field_map(),
            fetch_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn default_field_map() -> FieldMap {
        FieldMap::default()
            .with_id("/id")
            .with_title("/title")
            .with_department("/department")
            .with_location("/location")
            .with_description("/description")
            .with_posted_at("/posted_at", crate::normalize::DateFormat::Auto)
            .with_source_url("/url")
    }

    /// Append a page (builder pattern).
    pub fn with_page(self, page: MockPage) -> Self {
        self.push_page(page);
        self
    }

    /// Replace the field map used by `normalize`.
    pub fn with_field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    /// Append a page to an existing mock.
    pub fn push_page(&self, page: MockPage) {
        self.pages.write().unwrap().push(page);
    }

    /// Replace all pages, e.g. to simulate the next scrape run.
    pub fn set_pages(&self, pages: Vec<MockPage>) {
        *self.pages.write().unwrap() = pages;
    }

    /// Number of `fetch_page` calls so far.
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.read().unwrap().len()
    }

    /// Requests received so far.
    pub fn fetch_calls(&self) -> Vec<PageRequest> {
        self.fetch_calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for MockSource {
    fn employer(&self) -> &str {
        &self.employer
    }

    fn first_request(&self) -> PageRequest {
        PageRequest::Number(0)
    }

    async fn fetch_page(
        &self,
        request: &PageRequest,
        _options: &FetchOptions,
    ) -> CrawlResult<Page> {
        self.fetch_calls.write().unwrap().push(request.clone());

        let index = match request {
            PageRequest::Number(n) => *n as usize,
            _ => 0,
        };
        let pages = self.pages.read().unwrap();
        let next = (index + 1 < pages.len()).then(|| PageRequest::Number(index as u32 + 1));

        match pages.get(index) {
            Some(MockPage::Records(records)) => Ok(Page::new(records.clone(), next)),
            Some(MockPage::Failure(message)) => Err(CrawlError::Http(message.clone().into())),
            None => Ok(Page::last(Vec::new())),
        }
    }

    fn normalize(&self, raw: &Value) -> NormalizeResult<ScrapedListing> {
        self.field_map.normalize(&self.employer, raw)
    }

    fn kind(&self) -> &str {
        "mock"
    }
}
