//! Canonical listing shape and the page/fetch types shared by all sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A job listing as produced by a source, before it is persisted.
///
/// Store-owned fields (surrogate id, first/last seen, active flag) are
/// absent; the reconciliation store assigns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedListing {
    pub employer: String,
    pub external_id: String,
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub degree_requirement: Option<String>,
    pub experience_level: Option<String>,
    pub description: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub source_url: Option<String>,
}

impl ScrapedListing {
    /// Create a listing with only its natural key set.
    pub fn new(employer: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            employer: employer.into(),
            external_id: external_id.into(),
            title: None,
            department: None,
            location: None,
            degree_requirement: None,
            experience_level: None,
            description: None,
            posted_at: None,
            source_url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = Some(posted_at);
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

/// Position within a source's pagination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageRequest {
    /// Offset/limit pagination
    Offset { offset: u64, limit: u64 },
    /// Cursor pagination; `None` requests the first page
    Cursor(Option<String>),
    /// Page-number pagination
    Number(u32),
    /// Source has exactly one page
    Single,
}

/// One fetched page: raw records plus the request for the next page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<serde_json::Value>,
    /// `None` when the source reports no more items
    pub next: Option<PageRequest>,
}

impl Page {
    pub fn new(records: Vec<serde_json::Value>, next: Option<PageRequest>) -> Self {
        Self { records, next }
    }

    /// A final page (no successor).
    pub fn last(records: Vec<serde_json::Value>) -> Self {
        Self::new(records, None)
    }
}

/// Caller-supplied knobs for a fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Upper bound on pages fetched; `None` uses [`DEFAULT_MAX_PAGES`]
    pub max_pages: Option<usize>,
    /// Extra query parameters appended to every request
    pub query: BTreeMap<String, String>,
}

/// Fallback page cap so a misbehaving source cannot paginate forever.
pub const DEFAULT_MAX_PAGES: usize = 500;

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn page_limit(&self) -> usize {
        self.max_pages.unwrap_or(DEFAULT_MAX_PAGES)
    }
}

/// Everything a drained fetch produced.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub listings: Vec<ScrapedListing>,
    pub pages_fetched: usize,
    /// Raw records dropped because they failed normalization
    pub skipped_records: usize,
    /// Set when pagination stopped because of a page error
    pub halted_early: Option<String>,
}

impl FetchOutcome {
    /// True when every page the source offered was fetched.
    pub fn is_complete(&self) -> bool {
        self.halted_early.is_none()
    }

    /// External ids observed in this fetch, in fetch order.
    pub fn external_ids(&self) -> Vec<String> {
        self.listings.iter().map(|l| l.external_id.clone()).collect()
    }
}
