use careers::ScrapedListing;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Listing - a job posting tracked across scrape runs
///
/// Keyed by (employer, external_id). Temporal tracking:
/// - `first_seen_at` is set on insert and never changes
/// - `last_seen_at` moves forward every time a run observes the listing
/// - `is_active` drops to false when a complete run no longer sees it
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Listing {
    pub id: i64,
    pub employer: String,
    pub external_id: String,
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub degree_requirement: Option<String>,
    pub experience_level: Option<String>,
    pub description: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub source_url: Option<String>,
    pub is_active: bool,
    pub content_hash: String,
}

/// What one `upsert_batch` call did, by external id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub new_ids: Vec<String>,
    pub updated_ids: Vec<String>,
    /// Subset of `updated_ids` whose content differs from the stored copy
    pub changed_ids: Vec<String>,
}

/// Filters for [`super::ListingStore::query`].
#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    pub employer: Option<String>,
    pub is_active: Option<bool>,
    /// Only listings first seen within this many days of `as_of`
    pub first_seen_within_days: Option<i64>,
    /// Reference time for the window; defaults to now
    pub as_of: Option<DateTime<Utc>>,
    /// Newest `posted_at` first (listings without a date last)
    pub order_by_posted_desc: bool,
    pub limit: Option<i64>,
}

impl ListingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn employer(mut self, employer: impl Into<String>) -> Self {
        self.employer = Some(employer.into());
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn first_seen_within_days(mut self, days: i64) -> Self {
        self.first_seen_within_days = Some(days);
        self
    }

    pub fn as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn newest_posted_first(mut self) -> Self {
        self.order_by_posted_desc = true;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Lower bound on `first_seen_at` implied by the window.
    ///
    /// A negative window, or one reaching past the earliest representable
    /// time, has no lower bound.
    pub fn first_seen_since(&self) -> Option<DateTime<Utc>> {
        let days = self.first_seen_within_days.filter(|days| *days >= 0)?;
        let as_of = self.as_of.unwrap_or_else(Utc::now);
        Duration::try_days(days).and_then(|window| as_of.checked_sub_signed(window))
    }
}

/// Aggregate numbers over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_count: i64,
    pub active_count: i64,
    pub per_employer_counts: BTreeMap<String, i64>,
    pub most_recent_posted_at: Option<DateTime<Utc>>,
}

/// SHA-256 over the mutable fields of a scraped listing.
///
/// Used to tell a listing that was merely seen again from one whose
/// content changed.
pub fn content_hash(listing: &ScrapedListing) -> String {
    let posted_at = listing.posted_at.map(|d| d.to_rfc3339()).unwrap_or_default();
    let fields = [
        listing.title.as_deref().unwrap_or_default(),
        listing.department.as_deref().unwrap_or_default(),
        listing.location.as_deref().unwrap_or_default(),
        listing.degree_requirement.as_deref().unwrap_or_default(),
        listing.experience_level.as_deref().unwrap_or_default(),
        listing.description.as_deref().unwrap_or_default(),
        posted_at.as_str(),
        listing.source_url.as_deref().unwrap_or_default(),
    ];

    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}
