//! Draining a source's pagination into a finite batch of listings.

use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::traits::PageSource;
use crate::types::{FetchOptions, FetchOutcome};

/// Fetch every page a source offers and normalize the records.
///
/// Never fails: a page error stops pagination and the listings collected
/// so far are returned with [`FetchOutcome::halted_early`] set. Records
/// that fail normalization are skipped and counted.
pub async fn fetch_listings(source: &dyn PageSource, options: &FetchOptions) -> FetchOutcome {
    let employer = source.employer();
    let page_limit = options.page_limit();
    info!(employer = %employer, kind = source.kind(), "Starting listing fetch");

    let mut outcome = FetchOutcome::default();
    let mut requested = HashSet::new();
    let mut next = Some(source.first_request());
    let mut previous_ids: Vec<String> = Vec::new();

    while let Some(request) = next.take() {
        if outcome.pages_fetched >= page_limit {
            warn!(employer = %employer, page_limit, "Page limit reached, stopping pagination");
            outcome.halted_early = Some(format!("page limit {} reached", page_limit));
            break;
        }
        if !requested.insert(request.clone()) {
            warn!(employer = %employer, request = ?request, "Source repeated a page request, stopping");
            break;
        }

        debug!(employer = %employer, request = ?request, "Fetching page");
        let page = match source.fetch_page(&request, options).await {
            Ok(page) => page,
            Err(e) => {
                error!(employer = %employer, request = ?request, error = %e, "Page fetch failed, stopping pagination");
                outcome.halted_early = Some(e.to_string());
                break;
            }
        };
        outcome.pages_fetched += 1;

        if page.records.is_empty() {
            debug!(employer = %employer, "Empty page, pagination complete");
            break;
        }

        let mut listings = Vec::with_capacity(page.records.len());
        let mut skipped = 0;
        for raw in &page.records {
            match source.normalize(raw) {
                Ok(listing) => listings.push(listing),
                Err(e) => {
                    warn!(employer = %employer, error = %e, "Skipping malformed record");
                    skipped += 1;
                }
            }
        }

        // Out-of-range page numbers often serve the last page again
        let ids: Vec<String> = listings.iter().map(|l| l.external_id.clone()).collect();
        if !ids.is_empty() && ids == previous_ids {
            debug!(employer = %employer, request = ?request, "Page repeats the previous one, pagination complete");
            break;
        }

        outcome.listings.extend(listings);
        outcome.skipped_records += skipped;
        previous_ids = ids;
        next = page.next;
    }

    info!(
        employer = %employer,
        listings = outcome.listings.len(),
        pages = outcome.pages_fetched,
        skipped = outcome.skipped_records,
        complete = outcome.is_complete(),
        "Listing fetch finished"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::{MockPage, MockSource};
    use serde_json::json;

    #[tokio::test]
    async fn test_drains_all_pages() {
        let source = MockSource::new("Acme")
            .with_page(MockPage::records(vec![json!({"id": "1"}), json!({"id": "2"})]))
            .with_page(MockPage::records(vec![json!({"id": "3"})]));

        let outcome = fetch_listings(&source, &FetchOptions::default()).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.external_ids(), vec!["1", "2", "3"]);
        assert_eq!(source.fetch_call_count(), 2);
    }

    #[tokio::test]
    async fn test_page_error_keeps_partial_results() {
        let source = MockSource::new("Acme")
            .with_page(MockPage::records(vec![json!({"id": "1"})]))
            .with_page(MockPage::failure("connection reset"))
            .with_page(MockPage::records(vec![json!({"id": "3"})]));

        let outcome = fetch_listings(&source, &FetchOptions::default()).await;

        assert_eq!(outcome.external_ids(), vec!["1"]);
        assert!(!outcome.is_complete());
        assert!(outcome.halted_early.unwrap().contains("connection reset"));
        assert_eq!(source.fetch_call_count(), 2);
    }

    #[tokio::test]
    async fn test_repeated_last_page_stops_as_complete() {
        let last = vec![json!({"id": "3"}), json!({"id": "4"})];
        let source = MockSource::new("Acme")
            .with_page(MockPage::records(vec![json!({"id": "1"}), json!({"id": "2"})]))
            .with_page(MockPage::records(last.clone()))
            .with_page(MockPage::records(last.clone()))
            .with_page(MockPage::records(last));

        let outcome = fetch_listings(&source, &FetchOptions::new().with_max_pages(10)).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.external_ids(), vec!["1", "2", "3", "4"]);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(source.fetch_call_count(), 3);
    }

    #[tokio::test]
    async fn test_malformed_record_is_skipped() {
        let source = MockSource::new("Acme").with_page(MockPage::records(vec![
            json!({"id": "1"}),
            json!({"title": "no id"}),
            json!(17),
            json!({"id": "2"}),
        ]));

        let outcome = fetch_listings(&source, &FetchOptions::default()).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.external_ids(), vec!["1", "2"]);
        assert_eq!(outcome.skipped_records, 2);
    }

    #[tokio::test]
    async fn test_empty_page_stops() {
        let source = MockSource::new("Acme")
            .with_page(MockPage::records(vec![]))
            .with_page(MockPage::records(vec![json!({"id": "9"})]));

        let outcome = fetch_listings(&source, &FetchOptions::default()).await;

        assert!(outcome.is_complete());
        assert!(outcome.listings.is_empty());
        assert_eq!(source.fetch_call_count(), 1);
    }

    #[tokio::test]
    async fn test_page_limit_marks_fetch_incomplete() {
        let source = MockSource::new("Acme")
            .with_page(MockPage::records(vec![json!({"id": "1"})]))
            .with_page(MockPage::records(vec![json!({"id": "2"})]))
            .with_page(MockPage::records(vec![json!({"id": "3"})]));

        let outcome = fetch_listings(&source, &FetchOptions::new().with_max_pages(2)).await;

        assert_eq!(outcome.external_ids(), vec!["1", "2"]);
        assert!(!outcome.is_complete());
    }
}
