//! Micron Technology careers API.

use std::collections::BTreeMap;

use crate::error::SourceResult;
use crate::normalize::{DateFormat, FieldMap};
use crate::pagination::{Pagination, ParamTarget};
use crate::sources::{ApiConfig, ApiSource, HttpMethod};

pub const NAME: &str = "Micron";

const API_URL: &str = "https://careers.micron.com/api/apply/v2/jobs";
const PAGE_SIZE: u64 = 10;

pub fn config() -> ApiConfig {
    let headers = BTreeMap::from([
        ("Accept".to_string(), "*/*".to_string()),
        ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
        ("Referer".to_string(), "https://careers.micron.com/careers".to_string()),
        ("content-type".to_string(), "application/json".to_string()),
    ]);
    let query = BTreeMap::from([
        ("domain".to_string(), "micron.com".to_string()),
        ("sort_by".to_string(), "relevance".to_string()),
    ]);

    ApiConfig {
        url: API_URL.to_string(),
        method: HttpMethod::Get,
        headers,
        query,
        body: None,
        items_pointer: "/positions".to_string(),
        pagination: Pagination::OffsetLimit {
            offset: ParamTarget::query("start"),
            limit: ParamTarget::query("num"),
            page_size: PAGE_SIZE,
            total_pointer: Some("/count".to_string()),
        },
        fields: FieldMap::default()
            .with_id("/ats_job_id")
            .with_id("/id")
            .with_title("/name")
            .with_department("/department")
            .with_location("/location")
            .with_description("/job_description")
            .with_posted_at("/t_create", DateFormat::EpochSeconds)
            .with_source_url("/canonicalPositionUrl"),
    }
}

pub fn source(client: reqwest::Client) -> SourceResult<ApiSource> {
    ApiSource::new(NAME, config(), client)
}

/// Shape of one page as the API returns it, for tests.
#[cfg(test)]
pub(crate) fn sample_page() -> serde_json::Value {
    serde_json::json!({
        "count": 12,
        "positions": [
            {
                "id": 48123,
                "ats_job_id": "JR54321",
                "name": "Yield Enhancement Engineer",
                "department": "Front End Manufacturing",
                "location": "Boise, ID, United States",
                "job_description": "<p>Own yield.</p>",
                "t_create": 1741600000,
                "canonicalPositionUrl": "https://careers.micron.com/careers/job/48123"
            },
            {
                "id": 48124,
                "name": "Intern - Fab Operations",
                "t_create": null
            },
            {
                "name": "Broken record with no identifiers"
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PageSource;
    use crate::types::PageRequest;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_first_page_and_continuation() {
        let source = source(reqwest::Client::new()).unwrap();
        let page = source
            .interpret_response(&source.first_request(), &sample_page())
            .unwrap();

        assert_eq!(page.records.len(), 3);
        assert_eq!(page.next, Some(PageRequest::Offset { offset: 10, limit: 10 }));
    }

    #[test]
    fn test_normalizes_positions() {
        let source = source(reqwest::Client::new()).unwrap();
        let raw = sample_page();
        let positions = raw["positions"].as_array().unwrap();

        let first = source.normalize(&positions[0]).unwrap();
        assert_eq!(first.external_id, "JR54321");
        assert_eq!(first.title.as_deref(), Some("Yield Enhancement Engineer"));
        assert_eq!(first.posted_at, Some(Utc.timestamp_opt(1741600000, 0).unwrap()));
        assert_eq!(first.degree_requirement, None);
        assert_eq!(
            first.source_url.as_deref(),
            Some("https://careers.micron.com/careers/job/48123")
        );

        let second = source.normalize(&positions[1]).unwrap();
        assert_eq!(second.external_id, "48124");
        assert_eq!(second.posted_at, None);

        assert!(source.normalize(&positions[2]).is_err());
    }
}
