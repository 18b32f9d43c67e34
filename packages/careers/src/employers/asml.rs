//! ASML careers search (Sitecore Discover widget API).
//!
//! The endpoint requires an authorization token and a per-visitor uuid;
//! both are supplied by the caller.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::SourceResult;
use crate::normalize::{DateFormat, FieldMap};
use crate::pagination::{Pagination, ParamTarget};
use crate::sources::{ApiConfig, ApiSource, HttpMethod};

pub const NAME: &str = "ASML";

const API_URL: &str = "https://discover-euc1.sitecorecloud.io/discover/v2/126200477";
const PAGE_SIZE: u64 = 100;

/// Credentials for the search widget API.
#[derive(Debug, Clone)]
pub struct AsmlCredentials {
    pub auth_token: String,
    /// Visitor id prefix; the current epoch millis is appended
    pub uuid_prefix: String,
}

impl AsmlCredentials {
    pub fn user_uuid(&self) -> String {
        format!("{}{}", self.uuid_prefix, Utc::now().timestamp_millis())
    }
}

fn body_template() -> Value {
    json!({
        "context": {
            "page": {"uri": "https://www.asml.com/en/careers/find-your-job?job_type=Fix"},
            "locale": {"country": "us", "language": "en"},
            "user": {"uuid": ""}
        },
        "widget": {
            "items": [{
                "entity": "content",
                "rfk_id": "asml_job_search",
                "search": {
                    "limit": PAGE_SIZE,
                    "offset": 0,
                    "content": {},
                    "filter": {
                        "type": "and",
                        "filters": [
                            {"name": "job_type", "values": ["Fix"], "type": "anyOf"}
                        ]
                    }
                }
            }]
        }
    })
}

/// Request and field mapping for the careers search widget.
///
/// Only `name` is a confirmed field of the widget content. The other
/// pointers are inferred from the widget payload and resolve to `None`
/// when a record lacks them; records without `job_id` fall back to `id`.
pub fn config() -> ApiConfig {
    let headers = BTreeMap::from([
        ("Accept".to_string(), "application/json".to_string()),
        ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]);

    ApiConfig {
        url: API_URL.to_string(),
        method: HttpMethod::Post,
        headers,
        query: BTreeMap::new(),
        body: Some(body_template()),
        items_pointer: "/widgets/0/content".to_string(),
        pagination: Pagination::OffsetLimit {
            offset: ParamTarget::body("/widget/items/0/search/offset"),
            limit: ParamTarget::body("/widget/items/0/search/limit"),
            page_size: PAGE_SIZE,
            total_pointer: Some("/widgets/0/total_item".to_string()),
        },
        fields: FieldMap::default()
            .with_id("/job_id")
            .with_id("/id")
            .with_title("/name")
            .with_department("/job_category")
            .with_location("/location")
            .with_degree_requirement("/education_level")
            .with_experience_level("/experience_level")
            .with_description("/description")
            .with_posted_at("/publication_date", DateFormat::Auto)
            .with_source_url("/url")
            .with_url_base("https://www.asml.com"),
    }
}

pub fn source(client: reqwest::Client, credentials: &AsmlCredentials) -> SourceResult<ApiSource> {
    Ok(ApiSource::new(NAME, config(), client)?
        .with_header("authorization", credentials.auth_token.clone())
        .with_body_value("/context/user/uuid", Value::String(credentials.user_uuid())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PageSource;
    use crate::types::{FetchOptions, PageRequest};

    fn credentials() -> AsmlCredentials {
        AsmlCredentials {
            auth_token: "token-123".into(),
            uuid_prefix: "126200477-test-".into(),
        }
    }

    #[test]
    fn test_credentials_are_applied() {
        let source = source(reqwest::Client::new(), &credentials()).unwrap();
        assert_eq!(
            source.config().headers.get("authorization").map(String::as_str),
            Some("token-123")
        );

        let (_, body) = source.build_request(
            &PageRequest::Offset { offset: 200, limit: 100 },
            &FetchOptions::default(),
        );
        let body = body.unwrap();
        assert!(body["context"]["user"]["uuid"]
            .as_str()
            .unwrap()
            .starts_with("126200477-test-"));
        assert_eq!(body["widget"]["items"][0]["search"]["offset"], json!(200));
        assert_eq!(body["widget"]["items"][0]["search"]["limit"], json!(100));
    }

    #[test]
    fn test_normalizes_widget_content() {
        let source = source(reqwest::Client::new(), &credentials()).unwrap();
        let response = json!({
            "widgets": [{
                "total_item": 1,
                "content": [{
                    "id": "job_12345",
                    "job_id": "J-00012345",
                    "name": "Software Engineer C++",
                    "job_category": ["Software", "Development & Engineering"],
                    "location": "Veldhoven, Netherlands",
                    "education_level": "Master",
                    "experience_level": "Experienced",
                    "publication_date": "2025-04-01T00:00:00Z",
                    "url": "/en/careers/find-your-job/software-engineer-j00012345"
                }]
            }]
        });

        let page = source.interpret_response(&source.first_request(), &response).unwrap();
        assert_eq!(page.next, None);

        let listing = source.normalize(&page.records[0]).unwrap();
        assert_eq!(listing.employer, "ASML");
        assert_eq!(listing.external_id, "J-00012345");
        assert_eq!(
            listing.department.as_deref(),
            Some("Software; Development & Engineering")
        );
        assert_eq!(listing.degree_requirement.as_deref(), Some("Master"));
        assert_eq!(
            listing.source_url.as_deref(),
            Some("https://www.asml.com/en/careers/find-your-job/software-engineer-j00012345")
        );
        assert!(listing.posted_at.is_some());
    }

    #[test]
    fn test_name_only_content_still_normalizes() {
        let source = source(reqwest::Client::new(), &credentials()).unwrap();

        let listing = source
            .normalize(&json!({"id": "job_777", "name": "Process Engineer"}))
            .unwrap();

        assert_eq!(listing.external_id, "job_777");
        assert_eq!(listing.title.as_deref(), Some("Process Engineer"));
        assert_eq!(listing.department, None);
        assert_eq!(listing.degree_requirement, None);
        assert_eq!(listing.posted_at, None);
        assert_eq!(listing.source_url, None);
    }
}
