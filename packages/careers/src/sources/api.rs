//! JSON API source.
//!
//! Covers career sites backed by a paginated JSON endpoint. Everything
//! employer-specific (endpoint, headers, body template, pagination style,
//! field mapping) lives in [`ApiConfig`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use crate::error::{CrawlError, CrawlResult, NormalizeResult, SourceError, SourceResult};
use crate::normalize::FieldMap;
use crate::pagination::{set_pointer, Pagination, ParamTarget};
use crate::traits::PageSource;
use crate::types::{FetchOptions, Page, PageRequest, ScrapedListing};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Definition of a JSON API source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Request body template (POST only); pagination values are written into it
    #[serde(default)]
    pub body: Option<Value>,
    /// Pointer to the array of listing records in the response
    pub items_pointer: String,
    #[serde(default)]
    pub pagination: Pagination,
    pub fields: FieldMap,
}

/// Paginated JSON API source.
pub struct ApiSource {
    employer: String,
    config: ApiConfig,
    client: reqwest::Client,
}

impl ApiSource {
    /// Build a source, validating the definition up front.
    pub fn new(
        employer: impl Into<String>,
        config: ApiConfig,
        client: reqwest::Client,
    ) -> SourceResult<Self> {
        let employer = employer.into();
        let invalid = |reason: &str| SourceError::InvalidConfig {
            employer: employer.clone(),
            reason: reason.to_string(),
        };

        if Url::parse(&config.url).is_err() {
            return Err(invalid("url is not absolute"));
        }
        if config.fields.id.is_empty() {
            return Err(invalid("field map has no id pointers"));
        }
        if config.pagination.uses_body() && config.method != HttpMethod::Post {
            return Err(invalid("body pagination parameters require POST"));
        }
        if let Pagination::OffsetLimit { page_size: 0, .. } = config.pagination {
            return Err(invalid("page_size must be positive"));
        }

        Ok(Self {
            employer,
            config,
            client,
        })
    }

    /// Add a request header (e.g. an API token supplied by the caller).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Write a fixed value into the body template.
    pub fn with_body_value(mut self, pointer: &str, value: Value) -> Self {
        let body = self
            .config
            .body
            .get_or_insert_with(|| Value::Object(Default::default()));
        set_pointer(body, pointer, value);
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Query parameters and body for one page request.
    pub fn build_request(
        &self,
        request: &PageRequest,
        options: &FetchOptions,
    ) -> (Vec<(String, String)>, Option<Value>) {
        let mut query: Vec<(String, String)> = self
            .config
            .query
            .iter()
            .chain(options.query.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut body = match self.config.method {
            HttpMethod::Post => Some(self.config.body.clone().unwrap_or(Value::Object(Default::default()))),
            HttpMethod::Get => None,
        };

        for param in self.config.pagination.params(request) {
            match param.target {
                ParamTarget::Query { name } => {
                    let value = match &param.value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    query.push((name.clone(), value));
                }
                ParamTarget::Body { pointer } => {
                    if let Some(body) = body.as_mut() {
                        set_pointer(body, pointer, param.value.clone());
                    }
                }
            }
        }

        (query, body)
    }

    /// Turn a decoded response into a page.
    pub fn interpret_response(&self, request: &PageRequest, response: &Value) -> CrawlResult<Page> {
        let records = response
            .pointer(&self.config.items_pointer)
            .ok_or_else(|| {
                CrawlError::Decode(format!("no items at {}", self.config.items_pointer))
            })?
            .as_array()
            .ok_or_else(|| {
                CrawlError::Decode(format!("items at {} is not an array", self.config.items_pointer))
            })?
            .clone();

        let next = self
            .config
            .pagination
            .next_request(request, response, records.len());
        Ok(Page::new(records, next))
    }
}

#[async_trait]
impl PageSource for ApiSource {
    fn employer(&self) -> &str {
        &self.employer
    }

    fn first_request(&self) -> PageRequest {
        self.config.pagination.first_request()
    }

    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> CrawlResult<Page> {
        let (query, body) = self.build_request(request, options);

        let mut builder = match self.config.method {
            HttpMethod::Get => self.client.get(&self.config.url),
            HttpMethod::Post => self.client.post(&self.config.url),
        };
        for (name, value) in &self.config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder.query(&query);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(employer = %self.employer, status = status.as_u16(), "API response");
        if !status.is_success() {
            return Err(CrawlError::Status {
                status: status.as_u16(),
                url: self.config.url.clone(),
            });
        }

        let decoded: Value = response
            .json()
            .await
            .map_err(|e| CrawlError::Decode(e.to_string()))?;

        self.interpret_response(request, &decoded)
    }

    fn normalize(&self, raw: &Value) -> NormalizeResult<ScrapedListing> {
        self.config.fields.normalize(&self.employer, raw)
    }

    fn kind(&self) -> &str {
        "json_api"
    }
}
