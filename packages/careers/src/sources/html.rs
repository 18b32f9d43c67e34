//! HTML career-page source.
//!
//! Fetches a listing page (plain GET, or rendered remotely for
//! script-driven sites), selects one element per job, and turns each into a
//! JSON object so the regular [`FieldMap`] can normalize it.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use crate::error::{CrawlError, CrawlResult, NormalizeResult, SourceError, SourceResult};
use crate::normalize::FieldMap;
use crate::pagination::{Pagination, ParamTarget};
use crate::sources::render::Renderer;
use crate::traits::PageSource;
use crate::types::{FetchOptions, Page, PageRequest, ScrapedListing};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Static,
    /// Rendered by the remote rendering API before extraction
    Rendered,
}

/// One value pulled out of a job element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlField {
    /// Key in the record object handed to the field map
    pub name: String,
    /// Selector relative to the job element; `None` means the element itself
    #[serde(default)]
    pub selector: Option<String>,
    /// Attribute to read instead of the text content
    #[serde(default)]
    pub attr: Option<String>,
    /// Collect every match into an array instead of taking the first
    #[serde(default)]
    pub multiple: bool,
}

impl HtmlField {
    pub fn text(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: Some(selector.into()),
            attr: None,
            multiple: false,
        }
    }

    pub fn attr(name: impl Into<String>, selector: Option<&str>, attr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.map(String::from),
            attr: Some(attr.into()),
            multiple: false,
        }
    }

    pub fn all(mut self) -> Self {
        self.multiple = true;
        self
    }
}

/// Definition of an HTML source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlConfig {
    pub url: String,
    #[serde(default)]
    pub render: RenderMode,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Selector matching one element per job
    pub item_selector: String,
    pub extract: Vec<HtmlField>,
    #[serde(default)]
    pub pagination: Pagination,
    pub fields: FieldMap,
}

struct CompiledField {
    field: HtmlField,
    selector: Option<Selector>,
}

/// HTML page source.
pub struct HtmlSource {
    employer: String,
    config: HtmlConfig,
    item_selector: Selector,
    extract: Vec<CompiledField>,
    client: reqwest::Client,
    renderer: Option<Renderer>,
}

fn compile(selector: &str) -> SourceResult<Selector> {
    Selector::parse(selector).map_err(|e| SourceError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl HtmlSource {
    /// Build a source. `renderer` is required when the config asks for rendering.
    pub fn new(
        employer: impl Into<String>,
        config: HtmlConfig,
        client: reqwest::Client,
        renderer: Option<Renderer>,
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
        if config.pagination.uses_body() {
            return Err(invalid("HTML sources cannot paginate through a request body"));
        }
        if matches!(config.pagination, Pagination::Cursor { .. }) {
            return Err(invalid("HTML sources do not support cursor pagination"));
        }
        if config.render == RenderMode::Rendered && renderer.is_none() {
            return Err(SourceError::MissingCredential {
                employer,
                name: "FIRECRAWL_API_KEY".to_string(),
            });
        }

        let item_selector = compile(&config.item_selector)?;
        let extract = config
            .extract
            .iter()
            .map(|field| {
                Ok(CompiledField {
                    field: field.clone(),
                    selector: field.selector.as_deref().map(compile).transpose()?,
                })
            })
            .collect::<SourceResult<Vec<_>>>()?;

        Ok(Self {
            employer,
            config,
            item_selector,
            extract,
            client,
            renderer,
        })
    }

    /// Full URL (with query) for one page request.
    pub fn page_url(&self, request: &PageRequest, options: &FetchOptions) -> CrawlResult<Url> {
        let mut url = Url::parse(&self.config.url).map_err(|_| CrawlError::InvalidUrl {
            url: self.config.url.clone(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in self.config.query.iter().chain(options.query.iter()) {
                pairs.append_pair(k, v);
            }
            for param in self.config.pagination.params(request) {
                if let ParamTarget::Query { name } = param.target {
                    pairs.append_pair(name, &param.value.to_string());
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    /// One JSON object per job element in `html`.
    pub fn extract_records(&self, html: &str, page_url: &Url) -> Vec<Value> {
        let document = Html::parse_document(html);
        document
            .select(&self.item_selector)
            .map(|item| self.extract_item(item, page_url))
            .collect()
    }

    fn extract_item(&self, item: ElementRef<'_>, page_url: &Url) -> Value {
        let mut record = Map::new();
        for compiled in &self.extract {
            let matches: Vec<ElementRef<'_>> = match &compiled.selector {
                Some(selector) => item.select(selector).collect(),
                None => vec![item],
            };
            let mut values = matches
                .into_iter()
                .filter_map(|el| Self::read_value(el, &compiled.field, page_url));

            let value = if compiled.field.multiple {
                let all: Vec<Value> = values.map(Value::String).collect();
                (!all.is_empty()).then_some(Value::Array(all))
            } else {
                values.next().map(Value::String)
            };
            if let Some(value) = value {
                record.insert(compiled.field.name.clone(), value);
            }
        }
        Value::Object(record)
    }

    fn read_value(el: ElementRef<'_>, field: &HtmlField, page_url: &Url) -> Option<String> {
        let raw = match &field.attr {
            Some(attr) => {
                let value = el.value().attr(attr)?.trim().to_string();
                if attr == "href" || attr == "src" {
                    page_url
                        .join(&value)
                        .map(|u| u.to_string())
                        .unwrap_or(value)
                } else {
                    value
                }
            }
            None => el.text().collect::<Vec<_>>().join(" "),
        };
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        (!collapsed.is_empty()).then_some(collapsed)
    }

    async fn fetch_html(&self, url: &Url) -> CrawlResult<String> {
        if self.config.render == RenderMode::Rendered {
            if let Some(renderer) = &self.renderer {
                return renderer.render(url.as_str()).await;
            }
        }

        let mut builder = self.client.get(url.clone());
        for (name, value) in &self.config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.text().await.map_err(|e| CrawlError::Http(Box::new(e)))
    }
}

#[async_trait]
impl PageSource for HtmlSource {
    fn employer(&self) -> &str {
        &self.employer
    }

    fn first_request(&self) -> PageRequest {
        self.config.pagination.first_request()
    }

    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> CrawlResult<Page> {
        let url = self.page_url(request, options)?;
        let html = self.fetch_html(&url).await?;
        let records = self.extract_records(&html, &url);
        debug!(employer = %self.employer, url = %url, records = records.len(), "Extracted job elements");

        let next = self
            .config
            .pagination
            .next_request(request, &Value::Null, records.len());
        Ok(Page::new(records, next))
    }

    fn normalize(&self, raw: &Value) -> NormalizeResult<ScrapedListing> {
        self.config.fields.normalize(&self.employer, raw)
    }

    fn kind(&self) -> &str {
        match self.config.render {
            RenderMode::Static => "html",
            RenderMode::Rendered => "html_rendered",
        }
    }
}
