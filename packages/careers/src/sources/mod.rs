//! Source strategies and data-driven source definitions.
//!
//! # Available Sources
//!
//! - `ApiSource` - paginated JSON endpoints (offset/limit, cursor, page number)
//! - `HtmlSource` - listing pages parsed with CSS selectors, static or rendered
//! - `MockSource` - for testing

pub mod api;
pub mod html;
pub mod mock;
pub mod render;

pub use api::{ApiConfig, ApiSource, HttpMethod};
pub use html::{HtmlConfig, HtmlField, HtmlSource, RenderMode};
pub use mock::{MockPage, MockSource};
pub use render::Renderer;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::SourceResult;
use crate::traits::PageSource;

/// Browser-like agent; several career APIs reject obvious bots.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:136.0) Gecko/20100101 Firefox/136.0";

/// Shared pieces every source is built with.
#[derive(Clone)]
pub struct SourceContext {
    pub client: reqwest::Client,
    pub renderer: Option<Renderer>,
}

impl SourceContext {
    /// Build an HTTP client with the given request timeout.
    pub fn new(timeout: Duration) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            renderer: None,
        })
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

/// Serializable source definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    JsonApi(ApiConfig),
    Html(HtmlConfig),
}

/// A named employer and how to fetch its listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployerSpec {
    pub name: String,
    pub source: SourceSpec,
}

impl EmployerSpec {
    pub fn build(&self, ctx: &SourceContext) -> SourceResult<Arc<dyn PageSource>> {
        let source: Arc<dyn PageSource> = match &self.source {
            SourceSpec::JsonApi(config) => Arc::new(ApiSource::new(
                self.name.clone(),
                config.clone(),
                ctx.client.clone(),
            )?),
            SourceSpec::Html(config) => Arc::new(HtmlSource::new(
                self.name.clone(),
                config.clone(),
                ctx.client.clone(),
                ctx.renderer.clone(),
            )?),
        };
        Ok(source)
    }
}

/// Parse a JSON array of employer definitions.
pub fn parse_employer_specs(json: &str) -> SourceResult<Vec<EmployerSpec>> {
    Ok(serde_json::from_str(json)?)
}
