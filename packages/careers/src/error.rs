//! Typed errors for the careers library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! a dead page apart from a malformed record or a bad source definition.

use thiserror::Error;

/// Errors raised while fetching one page from a source.
///
/// These never escape [`crate::fetch_listings`]: a page failure halts
/// pagination and the listings gathered so far are returned.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Transport-level failure (connect, TLS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Response body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Remote rendering service failed
    #[error("render failed for {url}: {reason}")]
    Render { url: String, reason: String },
}

impl From<reqwest::Error> for CrawlError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => CrawlError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => CrawlError::Http(Box::new(e)),
        }
    }
}

/// Errors raised while normalizing one raw record.
///
/// A record that fails normalization is skipped; the batch continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// None of the identifier fields held a usable value
    #[error("record has no usable identifier (tried {tried:?})")]
    MissingId { tried: Vec<String> },

    /// Raw record is not a JSON object
    #[error("record is not an object")]
    NotAnObject,
}

/// Errors raised while building a source from its definition.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source definition is inconsistent
    #[error("invalid source config for {employer}: {reason}")]
    InvalidConfig { employer: String, reason: String },

    /// A credential the source needs was not supplied
    #[error("missing credential {name} for {employer}")]
    MissingCredential { employer: String, name: String },

    /// CSS selector failed to parse
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Employer definitions could not be parsed
    #[error("invalid employer definitions: {0}")]
    Definitions(#[from] serde_json::Error),
}

/// Result type alias for page fetches.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Result type alias for record normalization.
pub type NormalizeResult<T> = std::result::Result<T, NormalizeError>;

/// Result type alias for source construction.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
