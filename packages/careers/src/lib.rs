//! Career-site sources.
//!
//! Fetches job listings from employer career sites and normalizes them
//! into [`ScrapedListing`]s. A source only knows how to fetch one page and
//! normalize one record ([`PageSource`]); [`fetch_listings`] drains the
//! pagination and contains failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use careers::{employers, fetch_listings, FetchOptions, SourceContext};
//!
//! let ctx = SourceContext::new(std::time::Duration::from_secs(30))?;
//! let micron = employers::micron::source(ctx.client.clone())?;
//! let outcome = fetch_listings(&micron, &FetchOptions::default()).await;
//! println!("{} listings", outcome.listings.len());
//! ```

pub mod employers;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pagination;
pub mod sources;
pub mod traits;
pub mod types;

pub use error::{CrawlError, NormalizeError, SourceError};
pub use fetch::fetch_listings;
pub use normalize::{DateFormat, FieldMap};
pub use sources::{EmployerSpec, SourceContext, SourceSpec};
pub use traits::PageSource;
pub use types::{FetchOptions, FetchOutcome, Page, PageRequest, ScrapedListing};
