// Job Listing Tracker - Core
//
// Scrapes employer career sites through the `careers` sources and
// reconciles each run into a SQLite store: new listings are inserted,
// seen listings refreshed, vanished listings flagged inactive.

pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod store;

pub use config::Config;
pub use orchestrator::{EmployerEntry, Orchestrator};
pub use report::{EmployerReport, RunReport};
pub use store::{Listing, ListingQuery, ListingStore, StoreError, UpsertOutcome};
