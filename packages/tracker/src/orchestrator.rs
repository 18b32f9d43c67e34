//! Fetch-then-reconcile loop over the selected employers.

use careers::{fetch_listings, FetchOptions, PageSource};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::report::{EmployerReport, RunReport};
use crate::store::{ListingStore, StoreResult};

/// An employer selected for a run.
#[derive(Clone)]
pub enum EmployerEntry {
    Ready(Arc<dyn PageSource>),
    /// The source could not be built (missing credential, bad definition)
    Unavailable { employer: String, reason: String },
}

impl EmployerEntry {
    pub fn employer(&self) -> &str {
        match self {
            EmployerEntry::Ready(source) => source.employer(),
            EmployerEntry::Unavailable { employer, .. } => employer,
        }
    }
}

impl std::fmt::Debug for EmployerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmployerEntry::Ready(source) => f
                .debug_tuple("Ready")
                .field(&source.employer())
                .field(&source.kind())
                .finish(),
            EmployerEntry::Unavailable { employer, reason } => f
                .debug_struct("Unavailable")
                .field("employer", employer)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Runs each employer through fetch, upsert and retire, one at a time.
pub struct Orchestrator {
    store: ListingStore,
    options: FetchOptions,
}

impl Orchestrator {
    pub fn new(store: ListingStore, options: FetchOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &ListingStore {
        &self.store
    }

    /// Process every entry in order. A failing employer is recorded in the
    /// report and the loop moves on.
    pub async fn run(&self, entries: &[EmployerEntry]) -> RunReport {
        let mut report = RunReport::new();

        for entry in entries {
            if report.get(entry.employer()).is_some() {
                warn!(employer = %entry.employer(), "Employer already processed in this run, skipping");
                continue;
            }
            let employer_report = match entry {
                EmployerEntry::Ready(source) => self.run_employer(source.as_ref()).await,
                EmployerEntry::Unavailable { employer, reason } => {
                    warn!(employer = %employer, reason = %reason, "Skipping employer");
                    EmployerReport::failed(reason.clone())
                }
            };
            report.insert(entry.employer(), employer_report);
        }

        let totals = report.totals();
        info!(
            employers = report.employers.len(),
            new = totals.new,
            updated = totals.updated,
            retired = totals.retired,
            failed = totals.failed,
            "Run complete"
        );

        report
    }

    /// Fetch one employer and reconcile it into the store.
    pub async fn run_employer(&self, source: &dyn PageSource) -> EmployerReport {
        let employer = source.employer();
        match self.reconcile(source).await {
            Ok(report) => {
                info!(
                    employer = %employer,
                    new = report.new,
                    updated = report.updated,
                    changed = report.changed,
                    retired = report.retired,
                    "Employer reconciled"
                );
                report
            }
            Err(e) => {
                error!(employer = %employer, error = %e, "Reconciliation failed");
                EmployerReport::failed(e.to_string())
            }
        }
    }

    async fn reconcile(&self, source: &dyn PageSource) -> StoreResult<EmployerReport> {
        let employer = source.employer();
        let outcome = fetch_listings(source, &self.options).await;
        let observed = outcome.external_ids();

        let upserted = self.store.upsert_batch(employer, &outcome.listings).await?;

        if let Some(reason) = &outcome.halted_early {
            warn!(employer = %employer, reason = %reason, "Fetch incomplete, retiring against partial results");
        }
        let retired = self.store.retire_missing(employer, &observed).await?.len();

        Ok(EmployerReport {
            new: upserted.new_ids.len(),
            updated: upserted.updated_ids.len(),
            changed: upserted.changed_ids.len(),
            retired,
            fetched: outcome.listings.len(),
            skipped: outcome.skipped_records,
            partial: outcome.halted_early,
            error: None,
        })
    }
}
