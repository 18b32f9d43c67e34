//! Run summaries and listing tables for the terminal.

use colored::Colorize;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::store::{Listing, StoreStats};

/// What one employer's reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmployerReport {
    pub new: usize,
    pub updated: usize,
    /// Updated listings whose content actually changed
    pub changed: usize,
    pub retired: usize,
    /// Listings the source produced
    pub fetched: usize,
    /// Raw records dropped by normalization
    pub skipped: usize,
    /// Why pagination stopped before the end, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmployerReport {
    /// Zero counts plus the failure that caused them.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-employer results of one run, keyed by employer name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RunReport {
    pub employers: BTreeMap<String, EmployerReport>,
}

/// Sums across every employer in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub new: usize,
    pub updated: usize,
    pub changed: usize,
    pub retired: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `report` under `employer`. An employer already in the run
    /// keeps its first report; returns whether this one was stored.
    pub fn insert(&mut self, employer: impl Into<String>, report: EmployerReport) -> bool {
        match self.employers.entry(employer.into()) {
            Entry::Vacant(slot) => {
                slot.insert(report);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, employer: &str) -> Option<&EmployerReport> {
        self.employers.get(employer)
    }

    pub fn totals(&self) -> RunTotals {
        self.employers
            .values()
            .fold(RunTotals::default(), |mut totals, report| {
                totals.new += report.new;
                totals.updated += report.updated;
                totals.changed += report.changed;
                totals.retired += report.retired;
                totals.failed += usize::from(report.is_failed());
                totals
            })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable table, one row per employer plus totals.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let header = format!(
            "  {:<20} {:>6} {:>8} {:>8} {:>8}",
            "Employer", "New", "Updated", "Changed", "Retired"
        );
        let _ = writeln!(out, "{}", header.cyan().bold());
        let _ = writeln!(out, "{}", "─".repeat(header.chars().count()).dimmed());

        for (employer, report) in &self.employers {
            let name = format!("{:<20}", employer);
            let _ = write!(
                out,
                "  {} {:>6} {:>8} {:>8} {:>8}",
                name.bold(),
                report.new,
                report.updated,
                report.changed,
                report.retired
            );
            if let Some(error) = &report.error {
                let _ = write!(out, "  {}", format!("failed: {}", error).red());
            } else if let Some(reason) = &report.partial {
                let _ = write!(out, "  {}", format!("partial: {}", reason).yellow());
            }
            out.push('\n');
        }

        let totals = self.totals();
        let _ = writeln!(
            out,
            "  {} {:>6} {:>8} {:>8} {:>8}",
            format!("{:<20}", "Total").bold(),
            totals.new,
            totals.updated,
            totals.changed,
            totals.retired
        );
        out
    }
}

/// Table of listings for the recent-listings report.
pub fn render_listings(title: &str, listings: &[Listing]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", format!("{} ({})", title, listings.len()).cyan().bold());
    let _ = writeln!(out, "{}", "─".repeat(80).dimmed());

    if listings.is_empty() {
        let _ = writeln!(out, "  {}", "No listings".dimmed());
        return out;
    }

    for listing in listings {
        let posted = listing
            .posted_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let _ = writeln!(
            out,
            "  {} {} {}",
            format!("[{}]", listing.employer).blue(),
            listing.title.as_deref().unwrap_or("(untitled)").bold(),
            format!("#{}", listing.external_id).dimmed()
        );
        let _ = writeln!(
            out,
            "      {}  posted {}",
            listing.location.as_deref().unwrap_or("location unknown"),
            posted
        );
        if let Some(url) = &listing.source_url {
            let _ = writeln!(out, "      {}", url.dimmed());
        }
    }
    out
}

/// Store statistics block for the `stats` command.
pub fn render_stats(stats: &StoreStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Listing store".cyan().bold());
    let _ = writeln!(out, "{}", "─".repeat(40).dimmed());
    let _ = writeln!(out, "  {:<20} {}", "Total", stats.total_count);
    let _ = writeln!(out, "  {:<20} {}", "Active", stats.active_count);
    let _ = writeln!(
        out,
        "  {:<20} {}",
        "Most recent posting",
        stats
            .most_recent_posted_at
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "none".to_string())
    );
    for (employer, count) in &stats.per_employer_counts {
        let _ = writeln!(out, "  {:<20} {}", employer, count);
    }
    out
}
