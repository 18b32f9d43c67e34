//! Job listing tracker CLI
//!
//! Scrapes the configured employers, reconciles the results into the
//! listing store and prints what changed.

use anyhow::{Context, Result};
use careers::FetchOptions;
use clap::{Parser, Subcommand};
use tracker_core::config::Config;
use tracker_core::registry;
use tracker_core::report::{render_listings, render_stats};
use tracker_core::{ListingQuery, ListingStore, Orchestrator};

#[derive(Parser)]
#[command(name = "job-tracker")]
#[command(about = "Track job listings across employer career sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape employers and reconcile the listing store
    Run {
        /// Employers to scrape (case-insensitive), or "all"
        #[arg(long, num_args = 1.., default_value = "all")]
        companies: Vec<String>,

        /// Show active listings first seen within this many days
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(0..))]
        days: i64,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Page limit per employer (overrides MAX_PAGES)
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Show listings first seen recently
    Report {
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(0..))]
        days: i64,

        /// Only this employer
        #[arg(long)]
        company: Option<String>,

        /// Include inactive listings
        #[arg(long)]
        all: bool,
    },

    /// Print store statistics
    Stats,

    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let log_file = tracker_core::logging::init(config.log_dir.as_deref())?;
    if let Some(path) = log_file {
        tracing::debug!(path = %path.display(), "Logging to file");
    }

    let store = ListingStore::connect(&config.database_url)
        .await
        .context("Failed to open listing store")?;

    match cli.command {
        Commands::Run {
            companies,
            days,
            json,
            max_pages,
        } => {
            let ctx = registry::source_context(&config)?;
            let available = registry::available_employers(&config, &ctx)?;
            let selected = registry::select(available, &companies);
            if selected.is_empty() {
                tracing::warn!("No employers selected");
            }

            let options = FetchOptions::new().with_max_pages(max_pages.unwrap_or(config.max_pages));
            let orchestrator = Orchestrator::new(store.clone(), options);
            let report = orchestrator.run(&selected).await;

            if json {
                println!("{}", report.to_json().context("Failed to serialize report")?);
            } else {
                println!("{}", report.render_table());
                let recent = store
                    .query(
                        &ListingQuery::new()
                            .active(true)
                            .first_seen_within_days(days)
                            .newest_posted_first(),
                    )
                    .await
                    .context("Failed to query recent listings")?;
                println!(
                    "{}",
                    render_listings(&format!("New in the last {} day(s)", days), &recent)
                );
            }
        }
        Commands::Report { days, company, all } => {
            let mut query = ListingQuery::new()
                .first_seen_within_days(days)
                .newest_posted_first();
            if !all {
                query = query.active(true);
            }
            if let Some(company) = company {
                query = query.employer(resolve_employer(&store, &company).await?);
            }
            let listings = store
                .query(&query)
                .await
                .context("Failed to query listings")?;
            println!(
                "{}",
                render_listings(&format!("First seen in the last {} day(s)", days), &listings)
            );
        }
        Commands::Stats => {
            let stats = store.stats().await.context("Failed to read store statistics")?;
            println!("{}", render_stats(&stats));
        }
        Commands::Migrate => {
            // connect() already applied them
            println!("Migrations applied to {}", config.database_url);
        }
    }

    Ok(())
}

/// Match a user-typed employer name against the stored names, ignoring case.
async fn resolve_employer(store: &ListingStore, name: &str) -> Result<String> {
    let stats = store.stats().await.context("Failed to read employers")?;
    Ok(stats
        .per_employer_counts
        .keys()
        .find(|employer| employer.eq_ignore_ascii_case(name))
        .cloned()
        .unwrap_or_else(|| name.to_string()))
}
