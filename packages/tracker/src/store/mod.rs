//! Reconciliation store.
//!
//! One SQLite table, `job_listings`, keyed by (employer, external_id).
//! A scrape run upserts everything it observed for an employer and then
//! retires whatever that employer had active but was not observed.
//! Rows are never deleted.

mod error;
mod models;

pub use error::{StoreError, StoreResult};
pub use models::{content_hash, Listing, ListingQuery, StoreStats, UpsertOutcome};

use careers::ScrapedListing;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// SQLite-backed listing store.
#[derive(Clone)]
pub struct ListingStore {
    pool: SqlitePool,
}

impl ListingStore {
    /// Open (creating if needed) the database at `database_url` and apply
    /// pending migrations.
    ///
    /// # Example URLs
    /// - `sqlite://data/job_listings.db?mode=rwc` - file, created if missing
    /// - `sqlite::memory:` - use [`ListingStore::in_memory`] instead
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        if let Some(parent) = database_file(database_url).and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Ephemeral store for tests.
    ///
    /// Every connection to `:memory:` is a separate database, so the pool
    /// holds exactly one connection and never recycles it.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Upsert one employer's batch using the current time.
    pub async fn upsert_batch(
        &self,
        employer: &str,
        listings: &[ScrapedListing],
    ) -> StoreResult<UpsertOutcome> {
        self.upsert_batch_at(employer, listings, Utc::now()).await
    }

    /// Upsert one employer's batch as of `now`.
    ///
    /// Unknown keys are inserted as new and active. Known keys get every
    /// mutable field overwritten, `last_seen_at = now` and are reactivated;
    /// `first_seen_at` is never touched. The whole batch is one
    /// transaction.
    pub async fn upsert_batch_at(
        &self,
        employer: &str,
        listings: &[ScrapedListing],
        now: DateTime<Utc>,
    ) -> StoreResult<UpsertOutcome> {
        if let Some(stray) = listings.iter().find(|l| l.employer != employer) {
            return Err(StoreError::EmployerMismatch {
                expected: employer.to_string(),
                found: stray.employer.clone(),
            });
        }

        let batch = dedupe_last_wins(listings);
        let mut outcome = UpsertOutcome::default();
        let mut tx = self.pool.begin().await?;

        for listing in batch {
            let hash = content_hash(listing);
            let existing: Option<(i64, String)> = sqlx::query_as(
                "SELECT id, content_hash FROM job_listings WHERE employer = ?1 AND external_id = ?2",
            )
            .bind(employer)
            .bind(&listing.external_id)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO job_listings (
                            employer, external_id, title, department, location,
                            degree_requirement, experience_level, description, posted_at,
                            first_seen_at, last_seen_at, source_url, is_active, content_hash
                        )
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?11, 1, ?12)
                        "#,
                    )
                    .bind(employer)
                    .bind(&listing.external_id)
                    .bind(&listing.title)
                    .bind(&listing.department)
                    .bind(&listing.location)
                    .bind(&listing.degree_requirement)
                    .bind(&listing.experience_level)
                    .bind(&listing.description)
                    .bind(listing.posted_at)
                    .bind(now)
                    .bind(&listing.source_url)
                    .bind(&hash)
                    .execute(&mut *tx)
                    .await?;

                    outcome.new_ids.push(listing.external_id.clone());
                }
                Some((id, stored_hash)) => {
                    sqlx::query(
                        r#"
                        UPDATE job_listings SET
                            title = ?2,
                            department = ?3,
                            location = ?4,
                            degree_requirement = ?5,
                            experience_level = ?6,
                            description = ?7,
                            posted_at = ?8,
                            source_url = ?9,
                            last_seen_at = ?10,
                            is_active = 1,
                            content_hash = ?11
                        WHERE id = ?1
                        "#,
                    )
                    .bind(id)
                    .bind(&listing.title)
                    .bind(&listing.department)
                    .bind(&listing.location)
                    .bind(&listing.degree_requirement)
                    .bind(&listing.experience_level)
                    .bind(&listing.description)
                    .bind(listing.posted_at)
                    .bind(&listing.source_url)
                    .bind(now)
                    .bind(&hash)
                    .execute(&mut *tx)
                    .await?;

                    if stored_hash != hash {
                        outcome.changed_ids.push(listing.external_id.clone());
                    }
                    outcome.updated_ids.push(listing.external_id.clone());
                }
            }
        }

        tx.commit().await?;

        debug!(
            employer = %employer,
            new = outcome.new_ids.len(),
            updated = outcome.updated_ids.len(),
            changed = outcome.changed_ids.len(),
            "Upserted batch"
        );

        Ok(outcome)
    }

    /// Mark inactive every active listing of `employer` not in
    /// `observed_ids`, returning the rows that were retired by this call.
    ///
    /// Calling it again with the same set retires nothing.
    pub async fn retire_missing(
        &self,
        employer: &str,
        observed_ids: &[String],
    ) -> StoreResult<Vec<Listing>> {
        let observed = serde_json::to_string(observed_ids)?;

        let mut tx = self.pool.begin().await?;
        let mut retired: Vec<Listing> = sqlx::query_as(
            r#"
            UPDATE job_listings
            SET is_active = 0
            WHERE employer = ?1
              AND is_active = 1
              AND external_id NOT IN (SELECT value FROM json_each(?2))
            RETURNING *
            "#,
        )
        .bind(employer)
        .bind(observed)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        retired.sort_by_key(|l| l.id);

        if !retired.is_empty() {
            info!(employer = %employer, count = retired.len(), "Retired listings");
        }

        Ok(retired)
    }

    /// Listings matching `filter`.
    pub async fn query(&self, filter: &ListingQuery) -> StoreResult<Vec<Listing>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM job_listings WHERE 1 = 1");

        if let Some(employer) = &filter.employer {
            qb.push(" AND employer = ").push_bind(employer.clone());
        }
        if let Some(active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        if let Some(since) = filter.first_seen_since() {
            qb.push(" AND first_seen_at >= ").push_bind(since);
        }

        if filter.order_by_posted_desc {
            qb.push(" ORDER BY posted_at IS NULL, posted_at DESC, id");
        } else {
            qb.push(" ORDER BY id");
        }

        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let listings = qb.build_query_as::<Listing>().fetch_all(&self.pool).await?;
        Ok(listings)
    }

    pub async fn get_by_external_id(
        &self,
        employer: &str,
        external_id: &str,
    ) -> StoreResult<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(
            "SELECT * FROM job_listings WHERE employer = ?1 AND external_id = ?2",
        )
        .bind(employer)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(listing)
    }

    /// Force the active flag of one listing.
    ///
    /// Leaves `last_seen_at` alone. A missing key is
    /// [`StoreError::NotFound`].
    pub async fn set_active(
        &self,
        employer: &str,
        external_id: &str,
        active: bool,
    ) -> StoreResult<Listing> {
        sqlx::query_as::<_, Listing>(
            r#"
            UPDATE job_listings SET is_active = ?3
            WHERE employer = ?1 AND external_id = ?2
            RETURNING *
            "#,
        )
        .bind(employer)
        .bind(external_id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            employer: employer.to_string(),
            external_id: external_id.to_string(),
        })
    }

    pub async fn stats(&self) -> StoreResult<StoreStats> {
        let (total_count, active_count): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM job_listings",
        )
        .fetch_one(&self.pool)
        .await?;

        let per_employer: Vec<(String, i64)> = sqlx::query_as(
            "SELECT employer, COUNT(*) FROM job_listings GROUP BY employer ORDER BY employer",
        )
        .fetch_all(&self.pool)
        .await?;

        let most_recent_posted_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT posted_at FROM job_listings
            WHERE posted_at IS NOT NULL
            ORDER BY posted_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(StoreStats {
            total_count,
            active_count,
            per_employer_counts: per_employer.into_iter().collect(),
            most_recent_posted_at,
        })
    }
}

/// Collapse repeated keys: the last occurrence supplies the data, the first
/// occurrence fixes the position.
fn dedupe_last_wins(listings: &[ScrapedListing]) -> Vec<&ScrapedListing> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut batch: Vec<&ScrapedListing> = Vec::with_capacity(listings.len());

    for listing in listings {
        match position.get(listing.external_id.as_str()) {
            Some(&i) => batch[i] = listing,
            None => {
                position.insert(listing.external_id.as_str(), batch.len());
                batch.push(listing);
            }
        }
    }

    batch
}

/// Filesystem path of a file-backed SQLite URL, if it has one.
fn database_file(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(Path::new(path))
}
