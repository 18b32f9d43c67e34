use thiserror::Error;

/// Errors from the listing store.
///
/// Any of these raised inside `upsert_batch` or `retire_missing` means the
/// transaction was rolled back and the store is unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("could not encode observed ids: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("could not prepare database location: {0}")]
    Io(#[from] std::io::Error),

    /// Maintenance update addressed a listing that does not exist
    #[error("no listing {external_id} for {employer}")]
    NotFound { employer: String, external_id: String },

    /// A batch contained a listing scraped for a different employer
    #[error("listing for {found} in a batch for {expected}")]
    EmployerMismatch { expected: String, found: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
