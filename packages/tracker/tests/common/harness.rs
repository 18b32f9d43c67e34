//! Test harness backed by a private in-memory SQLite store.
//!
//! Each test gets its own database with migrations applied, so tests can
//! run in parallel without sharing rows.

use anyhow::{Context, Result};
use careers::FetchOptions;
use test_context::AsyncTestContext;
use tracker_core::{ListingStore, Orchestrator};

/// Test harness that manages test infrastructure.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let outcome = ctx.store.upsert_batch("Acme", &[]).await.unwrap();
/// }
/// ```
pub struct TestHarness {
    pub store: ListingStore,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.store.pool().close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let store = ListingStore::in_memory()
            .await
            .context("Failed to open in-memory store")?;

        Ok(Self { store })
    }

    /// Orchestrator over this harness's store with default fetch options.
    #[allow(dead_code)]
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.store.clone(), FetchOptions::default())
    }
}
