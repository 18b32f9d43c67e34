//! Tracing setup for the `job-tracker` binary.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,tracker_core=debug,careers=debug,sqlx=warn";

/// Daily log file name, e.g. `job_tracker_20250401.log`.
pub fn log_file_name(date: chrono::NaiveDate) -> String {
    format!("job_tracker_{}.log", date.format("%Y%m%d"))
}

/// Install the global subscriber: stdout, plus a plain-text daily file in
/// `log_dir` when one is given. `RUST_LOG` overrides [`DEFAULT_FILTER`].
///
/// Returns the path of the log file, if any.
pub fn init(log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let (file_layer, path) = match log_dir {
        Some(dir) => {
            let (file, path) = open_log_file(dir)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(path)
}

fn open_log_file(dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let path = dir.join(log_file_name(Local::now().date_naive()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok((file, path))
}
