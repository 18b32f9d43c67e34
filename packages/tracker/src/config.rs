use anyhow::{Context, Result};
use careers::employers::{AsmlCredentials, EmployerCredentials};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/job_listings.db?mode=rwc";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// `None` disables the log file
    pub log_dir: Option<PathBuf>,
    pub http_timeout: Duration,
    pub max_pages: usize,
    pub asml_auth_token: Option<String>,
    pub asml_uuid_prefix: Option<String>,
    pub firecrawl_api_key: Option<String>,
    pub employers_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Unset and empty are the same thing for optional values
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            log_dir: match lookup("LOG_DIR") {
                Some(dir) if dir.trim().is_empty() => None,
                Some(dir) => Some(PathBuf::from(dir)),
                None => Some(PathBuf::from(DEFAULT_LOG_DIR)),
            },
            http_timeout: Duration::from_secs(
                optional("HTTP_TIMEOUT_SECS")
                    .map(|v| v.parse())
                    .transpose()
                    .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            max_pages: optional("MAX_PAGES")
                .map(|v| v.parse())
                .transpose()
                .context("MAX_PAGES must be a valid number")?
                .unwrap_or(careers::types::DEFAULT_MAX_PAGES),
            asml_auth_token: optional("ASML_AUTH_TOKEN"),
            asml_uuid_prefix: optional("ASML_UUID_PREFIX"),
            firecrawl_api_key: optional("FIRECRAWL_API_KEY"),
            employers_file: optional("EMPLOYERS_FILE").map(PathBuf::from),
        })
    }

    /// Credentials to hand to the built-in employer sources.
    pub fn credentials(&self) -> EmployerCredentials {
        let asml = match (&self.asml_auth_token, &self.asml_uuid_prefix) {
            (Some(auth_token), Some(uuid_prefix)) => Some(AsmlCredentials {
                auth_token: auth_token.clone(),
                uuid_prefix: uuid_prefix.clone(),
            }),
            _ => None,
        };
        EmployerCredentials { asml }
    }
}
