//! Which employers exist and which ones a run should process.

use anyhow::{Context, Result};
use careers::employers::{self, BUILTIN_KEYS};
use careers::sources::{parse_employer_specs, Renderer};
use careers::{EmployerSpec, SourceContext};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::orchestrator::EmployerEntry;

/// HTTP client (and renderer, when a key is configured) shared by every
/// source.
pub fn source_context(config: &Config) -> Result<SourceContext> {
    let mut ctx =
        SourceContext::new(config.http_timeout).context("Failed to build HTTP client")?;
    if let Some(key) = &config.firecrawl_api_key {
        ctx = ctx.with_renderer(Renderer::new(key.clone()).context("Failed to build renderer")?);
    }
    Ok(ctx)
}

/// Read custom employer definitions from a JSON file.
pub fn load_employer_specs(path: &Path) -> Result<Vec<EmployerSpec>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read employers file {}", path.display()))?;
    parse_employer_specs(&json)
        .with_context(|| format!("Invalid employer definitions in {}", path.display()))
}

/// Every employer known to this configuration: the built-ins followed by
/// the definitions in `EMPLOYERS_FILE`.
///
/// Sources that cannot be built become [`EmployerEntry::Unavailable`] so
/// the run can report them.
pub fn available_employers(config: &Config, ctx: &SourceContext) -> Result<Vec<EmployerEntry>> {
    let credentials = config.credentials();
    let mut entries = Vec::new();

    for &key in BUILTIN_KEYS {
        let name = employers::display_name(key).unwrap_or(key);
        match employers::build_builtin(key, ctx, &credentials) {
            Some(Ok(source)) => entries.push(EmployerEntry::Ready(source)),
            Some(Err(e)) => entries.push(EmployerEntry::Unavailable {
                employer: name.to_string(),
                reason: e.to_string(),
            }),
            None => {}
        }
    }

    if let Some(path) = &config.employers_file {
        let specs = load_employer_specs(path)?;
        info!(path = %path.display(), count = specs.len(), "Loaded custom employers");
        for spec in specs {
            match spec.build(ctx) {
                Ok(source) => entries.push(EmployerEntry::Ready(source)),
                Err(e) => entries.push(EmployerEntry::Unavailable {
                    employer: spec.name.clone(),
                    reason: e.to_string(),
                }),
            }
        }
    }

    Ok(reject_duplicate_names(entries))
}

/// Employer names key the store's partitions, so each may appear once.
/// Later entries whose name matches an earlier one (ignoring case) become
/// [`EmployerEntry::Unavailable`].
pub fn reject_duplicate_names(entries: Vec<EmployerEntry>) -> Vec<EmployerEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .map(|entry| {
            let name = entry.employer().to_string();
            if seen.insert(name.to_lowercase()) {
                return entry;
            }
            warn!(employer = %name, "Duplicate employer name");
            EmployerEntry::Unavailable {
                reason: format!("duplicate employer name {:?}; another source already uses it", name),
                employer: name,
            }
        })
        .collect()
}

/// Narrow `available` to the requested names.
///
/// Matching is case-insensitive. No names, or `all` among them, selects
/// everything. Unknown names are logged and ignored. Order follows
/// `available`.
pub fn select(available: Vec<EmployerEntry>, requested: &[String]) -> Vec<EmployerEntry> {
    let wanted: Vec<String> = requested
        .iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    if wanted.is_empty() || wanted.iter().any(|name| name == "all") {
        return available;
    }

    for name in &wanted {
        if !available.iter().any(|e| e.employer().to_lowercase() == *name) {
            warn!(employer = %name, "Unknown employer, ignoring");
        }
    }

    available
        .into_iter()
        .filter(|e| wanted.contains(&e.employer().to_lowercase()))
        .collect()
}
