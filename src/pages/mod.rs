//! Page loaders and view-models, independent of any rendering.
//!
//! A loader fetches everything a page needs for one project + date range.
//! When a fetch fails and sample fallback is on, the page is filled from
//! [`crate::sample`] and tagged as such.

pub mod dashboard;
pub mod flaky;
pub mod run_details;
pub mod runs;
pub mod settings;
pub mod trends;

use crate::api::types::ProjectId;
use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{QaHubError, Result};
use crate::sample::DataSource;
use tracing::warn;

/// Everything a loader depends on, captured at request time.
#[derive(Clone)]
pub struct PageContext {
    pub api: ApiClient,
    pub project: Option<ProjectId>,
    pub days: u32,
    pub sample_fallback: bool,
}

impl PageContext {
    pub fn new(api: ApiClient, project: Option<ProjectId>, days: u32, config: &Config) -> Self {
        Self {
            api,
            project,
            days,
            sample_fallback: config.sample_fallback,
        }
    }

    pub fn require_project(&self) -> Result<ProjectId> {
        self.project.ok_or(QaHubError::NoProjectSelected)
    }
}

/// Page data plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Loaded<T> {
    pub fn live(data: T) -> Self {
        Self {
            data,
            source: DataSource::Live,
        }
    }

    pub fn sample(data: T) -> Self {
        Self {
            data,
            source: DataSource::Sample,
        }
    }
}

/// Swap a failed fetch for sample data when allowed.
pub fn or_sample<T>(
    result: Result<T>,
    fallback: bool,
    what: &str,
    sample: impl FnOnce() -> T,
) -> Result<Loaded<T>> {
    match result {
        Ok(data) => Ok(Loaded::live(data)),
        Err(e) if fallback => {
            warn!(page = what, error = %e, "backend unavailable, using sample data");
            Ok(Loaded::sample(sample()))
        }
        Err(e) => Err(e),
    }
}

/// Case-insensitive substring match over any of `fields`. Empty query matches.
pub fn matches_query(query: &str, fields: &[&str]) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(&query))
}
