//! CLI command handlers.
//!
//! Each submodule holds the handlers for one group of subcommands. Handlers
//! take a [`CliContext`] (config, session store, saved session) and print
//! their results through [`crate::output`].
//!
//! - [`auth`] - login, register, logout, whoami, users
//! - [`projects`] - list and select projects
//! - [`runs`] - run list, details, analysis, deletion
//! - [`flaky`] - flaky test list and triage
//! - [`trends`] - pass-rate trends and top failures
//! - [`keys`] - API key management
//! - [`upload`] - JUnit XML upload
//! - [`watch`] - live run events
//! - [`dashboard`] - full-screen dashboard
//! - [`config`] - show, set and reset configuration

mod auth;
mod config;
mod dashboard;
mod flaky;
mod keys;
mod projects;
mod runs;
mod trends;
mod upload;
mod watch;

pub use auth::{login_command, logout_command, register_command, users_command, whoami_command};
pub use config::{config_reset_command, config_set_command, config_show_command};
pub use dashboard::dashboard_command;
pub use flaky::{flaky_ack_command, flaky_list_command, flaky_status_command, FlakyListOptions};
pub use keys::{keys_generate_command, keys_list_command, keys_revoke_command};
pub use projects::{projects_command, projects_use_command};
pub use runs::{analyze_command, delete_run_command, run_command, runs_command, RunViewOptions};
pub use trends::{failures_command, trends_command};
pub use upload::upload_command;
pub use watch::watch_command;

use crate::api::types::{Project, ProjectId};
use crate::api::ApiClient;
use crate::config::{load_config, validate_config, Config};
use crate::error::{QaHubError, Result};
use crate::filter::DateRange;
use crate::output::{print_sample_notice, print_warning};
use crate::pages::{Loaded, PageContext};
use crate::session::{project_load_error_message, ProjectScope, Session, SessionStore};
use tracing::{debug, warn};

/// Loaded once per invocation and handed to every command.
pub struct CliContext {
    pub config: Config,
    pub store: SessionStore,
    pub session: Session,
}

impl CliContext {
    /// Load config and session from the default locations.
    ///
    /// `api_url` overrides the configured backend for this invocation only.
    pub fn load(api_url: Option<&str>) -> Result<Self> {
        let mut config = load_config()?;
        if let Some(url) = api_url {
            config.api_url = url.trim_end_matches('/').to_string();
            validate_config(&config).map_err(|e| QaHubError::Config(e.to_string()))?;
        }
        let store = SessionStore::new()?;
        let session = store.load()?;
        Ok(Self::new(config, store, session))
    }

    pub fn new(config: Config, store: SessionStore, session: Session) -> Self {
        Self {
            config,
            store,
            session,
        }
    }

    /// Client carrying the saved token, if any.
    pub fn api(&self) -> Result<ApiClient> {
        Ok(ApiClient::from_config(&self.config)?.with_token(self.session.token.clone()))
    }

    /// Client for endpoints that need a login.
    pub fn authed_api(&self) -> Result<ApiClient> {
        self.session.require_token()?;
        self.api()
    }

    pub fn range(&self, days: Option<DateRange>) -> DateRange {
        days.unwrap_or_else(|| self.config.date_range())
    }

    pub async fn project_scope(&self, api: &ApiClient) -> Result<ProjectScope> {
        let projects = api.list_projects().await?;
        Ok(ProjectScope::restore(projects, self.session.last_project_id))
    }

    /// The project commands act on. Errors when none can be resolved.
    pub async fn current_project(&self, api: &ApiClient) -> Result<Project> {
        let scope = self.project_scope(api).await?;
        scope.current().cloned().ok_or(QaHubError::NoProjectSelected)
    }

    /// Context for a read-only page. A project list failure is reported but
    /// not fatal: the page loader decides whether sample data stands in.
    pub async fn page_context(&self, range: DateRange) -> Result<PageContext> {
        let api = self.api()?;
        let project = self.resolve_project(&api).await;
        debug!(?project, days = range.days(), "page context");
        Ok(PageContext::new(api, project, range.days(), &self.config))
    }

    async fn resolve_project(&self, api: &ApiClient) -> Option<ProjectId> {
        match self.project_scope(api).await {
            Ok(scope) => scope.current_id(),
            Err(e) => {
                warn!(error = %e, "project list unavailable");
                print_warning(project_load_error_message(&e));
                self.session.last_project_id
            }
        }
    }
}

/// Print the sample-data banner when `loaded` did not come from the backend.
pub(crate) fn announce_source<T>(loaded: &Loaded<T>) {
    if loaded.source.is_sample() {
        print_sample_notice();
    }
}
