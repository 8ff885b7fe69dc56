use crate::api::types::{LoginResponse, Project, ProjectId, User};
use crate::config::config_dir;
use crate::error::{QaHubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const SESSION_FILE: &str = "session.json";

/// What survives between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_project_id: Option<ProjectId>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The bearer token, or `NotLoggedIn`.
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(QaHubError::NotLoggedIn)
    }

    pub fn can_manage_keys(&self) -> bool {
        self.user.as_ref().is_some_and(User::can_manage_keys)
    }
}

/// Reads and writes `session.json` in the config directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_dir: PathBuf,
}

impl SessionStore {
    pub fn new() -> Result<Self> {
        Ok(Self {
            base_dir: config_dir()?,
        })
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        Self { base_dir: dir }
    }

    fn session_file(&self) -> PathBuf {
        self.base_dir.join(SESSION_FILE)
    }

    /// Missing file means an empty, logged-out session.
    pub fn load(&self) -> Result<Session> {
        let path = self.session_file();
        if !path.exists() {
            return Ok(Session::default());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| QaHubError::Session(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        let content = serde_json::to_string_pretty(session)?;
        fs::write(self.session_file(), content)?;
        debug!(path = %self.session_file().display(), "session saved");
        Ok(())
    }

    /// Store the token and user from a successful login.
    pub fn login(&self, response: &LoginResponse) -> Result<Session> {
        let mut session = self.load()?;
        session.token = Some(response.token.clone());
        session.user = Some(User::from(response));
        self.save(&session)?;
        Ok(session)
    }

    /// Clear credentials. The last project id is kept for the next login.
    pub fn logout(&self) -> Result<Session> {
        let mut session = self.load()?;
        session.token = None;
        session.user = None;
        self.save(&session)?;
        Ok(session)
    }

    pub fn set_last_project(&self, id: Option<ProjectId>) -> Result<()> {
        let mut session = self.load()?;
        session.last_project_id = id;
        self.save(&session)
    }
}

/// The project list plus the active selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectScope {
    projects: Vec<Project>,
    current: Option<ProjectId>,
}

impl ProjectScope {
    /// Pick the saved project if it is still listed, else the first one.
    pub fn restore(projects: Vec<Project>, saved_id: Option<ProjectId>) -> Self {
        let current = saved_id
            .filter(|id| projects.iter().any(|p| p.id == *id))
            .or_else(|| projects.first().map(|p| p.id));
        Self { projects, current }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn current(&self) -> Option<&Project> {
        let id = self.current?;
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn current_id(&self) -> Option<ProjectId> {
        self.current
    }

    /// Resolve a project by numeric id or case-insensitive name.
    pub fn find(&self, id_or_name: &str) -> Option<&Project> {
        let needle = id_or_name.trim();
        if let Ok(id) = needle.parse::<ProjectId>() {
            if let Some(p) = self.projects.iter().find(|p| p.id == id) {
                return Some(p);
            }
        }
        self.projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(needle))
    }

    /// Make `id` current without persisting. False if it is not listed.
    pub fn set_current(&mut self, id: ProjectId) -> bool {
        if self.projects.iter().any(|p| p.id == id) {
            self.current = Some(id);
            true
        } else {
            false
        }
    }

    /// Id of the project after the current one, wrapping.
    pub fn next_id(&self) -> Option<ProjectId> {
        if self.projects.is_empty() {
            return None;
        }
        let idx = self
            .current
            .and_then(|id| self.projects.iter().position(|p| p.id == id))
            .map(|i| (i + 1) % self.projects.len())
            .unwrap_or(0);
        Some(self.projects[idx].id)
    }

    /// Make `id` current and persist it. Returns the selected project.
    pub fn select(&mut self, id: ProjectId, store: &SessionStore) -> Result<&Project> {
        if !self.projects.iter().any(|p| p.id == id) {
            return Err(QaHubError::ProjectNotFound(id.to_string()));
        }
        store.set_last_project(Some(id))?;
        self.current = Some(id);
        self.current().ok_or_else(|| QaHubError::ProjectNotFound(id.to_string()))
    }

    /// Select the next project in list order, wrapping. `None` if the list is empty.
    pub fn cycle(&mut self, store: &SessionStore) -> Result<Option<&Project>> {
        match self.next_id() {
            Some(id) => self.select(id, store).map(Some),
            None => Ok(None),
        }
    }
}

/// Message shown when the project list cannot be fetched.
pub fn project_load_error_message(err: &QaHubError) -> &'static str {
    match err {
        QaHubError::Forbidden(_) | QaHubError::Unauthorized => {
            "No valid user logged in. Please login to fetch your projects."
        }
        _ => "Failed to load projects. Ensure backend is running.",
    }
}
