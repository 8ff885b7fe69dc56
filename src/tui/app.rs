//! State and input handling for the dashboard TUI.
//!
//! [`App`] never performs I/O. Key presses and backend results go in
//! ([`App::handle_key`], [`App::apply`]); [`Command`]s come out for the
//! runtime in `tui::run_dashboard` to execute. Every fetch carries a
//! [`FetchTicket`] so a late response for a project, range or run the
//! user has already left is dropped instead of overwriting newer data.

use super::views::View;
use crate::api::types::*;
use crate::error::{QaHubError, Result};
use crate::fetch::{FetchKind, FetchTicket, FetchTracker, Scope};
use crate::filter::{DateFilter, DateRange};
use crate::pages::dashboard::DashboardData;
use crate::pages::flaky::{FlakyBoard, FlakyFilters, ManagedFlakyTest, PendingUpdate, Toast};
use crate::pages::run_details::{self, StatusFilter};
use crate::pages::trends::TrendsData;
use crate::pages::{settings, Loaded};
use crate::realtime::{ConnectionState, Level, NotificationCenter};
use crate::route::Route;
use crate::sample::DataSource;
use crate::session::{project_load_error_message, ProjectScope};
use chrono::{DateTime, Utc};
use crossterm::event::KeyCode;
use tracing::debug;

/// Work the runtime performs on behalf of the app.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Fetch(FetchTicket),
    /// Persist the selection and move the realtime subscription.
    ProjectChanged(Option<ProjectId>),
    UpdateFlaky(PendingUpdate),
    GenerateKey { project: ProjectId, name: String },
    RevokeKey { project: ProjectId, key: ApiKeyId },
}

/// Results and signals delivered back to the app.
#[derive(Debug)]
pub enum AppEvent {
    Projects(FetchTicket, Result<Vec<Project>>),
    Dashboard(FetchTicket, Result<Loaded<DashboardData>>),
    Runs(FetchTicket, Result<Loaded<Vec<TestRun>>>),
    RunDetails(FetchTicket, Result<Loaded<RunDetails>>),
    Analysis(FetchTicket, Result<Loaded<Analysis>>),
    FlakyTests(FetchTicket, Result<Loaded<Vec<FlakyTest>>>),
    Trends(FetchTicket, Result<Loaded<TrendsData>>),
    ApiKeys(FetchTicket, Result<Vec<ApiKey>>),
    FlakyUpdated(PendingUpdate, Result<()>),
    /// Tagged with the project the key belongs to.
    KeyGenerated(ProjectId, Result<(ApiKey, Vec<ApiKey>)>),
    KeyRevoked(ProjectId, Result<Vec<ApiKey>>),
    RunEvent(TestRunEvent),
    Connection(ConnectionState),
}

/// Load state of one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for PageState<T> {
    fn default() -> Self {
        PageState::Idle
    }
}

impl<T> PageState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            PageState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PageState::Loading)
    }

    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => PageState::Ready(data),
            Err(e) => PageState::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPurpose {
    CaseSearch,
    FlakySearch,
    KeyName,
}

/// A single-line text prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub purpose: InputPurpose,
    pub buffer: String,
}

pub struct App {
    view: View,
    /// Run shown in the details screen, if open.
    open_run: Option<RunId>,
    user: Option<User>,
    projects: ProjectScope,
    saved_project: Option<ProjectId>,
    projects_loaded: bool,
    filter: DateFilter,
    flaky_threshold: f64,
    tracker: FetchTracker,
    dashboard: PageState<Loaded<DashboardData>>,
    runs: PageState<Loaded<Vec<TestRun>>>,
    details: PageState<Loaded<RunDetails>>,
    analysis: PageState<Loaded<Analysis>>,
    case_query: String,
    case_status: StatusFilter,
    flaky: PageState<FlakyBoard>,
    flaky_filters: FlakyFilters,
    trends: PageState<Loaded<TrendsData>>,
    keys: PageState<Vec<ApiKey>>,
    new_key: Option<ApiKey>,
    reveal_secrets: bool,
    confirm_revoke: Option<ApiKeyId>,
    notifications: NotificationCenter,
    connection: ConnectionState,
    selected_index: usize,
    input: Option<Input>,
    should_quit: bool,
}

impl App {
    pub fn new(
        user: Option<User>,
        saved_project: Option<ProjectId>,
        range: DateRange,
        flaky_threshold: f64,
        notification_ttl: chrono::Duration,
    ) -> Self {
        Self {
            view: View::default(),
            open_run: None,
            user,
            projects: ProjectScope::default(),
            saved_project,
            projects_loaded: false,
            filter: DateFilter::new(range),
            flaky_threshold,
            tracker: FetchTracker::new(),
            dashboard: PageState::Idle,
            runs: PageState::Idle,
            details: PageState::Idle,
            analysis: PageState::Idle,
            case_query: String::new(),
            case_status: StatusFilter::default(),
            flaky: PageState::Idle,
            flaky_filters: FlakyFilters::default(),
            trends: PageState::Idle,
            keys: PageState::Idle,
            new_key: None,
            reveal_secrets: false,
            confirm_revoke: None,
            notifications: NotificationCenter::new(notification_ttl),
            connection: ConnectionState::default(),
            selected_index: 0,
            input: None,
            should_quit: false,
        }
    }

    /// Initial commands: the project list, which in turn loads the first page.
    pub fn start(&mut self) -> Vec<Command> {
        let ticket = self.tracker.issue(FetchKind::Projects, Scope::default());
        vec![Command::Fetch(ticket)]
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn open_run(&self) -> Option<RunId> {
        self.open_run
    }

    pub fn route(&self) -> Route {
        match self.open_run {
            Some(id) => Route::RunDetails(id),
            None => self.view.route(),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn projects(&self) -> &ProjectScope {
        &self.projects
    }

    pub fn date_range(&self) -> DateRange {
        self.filter.range()
    }

    pub fn flaky_threshold(&self) -> f64 {
        self.flaky_threshold
    }

    pub fn dashboard(&self) -> &PageState<Loaded<DashboardData>> {
        &self.dashboard
    }

    pub fn runs(&self) -> &PageState<Loaded<Vec<TestRun>>> {
        &self.runs
    }

    pub fn details(&self) -> &PageState<Loaded<RunDetails>> {
        &self.details
    }

    pub fn analysis(&self) -> &PageState<Loaded<Analysis>> {
        &self.analysis
    }

    pub fn case_query(&self) -> &str {
        &self.case_query
    }

    pub fn case_status(&self) -> StatusFilter {
        self.case_status
    }

    pub fn flaky(&self) -> &PageState<FlakyBoard> {
        &self.flaky
    }

    pub fn flaky_filters(&self) -> &FlakyFilters {
        &self.flaky_filters
    }

    pub fn trends(&self) -> &PageState<Loaded<TrendsData>> {
        &self.trends
    }

    pub fn keys(&self) -> &PageState<Vec<ApiKey>> {
        &self.keys
    }

    pub fn new_key(&self) -> Option<&ApiKey> {
        self.new_key.as_ref()
    }

    pub fn reveal_secrets(&self) -> bool {
        self.reveal_secrets
    }

    pub fn confirm_revoke(&self) -> Option<ApiKeyId> {
        self.confirm_revoke
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn input(&self) -> Option<&Input> {
        self.input.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Where the data on screen came from, once it has loaded.
    pub fn data_source(&self) -> Option<DataSource> {
        if self.open_run.is_some() {
            return self.details.ready().map(|l| l.source);
        }
        match self.view {
            View::Dashboard => self.dashboard.ready().map(|l| l.source),
            View::Runs => self.runs.ready().map(|l| l.source),
            View::FlakyTests => self.flaky.ready().map(|b| b.source()),
            View::Trends => self.trends.ready().map(|l| l.source),
            View::Settings => None,
        }
    }

    /// Runs listed on the current screen (dashboard panel or runs table).
    pub fn listed_runs(&self) -> &[TestRun] {
        match self.view {
            View::Dashboard => self
                .dashboard
                .ready()
                .map(|l| l.data.runs.as_slice())
                .unwrap_or(&[]),
            View::Runs => self
                .runs
                .ready()
                .map(|l| l.data.as_slice())
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    pub fn visible_cases(&self) -> Vec<&TestCase> {
        match self.details.ready() {
            Some(loaded) => {
                run_details::filter_cases(&loaded.data, &self.case_query, self.case_status)
            }
            None => Vec::new(),
        }
    }

    pub fn visible_flaky(&self) -> Vec<&ManagedFlakyTest> {
        match self.flaky.ready() {
            Some(board) => board.filtered(&self.flaky_filters),
            None => Vec::new(),
        }
    }

    fn list_len(&self) -> usize {
        if self.open_run.is_some() {
            return self.visible_cases().len();
        }
        match self.view {
            View::Dashboard | View::Runs => self.listed_runs().len(),
            View::FlakyTests => self.visible_flaky().len(),
            View::Settings => self.keys.ready().map(|k| k.len()).unwrap_or(0),
            View::Trends => 0,
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.list_len();
        if self.selected_index >= len {
            self.selected_index = len.saturating_sub(1);
        }
    }

    fn scope(&self) -> Scope {
        Scope {
            project: self.projects.current_id(),
            days: self.filter.days(),
            run: self.open_run,
        }
    }

    fn issue(&mut self, kind: FetchKind) -> Command {
        let ticket = self.tracker.issue(kind, self.scope());
        debug!(?kind, generation = ticket.generation, "fetch issued");
        Command::Fetch(ticket)
    }

    /// Fetch every data source of the visible screen once.
    pub fn load_current(&mut self) -> Vec<Command> {
        if !self.projects_loaded {
            return Vec::new();
        }
        if self.open_run.is_some() {
            self.details = PageState::Loading;
            return vec![self.issue(FetchKind::RunDetails)];
        }
        match self.view {
            View::Dashboard => {
                self.dashboard = PageState::Loading;
                vec![self.issue(FetchKind::Dashboard)]
            }
            View::Runs => {
                self.runs = PageState::Loading;
                vec![self.issue(FetchKind::Runs)]
            }
            View::FlakyTests => {
                self.flaky = PageState::Loading;
                vec![self.issue(FetchKind::FlakyTests)]
            }
            View::Trends => {
                self.trends = PageState::Loading;
                vec![self.issue(FetchKind::Trends)]
            }
            View::Settings => {
                if let Err(e) = settings::ensure_can_manage(self.user.as_ref()) {
                    self.keys = PageState::Failed(error_text(&e));
                    return Vec::new();
                }
                if self.projects.current_id().is_none() {
                    self.keys = PageState::Failed(QaHubError::NoProjectSelected.to_string());
                    return Vec::new();
                }
                self.keys = PageState::Loading;
                vec![self.issue(FetchKind::ApiKeys)]
            }
        }
    }

    pub fn navigate(&mut self, route: Route) -> Vec<Command> {
        let (view, run) = View::from_route(route);
        if run != self.open_run {
            self.case_query.clear();
            self.case_status = StatusFilter::default();
            self.analysis = PageState::Idle;
        }
        self.view = view;
        self.open_run = run;
        self.selected_index = 0;
        self.input = None;
        self.confirm_revoke = None;
        self.load_current()
    }

    /// Change the date range. Re-fetches the visible page only if the value
    /// changed and the page depends on it.
    pub fn set_range(&mut self, range: DateRange) -> Vec<Command> {
        if !self.filter.set(range) {
            return Vec::new();
        }
        if self.open_run.is_some() || !self.view.uses_date_range() {
            return Vec::new();
        }
        self.load_current()
    }

    /// Switch to the next project and reload.
    pub fn cycle_project(&mut self) -> Vec<Command> {
        let Some(id) = self.projects.next_id() else {
            return Vec::new();
        };
        if Some(id) == self.projects.current_id() || !self.projects.set_current(id) {
            return Vec::new();
        }
        self.tracker.invalidate_all();
        let mut commands = vec![Command::ProjectChanged(Some(id))];
        // A run belongs to the project it was opened from.
        let route = self.view.route();
        commands.extend(self.navigate(route));
        commands
    }

    /// Handle keyboard input.
    pub fn handle_key(&mut self, key: KeyCode) -> Vec<Command> {
        if self.input.is_some() {
            return self.handle_input_key(key);
        }
        if let Some(key_id) = self.confirm_revoke.take() {
            return match (key, self.projects.current_id()) {
                (KeyCode::Char('y') | KeyCode::Char('Y'), Some(project)) => {
                    vec![Command::RevokeKey {
                        project,
                        key: key_id,
                    }]
                }
                _ => Vec::new(),
            };
        }
        if self.new_key.is_some() {
            if matches!(key, KeyCode::Esc | KeyCode::Enter) {
                self.new_key = None;
            }
            return Vec::new();
        }

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Esc => {
                if self.open_run.is_some() {
                    return self.navigate(Route::Runs);
                }
                if let Some(id) = self.notifications.latest().map(|n| n.id) {
                    self.notifications.dismiss(id);
                }
                Vec::new()
            }
            KeyCode::Tab => self.navigate(self.view.next().route()),
            KeyCode::BackTab => self.navigate(self.view.prev().route()),
            KeyCode::Char(c @ '1'..='5') => match c.to_digit(10).and_then(View::from_number) {
                Some(view) => self.navigate(view.route()),
                None => Vec::new(),
            },
            KeyCode::Char('[') => self.set_range(self.filter.range().prev()),
            KeyCode::Char(']') => self.set_range(self.filter.range().next()),
            KeyCode::Char('p') => self.cycle_project(),
            KeyCode::Char('r') => self.load_current(),
            KeyCode::Char('o') => self.open_latest_notification(),
            KeyCode::Up => {
                self.selected_index = self.selected_index.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down => {
                if self.selected_index + 1 < self.list_len() {
                    self.selected_index += 1;
                }
                Vec::new()
            }
            KeyCode::Enter => self.handle_enter(),
            KeyCode::Char(c) => self.handle_view_key(c),
            _ => Vec::new(),
        }
    }

    fn handle_enter(&mut self) -> Vec<Command> {
        if self.open_run.is_some() {
            return Vec::new();
        }
        match self.listed_runs().get(self.selected_index).map(|r| r.id) {
            Some(id) => self.navigate(Route::RunDetails(id)),
            None => Vec::new(),
        }
    }

    fn handle_view_key(&mut self, c: char) -> Vec<Command> {
        if self.open_run.is_some() {
            match c {
                '/' => self.begin_input(InputPurpose::CaseSearch),
                's' => {
                    self.case_status = self.case_status.next();
                    self.selected_index = 0;
                }
                'a' => {
                    self.analysis = PageState::Loading;
                    return vec![self.issue(FetchKind::Analysis)];
                }
                _ => {}
            }
            return Vec::new();
        }

        match (self.view, c) {
            (View::FlakyTests, '/') => self.begin_input(InputPurpose::FlakySearch),
            (View::FlakyTests, 'f') => {
                self.flaky_filters.cycle_status();
                self.selected_index = 0;
            }
            (View::FlakyTests, 'k') => {
                self.flaky_filters.acknowledged = self.flaky_filters.acknowledged.next();
                self.selected_index = 0;
            }
            (View::FlakyTests, 'a') => return self.toggle_selected_ack(),
            (View::FlakyTests, 's') => return self.advance_selected_status(),
            (View::Settings, 'g') => {
                if self.can_edit_keys() {
                    self.begin_input(InputPurpose::KeyName);
                }
            }
            (View::Settings, 'd') => {
                if self.can_edit_keys() {
                    self.confirm_revoke = self
                        .keys
                        .ready()
                        .and_then(|keys| keys.get(self.selected_index))
                        .map(|k| k.id);
                }
            }
            (View::Settings, 'v') => self.reveal_secrets = !self.reveal_secrets,
            _ => {}
        }
        Vec::new()
    }

    fn can_edit_keys(&self) -> bool {
        self.keys.ready().is_some() && self.projects.current_id().is_some()
    }

    fn selected_flaky_id(&self) -> Option<String> {
        self.visible_flaky()
            .get(self.selected_index)
            .map(|t| t.id.clone())
    }

    fn toggle_selected_ack(&mut self) -> Vec<Command> {
        let Some(id) = self.selected_flaky_id() else {
            return Vec::new();
        };
        let PageState::Ready(board) = &mut self.flaky else {
            return Vec::new();
        };
        let pending = board.begin_toggle_ack(&id);
        self.clamp_selection();
        pending.map(Command::UpdateFlaky).into_iter().collect()
    }

    fn advance_selected_status(&mut self) -> Vec<Command> {
        let Some(id) = self.selected_flaky_id() else {
            return Vec::new();
        };
        let PageState::Ready(board) = &mut self.flaky else {
            return Vec::new();
        };
        let next = match board.get(&id) {
            Some(test) => test.resolution_status.next(),
            None => return Vec::new(),
        };
        let pending = board.begin_set_status(&id, next);
        self.clamp_selection();
        pending.map(Command::UpdateFlaky).into_iter().collect()
    }

    fn begin_input(&mut self, purpose: InputPurpose) {
        let buffer = match purpose {
            InputPurpose::CaseSearch => self.case_query.clone(),
            InputPurpose::FlakySearch => self.flaky_filters.query.clone(),
            InputPurpose::KeyName => String::new(),
        };
        self.input = Some(Input { purpose, buffer });
    }

    fn handle_input_key(&mut self, key: KeyCode) -> Vec<Command> {
        let Some(mut input) = self.input.take() else {
            return Vec::new();
        };
        match key {
            KeyCode::Esc => {
                if input.purpose != InputPurpose::KeyName {
                    input.buffer.clear();
                    self.apply_search(&input);
                }
                Vec::new()
            }
            KeyCode::Enter => {
                if input.purpose == InputPurpose::KeyName {
                    return self.submit_key_name(&input.buffer);
                }
                Vec::new()
            }
            KeyCode::Backspace => {
                input.buffer.pop();
                self.apply_search(&input);
                self.input = Some(input);
                Vec::new()
            }
            KeyCode::Char(c) => {
                input.buffer.push(c);
                self.apply_search(&input);
                self.input = Some(input);
                Vec::new()
            }
            _ => {
                self.input = Some(input);
                Vec::new()
            }
        }
    }

    /// Searches filter as you type.
    fn apply_search(&mut self, input: &Input) {
        match input.purpose {
            InputPurpose::CaseSearch => self.case_query = input.buffer.clone(),
            InputPurpose::FlakySearch => self.flaky_filters.query = input.buffer.clone(),
            InputPurpose::KeyName => return,
        }
        self.selected_index = 0;
    }

    fn submit_key_name(&mut self, name: &str) -> Vec<Command> {
        let Some(project) = self.projects.current_id() else {
            return Vec::new();
        };
        match settings::validate_key_name(name) {
            Ok(name) => vec![Command::GenerateKey { project, name }],
            Err(e) => {
                self.notify(Level::Error, "API Keys", error_text(&e), Utc::now());
                Vec::new()
            }
        }
    }

    /// "View Details" on the newest run notification.
    fn open_latest_notification(&mut self) -> Vec<Command> {
        let Some(id) = self.notifications.latest_run().map(|n| n.id) else {
            return Vec::new();
        };
        match self.notifications.open(id) {
            Some(route) => self.navigate(route),
            None => Vec::new(),
        }
    }

    fn notify(&mut self, level: Level, title: &str, message: String, now: DateTime<Utc>) {
        self.notifications.push(level, title, message, now);
    }

    /// Drop expired notifications.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.notifications.prune(now);
    }

    /// Apply a result or signal from the runtime.
    pub fn apply(&mut self, event: AppEvent, now: DateTime<Utc>) -> Vec<Command> {
        match event {
            AppEvent::Projects(ticket, result) => {
                if !self.tracker.complete(&ticket) {
                    return Vec::new();
                }
                self.projects_loaded = true;
                let mut commands = Vec::new();
                match result {
                    Ok(projects) => {
                        self.projects = ProjectScope::restore(projects, self.saved_project);
                        commands.push(Command::ProjectChanged(self.projects.current_id()));
                    }
                    Err(e) => {
                        let message = project_load_error_message(&e).to_string();
                        self.notify(Level::Error, "Projects", message, now);
                    }
                }
                commands.extend(self.load_current());
                commands
            }
            AppEvent::Dashboard(ticket, result) => {
                if self.tracker.complete(&ticket) {
                    self.dashboard = PageState::from_result(result);
                    self.clamp_selection();
                }
                Vec::new()
            }
            AppEvent::Runs(ticket, result) => {
                if self.tracker.complete(&ticket) {
                    self.runs = PageState::from_result(result);
                    self.clamp_selection();
                }
                Vec::new()
            }
            AppEvent::RunDetails(ticket, result) => {
                if self.tracker.complete(&ticket) && ticket.scope.run == self.open_run {
                    self.details = match result {
                        Err(QaHubError::Http { status: 404, .. }) => {
                            PageState::Failed(run_details::NOT_FOUND_MESSAGE.to_string())
                        }
                        other => PageState::from_result(other),
                    };
                    self.clamp_selection();
                }
                Vec::new()
            }
            AppEvent::Analysis(ticket, result) => {
                if self.tracker.complete(&ticket) && ticket.scope.run == self.open_run {
                    self.analysis = PageState::from_result(result);
                }
                Vec::new()
            }
            AppEvent::FlakyTests(ticket, result) => {
                if self.tracker.complete(&ticket) {
                    let project = ticket.scope.project;
                    self.flaky = PageState::from_result(
                        result.map(|loaded| FlakyBoard::new(loaded).for_project(project)),
                    );
                    self.clamp_selection();
                }
                Vec::new()
            }
            AppEvent::Trends(ticket, result) => {
                if self.tracker.complete(&ticket) {
                    self.trends = PageState::from_result(result);
                }
                Vec::new()
            }
            AppEvent::ApiKeys(ticket, result) => {
                if self.tracker.complete(&ticket) {
                    self.keys = match result {
                        Ok(keys) => PageState::Ready(keys),
                        Err(e) => PageState::Failed(error_text(&e)),
                    };
                    self.clamp_selection();
                }
                Vec::new()
            }
            AppEvent::FlakyUpdated(pending, outcome) => {
                let toast = match &mut self.flaky {
                    PageState::Ready(board) => board.settle(&pending, &outcome),
                    _ => Toast::settled(&pending, &outcome),
                };
                self.notify(toast.level, "Flaky Tests", toast.message, now);
                self.clamp_selection();
                Vec::new()
            }
            AppEvent::KeyGenerated(project, result) => {
                let current = self.projects.current_id() == Some(project);
                match result {
                    Ok((key, keys)) => {
                        if current {
                            self.keys = PageState::Ready(keys);
                            self.clamp_selection();
                        }
                        self.notify(
                            Level::Success,
                            "API Keys",
                            format!("Key '{}' created", key.name),
                            now,
                        );
                        self.new_key = Some(key);
                    }
                    Err(e) => self.notify(Level::Error, "API Keys", error_text(&e), now),
                }
                Vec::new()
            }
            AppEvent::KeyRevoked(project, result) => {
                let current = self.projects.current_id() == Some(project);
                match result {
                    Ok(keys) => {
                        if current {
                            self.keys = PageState::Ready(keys);
                            self.clamp_selection();
                        }
                        self.notify(Level::Success, "API Keys", "Key revoked".to_string(), now);
                    }
                    Err(e) => self.notify(Level::Error, "API Keys", error_text(&e), now),
                }
                Vec::new()
            }
            AppEvent::RunEvent(event) => {
                self.notifications.push_event(&event, now);
                Vec::new()
            }
            AppEvent::Connection(state) => {
                self.connection = state;
                Vec::new()
            }
        }
    }
}

/// Forbidden carries a user-facing sentence; everything else uses Display.
fn error_text(err: &QaHubError) -> String {
    match err {
        QaHubError::Forbidden(message) if !message.is_empty() => message.clone(),
        QaHubError::Validation(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::flaky::AckFilter;
    use crate::sample;

    fn user(role: &str) -> User {
        User {
            username: "sam".into(),
            role: role.into(),
        }
    }

    fn project(id: ProjectId, name: &str) -> Project {
        Project {
            id,
            name: name.into(),
            description: String::new(),
        }
    }

    fn app() -> App {
        App::new(
            Some(user("ADMIN")),
            Some(2),
            DateRange::Days30,
            0.0,
            chrono::Duration::seconds(8),
        )
    }

    fn fetches(commands: &[Command]) -> Vec<FetchTicket> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Fetch(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// App with projects loaded and the dashboard fetch outstanding.
    fn started() -> (App, FetchTicket) {
        let mut app = app();
        let start = fetches(&app.start());
        let commands = app.apply(
            AppEvent::Projects(start[0], Ok(vec![project(1, "Web"), project(2, "Mobile")])),
            Utc::now(),
        );
        let tickets = fetches(&commands);
        (app, tickets[0])
    }

    fn event(run_id: RunId) -> TestRunEvent {
        TestRunEvent {
            run_id,
            status: HealthStatus::Unhealthy,
            project_id: 2,
            project_name: "Mobile".into(),
            total_tests: 80,
            fail_count: 12,
            event_type: RunEventType::NewRun,
        }
    }

    #[test]
    fn test_app_handle_quit() {
        let mut app = app();
        assert!(!app.should_quit());
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit());
    }

    #[test]
    fn test_start_fetches_projects_only() {
        let mut app = app();
        let tickets = fetches(&app.start());
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].kind, FetchKind::Projects);
        // Pages wait for the project list.
        assert!(app.load_current().is_empty());
    }

    #[test]
    fn test_projects_restore_saved_selection_and_load_page() {
        let mut app = app();
        let start = fetches(&app.start());
        let commands = app.apply(
            AppEvent::Projects(start[0], Ok(vec![project(1, "Web"), project(2, "Mobile")])),
            Utc::now(),
        );
        assert_eq!(commands[0], Command::ProjectChanged(Some(2)));
        let tickets = fetches(&commands);
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].kind, FetchKind::Dashboard);
        assert_eq!(tickets[0].scope.project, Some(2));
        assert_eq!(tickets[0].scope.days, 30);
        assert!(app.dashboard().is_loading());
    }

    #[test]
    fn test_project_load_failure_notifies_and_still_loads() {
        let mut app = app();
        let start = fetches(&app.start());
        let commands = app.apply(
            AppEvent::Projects(start[0], Err(QaHubError::Unauthorized)),
            Utc::now(),
        );
        assert_eq!(fetches(&commands).len(), 1);
        let note = app.notifications().latest().unwrap();
        assert_eq!(note.level, Level::Error);
        assert_eq!(
            note.message,
            "No valid user logged in. Please login to fetch your projects."
        );
    }

    #[test]
    fn test_date_change_fetches_once_per_source() {
        let (mut app, _) = started();
        let commands = app.set_range(DateRange::Days7);
        let tickets = fetches(&commands);
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].kind, FetchKind::Dashboard);
        assert_eq!(tickets[0].scope.days, 7);

        // Same value again: nothing to do.
        assert!(app.set_range(DateRange::Days7).is_empty());

        app.navigate(Route::Trends);
        let tickets = fetches(&app.handle_key(KeyCode::Char(']')));
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].kind, FetchKind::Trends);
        assert_eq!(tickets[0].scope.days, 15);
    }

    #[test]
    fn test_date_change_on_settings_does_not_refetch() {
        let (mut app, _) = started();
        app.navigate(Route::Settings);
        assert!(app.set_range(DateRange::Days90).is_empty());
        assert_eq!(app.date_range(), DateRange::Days90);
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let (mut app, first) = started();
        let second = fetches(&app.set_range(DateRange::Days7))[0];

        app.apply(
            AppEvent::Dashboard(first, Ok(Loaded::live(DashboardData::sample()))),
            Utc::now(),
        );
        assert!(app.dashboard().is_loading());

        app.apply(
            AppEvent::Dashboard(second, Ok(Loaded::sample(DashboardData::sample()))),
            Utc::now(),
        );
        assert_eq!(app.data_source(), Some(DataSource::Sample));

        // Delivering the same ticket twice is ignored.
        app.apply(
            AppEvent::Dashboard(second, Err(QaHubError::Network("late".into()))),
            Utc::now(),
        );
        assert!(app.dashboard().ready().is_some());
    }

    #[test]
    fn test_tab_switches_view_and_fetches() {
        let (mut app, _) = started();
        let tickets = fetches(&app.handle_key(KeyCode::Tab));
        assert_eq!(app.view(), View::Runs);
        assert_eq!(tickets[0].kind, FetchKind::Runs);

        app.handle_key(KeyCode::BackTab);
        assert_eq!(app.view(), View::Dashboard);

        app.handle_key(KeyCode::Char('3'));
        assert_eq!(app.view(), View::FlakyTests);
        assert_eq!(app.route().path(), "/flaky-tests");
    }

    #[test]
    fn test_enter_opens_run_details_and_esc_returns() {
        let (mut app, _) = started();
        let runs = fetches(&app.navigate(Route::Runs))[0];
        app.apply(AppEvent::Runs(runs, Ok(Loaded::live(sample::runs()))), Utc::now());

        app.handle_key(KeyCode::Down);
        let tickets = fetches(&app.handle_key(KeyCode::Enter));
        assert_eq!(app.open_run(), Some(2));
        assert_eq!(app.route(), Route::RunDetails(2));
        assert_eq!(tickets[0].kind, FetchKind::RunDetails);
        assert_eq!(tickets[0].scope.run, Some(2));

        app.apply(
            AppEvent::RunDetails(tickets[0], Ok(Loaded::live(sample::run_details(2)))),
            Utc::now(),
        );
        assert_eq!(app.visible_cases().len(), 10);
        app.handle_key(KeyCode::Char('s'));
        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.case_status(), StatusFilter::Failed);
        assert_eq!(app.visible_cases().len(), 2);

        app.handle_key(KeyCode::Esc);
        assert_eq!(app.open_run(), None);
        assert_eq!(app.view(), View::Runs);
    }

    #[test]
    fn test_run_not_found_message() {
        let (mut app, _) = started();
        let ticket = fetches(&app.navigate(Route::RunDetails(999)))[0];
        app.apply(
            AppEvent::RunDetails(
                ticket,
                Err(QaHubError::Http {
                    status: 404,
                    body: String::new(),
                }),
            ),
            Utc::now(),
        );
        assert_eq!(
            app.details(),
            &PageState::Failed(run_details::NOT_FOUND_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_case_search_filters_as_you_type() {
        let (mut app, _) = started();
        let ticket = fetches(&app.navigate(Route::RunDetails(1)))[0];
        app.apply(
            AppEvent::RunDetails(ticket, Ok(Loaded::live(sample::run_details(1)))),
            Utc::now(),
        );
        app.handle_key(KeyCode::Char('/'));
        for c in "cart".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        assert_eq!(app.case_query(), "cart");
        app.handle_key(KeyCode::Enter);
        assert!(app.input().is_none());
        assert_eq!(app.case_query(), "cart");

        app.handle_key(KeyCode::Char('/'));
        app.handle_key(KeyCode::Esc);
        assert_eq!(app.case_query(), "");
    }

    #[test]
    fn test_flaky_ack_rolls_back_on_failure() {
        let (mut app, _) = started();
        let ticket = fetches(&app.navigate(Route::FlakyTests))[0];
        app.apply(
            AppEvent::FlakyTests(ticket, Ok(Loaded::live(sample::flaky_tests()))),
            Utc::now(),
        );

        let commands = app.handle_key(KeyCode::Char('a'));
        let pending = match &commands[..] {
            [Command::UpdateFlaky(p)] => p.clone(),
            other => panic!("unexpected commands: {:?}", other),
        };
        assert_eq!(pending.id, "flaky-0");
        assert!(app.visible_flaky()[0].acknowledged);

        app.apply(
            AppEvent::FlakyUpdated(pending, Err(QaHubError::Network("down".into()))),
            Utc::now(),
        );
        assert!(!app.visible_flaky()[0].acknowledged);
        let note = app.notifications().latest().unwrap();
        assert_eq!(note.level, Level::Error);
        assert_eq!(note.message, "Failed to update acknowledgement status");
    }

    #[test]
    fn test_late_flaky_failure_does_not_touch_other_project() {
        let (mut app, _) = started();
        let ticket = fetches(&app.navigate(Route::FlakyTests))[0];
        app.apply(
            AppEvent::FlakyTests(ticket, Ok(Loaded::live(sample::flaky_tests()))),
            Utc::now(),
        );
        let pending = match &app.handle_key(KeyCode::Char('a'))[..] {
            [Command::UpdateFlaky(p)] => p.clone(),
            other => panic!("unexpected commands: {:?}", other),
        };
        assert_eq!(pending.project, Some(2));

        let reload = fetches(&app.handle_key(KeyCode::Char('p')));
        assert_eq!(reload[0].kind, FetchKind::FlakyTests);
        assert_eq!(reload[0].scope.project, Some(1));
        let mut other = sample::flaky_tests();
        other.reverse();
        app.apply(AppEvent::FlakyTests(reload[0], Ok(Loaded::live(other))), Utc::now());
        assert_eq!(app.visible_flaky()[0].test_name, "testCacheInvalidation");
        assert!(app.visible_flaky()[0].acknowledged);

        app.apply(
            AppEvent::FlakyUpdated(pending, Err(QaHubError::Network("down".into()))),
            Utc::now(),
        );
        let rows = app.visible_flaky();
        assert!(rows[0].acknowledged);
        assert!(!rows[5].acknowledged);
        let note = app.notifications().latest().unwrap();
        assert_eq!(note.level, Level::Error);
        assert_eq!(note.message, "Failed to update acknowledgement status");
    }

    #[test]
    fn test_flaky_filter_keys() {
        let (mut app, _) = started();
        let ticket = fetches(&app.navigate(Route::FlakyTests))[0];
        app.apply(
            AppEvent::FlakyTests(ticket, Ok(Loaded::sample(sample::flaky_tests()))),
            Utc::now(),
        );
        app.handle_key(KeyCode::Char('k'));
        assert_eq!(app.flaky_filters().acknowledged, AckFilter::Acknowledged);
        assert_eq!(app.visible_flaky().len(), 3);
        assert_eq!(app.data_source(), Some(DataSource::Sample));
    }

    #[test]
    fn test_notification_opens_run_details() {
        let (mut app, _) = started();
        app.apply(AppEvent::RunEvent(event(42)), Utc::now());
        assert_eq!(app.notifications().active().len(), 1);

        let tickets = fetches(&app.handle_key(KeyCode::Char('o')));
        assert_eq!(app.route(), Route::RunDetails(42));
        assert_eq!(tickets[0].kind, FetchKind::RunDetails);
        assert!(app.notifications().is_empty());
    }

    #[test]
    fn test_notifications_expire_on_tick() {
        let (mut app, _) = started();
        let now = Utc::now();
        app.apply(AppEvent::RunEvent(event(1)), now);
        app.tick(now + chrono::Duration::seconds(4));
        assert_eq!(app.notifications().active().len(), 1);
        app.tick(now + chrono::Duration::seconds(9));
        assert!(app.notifications().is_empty());
    }

    #[test]
    fn test_cycle_project_persists_and_reloads() {
        let (mut app, _) = started();
        let commands = app.handle_key(KeyCode::Char('p'));
        assert_eq!(commands[0], Command::ProjectChanged(Some(1)));
        let tickets = fetches(&commands);
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].scope.project, Some(1));
    }

    #[test]
    fn test_settings_denied_for_viewer() {
        let mut app = App::new(
            Some(user("USER")),
            None,
            DateRange::Days30,
            0.0,
            chrono::Duration::seconds(8),
        );
        let start = fetches(&app.start());
        app.apply(AppEvent::Projects(start[0], Ok(vec![project(1, "Web")])), Utc::now());
        assert!(app.navigate(Route::Settings).is_empty());
        assert_eq!(
            app.keys(),
            &PageState::Failed(settings::ACCESS_DENIED_MESSAGE.to_string())
        );
        app.handle_key(KeyCode::Char('g'));
        assert!(app.input().is_none());
    }

    #[test]
    fn test_generate_key_rejects_blank_name() {
        let (mut app, _) = started();
        let ticket = fetches(&app.navigate(Route::Settings))[0];
        assert_eq!(ticket.kind, FetchKind::ApiKeys);
        app.apply(AppEvent::ApiKeys(ticket, Ok(Vec::new())), Utc::now());

        app.handle_key(KeyCode::Char('g'));
        app.handle_key(KeyCode::Char(' '));
        assert!(app.handle_key(KeyCode::Enter).is_empty());
        assert_eq!(app.notifications().latest().unwrap().level, Level::Error);

        app.handle_key(KeyCode::Char('g'));
        for c in "ci".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        assert_eq!(
            app.handle_key(KeyCode::Enter),
            vec![Command::GenerateKey {
                project: 2,
                name: "ci".into()
            }]
        );
    }

    #[test]
    fn test_revoke_requires_confirmation() {
        let (mut app, _) = started();
        let ticket = fetches(&app.navigate(Route::Settings))[0];
        let key = ApiKey {
            id: 9,
            name: "ci".into(),
            secret_key: "qa_0123456789".into(),
            created_at: Utc::now(),
            last_used_at: None,
        };
        app.apply(AppEvent::ApiKeys(ticket, Ok(vec![key])), Utc::now());

        app.handle_key(KeyCode::Char('d'));
        assert_eq!(app.confirm_revoke(), Some(9));
        assert!(app.handle_key(KeyCode::Char('n')).is_empty());
        assert_eq!(app.confirm_revoke(), None);

        app.handle_key(KeyCode::Char('d'));
        assert_eq!(
            app.handle_key(KeyCode::Char('y')),
            vec![Command::RevokeKey { project: 2, key: 9 }]
        );
    }

    fn api_key(id: ApiKeyId, name: &str) -> ApiKey {
        ApiKey {
            id,
            name: name.into(),
            secret_key: format!("qa_{}_0123456789", name),
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[test]
    fn test_late_key_results_keep_current_project_list() {
        let (mut app, _) = started();
        let ticket = fetches(&app.navigate(Route::Settings))[0];
        app.apply(AppEvent::ApiKeys(ticket, Ok(vec![api_key(9, "ci")])), Utc::now());

        let reload = fetches(&app.handle_key(KeyCode::Char('p')));
        assert_eq!(reload[0].kind, FetchKind::ApiKeys);
        assert_eq!(reload[0].scope.project, Some(1));
        let current = vec![api_key(4, "web-ci")];
        app.apply(AppEvent::ApiKeys(reload[0], Ok(current.clone())), Utc::now());

        app.apply(AppEvent::KeyRevoked(2, Ok(Vec::new())), Utc::now());
        assert_eq!(app.keys(), &PageState::Ready(current.clone()));
        assert_eq!(app.notifications().latest().unwrap().level, Level::Success);

        let late = api_key(10, "nightly");
        app.apply(
            AppEvent::KeyGenerated(2, Ok((late.clone(), vec![api_key(9, "ci"), late]))),
            Utc::now(),
        );
        assert_eq!(app.keys(), &PageState::Ready(current.clone()));

        app.apply(AppEvent::KeyRevoked(1, Ok(Vec::new())), Utc::now());
        assert_eq!(app.keys(), &PageState::Ready(Vec::new()));
    }

    #[test]
    fn test_connection_state_is_tracked() {
        let mut app = app();
        assert_eq!(app.connection(), ConnectionState::Disconnected);
        app.apply(AppEvent::Connection(ConnectionState::Subscribed), Utc::now());
        assert_eq!(app.connection(), ConnectionState::Subscribed);
    }
}
