//! Interactive dashboard (`qahub dashboard`).
//!
//! The event loop runs on a blocking thread and owns the [`App`]. Fetches
//! and mutations are spawned onto the tokio runtime and report back over
//! an unbounded channel as [`AppEvent`]s. The realtime listener lives for
//! the whole session and follows the selected project.

pub mod app;
pub mod ui;
pub mod views;

pub use app::{App, AppEvent, Command, PageState};
pub use views::View;

use crate::api::types::{ProjectId, TestRunEvent, User};
use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{QaHubError, Result};
use crate::fetch::{FetchKind, FetchTicket};
use crate::filter::DateRange;
use crate::pages::{dashboard, flaky, run_details, runs, settings, trends, PageContext};
use crate::realtime::{BrokerSettings, RealtimeListener, StompBroker};
use crate::route::Route;
use crate::session::SessionStore;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Options from the command line.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub range: DateRange,
    pub flaky_threshold: f64,
    /// Screen to open first, e.g. `/runs/42`.
    pub initial_route: Option<Route>,
}

/// Initialize the terminal for TUI mode.
pub fn init_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

type PanicHook = Arc<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

/// Runs `restore` ahead of the previous panic hook for as long as it is
/// alive, then puts the previous hook back.
struct PanicRestore {
    previous: PanicHook,
}

impl PanicRestore {
    fn install(restore: impl Fn() + Send + Sync + 'static) -> Self {
        let previous: PanicHook = Arc::from(panic::take_hook());
        let chained = Arc::clone(&previous);
        panic::set_hook(Box::new(move |info| {
            restore();
            chained(info);
        }));
        Self { previous }
    }
}

impl Drop for PanicRestore {
    fn drop(&mut self) {
        // set_hook may not be called while unwinding.
        if std::thread::panicking() {
            return;
        }
        let previous = Arc::clone(&self.previous);
        panic::set_hook(Box::new(move |info| previous(info)));
    }
}

/// Executes [`Command`]s against the backend and the realtime listener.
struct Executor {
    runtime: Handle,
    api: ApiClient,
    user: Option<User>,
    sample_fallback: bool,
    flaky_threshold: f64,
    store: SessionStore,
    listener: RealtimeListener<StompBroker>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl Executor {
    fn execute(&mut self, command: Command) {
        match command {
            Command::Fetch(ticket) => self.fetch(ticket),
            Command::ProjectChanged(project) => self.project_changed(project),
            Command::UpdateFlaky(pending) => {
                let api = self.api.clone();
                let events = self.events.clone();
                self.runtime.spawn(async move {
                    let outcome = flaky::commit(&api, &pending).await;
                    let _ = events.send(AppEvent::FlakyUpdated(pending, outcome));
                });
            }
            Command::GenerateKey { project, name } => {
                let api = self.api.clone();
                let user = self.user.clone();
                let events = self.events.clone();
                self.runtime.spawn(async move {
                    let result = settings::generate(&api, user.as_ref(), project, &name).await;
                    let _ = events.send(AppEvent::KeyGenerated(project, result));
                });
            }
            Command::RevokeKey { project, key } => {
                let api = self.api.clone();
                let user = self.user.clone();
                let events = self.events.clone();
                self.runtime.spawn(async move {
                    let result = settings::revoke(&api, user.as_ref(), project, key).await;
                    let _ = events.send(AppEvent::KeyRevoked(project, result));
                });
            }
        }
    }

    fn project_changed(&mut self, project: Option<ProjectId>) {
        if let Some(id) = project {
            if let Err(e) = self.store.set_last_project(Some(id)) {
                warn!(error = %e, "could not persist project selection");
            }
        }
        if let Err(e) = self.listener.set_project(project) {
            warn!(error = %e, "realtime subscription failed");
        }
    }

    fn fetch(&self, ticket: FetchTicket) {
        let ctx = PageContext {
            api: self.api.clone(),
            project: ticket.scope.project,
            days: ticket.scope.days,
            sample_fallback: self.sample_fallback,
        };
        let user = self.user.clone();
        let threshold = self.flaky_threshold;
        let events = self.events.clone();

        self.runtime.spawn(async move {
            let event = match ticket.kind {
                FetchKind::Projects => AppEvent::Projects(ticket, ctx.api.list_projects().await),
                FetchKind::Dashboard => AppEvent::Dashboard(ticket, dashboard::load(&ctx).await),
                FetchKind::Runs => AppEvent::Runs(ticket, runs::load(&ctx).await),
                FetchKind::RunDetails => {
                    let result = match ticket.scope.run {
                        Some(run) => run_details::load(&ctx, run).await,
                        None => Err(no_run()),
                    };
                    AppEvent::RunDetails(ticket, result)
                }
                FetchKind::Analysis => {
                    let result = match ticket.scope.run {
                        Some(run) => run_details::analyze(&ctx, run).await,
                        None => Err(no_run()),
                    };
                    AppEvent::Analysis(ticket, result)
                }
                FetchKind::FlakyTests => {
                    AppEvent::FlakyTests(ticket, flaky::load(&ctx, threshold).await)
                }
                FetchKind::Trends => AppEvent::Trends(ticket, trends::load(&ctx).await),
                FetchKind::ApiKeys => {
                    let result = match ctx.project {
                        Some(project) => settings::list(&ctx.api, user.as_ref(), project).await,
                        None => Err(QaHubError::NoProjectSelected),
                    };
                    AppEvent::ApiKeys(ticket, result)
                }
            };
            let _ = events.send(event);
        });
    }
}

fn no_run() -> QaHubError {
    QaHubError::Validation("No run selected".to_string())
}

/// Forward realtime events and connection changes into the app channel.
fn spawn_forwarders(
    runtime: &Handle,
    listener: &RealtimeListener<StompBroker>,
    mut run_events: mpsc::UnboundedReceiver<TestRunEvent>,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    let run_tx = events.clone();
    runtime.spawn(async move {
        while let Some(event) = run_events.recv().await {
            if run_tx.send(AppEvent::RunEvent(event)).is_err() {
                break;
            }
        }
    });

    let mut state = listener.state();
    runtime.spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            if events.send(AppEvent::Connection(current)).is_err() {
                break;
            }
        }
    });
}

/// Run the dashboard until the user quits.
///
/// Blocks the calling thread; call it from a blocking context such as
/// `tokio::task::block_in_place`.
pub fn run_dashboard(
    runtime: Handle,
    config: &Config,
    store: SessionStore,
    options: DashboardOptions,
) -> Result<()> {
    let session = store.load()?;
    let api = ApiClient::from_config(config)?.with_token(session.token.clone());
    let broker = StompBroker::new(BrokerSettings::from_config(config)?, runtime.clone());

    let (app_tx, mut app_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (run_tx, run_rx) = mpsc::unbounded_channel::<TestRunEvent>();
    let listener = RealtimeListener::new(broker, run_tx);
    spawn_forwarders(&runtime, &listener, run_rx, app_tx.clone());

    let mut app = App::new(
        session.user.clone(),
        session.last_project_id,
        options.range,
        options.flaky_threshold,
        config.notification_ttl(),
    );
    let mut executor = Executor {
        runtime,
        api,
        user: session.user,
        sample_fallback: config.sample_fallback,
        flaky_threshold: options.flaky_threshold,
        store,
        listener,
        events: app_tx,
    };

    // Leave raw mode on panic; `watch` and later commands get the old hook back.
    let _panic_restore = PanicRestore::install(|| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    });

    let mut terminal = init_terminal()?;
    info!(api = %config.api_url, "dashboard started");

    for command in app.start() {
        executor.execute(command);
    }
    if let Some(route) = options.initial_route {
        for command in app.navigate(route) {
            executor.execute(command);
        }
    }

    let result = event_loop(&mut terminal, &mut app, &mut executor, &mut app_rx);

    // Unsubscribe before the terminal is handed back.
    drop(executor);
    restore_terminal(&mut terminal)?;
    info!("dashboard closed");
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    executor: &mut Executor,
    events: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(INPUT_POLL)? {
            // Only handle key press events (not release or repeat)
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    for command in app.handle_key(key.code) {
                        executor.execute(command);
                    }
                }
            }
        }

        while let Ok(event) = events.try_recv() {
            for command in app.apply(event, Utc::now()) {
                executor.execute(command);
            }
        }
        app.tick(Utc::now());

        if app.should_quit() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_panic_restore_is_removed_on_drop() {
        let restored = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&restored);
        let guard = PanicRestore::install(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(panic::catch_unwind(|| panic!("inside the dashboard")).is_err());
        assert_eq!(restored.load(Ordering::SeqCst), 1);

        drop(guard);
        assert!(panic::catch_unwind(|| panic!("after the dashboard")).is_err());
        assert_eq!(restored.load(Ordering::SeqCst), 1);
    }
}
