//! `qahub dashboard`: the full-screen view.

use super::CliContext;
use crate::error::{QaHubError, Result};
use crate::filter::DateRange;
use crate::logging;
use crate::pages::flaky::validate_threshold;
use crate::route::Route;
use crate::tui::{self, DashboardOptions};
use tokio::runtime::Handle;

pub async fn dashboard_command(
    ctx: &CliContext,
    days: Option<DateRange>,
    flaky_threshold: f64,
    open: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let initial_route = match open {
        Some(path) => Some(Route::parse(path).ok_or_else(|| {
            QaHubError::Validation(format!(
                "Unknown screen '{}'. Try /runs, /runs/<id>, /flaky-tests, /trends or /settings",
                path
            ))
        })?),
        None => None,
    };
    let options = DashboardOptions {
        range: ctx.range(days),
        flaky_threshold: validate_threshold(flaky_threshold)?,
        initial_route,
    };

    // Held until the dashboard closes so buffered log lines are flushed.
    let _guard = logging::init_file(verbose)?;

    let runtime = Handle::current();
    let config = ctx.config.clone();
    let store = ctx.store.clone();
    tokio::task::block_in_place(move || tui::run_dashboard(runtime, &config, store, options))
}
