//! Flaky test commands: list, acknowledge, change resolution status.
//!
//! Mutations work against live data only; sample data is never updated.

use super::{announce_source, CliContext};
use crate::api::types::ResolutionStatus;
use crate::api::ApiClient;
use crate::error::{QaHubError, Result};
use crate::filter::DateRange;
use crate::output::{print_flaky_tests, print_info, print_success, print_warning};
use crate::pages::flaky::{self, AckFilter, FlakyBoard, FlakyFilters, PendingUpdate};
use crate::pages::Loaded;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct FlakyListOptions {
    pub days: Option<DateRange>,
    pub threshold: f64,
    pub search: String,
    pub status: Option<ResolutionStatus>,
    pub acknowledged: AckFilter,
}

pub async fn flaky_list_command(ctx: &CliContext, options: &FlakyListOptions) -> Result<()> {
    let threshold = flaky::validate_threshold(options.threshold)?;
    let page = ctx.page_context(ctx.range(options.days)).await?;
    let loaded = flaky::load(&page, threshold).await?;
    announce_source(&loaded);

    let board = FlakyBoard::new(loaded);
    let filters = FlakyFilters {
        query: options.search.clone(),
        status: options.status,
        acknowledged: options.acknowledged,
    };
    print_flaky_tests(&board.filtered(&filters), board.stats());
    Ok(())
}

async fn live_board(ctx: &CliContext, api: &ApiClient, days: Option<DateRange>) -> Result<FlakyBoard> {
    let project = ctx.current_project(api).await?;
    let response = api
        .flaky_tests(ctx.range(days).days(), flaky::DEFAULT_THRESHOLD, project.id)
        .await?;
    Ok(FlakyBoard::new(Loaded::live(response.tests)).for_project(Some(project.id)))
}

fn resolve_id(board: &FlakyBoard, test: &str) -> Result<String> {
    board
        .find(test)
        .map(|t| t.id.clone())
        .ok_or_else(|| QaHubError::Validation(format!("No flaky test matches '{}'", test)))
}

/// Send an update already applied to `board`, reporting the settled result.
async fn commit(api: &ApiClient, board: &mut FlakyBoard, pending: PendingUpdate) -> Result<()> {
    let outcome = flaky::commit(api, &pending).await;
    let toast = board.settle(&pending, &outcome);
    match outcome {
        Ok(()) => {
            print_success(&toast.message);
            Ok(())
        }
        Err(e) => {
            warn!(test = %pending.id, error = %e, "flaky update rejected");
            print_warning(&toast.message);
            Err(e)
        }
    }
}

pub async fn flaky_ack_command(
    ctx: &CliContext,
    test: &str,
    acknowledge: bool,
    days: Option<DateRange>,
) -> Result<()> {
    let api = ctx.authed_api()?;
    let mut board = live_board(ctx, &api, days).await?;
    let id = resolve_id(&board, test)?;

    if board.get(&id).is_some_and(|t| t.acknowledged == acknowledge) {
        let state = if acknowledge { "acknowledged" } else { "unacknowledged" };
        print_info(&format!("{} is already {}.", test, state));
        return Ok(());
    }

    let pending = board
        .begin_toggle_ack(&id)
        .ok_or_else(|| QaHubError::Validation(format!("No flaky test matches '{}'", test)))?;
    commit(&api, &mut board, pending).await
}

pub async fn flaky_status_command(
    ctx: &CliContext,
    test: &str,
    status: ResolutionStatus,
    days: Option<DateRange>,
) -> Result<()> {
    let api = ctx.authed_api()?;
    let mut board = live_board(ctx, &api, days).await?;
    let id = resolve_id(&board, test)?;

    if board.get(&id).is_some_and(|t| t.resolution_status == status) {
        print_info(&format!("{} is already {}.", test, status.label()));
        return Ok(());
    }

    let pending = board
        .begin_set_status(&id, status)
        .ok_or_else(|| QaHubError::Validation(format!("No flaky test matches '{}'", test)))?;
    commit(&api, &mut board, pending).await
}
