//! Run commands: list, details, analysis, deletion.

use super::{announce_source, CliContext};
use crate::api::types::RunId;
use crate::error::{QaHubError, Result};
use crate::filter::DateRange;
use crate::output::{print_analysis, print_info, print_run_details, print_runs, print_success, Spinner};
use crate::pages::run_details::{self, filter_cases, StatusFilter, NOT_FOUND_MESSAGE};
use crate::pages::runs;
use crate::prompt;
use tracing::info;

/// Filters for `qahub run <id>`.
#[derive(Debug, Clone, Default)]
pub struct RunViewOptions {
    pub search: String,
    pub status: StatusFilter,
}

pub async fn runs_command(
    ctx: &CliContext,
    days: Option<DateRange>,
    limit: Option<usize>,
) -> Result<()> {
    let page = ctx.page_context(ctx.range(days)).await?;
    let mut loaded = runs::load(&page).await?;
    announce_source(&loaded);
    if let Some(limit) = limit {
        loaded.data.truncate(limit);
    }
    print_runs(&loaded.data);
    Ok(())
}

fn not_found(err: QaHubError, id: RunId) -> QaHubError {
    match err {
        QaHubError::Http { status: 404, .. } => {
            QaHubError::Validation(format!("{}: #{}", NOT_FOUND_MESSAGE, id))
        }
        other => other,
    }
}

pub async fn run_command(ctx: &CliContext, id: RunId, options: &RunViewOptions) -> Result<()> {
    let page = ctx.page_context(ctx.range(None)).await?;
    let loaded = run_details::load(&page, id)
        .await
        .map_err(|e| not_found(e, id))?;
    announce_source(&loaded);

    let cases = filter_cases(&loaded.data, &options.search, options.status);
    print_run_details(&loaded.data, &cases);

    if let Some(analysis) = &loaded.data.run.ai_analysis {
        println!();
        print_analysis(analysis);
    }
    Ok(())
}

pub async fn analyze_command(ctx: &CliContext, id: RunId) -> Result<()> {
    let page = ctx.page_context(ctx.range(None)).await?;
    let spinner = Spinner::start(format!("Analyzing run #{}...", id));
    let result = run_details::analyze(&page, id).await;
    spinner.finish();

    let loaded = result.map_err(|e| not_found(e, id))?;
    announce_source(&loaded);
    print_analysis(&loaded.data);
    Ok(())
}

pub async fn delete_run_command(ctx: &CliContext, id: RunId, yes: bool) -> Result<()> {
    let api = ctx.authed_api()?;
    if !yes && !prompt::confirm(&format!("Delete run #{}?", id), false) {
        print_info("Nothing deleted.");
        return Ok(());
    }
    api.delete_run(id).await.map_err(|e| not_found(e, id))?;
    info!(run = id, "run deleted");
    print_success(&format!("Deleted run #{}", id));
    Ok(())
}
