//! Trend and failure reports.

use super::{announce_source, CliContext};
use crate::error::Result;
use crate::filter::DateRange;
use crate::output::{print_failures, print_trends};
use crate::pages::{or_sample, trends};
use crate::sample;

pub async fn trends_command(ctx: &CliContext, days: Option<DateRange>) -> Result<()> {
    let page = ctx.page_context(ctx.range(days)).await?;
    let loaded = trends::load(&page).await?;
    announce_source(&loaded);
    print_trends(&loaded.data);
    Ok(())
}

/// Most frequent error messages in the period.
pub async fn failures_command(ctx: &CliContext, days: Option<DateRange>, limit: u32) -> Result<()> {
    let page = ctx.page_context(ctx.range(days)).await?;
    let result = match page.require_project() {
        Ok(project) => page.api.top_failures(limit, page.days, project).await,
        Err(e) => Err(e),
    };
    let mut loaded = or_sample(result, page.sample_fallback, "top failures", sample::top_failures)?;
    announce_source(&loaded);
    loaded.data.truncate(limit as usize);
    print_failures(&loaded.data);
    Ok(())
}
