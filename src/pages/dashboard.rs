use super::{or_sample, Loaded, PageContext};
use crate::api::types::*;
use crate::api::DASHBOARD_PANEL_LIMIT;
use crate::error::Result;
use crate::sample;

/// Flaky panel shows at most this many cards.
pub const FLAKY_PANEL_MAX: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub metrics: DashboardMetrics,
    pub trends: Vec<TrendData>,
    pub top_failures: Vec<TopFailure>,
    pub flaky_tests: Vec<FlakyTest>,
    pub runs: Vec<TestRun>,
}

impl DashboardData {
    pub fn sample() -> Self {
        Self {
            metrics: sample::dashboard_metrics(),
            trends: sample::trends(),
            top_failures: sample::top_failures(),
            flaky_tests: sample::dashboard_flaky_tests(),
            runs: sample::recent_runs(),
        }
    }

    /// Failures in the most recent trend point.
    pub fn active_failures(&self) -> u32 {
        self.trends.last().map(|t| t.fail_count).unwrap_or(0)
    }

    pub fn pass_rate_direction(&self) -> TrendDirection {
        if self.metrics.pass_rate_trend >= 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        }
    }

    /// e.g. "↑ 2.5% vs previous period".
    pub fn pass_rate_trend_label(&self) -> String {
        format!(
            "{} {:.1}% vs previous period",
            self.pass_rate_direction().arrow(),
            self.metrics.pass_rate_trend.abs()
        )
    }

    pub fn flaky_panel(&self) -> &[FlakyTest] {
        let n = self.flaky_tests.len().min(FLAKY_PANEL_MAX);
        &self.flaky_tests[..n]
    }
}

/// Fetch the four panels together. If any one fails, all four switch to
/// sample data so the panels never mix sources.
pub async fn load(ctx: &PageContext) -> Result<Loaded<DashboardData>> {
    let result = fetch(ctx).await;
    or_sample(result, ctx.sample_fallback, "dashboard", DashboardData::sample)
}

async fn fetch(ctx: &PageContext) -> Result<DashboardData> {
    let project = ctx.require_project()?;
    let api = &ctx.api;
    let (trends, top_failures, flaky, runs) = futures::try_join!(
        api.trends(ctx.days, project),
        api.top_failures(DASHBOARD_PANEL_LIMIT, ctx.days, project),
        api.flaky_tests(ctx.days, 0.0, project),
        api.runs(Some(DASHBOARD_PANEL_LIMIT), Some(ctx.days), project),
    )?;
    Ok(DashboardData {
        metrics: trends.metrics,
        trends: trends.daily_trends,
        top_failures,
        flaky_tests: flaky.tests,
        runs,
    })
}
