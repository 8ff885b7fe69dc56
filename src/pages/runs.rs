use super::{or_sample, Loaded, PageContext};
use crate::api::types::TestRun;
use crate::error::Result;
use crate::sample;

pub const EMPTY_MESSAGE: &str = "No test runs found. Upload a report to get started.";

pub async fn load(ctx: &PageContext) -> Result<Loaded<Vec<TestRun>>> {
    let result = match ctx.require_project() {
        Ok(project) => ctx.api.runs(None, Some(ctx.days), project).await,
        Err(e) => Err(e),
    };
    or_sample(result, ctx.sample_fallback, "runs", sample::runs)
}

/// Aggregate counts shown above the runs table.
pub fn summarize(runs: &[TestRun]) -> RunsSummary {
    RunsSummary {
        total: runs.len(),
        healthy: runs.iter().filter(|r| r.status.is_healthy()).count(),
        tests: runs.iter().map(|r| r.total_tests as u64).sum(),
        failures: runs.iter().map(|r| r.fail_count as u64).sum(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunsSummary {
    pub total: usize,
    pub healthy: usize,
    pub tests: u64,
    pub failures: u64,
}

/// "Jan 07, 2024 14:30".
pub fn format_execution_date(run: &TestRun) -> String {
    run.execution_date.format("%b %d, %Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_sample_runs() {
        let summary = summarize(&sample::runs());
        assert_eq!(summary.total, 7);
        assert_eq!(summary.healthy, 4);
        assert_eq!(summary.failures, 61);
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), RunsSummary::default());
    }

    #[test]
    fn test_execution_date_format() {
        let run = &sample::runs()[0];
        assert_eq!(format_execution_date(run), "Jan 07, 2024 14:30");
    }
}
