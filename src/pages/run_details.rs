use super::{matches_query, or_sample, Loaded, PageContext};
use crate::api::types::*;
use crate::error::{QaHubError, Result};
use crate::sample;
use std::fmt;
use std::str::FromStr;

pub const NOT_FOUND_MESSAGE: &str = "Run not found";
pub const NO_ANALYSIS_MESSAGE: &str = "AI analysis has not been generated for this run";
pub const NO_MATCHES_MESSAGE: &str = "No test cases match your filters";

pub async fn load(ctx: &PageContext, run: RunId) -> Result<Loaded<RunDetails>> {
    let result = ctx.api.run_details(run).await;
    or_sample(result, ctx.sample_fallback, "run details", || {
        sample::run_details(run)
    })
}

/// Ask the backend for an analysis; the bundled report stands in on failure.
pub async fn analyze(ctx: &PageContext, run: RunId) -> Result<Loaded<Analysis>> {
    let result = ctx.api.analyze_run(run).await;
    or_sample(result, ctx.sample_fallback, "analysis", sample::analysis)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Passed,
    Failed,
    Skipped,
}

impl StatusFilter {
    pub fn all() -> &'static [StatusFilter] {
        &[
            StatusFilter::All,
            StatusFilter::Passed,
            StatusFilter::Failed,
            StatusFilter::Skipped,
        ]
    }

    pub fn next(self) -> StatusFilter {
        let all = StatusFilter::all();
        let idx = all.iter().position(|s| *s == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    pub fn accepts(self, status: &TestStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Passed => *status == TestStatus::Passed,
            StatusFilter::Failed => *status == TestStatus::Failed,
            StatusFilter::Skipped => *status == TestStatus::Skipped,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "all",
            StatusFilter::Passed => "PASSED",
            StatusFilter::Failed => "FAILED",
            StatusFilter::Skipped => "SKIPPED",
        })
    }
}

impl FromStr for StatusFilter {
    type Err = QaHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "passed" => Ok(StatusFilter::Passed),
            "failed" => Ok(StatusFilter::Failed),
            "skipped" => Ok(StatusFilter::Skipped),
            _ => Err(QaHubError::Validation(format!(
                "Invalid status filter '{}'. Choose one of: all, passed, failed, skipped",
                s
            ))),
        }
    }
}

/// Cases matching the search text (test or class name) and status.
pub fn filter_cases<'a>(
    details: &'a RunDetails,
    query: &str,
    status: StatusFilter,
) -> Vec<&'a TestCase> {
    details
        .test_cases
        .iter()
        .filter(|c| status.accepts(&c.status))
        .filter(|c| matches_query(query, &[&c.test_name, &c.class_name]))
        .collect()
}

/// "2.50s"; skipped cases with no duration show "-".
pub fn format_duration(seconds: f64) -> String {
    if seconds <= 0.0 {
        "-".to_string()
    } else {
        format!("{:.2}s", seconds)
    }
}

/// Flatten either analysis shape into display lines.
pub fn analysis_lines(analysis: &Analysis) -> Vec<String> {
    match analysis {
        Analysis::Text(text) => text.lines().map(str::to_string).collect(),
        Analysis::Structured(report) => {
            let mut lines = vec![
                "## Executive Summary".to_string(),
                report.executive_summary.clone(),
                String::new(),
                "## Failure Analysis".to_string(),
            ];
            for (i, item) in report.failure_analysis.iter().enumerate() {
                lines.push(format!("{}. **{}** ({} occurrences)", i + 1, item.root_cause, item.count));
                if !item.affected_features.is_empty() {
                    lines.push(format!(
                        "   - Affected: {}",
                        item.affected_features.join(", ")
                    ));
                }
                lines.push(format!("   - Suggested fix: {}", item.suggested_fix));
            }
            if !report.flakiness_check.is_empty() {
                lines.push(String::new());
                lines.push("## Flakiness Check".to_string());
                lines.push(report.flakiness_check.clone());
            }
            lines
        }
    }
}
