//! Tables and detail views for backend data.
//!
//! Free-text columns (names, error messages) are truncated to the terminal
//! width; numeric columns are fixed-width.

use super::colors::*;
use super::progress::{make_progress_bar, terminal_width};
use crate::api::types::*;
use crate::api::StagedUpload;
use crate::pages::flaky::{FlakyStats, ManagedFlakyTest, Severity};
use crate::pages::run_details::{analysis_lines, format_duration};
use crate::pages::runs::{format_execution_date, summarize};
use crate::pages::settings::last_used_label;
use crate::pages::trends::{short_date, TrendsData};
use crate::realtime::notification::{event_message, event_title};
use crate::session::Session;

/// Truncate to `max_len` characters, adding "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Room left for a free-text column after `fixed` columns.
fn free_width(fixed: usize) -> usize {
    terminal_width().saturating_sub(fixed).max(20)
}

fn rate_color(rate: f64) -> &'static str {
    if rate >= 90.0 {
        GREEN
    } else if rate >= 75.0 {
        YELLOW
    } else {
        RED
    }
}

fn health_color(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => GREEN,
        HealthStatus::Unhealthy => RED,
        HealthStatus::Other(_) => YELLOW,
    }
}

fn print_empty(message: &str) {
    println!("{GRAY}{}{RESET}", message);
}

// ============================================================================
// Account and projects
// ============================================================================

pub fn print_whoami(session: &Session, api_url: &str) {
    match &session.user {
        Some(user) => {
            println!("{BLUE}User:{RESET}      {}", user.username);
            println!("{BLUE}Role:{RESET}      {}", user.role);
        }
        None => println!("{GRAY}Not logged in.{RESET}"),
    }
    println!("{BLUE}Backend:{RESET}   {}", api_url);
    match session.last_project_id {
        Some(id) => println!("{BLUE}Project:{RESET}   {}", id),
        None => println!("{BLUE}Project:{RESET}   {GRAY}none{RESET}"),
    }
}

pub fn print_projects(projects: &[Project], current: Option<ProjectId>) {
    if projects.is_empty() {
        print_empty("No projects found.");
        return;
    }
    println!("{BOLD}Projects:{RESET}");
    println!();
    let width = free_width(16);
    for project in projects {
        let marker = if Some(project.id) == current {
            format!("{CYAN}▶{RESET}")
        } else {
            " ".to_string()
        };
        println!("{} {BOLD}{:>4}{RESET}  {}", marker, project.id, project.name);
        if !project.description.is_empty() {
            println!("        {GRAY}{}{RESET}", truncate(&project.description, width));
        }
    }
}

pub fn print_users(users: &[String]) {
    if users.is_empty() {
        print_empty("No users found.");
        return;
    }
    println!("{BOLD}Users ({}):{RESET}", users.len());
    for user in users {
        println!("  {}", user);
    }
}

// ============================================================================
// Runs
// ============================================================================

pub fn format_run_row(run: &TestRun) -> String {
    let rate = run.pass_rate();
    format!(
        "{:>6}  {:<18}  {:>6}  {:>6}  {:>6}  {:>6}  {}{:>6.1}%{RESET}  {}{}{RESET}",
        run.id,
        format_execution_date(run),
        run.total_tests,
        run.pass_count,
        run.fail_count,
        run.skip_count,
        rate_color(rate),
        rate,
        health_color(&run.status),
        run.status
    )
}

pub fn print_runs(runs: &[TestRun]) {
    if runs.is_empty() {
        print_empty(crate::pages::runs::EMPTY_MESSAGE);
        return;
    }
    let summary = summarize(runs);
    println!(
        "{BOLD}{}{RESET} runs, {GREEN}{}{RESET} healthy, {} tests, {RED}{}{RESET} failures",
        summary.total, summary.healthy, summary.tests, summary.failures
    );
    println!();
    println!(
        "{GRAY}{:>6}  {:<18}  {:>6}  {:>6}  {:>6}  {:>6}  {:>7}  STATUS{RESET}",
        "ID", "EXECUTED", "TESTS", "PASS", "FAIL", "SKIP", "RATE"
    );
    for run in runs {
        println!("{}", format_run_row(run));
    }
}

fn test_status_color(status: &TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => GREEN,
        TestStatus::Failed => RED,
        TestStatus::Skipped => YELLOW,
        TestStatus::Unknown(_) => GRAY,
    }
}

pub fn print_run_details(details: &RunDetails, cases: &[&TestCase]) {
    let run = &details.run;
    println!("{BOLD}Run #{}{RESET}", run.id);
    println!("{BLUE}Executed:{RESET}  {}", format_execution_date(run));
    println!(
        "{BLUE}Status:{RESET}    {}{}{RESET}",
        health_color(&run.status),
        run.status
    );
    println!(
        "{BLUE}Tests:{RESET}     {} total, {GREEN}{} passed{RESET}, {RED}{} failed{RESET}, {} skipped",
        run.total_tests, run.pass_count, run.fail_count, run.skip_count
    );
    println!(
        "{BLUE}Pass rate:{RESET} {} {:.1}%",
        make_progress_bar(run.pass_count as usize, run.total_tests as usize, 20),
        run.pass_rate()
    );
    println!();

    if cases.is_empty() {
        print_empty(crate::pages::run_details::NO_MATCHES_MESSAGE);
        return;
    }
    println!("{BOLD}Test cases ({}):{RESET}", cases.len());
    let width = free_width(22);
    for case in cases {
        println!(
            "  {}{:<8}{RESET} {} {GRAY}{}{RESET}",
            test_status_color(&case.status),
            case.status.as_str(),
            truncate(&format!("{}.{}", case.class_name, case.test_name), width),
            format_duration(case.duration)
        );
        if let Some(failure) = &case.test_failure {
            println!("           {RED}{}{RESET}", truncate(&failure.message, width));
        }
    }
}

pub fn print_analysis(analysis: &Analysis) {
    for line in analysis_lines(analysis) {
        match line.strip_prefix("## ") {
            Some(heading) => println!("{CYAN}{BOLD}{}{RESET}", heading),
            None => println!("{}", line),
        }
    }
}

// ============================================================================
// Flaky tests
// ============================================================================

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::High => RED,
        Severity::Medium => YELLOW,
        Severity::Low => BLUE,
    }
}

pub fn print_flaky_tests(tests: &[&ManagedFlakyTest], stats: FlakyStats) {
    println!(
        "{BOLD}{}{RESET} flaky, {} acknowledged, {YELLOW}{}{RESET} in progress, {GREEN}{}{RESET} resolved",
        stats.total, stats.acknowledged, stats.in_progress, stats.resolved
    );
    println!();
    if tests.is_empty() {
        print_empty(crate::pages::flaky::EMPTY_MESSAGE);
        return;
    }
    let width = free_width(52);
    for test in tests {
        let ack = if test.acknowledged {
            format!("{GREEN}✓{RESET}")
        } else {
            " ".to_string()
        };
        let assignee = test
            .assignee
            .as_deref()
            .map(|a| format!(" @{}", a))
            .unwrap_or_default();
        println!(
            "  {GRAY}{:<10}{RESET} {}{:>4}{RESET} {} {} {GRAY}{}/{}{RESET}  {}{}",
            test.id,
            severity_color(test.severity()),
            test.score_label(),
            ack,
            truncate(&format!("{}.{}", test.class_name, test.test_name), width),
            test.pass_count,
            test.fail_count,
            test.resolution_status.label(),
            assignee
        );
    }
}

// ============================================================================
// Trends and failures
// ============================================================================

pub fn print_trends(data: &TrendsData) {
    if data.daily.is_empty() {
        print_empty(crate::pages::trends::EMPTY_MESSAGE);
        return;
    }
    let execution = data
        .avg_execution_secs()
        .map(|s| format!("{}s", s))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{BLUE}Avg pass rate:{RESET} {}{:.1}%{RESET}   {BLUE}Failures:{RESET} {}   {BLUE}Avg execution:{RESET} {}",
        rate_color(data.avg_pass_rate()),
        data.avg_pass_rate(),
        data.total_failures(),
        execution
    );
    println!();
    for point in &data.daily {
        println!(
            "  {:<7} {} {:>5.1}%  {RED}{:>4} failed{RESET}",
            short_date(point),
            make_progress_bar(point.pass_rate.round().max(0.0) as usize, 100, 25),
            point.pass_rate,
            point.fail_count
        );
    }

    if data.patterns.is_empty() {
        return;
    }
    println!();
    println!("{BOLD}Failure patterns:{RESET}");
    let max = data.max_pattern_count().max(1) as usize;
    for pattern in &data.patterns {
        let filled = pattern.count as usize * 20 / max;
        println!(
            "  {:<24} {RED}{:<20}{RESET} {:>4} {}",
            truncate(&pattern.category, 24),
            "█".repeat(filled),
            pattern.count,
            pattern.trend.arrow()
        );
    }
}

pub fn print_failures(failures: &[TopFailure]) {
    if failures.is_empty() {
        print_empty("No failures in this period.");
        return;
    }
    let width = free_width(10);
    for failure in failures {
        println!(
            "{RED}{:>6}{RESET}  {}",
            failure.count,
            truncate(&failure.error_message, width)
        );
        if let Some(test) = &failure.test_name {
            println!("        {GRAY}{}{RESET}", test);
        }
    }
}

// ============================================================================
// API keys, uploads, events
// ============================================================================

pub fn print_keys(keys: &[ApiKey], reveal: bool) {
    if keys.is_empty() {
        print_empty(crate::pages::settings::EMPTY_MESSAGE);
        return;
    }
    for key in keys {
        let secret = if reveal {
            key.secret_key.clone()
        } else {
            key.masked_secret()
        };
        println!(
            "{BOLD}{:>4}{RESET}  {:<24} {CYAN}{}{RESET}",
            key.id,
            truncate(&key.name, 24),
            secret
        );
        println!(
            "      {GRAY}created {}, last used {}{RESET}",
            key.created_at.format("%b %d, %Y"),
            last_used_label(key)
        );
    }
}

pub fn print_new_key(key: &ApiKey) {
    println!("{GREEN}\u{2714}{RESET} Created API key {BOLD}{}{RESET}", key.name);
    println!();
    println!("  {YELLOW}{BOLD}{}{RESET}", key.secret_key);
    println!();
    println!("{GRAY}Store this key in your CI secrets; list output masks it.{RESET}");
}

pub fn print_staged_upload(staged: &StagedUpload) {
    for report in &staged.staged {
        println!(
            "  {} {GRAY}({:.1} KB){RESET}",
            report.file_name,
            report.size_bytes as f64 / 1024.0
        );
    }
    println!("{BLUE}Total:{RESET} {}", staged.total_size_label());
    if let Some(message) = staged.skipped_message() {
        println!("{YELLOW}{}{RESET}", message);
    }
}

pub fn format_run_event(event: &TestRunEvent) -> String {
    let color = if event.status.is_healthy() { GREEN } else { YELLOW };
    format!(
        "{}{BOLD}{}{RESET}  {}",
        color,
        event_title(event),
        event_message(event)
    )
}
