//! Layout and widgets for the dashboard TUI.
//!
//! ```text
//! ┌ qahub · Web · Last 30 days · live ───────────────────────┐
//! │ Dashboard │ Test Runs │ Flaky Tests │ Trends │ Settings  │
//! └──────────────────────────────────────────────────────────┘
//!   page content                            ┌ notification ┐
//!                                           └──────────────┘
//!  Tab: switch view | [ ]: date range | p: project | Q: quit
//! ```

use super::app::{App, InputPurpose, PageState};
use super::views::View;
use crate::api::types::*;
use crate::pages::dashboard::DashboardData;
use crate::pages::flaky::{self, Severity};
use crate::pages::run_details::{self, analysis_lines, format_duration};
use crate::pages::runs::{self, format_execution_date, summarize};
use crate::pages::settings::{self, last_used_label};
use crate::pages::trends::{self, short_date};
use crate::realtime::{ConnectionState, Level};
use crate::sample::DataSource;
use std::borrow::Cow;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Sparkline, Tabs, Wrap},
    Frame,
};

const MAX_VISIBLE_NOTIFICATIONS: usize = 3;

/// Render the whole screen.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with tabs
            Constraint::Min(0),    // Page
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_content(frame, app, chunks[1]);
    render_footer(frame, app, chunks[2]);

    if let Some(key) = app.new_key() {
        render_new_key_modal(frame, key, chunks[1]);
    } else if app.confirm_revoke().is_some() {
        render_confirm_modal(frame, chunks[1]);
    }
    render_notifications(frame, app, chunks[1]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = View::all().iter().map(|v| Line::from(v.name())).collect();

    let project = app
        .projects()
        .current()
        .map(|p| p.name.as_str())
        .unwrap_or("no project");
    let mut title = format!(
        " qahub · {} · {} · {} ",
        project,
        app.date_range().label(),
        app.connection().label()
    );
    if app.data_source() == Some(DataSource::Sample) {
        title.push_str("· SAMPLE DATA ");
    }

    let title_style = match app.connection() {
        ConnectionState::Subscribed => Style::default().fg(Color::Green),
        ConnectionState::Connecting => Style::default().fg(Color::Yellow),
        ConnectionState::Disconnected => Style::default().fg(Color::DarkGray),
    };

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(title, title_style)),
        )
        .select(app.view().index())
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

fn render_content(frame: &mut Frame, app: &App, area: Rect) {
    if app.open_run().is_some() {
        render_run_details(frame, app, area);
        return;
    }
    match app.view() {
        View::Dashboard => render_dashboard(frame, app, area),
        View::Runs => render_runs(frame, app, area),
        View::FlakyTests => render_flaky(frame, app, area),
        View::Trends => render_trends(frame, app, area),
        View::Settings => render_settings(frame, app, area),
    }
}

/// Loading / error / empty placeholder. Returns the data when ready.
fn ready_or_placeholder<'a, T>(
    frame: &mut Frame,
    state: &'a PageState<T>,
    title: &str,
    area: Rect,
) -> Option<&'a T> {
    let (message, color) = match state {
        PageState::Ready(data) => return Some(data),
        PageState::Idle | PageState::Loading => ("Loading...".to_string(), Color::DarkGray),
        PageState::Failed(e) => (e.clone(), Color::Red),
    };
    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        );
    frame.render_widget(paragraph, area);
    None
}

fn render_message(frame: &mut Frame, message: &str, title: &str, area: Rect) {
    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        );
    frame.render_widget(paragraph, area);
}

fn selection_marker(selected: bool) -> Span<'static> {
    Span::styled(
        if selected { "▶ " } else { "  " },
        Style::default().fg(Color::Cyan),
    )
}

fn name_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

fn label<'a>(text: impl Into<Cow<'a, str>>) -> Span<'a> {
    Span::styled(text, Style::default().fg(Color::DarkGray))
}

// ============================================================================
// Dashboard
// ============================================================================

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let Some(loaded) = ready_or_placeholder(frame, app.dashboard(), "Dashboard", area) else {
        return;
    };
    let data = &loaded.data;

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(7),
            Constraint::Min(0),
        ])
        .split(area);

    render_metric_cards(frame, data, rows[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    render_pass_rate_sparkline(frame, &data.trends, " Pass Rate ", middle[0]);
    render_top_failures(frame, &data.top_failures, middle[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[2]);
    render_flaky_panel(frame, data, bottom[0]);
    render_run_list(frame, app, &data.runs, " Recent Runs ", bottom[1]);
}

fn metric_card(frame: &mut Frame, title: &str, value: String, detail: Line, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            value,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        detail,
    ];
    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", title)),
    );
    frame.render_widget(card, area);
}

fn render_metric_cards(frame: &mut Frame, data: &DashboardData, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let metrics = &data.metrics;
    let trend_color = match data.pass_rate_direction() {
        TrendDirection::Down => Color::Red,
        _ => Color::Green,
    };
    metric_card(
        frame,
        "Pass Rate",
        format!("{:.1}%", metrics.latest_pass_rate),
        Line::from(Span::styled(
            data.pass_rate_trend_label(),
            Style::default().fg(trend_color),
        )),
        cards[0],
    );
    metric_card(
        frame,
        "Total Runs",
        metrics.total_runs.to_string(),
        Line::from(label("in selected period")),
        cards[1],
    );
    metric_card(
        frame,
        "Active Failures",
        data.active_failures().to_string(),
        Line::from(label(format!(
            "{} unique failures",
            metrics.total_unique_failures
        ))),
        cards[2],
    );
    metric_card(
        frame,
        "Avg Duration",
        format!("{:.0}s", metrics.avg_execution_time),
        Line::from(label("per run")),
        cards[3],
    );
}

fn render_pass_rate_sparkline(frame: &mut Frame, daily: &[TrendData], title: &str, area: Rect) {
    let series: Vec<u64> = daily
        .iter()
        .map(|d| d.pass_rate.max(0.0).round() as u64)
        .collect();
    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .max(100)
        .style(Style::default().fg(Color::Green))
        .data(series);
    frame.render_widget(sparkline, area);
}

fn render_top_failures(frame: &mut Frame, failures: &[TopFailure], area: Rect) {
    let width = area.width.saturating_sub(10) as usize;
    let items: Vec<ListItem> = failures
        .iter()
        .map(|f| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>4} ", f.count), Style::default().fg(Color::Red)),
                Span::raw(truncate_string(&f.error_message, width)),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Top Failures "),
    );
    frame.render_widget(list, area);
}

fn render_flaky_panel(frame: &mut Frame, data: &DashboardData, area: Rect) {
    let panel = data.flaky_panel();
    if panel.is_empty() {
        render_message(frame, flaky::EMPTY_MESSAGE, "Flaky Tests", area);
        return;
    }
    let items: Vec<ListItem> = panel
        .iter()
        .map(|t| {
            let severity = Severity::from_score(t.flakiness_score);
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>4.0}% ", t.flakiness_score * 100.0),
                    Style::default().fg(severity_color(severity)),
                ),
                Span::raw(t.test_name.clone()),
                Span::styled(
                    format!(" ({})", t.class_name),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Flaky Tests "),
    );
    frame.render_widget(list, area);
}

fn render_run_list(frame: &mut Frame, app: &App, runs_list: &[TestRun], title: &str, area: Rect) {
    if runs_list.is_empty() {
        render_message(frame, runs::EMPTY_MESSAGE, title.trim(), area);
        return;
    }
    let items: Vec<ListItem> = runs_list
        .iter()
        .enumerate()
        .map(|(i, run)| {
            let selected = i == app.selected_index();
            ListItem::new(Line::from(vec![
                selection_marker(selected),
                Span::styled(format!("#{:<5}", run.id), name_style(selected)),
                Span::raw(format!("{}  ", format_execution_date(run))),
                Span::raw(format!(
                    "{:>4} tests {:>4} failed  ",
                    run.total_tests, run.fail_count
                )),
                Span::styled(
                    format!("{:>5.1}%  ", run.pass_rate()),
                    Style::default().fg(pass_rate_color(run.pass_rate())),
                ),
                Span::styled(
                    run.status.to_string(),
                    Style::default().fg(health_color(&run.status)),
                ),
            ]))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title.to_string()));
    frame.render_widget(list, area);
}

// ============================================================================
// Runs
// ============================================================================

fn render_runs(frame: &mut Frame, app: &App, area: Rect) {
    let Some(loaded) = ready_or_placeholder(frame, app.runs(), "Test Runs", area) else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let summary = summarize(&loaded.data);
    let line = Line::from(vec![
        label("Runs: "),
        Span::raw(summary.total.to_string()),
        label("   Healthy: "),
        Span::styled(summary.healthy.to_string(), Style::default().fg(Color::Green)),
        label("   Tests: "),
        Span::raw(summary.tests.to_string()),
        label("   Failures: "),
        Span::styled(summary.failures.to_string(), Style::default().fg(Color::Red)),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(" Summary ")),
        chunks[0],
    );
    let title = format!(" Test Runs ({}) ", loaded.data.len());
    render_run_list(frame, app, &loaded.data, &title, chunks[1]);
}

// ============================================================================
// Run details
// ============================================================================

fn render_run_details(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" Run #{} ", app.open_run().unwrap_or_default());
    let Some(loaded) = ready_or_placeholder(frame, app.details(), &title, area) else {
        return;
    };
    let details = &loaded.data;
    let run = &details.run;

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(6)])
        .split(columns[0]);

    let info = vec![
        Line::from(vec![
            label("Executed: "),
            Span::raw(format_execution_date(run)),
            label("   Status: "),
            Span::styled(run.status.to_string(), Style::default().fg(health_color(&run.status))),
        ]),
        Line::from(vec![
            label("Tests: "),
            Span::raw(run.total_tests.to_string()),
            label("   Passed: "),
            Span::styled(run.pass_count.to_string(), Style::default().fg(Color::Green)),
            label("   Failed: "),
            Span::styled(run.fail_count.to_string(), Style::default().fg(Color::Red)),
            label("   Skipped: "),
            Span::raw(run.skip_count.to_string()),
        ]),
        Line::from(vec![
            label("Filter: "),
            Span::styled(
                app.case_status().to_string(),
                Style::default().fg(Color::Cyan),
            ),
            label("   Search: "),
            Span::raw(if app.case_query().is_empty() {
                "-".to_string()
            } else {
                app.case_query().to_string()
            }),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(info).block(Block::default().borders(Borders::ALL).title(title)),
        left[0],
    );

    let cases = app.visible_cases();
    if cases.is_empty() {
        render_message(frame, run_details::NO_MATCHES_MESSAGE, "Test Cases", left[1]);
    } else {
        let width = left[1].width.saturating_sub(24) as usize;
        let items: Vec<ListItem> = cases
            .iter()
            .enumerate()
            .map(|(i, case)| {
                let selected = i == app.selected_index();
                ListItem::new(Line::from(vec![
                    selection_marker(selected),
                    Span::styled(
                        format!("{:<8}", case.status.as_str()),
                        Style::default().fg(test_status_color(&case.status)),
                    ),
                    Span::styled(
                        truncate_string(&format!("{}.{}", case.class_name, case.test_name), width),
                        name_style(selected),
                    ),
                    Span::styled(
                        format!(" {}", format_duration(case.duration)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Test Cases ({}) ", cases.len())),
        );
        frame.render_widget(list, left[1]);
    }

    let failure = cases
        .get(app.selected_index())
        .and_then(|c| c.test_failure.as_ref())
        .map(|f| f.message.clone())
        .unwrap_or_else(|| "No failure for the selected case".to_string());
    frame.render_widget(
        Paragraph::new(failure)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Failure ")),
        left[2],
    );

    render_analysis(frame, app, run, columns[1]);
}

fn render_analysis(frame: &mut Frame, app: &App, run: &TestRun, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" AI Analysis ");
    let stored = run.ai_analysis.as_ref();
    let (lines, color) = match (app.analysis(), stored) {
        (PageState::Loading, _) => (vec!["Analyzing...".to_string()], Color::DarkGray),
        (PageState::Ready(loaded), _) => (analysis_lines(&loaded.data), Color::White),
        (PageState::Failed(e), _) => (vec![e.clone()], Color::Red),
        (PageState::Idle, Some(analysis)) => (analysis_lines(analysis), Color::White),
        (PageState::Idle, None) => (
            vec![
                run_details::NO_ANALYSIS_MESSAGE.to_string(),
                String::new(),
                "Press 'a' to generate one.".to_string(),
            ],
            Color::DarkGray,
        ),
    };
    let text: Vec<Line> = lines
        .into_iter()
        .map(|l| {
            if let Some(heading) = l.strip_prefix("## ") {
                Line::from(Span::styled(
                    heading.to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(l)
            }
        })
        .collect();
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: false })
            .block(block),
        area,
    );
}

// ============================================================================
// Flaky tests
// ============================================================================

fn render_flaky(frame: &mut Frame, app: &App, area: Rect) {
    let Some(board) = ready_or_placeholder(frame, app.flaky(), "Flaky Tests", area) else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let stats = board.stats();
    let filters = app.flaky_filters();
    let status_filter = filters
        .status
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| "all".to_string());
    let header = vec![
        Line::from(vec![
            label("Flaky: "),
            Span::raw(stats.total.to_string()),
            label("   Acknowledged: "),
            Span::raw(stats.acknowledged.to_string()),
            label("   In progress: "),
            Span::styled(stats.in_progress.to_string(), Style::default().fg(Color::Yellow)),
            label("   Resolved: "),
            Span::styled(stats.resolved.to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            label("Status: "),
            Span::styled(status_filter, Style::default().fg(Color::Cyan)),
            label("   Acknowledged: "),
            Span::styled(
                filters.acknowledged.to_string(),
                Style::default().fg(Color::Cyan),
            ),
            label("   Search: "),
            Span::raw(if filters.query.is_empty() {
                "-".to_string()
            } else {
                filters.query.clone()
            }),
            label(format!("   Threshold: {:.2}", app.flaky_threshold())),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL).title(" Filters ")),
        chunks[0],
    );

    let tests = app.visible_flaky();
    if tests.is_empty() {
        render_message(frame, flaky::EMPTY_MESSAGE, "Flaky Tests", chunks[1]);
        return;
    }
    let width = chunks[1].width.saturating_sub(48) as usize;
    let items: Vec<ListItem> = tests
        .iter()
        .enumerate()
        .map(|(i, test)| {
            let selected = i == app.selected_index();
            ListItem::new(Line::from(vec![
                selection_marker(selected),
                Span::styled(
                    format!("{:>4} ", test.score_label()),
                    Style::default().fg(severity_color(test.severity())),
                ),
                Span::styled(
                    if test.acknowledged { "✓ " } else { "  " },
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    truncate_string(&format!("{}.{}", test.class_name, test.test_name), width),
                    name_style(selected),
                ),
                Span::styled(
                    format!("  {}/{} pass/fail  ", test.pass_count, test.fail_count),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    test.resolution_status.label(),
                    Style::default().fg(resolution_color(test.resolution_status)),
                ),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Flaky Tests ({}) ", tests.len())),
    );
    frame.render_widget(list, chunks[1]);
}

// ============================================================================
// Trends
// ============================================================================

fn render_trends(frame: &mut Frame, app: &App, area: Rect) {
    let Some(loaded) = ready_or_placeholder(frame, app.trends(), "Trends", area) else {
        return;
    };
    let data = &loaded.data;
    if data.daily.is_empty() {
        render_message(frame, trends::EMPTY_MESSAGE, "Trends", area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(0),
        ])
        .split(area);

    let execution = data
        .avg_execution_secs()
        .map(|s| format!("{}s", s))
        .unwrap_or_else(|| "-".to_string());
    let summary = Line::from(vec![
        label("Avg pass rate: "),
        Span::styled(
            format!("{:.1}%", data.avg_pass_rate()),
            Style::default().fg(pass_rate_color(data.avg_pass_rate())),
        ),
        label("   Total failures: "),
        Span::styled(data.total_failures().to_string(), Style::default().fg(Color::Red)),
        label("   Avg execution: "),
        Span::raw(execution),
    ]);
    frame.render_widget(
        Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title(" Summary ")),
        rows[0],
    );

    let first = data.daily.first().map(short_date).unwrap_or_default();
    let last = data.daily.last().map(short_date).unwrap_or_default();
    let title = format!(" Pass Rate {} - {} ", first, last);
    render_pass_rate_sparkline(frame, &data.daily, &title, rows[1]);

    let max = data.max_pattern_count().max(1);
    let bar_width = rows[2].width.saturating_sub(40) as usize;
    let items: Vec<ListItem> = data
        .patterns
        .iter()
        .map(|p| {
            let filled = (p.count as usize * bar_width) / max as usize;
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<24}", truncate_string(&p.category, 24))),
                Span::styled("█".repeat(filled), Style::default().fg(Color::Red)),
                Span::raw(format!(" {} ", p.count)),
                Span::styled(
                    p.trend.arrow(),
                    Style::default().fg(match p.trend {
                        TrendDirection::Up => Color::Red,
                        TrendDirection::Down => Color::Green,
                        TrendDirection::Stable | TrendDirection::Other(_) => Color::DarkGray,
                    }),
                ),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Failure Patterns "),
    );
    frame.render_widget(list, rows[2]);
}

// ============================================================================
// Settings
// ============================================================================

fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let (username, role) = app
        .user()
        .map(|u| (u.username.as_str(), u.role.as_str()))
        .unwrap_or(("not logged in", "-"));
    let project = app
        .projects()
        .current()
        .map(|p| p.name.as_str())
        .unwrap_or("none");
    let profile = vec![
        Line::from(vec![label("User: "), Span::raw(username), label("   Role: "), Span::raw(role)]),
        Line::from(vec![label("Project: "), Span::raw(project)]),
    ];
    frame.render_widget(
        Paragraph::new(profile).block(Block::default().borders(Borders::ALL).title(" Profile ")),
        chunks[0],
    );

    let Some(keys) = ready_or_placeholder(frame, app.keys(), "API Keys", chunks[1]) else {
        return;
    };
    if keys.is_empty() {
        render_message(frame, settings::EMPTY_MESSAGE, "API Keys", chunks[1]);
        return;
    }
    let items: Vec<ListItem> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let selected = i == app.selected_index();
            let secret = if app.reveal_secrets() {
                key.secret_key.clone()
            } else {
                key.masked_secret()
            };
            ListItem::new(Line::from(vec![
                selection_marker(selected),
                Span::styled(format!("{:<24}", truncate_string(&key.name, 24)), name_style(selected)),
                Span::styled(format!("{:<40}", secret), Style::default().fg(Color::Cyan)),
                label(format!(
                    "created {}  last used {}",
                    key.created_at.format("%b %d, %Y"),
                    last_used_label(key)
                )),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" API Keys ({}) ", keys.len())),
    );
    frame.render_widget(list, chunks[1]);
}

// ============================================================================
// Overlays and footer
// ============================================================================

fn render_new_key_modal(frame: &mut Frame, key: &ApiKey, area: Rect) {
    let modal_area = centered_rect(60, 40, area);
    frame.render_widget(Clear, modal_area);
    let lines = vec![
        Line::from(vec![label("Name:   "), Span::raw(key.name.clone())]),
        Line::from(vec![
            label("Secret: "),
            Span::styled(
                key.secret_key.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(label("Copy this key now. It is only shown in full once.")),
        Line::from(""),
        Line::from(label("Press Enter or Esc to close")),
    ];
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" API Key Created ")
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(paragraph, modal_area);
}

fn render_confirm_modal(frame: &mut Frame, area: Rect) {
    let modal_area = centered_rect(50, 20, area);
    frame.render_widget(Clear, modal_area);
    let paragraph = Paragraph::new(vec![
        Line::from("Revoke this API key? CI jobs using it will stop working."),
        Line::from(""),
        Line::from(label("y: revoke | any other key: cancel")),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Revoke API Key ")
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(paragraph, modal_area);
}

fn render_notifications(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.notifications().active();
    let width = area.width.min(56);
    if width < 10 {
        return;
    }
    let x = area.x + area.width - width;
    let mut y = area.y;
    for note in active.iter().rev().take(MAX_VISIBLE_NOTIFICATIONS) {
        let height = 4;
        if y + height > area.y + area.height {
            break;
        }
        let rect = Rect::new(x, y, width, height);
        let mut lines = vec![Line::from(truncate_string(
            &note.message,
            width.saturating_sub(2) as usize,
        ))];
        if note.run_id.is_some() {
            lines.push(Line::from(label("o: view details | Esc: dismiss")));
        }
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(level_color(note.level)))
                    .title(format!(" {} ", note.title)),
            ),
            rect,
        );
        y += height;
    }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(input) = app.input() {
        let prompt = match input.purpose {
            InputPurpose::CaseSearch | InputPurpose::FlakySearch => "Search",
            InputPurpose::KeyName => "Key name",
        };
        let line = Line::from(vec![
            Span::styled(format!(" {}: ", prompt), Style::default().fg(Color::Cyan)),
            Span::raw(input.buffer.clone()),
            Span::styled("█", Style::default().fg(Color::Cyan)),
            label("  (Enter: done | Esc: cancel)"),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let help_text = footer_help(app);
    let footer = Paragraph::new(help_text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, area);
}

fn footer_help(app: &App) -> &'static str {
    if app.new_key().is_some() {
        return " Enter/Esc: close ";
    }
    if app.open_run().is_some() {
        return " ↑↓: navigate | /: search | s: status filter | a: analyze | Esc: back | Q: quit ";
    }
    match app.view() {
        View::Dashboard | View::Runs => {
            " Tab: switch view | ↑↓: navigate | Enter: details | [ ]: date range | p: project | r: refresh | Q: quit "
        }
        View::FlakyTests => {
            " ↑↓: navigate | a: ack | s: status | /: search | f: status filter | k: ack filter | [ ]: date range | Q: quit "
        }
        View::Trends => " Tab: switch view | [ ]: date range | p: project | r: refresh | Q: quit ",
        View::Settings => " Tab: switch view | ↑↓: navigate | g: generate | d: revoke | v: reveal | Q: quit ",
    }
}

fn pass_rate_color(rate: f64) -> Color {
    if rate >= 90.0 {
        Color::Green
    } else if rate >= 75.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn health_color(status: &HealthStatus) -> Color {
    match status {
        HealthStatus::Healthy => Color::Green,
        HealthStatus::Unhealthy => Color::Red,
        HealthStatus::Other(_) => Color::Yellow,
    }
}

fn test_status_color(status: &TestStatus) -> Color {
    match status {
        TestStatus::Passed => Color::Green,
        TestStatus::Failed => Color::Red,
        TestStatus::Skipped => Color::Yellow,
        TestStatus::Unknown(_) => Color::DarkGray,
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::High => Color::Red,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Blue,
    }
}

fn resolution_color(status: ResolutionStatus) -> Color {
    match status {
        ResolutionStatus::Unresolved => Color::Red,
        ResolutionStatus::Investigating | ResolutionStatus::InProgress => Color::Yellow,
        ResolutionStatus::Resolved => Color::Green,
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Info => Color::Cyan,
        Level::Success => Color::Green,
        Level::Warning => Color::Yellow,
        Level::Error => Color::Red,
    }
}

/// Truncate to `max_len` characters, adding "..." if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Create a centered rectangle of given percentage width/height.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DateRange;
    use crossterm::event::KeyCode;
    use ratatui::{backend::TestBackend, Terminal};

    fn app() -> App {
        App::new(
            None,
            None,
            DateRange::Days30,
            0.0,
            chrono::Duration::seconds(8),
        )
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a longer message", 8), "a lon...");
        assert_eq!(truncate_string("ééééé", 4), "é...");
    }

    #[test]
    fn test_centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let rect = centered_rect(60, 40, area);
        assert_eq!(rect.width, 60);
        assert_eq!(rect.height, 20);
        assert_eq!(rect.x, 20);
    }

    #[test]
    fn test_pass_rate_colors() {
        assert_eq!(pass_rate_color(95.0), Color::Green);
        assert_eq!(pass_rate_color(80.0), Color::Yellow);
        assert_eq!(pass_rate_color(50.0), Color::Red);
    }

    #[test]
    fn test_footer_changes_with_view() {
        let mut app = app();
        assert!(footer_help(&app).contains("Enter: details"));
        app.handle_key(KeyCode::Char('3'));
        assert!(footer_help(&app).contains("a: ack"));
        app.handle_key(KeyCode::Char('5'));
        assert!(footer_help(&app).contains("g: generate"));
    }

    #[test]
    fn test_render_header_and_loading_state() {
        let screen = draw(&app());
        assert!(screen.contains("Dashboard"));
        assert!(screen.contains("Flaky Tests"));
        assert!(screen.contains("Last 30 days"));
        assert!(screen.contains("offline"));
        assert!(screen.contains("Loading..."));
    }
}
