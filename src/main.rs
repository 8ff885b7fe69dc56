//! qahub CLI entry point.
//!
//! Parses command-line arguments and dispatches to the appropriate command handler.

use clap::{CommandFactory, Parser, Subcommand};
use qahub::api::types::{ApiKeyId, ResolutionStatus, RunId};
use qahub::commands::{
    analyze_command, config_reset_command, config_set_command, config_show_command,
    dashboard_command, delete_run_command, failures_command, flaky_ack_command,
    flaky_list_command, flaky_status_command, keys_generate_command, keys_list_command,
    keys_revoke_command, login_command, logout_command, projects_command,
    projects_use_command, register_command, run_command, runs_command, trends_command,
    upload_command, users_command, watch_command, whoami_command, CliContext,
    FlakyListOptions, RunViewOptions,
};
use qahub::completion::{print_completion_script, ShellType, SUPPORTED_SHELLS};
use qahub::error::{QaHubError, Result};
use qahub::filter::DateRange;
use qahub::logging;
use qahub::output::{print_error, print_info};
use qahub::pages::flaky::{AckFilter, DEFAULT_THRESHOLD};
use qahub::pages::run_details::StatusFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qahub")]
#[command(
    version,
    about = "Test-execution insights from the terminal: runs, trends, flaky tests and AI failure analysis",
    arg_required_else_help = true,
    after_help = "EXAMPLES:
    # Sign in and pick a project
    qahub login --username sam
    qahub projects use checkout-service

    # Look at recent results
    qahub runs --days 7
    qahub run 42 --status failed
    qahub analyze 42

    # Triage flaky tests
    qahub flaky --search payment
    qahub flaky ack PaymentTest.testPaymentProcessing

    # Upload JUnit reports from CI
    qahub upload target/surefire-reports/*.xml

    # Open the live dashboard
    qahub dashboard"
)]
struct Cli {
    /// Log debug output (stderr for commands, the log file for the dashboard)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend URL for this invocation (overrides config and QAHUB_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    #[command(after_help = "EXAMPLES:
    qahub login                                   # Prompt for username and password
    qahub login -u sam                            # Prompt for the password only
    echo \"$PASSWORD\" | qahub login -u sam --password-stdin")]
    Login {
        #[arg(short, long)]
        username: Option<String>,

        /// Read the password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },

    /// Create an account
    Register {
        #[arg(short, long)]
        username: Option<String>,

        /// Read the password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },

    /// Forget the saved session
    Logout,

    /// Show the logged-in user, backend and selected project
    Whoami,

    /// List registered users
    Users,

    /// List projects, or select the one other commands act on
    #[command(after_help = "EXAMPLES:
    qahub projects                     # List projects (▶ marks the current one)
    qahub projects use 3               # Select by id
    qahub projects use checkout        # Select by name (case-insensitive)")]
    Projects {
        #[command(subcommand)]
        action: Option<ProjectsAction>,
    },

    /// List test runs for the current project
    #[command(after_help = "EXAMPLES:
    qahub runs                         # Last 30 days (or default_days from config)
    qahub runs --days 7 -n 10          # Ten most recent runs from the last week")]
    Runs {
        /// Date range in days: 7, 15, 30, 60 or 90
        #[arg(short, long)]
        days: Option<DateRange>,

        /// Show at most this many runs
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show one run with its test cases
    #[command(after_help = "EXAMPLES:
    qahub run 42
    qahub run 42 --status failed
    qahub run 42 --search login")]
    Run {
        id: RunId,

        /// Case-insensitive match on test or class name
        #[arg(short, long, default_value = "")]
        search: String,

        /// all, passed, failed or skipped
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },

    /// Generate an AI failure analysis for a run
    Analyze { id: RunId },

    /// Delete a run
    DeleteRun {
        id: RunId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List and triage flaky tests
    #[command(after_help = "EXAMPLES:
    qahub flaky                                      # All flaky tests, last 30 days
    qahub flaky list --status unresolved --ack no    # Untriaged tests
    qahub flaky ack AuthenticationTest.testUserLogin
    qahub flaky status testUserLogin in-progress

TESTS:
    A test can be named by its id, Class.test, or bare test name.

STATUSES:
    unresolved, investigating, in-progress, resolved")]
    Flaky {
        #[command(subcommand)]
        action: Option<FlakyAction>,
    },

    /// Pass-rate trend and failure patterns
    Trends {
        #[arg(short, long)]
        days: Option<DateRange>,
    },

    /// Most frequent failures
    Failures {
        #[arg(short, long)]
        days: Option<DateRange>,

        #[arg(short = 'n', long, default_value_t = 10)]
        limit: u32,
    },

    /// Manage API keys for CI uploads (managers and admins)
    #[command(after_help = "EXAMPLES:
    qahub keys                         # List keys, secrets masked
    qahub keys list --reveal           # Show full secrets
    qahub keys generate jenkins
    qahub keys revoke 7")]
    Keys {
        #[command(subcommand)]
        action: Option<KeysAction>,
    },

    /// Upload JUnit XML reports to the current project
    #[command(after_help = "EXAMPLES:
    qahub upload report.xml
    qahub upload target/surefire-reports/*

FILES:
    Only names ending in .xml are uploaded; anything else is skipped and counted.")]
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print run events for the current project as they happen
    Watch,

    /// Open the full-screen dashboard
    #[command(after_help = "EXAMPLES:
    qahub dashboard
    qahub dashboard --days 7
    qahub dashboard --open /runs/42

KEYS:
    Tab / 1-5     switch screens          [ ]   change date range
    p             next project            r     refresh
    ↑ ↓ Enter     select and open         o     open latest notification
    q             quit

LOGS:
    Written to <config dir>/logs/ while the dashboard is open.")]
    Dashboard {
        #[arg(short, long)]
        days: Option<DateRange>,

        /// Minimum flakiness score (0.0 to 1.0) for the flaky tests screen
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        flaky_threshold: f64,

        /// Screen to open first: /runs, /runs/<id>, /flaky-tests, /trends, /settings
        #[arg(long, value_name = "PATH")]
        open: Option<String>,
    },

    /// View, modify, or reset configuration values
    #[command(after_help = "EXAMPLES:
    qahub config                              # Show the current config
    qahub config set default_days 7
    qahub config set sample_fallback false
    qahub config reset                        # Back to defaults

CONFIG FILE:
    ~/.config/qahub/config.toml (QAHUB_CONFIG_DIR overrides the directory)

VALID KEYS:
    api_url               - REST API base URL
    broker_url            - STOMP WebSocket URL
    request_timeout_secs  - Per-request timeout
    reconnect_delay_ms    - Broker reconnect delay
    heartbeat_ms          - STOMP heart-beat interval
    notification_secs     - Notification lifetime
    default_days          - 7, 15, 30, 60 or 90
    sample_fallback       - Show sample data when the backend is down (true/false)")]
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },

    /// Output shell completion script to stdout (hidden utility command)
    #[command(hide = true)]
    Completions {
        /// Shell type to generate completions for (bash, zsh, or fish)
        shell: String,
    },
}

#[derive(Subcommand)]
enum ProjectsAction {
    /// Select the project other commands act on
    Use {
        /// Project id or name
        project: String,
    },
}

#[derive(Subcommand)]
enum FlakyAction {
    /// List flaky tests (the default)
    List {
        #[arg(short, long)]
        days: Option<DateRange>,

        /// Minimum flakiness score, 0.0 to 1.0
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        #[arg(short, long, default_value = "")]
        search: String,

        #[arg(long, value_parser = parse_resolution)]
        status: Option<ResolutionStatus>,

        /// all, acknowledged (yes) or unacknowledged (no)
        #[arg(long, default_value = "all")]
        ack: AckFilter,
    },

    /// Acknowledge a flaky test
    Ack {
        test: String,

        #[arg(short, long)]
        days: Option<DateRange>,
    },

    /// Remove the acknowledgement from a flaky test
    Unack {
        test: String,

        #[arg(short, long)]
        days: Option<DateRange>,
    },

    /// Set the resolution status of a flaky test
    Status {
        test: String,

        #[arg(value_parser = parse_resolution)]
        status: ResolutionStatus,

        #[arg(short, long)]
        days: Option<DateRange>,
    },
}

#[derive(Subcommand)]
enum KeysAction {
    /// List keys (the default)
    List {
        /// Print full secrets instead of the first 8 characters
        #[arg(long)]
        reveal: bool,
    },

    /// Create a key; the full secret is printed once
    Generate { name: String },

    /// Revoke a key by id
    Revoke {
        id: ApiKeyId,

        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Set a configuration value
    Set { key: String, value: String },

    /// Reset configuration to default values
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn parse_resolution(s: &str) -> std::result::Result<ResolutionStatus, String> {
    ResolutionStatus::parse(s).ok_or_else(|| {
        format!(
            "unknown status '{}'; expected unresolved, investigating, in-progress or resolved",
            s
        )
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The dashboard owns the terminal and logs to a file instead.
    if !matches!(cli.command, Commands::Dashboard { .. }) {
        logging::init_cli(cli.verbose);
    }

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        if e.is_auth_failure() {
            print_info("Run 'qahub login' to start a new session.");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Commands that work without a valid config or session.
    match &cli.command {
        Commands::Config { subcommand } => {
            return match subcommand {
                None => config_show_command(),
                Some(ConfigSubcommand::Set { key, value }) => config_set_command(key, value),
                Some(ConfigSubcommand::Reset { yes }) => config_reset_command(*yes),
            };
        }
        Commands::Completions { shell } => {
            let shell = ShellType::from_name(shell).map_err(|e| {
                QaHubError::ShellCompletion(format!(
                    "{}\nSupported shells: {}",
                    e,
                    SUPPORTED_SHELLS.join(", ")
                ))
            })?;
            print_completion_script(shell, &mut Cli::command());
            return Ok(());
        }
        _ => {}
    }

    let ctx = CliContext::load(cli.api_url.as_deref())?;

    match cli.command {
        Commands::Login {
            username,
            password_stdin,
        } => login_command(&ctx, username, password_stdin).await,
        Commands::Register {
            username,
            password_stdin,
        } => register_command(&ctx, username, password_stdin).await,
        Commands::Logout => logout_command(&ctx),
        Commands::Whoami => whoami_command(&ctx),
        Commands::Users => users_command(&ctx).await,

        Commands::Projects { action: None } => projects_command(&ctx).await,
        Commands::Projects {
            action: Some(ProjectsAction::Use { project }),
        } => projects_use_command(&ctx, &project).await,

        Commands::Runs { days, limit } => runs_command(&ctx, days, limit).await,
        Commands::Run { id, search, status } => {
            run_command(&ctx, id, &RunViewOptions { search, status }).await
        }
        Commands::Analyze { id } => analyze_command(&ctx, id).await,
        Commands::DeleteRun { id, yes } => delete_run_command(&ctx, id, yes).await,

        Commands::Flaky { action } => match action {
            None => flaky_list_command(&ctx, &FlakyListOptions::default()).await,
            Some(FlakyAction::List {
                days,
                threshold,
                search,
                status,
                ack,
            }) => {
                let options = FlakyListOptions {
                    days,
                    threshold,
                    search,
                    status,
                    acknowledged: ack,
                };
                flaky_list_command(&ctx, &options).await
            }
            Some(FlakyAction::Ack { test, days }) => flaky_ack_command(&ctx, &test, true, days).await,
            Some(FlakyAction::Unack { test, days }) => {
                flaky_ack_command(&ctx, &test, false, days).await
            }
            Some(FlakyAction::Status { test, status, days }) => {
                flaky_status_command(&ctx, &test, status, days).await
            }
        },

        Commands::Trends { days } => trends_command(&ctx, days).await,
        Commands::Failures { days, limit } => failures_command(&ctx, days, limit).await,

        Commands::Keys { action } => match action {
            None => keys_list_command(&ctx, false).await,
            Some(KeysAction::List { reveal }) => keys_list_command(&ctx, reveal).await,
            Some(KeysAction::Generate { name }) => keys_generate_command(&ctx, &name).await,
            Some(KeysAction::Revoke { id, yes }) => keys_revoke_command(&ctx, id, yes).await,
        },

        Commands::Upload { files } => upload_command(&ctx, &files).await,
        Commands::Watch => watch_command(&ctx).await,
        Commands::Dashboard {
            days,
            flaky_threshold,
            open,
        } => dashboard_command(&ctx, days, flaky_threshold, open.as_deref(), cli.verbose).await,

        // Handled above.
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}
