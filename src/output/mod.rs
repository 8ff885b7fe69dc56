//! Terminal output for the CLI commands.
//!
//! - [`messages`] - Error, warning, info and success lines
//! - [`progress`] - Spinners and bar strings
//! - [`report`] - Tables and detail views for backend data

pub mod messages;
pub mod progress;
pub mod report;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

pub use colors::*;

pub use messages::{print_error, print_info, print_sample_notice, print_success, print_warning};
pub use progress::{make_progress_bar, terminal_width, Spinner};
pub use report::*;
