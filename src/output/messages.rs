//! Basic message output functions.

use super::colors::*;

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{RED}{BOLD}Error:{RESET} {}", msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    println!("{YELLOW}Warning:{RESET} {}", msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{CYAN}Info:{RESET} {}", msg);
}

pub fn print_success(msg: &str) {
    println!("{GREEN}\u{2714}{RESET} {}", msg);
}

/// Shown above any output that was filled from bundled sample data.
pub fn print_sample_notice() {
    println!("{YELLOW}{BOLD}SAMPLE DATA{RESET}{YELLOW} - the backend could not be reached.{RESET}");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_smoke() {
        print_error("boom");
        print_warning("careful");
        print_info("fyi");
        print_success("done");
        print_sample_notice();
    }
}
