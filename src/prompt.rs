//! Interactive prompts for the CLI commands.

use crate::error::{QaHubError, Result};
use crate::output::{CYAN, GRAY, RESET};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, BufRead, Write};

fn print_question(question: &str) {
    print!("{CYAN}?{RESET} {} ", question);
    let _ = io::stdout().flush();
}

/// Ask a yes/no question and return the user's choice.
pub fn confirm(question: &str, default: bool) -> bool {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print_question(&format!("{} {GRAY}{}{RESET}", question, hint));

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return default;
    }
    parse_yes_no(&input, default)
}

fn parse_yes_no(input: &str, default: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

/// Read one visible line. Fails on EOF.
pub fn read_line(question: &str) -> Result<String> {
    print_question(question);
    let mut input = String::new();
    let read = io::stdin().lock().read_line(&mut input)?;
    if read == 0 {
        return Err(QaHubError::Validation("No input provided".to_string()));
    }
    Ok(input.trim().to_string())
}

/// Read a password without echoing it.
pub fn read_password(question: &str) -> Result<String> {
    print_question(question);
    enable_raw_mode()?;
    let result = read_hidden();
    disable_raw_mode()?;
    println!();
    result
}

fn read_hidden() -> Result<String> {
    let mut buffer = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(buffer),
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(QaHubError::Validation("Cancelled".to_string()));
                }
                KeyCode::Char(c) => buffer.push(c),
                KeyCode::Esc => return Err(QaHubError::Validation("Cancelled".to_string())),
                _ => {}
            }
        }
    }
}
