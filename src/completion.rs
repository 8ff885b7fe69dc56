//! Shell completion scripts for `qahub completions <shell>`.
//!
//! The clap `Command` is built by the binary and passed in, so the script
//! always matches the real argument tree.

use crate::error::{QaHubError, Result};
use clap::Command;
use clap_complete::{generate, Shell};

pub const BIN_NAME: &str = "qahub";

pub const SUPPORTED_SHELLS: &[&str] = &["bash", "zsh", "fish"];

/// Supported shell types for completion scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

impl ShellType {
    pub fn to_clap_shell(self) -> Shell {
        match self {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
        }
    }

    /// Accepts a bare name (`zsh`) or a shell path (`/usr/bin/zsh`).
    pub fn from_name(name: &str) -> Result<ShellType> {
        let name = std::path::Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);

        match name {
            "bash" => Ok(ShellType::Bash),
            "zsh" => Ok(ShellType::Zsh),
            "fish" => Ok(ShellType::Fish),
            _ => Err(QaHubError::ShellCompletion(format!(
                "Unsupported shell: '{}'",
                name
            ))),
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub fn generate_completion_script(shell: ShellType, cmd: &mut Command) -> String {
    let mut buf = Vec::new();
    generate(shell.to_clap_shell(), cmd, BIN_NAME, &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

pub fn print_completion_script(shell: ShellType, cmd: &mut Command) {
    print!("{}", generate_completion_script(shell, cmd));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cli() -> Command {
        Command::new(BIN_NAME)
            .subcommand(Command::new("runs").about("List test runs"))
            .subcommand(Command::new("dashboard").about("Open the dashboard"))
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ShellType::from_name("bash").unwrap(), ShellType::Bash);
        assert_eq!(ShellType::from_name("/usr/bin/zsh").unwrap(), ShellType::Zsh);
        assert_eq!(ShellType::from_name("fish").unwrap(), ShellType::Fish);
    }

    #[test]
    fn test_from_name_unsupported() {
        let err = ShellType::from_name("powershell").unwrap_err();
        assert!(err.to_string().contains("Unsupported shell: 'powershell'"));
    }

    #[test]
    fn test_generate_bash_includes_subcommands() {
        let script = generate_completion_script(ShellType::Bash, &mut sample_cli());
        assert!(script.contains("qahub"));
        assert!(script.contains("runs"));
        assert!(script.contains("dashboard"));
    }

    #[test]
    fn test_generate_fish() {
        let script = generate_completion_script(ShellType::Fish, &mut sample_cli());
        assert!(script.contains("complete -c qahub"));
    }

    #[test]
    fn test_display() {
        assert_eq!(ShellType::Zsh.to_string(), "zsh");
    }
}
