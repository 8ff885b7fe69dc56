//! Config command handler.
//!
//! Displays, modifies, and resets `~/.config/qahub/config.toml`. These run
//! without loading the session, so a broken config can still be repaired.

use crate::config::{config_dir, load_config_at, save_config_at, set_config_value, Config};
use crate::error::Result;
use crate::output::{print_info, print_success, BOLD, CYAN, GRAY, RESET, YELLOW};
use crate::prompt;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.toml";

pub fn config_show_command() -> Result<()> {
    config_show_at(&config_dir()?)
}

fn config_show_at(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILENAME);
    println!("{BOLD}# qahub config{RESET}");
    println!("{GRAY}# {}{RESET}", path.display());
    println!();

    let config = if path.exists() {
        crate::config::read_config_file(&path)?
    } else {
        println!("{YELLOW}# (file does not exist, using defaults){RESET}");
        println!();
        Config::default()
    };
    print_config_as_toml(&config);
    Ok(())
}

/// Print a Config struct as valid TOML.
fn print_config_as_toml(config: &Config) {
    println!("{CYAN}api_url{RESET} = \"{}\"", config.api_url);
    println!("{CYAN}broker_url{RESET} = \"{}\"", config.broker_url);
    println!("{CYAN}request_timeout_secs{RESET} = {}", config.request_timeout_secs);
    println!("{CYAN}reconnect_delay_ms{RESET} = {}", config.reconnect_delay_ms);
    println!("{CYAN}heartbeat_ms{RESET} = {}", config.heartbeat_ms);
    println!("{CYAN}notification_secs{RESET} = {}", config.notification_secs);
    println!("{CYAN}default_days{RESET} = {}", config.default_days);
    println!("{CYAN}sample_fallback{RESET} = {}", config.sample_fallback);
}

pub fn config_set_command(key: &str, value: &str) -> Result<()> {
    config_set_at(&config_dir()?, key, value)?;
    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn config_set_at(dir: &Path, key: &str, value: &str) -> Result<Config> {
    let mut config = load_config_at(dir)?;
    set_config_value(&mut config, key, value)?;
    save_config_at(dir, &config)?;
    Ok(config)
}

pub fn config_reset_command(yes: bool) -> Result<()> {
    if !yes && !prompt::confirm("Reset configuration to defaults?", false) {
        print_info("Configuration unchanged.");
        return Ok(());
    }
    save_config_at(&config_dir()?, &Config::default())?;
    print_success("Configuration reset to defaults.");
    Ok(())
}
