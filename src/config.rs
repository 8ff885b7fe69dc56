use crate::error::{QaHubError, Result};
use crate::filter::DateRange;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "qahub";

/// Overrides the whole config directory (used by scripts and tests).
const CONFIG_DIR_ENV: &str = "QAHUB_CONFIG_DIR";
const API_URL_ENV: &str = "QAHUB_API_URL";
const BROKER_URL_ENV: &str = "QAHUB_BROKER_URL";

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_BROKER_URL: &str = "ws://localhost:8080/ws/websocket";

// ============================================================================
// Client Configuration
// ============================================================================

/// Settings for talking to the backend and the push broker.
///
/// Every field has a serde default, so a partial `config.toml` still loads.
///
/// # Example
///
/// ```toml
/// api_url = "http://localhost:8080"
/// broker_url = "ws://localhost:8080/ws/websocket"
/// default_days = 30
/// sample_fallback = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// WebSocket URL of the STOMP broker.
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fixed delay between broker reconnect attempts.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// STOMP heart-beat interval offered in both directions.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    /// How long a run notification stays visible.
    #[serde(default = "default_notification_secs")]
    pub notification_secs: u64,

    /// Initial "last N days" filter.
    #[serde(default = "default_days")]
    pub default_days: u32,

    /// Show bundled sample data when a page fetch fails.
    ///
    /// Pages rendered from sample data are always labelled as such.
    #[serde(default = "default_true")]
    pub sample_fallback: bool,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_broker_url() -> String {
    DEFAULT_BROKER_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_heartbeat_ms() -> u64 {
    4000
}

fn default_notification_secs() -> u64 {
    8
}

fn default_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            broker_url: default_broker_url(),
            request_timeout_secs: default_request_timeout_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_ms: default_heartbeat_ms(),
            notification_secs: default_notification_secs(),
            default_days: default_days(),
            sample_fallback: true,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn notification_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.notification_secs as i64)
    }

    /// The configured default date range. Validated on load, so this falls
    /// back to 30 days only for hand-built configs.
    pub fn date_range(&self) -> DateRange {
        DateRange::from_days(self.default_days).unwrap_or_default()
    }

    /// Apply `QAHUB_API_URL` / `QAHUB_BROKER_URL` if set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env::var(API_URL_ENV).ok().filter(|s| !s.is_empty()) {
            self.api_url = url;
        }
        if let Some(url) = env::var(BROKER_URL_ENV).ok().filter(|s| !s.is_empty()) {
            self.broker_url = url;
        }
        self
    }
}

// ============================================================================
// Config Validation
// ============================================================================

use std::error::Error;
use std::fmt;

/// A specific reason a configuration is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A URL field does not parse or has the wrong scheme.
    InvalidUrl { key: &'static str, value: String },
    /// `default_days` is not one of 7, 15, 30, 60, 90.
    InvalidDays(u32),
    /// A duration field is zero.
    ZeroDuration(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidUrl { key, value } => {
                write!(f, "`{}` is not a valid URL: {}", key, value)
            }
            ConfigError::InvalidDays(days) => write!(
                f,
                "`default_days` must be one of {}, got {}",
                DateRange::allowed_values_label(),
                days
            ),
            ConfigError::ZeroDuration(key) => write!(f, "`{}` must be greater than zero", key),
        }
    }
}

impl Error for ConfigError {}

/// Validate a configuration for usability.
///
/// # Validation Rules
///
/// - `api_url` must be an `http`/`https` URL
/// - `broker_url` must be a `ws`/`wss` URL
/// - `default_days` must be one of the selectable ranges
/// - timeouts and intervals must be non-zero
///
/// # Example
///
/// ```
/// use qahub::config::{Config, validate_config};
///
/// assert!(validate_config(&Config::default()).is_ok());
///
/// let invalid = Config {
///     default_days: 12,
///     ..Default::default()
/// };
/// assert!(validate_config(&invalid).is_err());
/// ```
pub fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    check_url("api_url", &config.api_url, &["http", "https"])?;
    check_url("broker_url", &config.broker_url, &["ws", "wss"])?;

    if DateRange::from_days(config.default_days).is_none() {
        return Err(ConfigError::InvalidDays(config.default_days));
    }
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::ZeroDuration("request_timeout_secs"));
    }
    if config.reconnect_delay_ms == 0 {
        return Err(ConfigError::ZeroDuration("reconnect_delay_ms"));
    }
    if config.notification_secs == 0 {
        return Err(ConfigError::ZeroDuration("notification_secs"));
    }

    Ok(())
}

fn check_url(
    key: &'static str,
    value: &str,
    schemes: &[&str],
) -> std::result::Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
    };
    let parsed = url::Url::parse(value).map_err(|_| invalid())?;
    if schemes.contains(&parsed.scheme()) {
        Ok(())
    } else {
        Err(invalid())
    }
}

// ============================================================================
// Config File Management
// ============================================================================

const CONFIG_FILENAME: &str = "config.toml";

/// Get the qahub config directory path (~/.config/qahub/).
///
/// `QAHUB_CONFIG_DIR` takes precedence when set. Does not create the directory.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| QaHubError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Ensure the config directory exists, returning it and whether it was created.
pub fn ensure_config_dir() -> Result<(PathBuf, bool)> {
    let dir = config_dir()?;
    let created = !dir.exists();
    fs::create_dir_all(&dir)?;
    Ok((dir, created))
}

/// Path to `config.toml`.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Directory the TUI writes its log file into.
pub fn log_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("logs"))
}

/// Load, env-override and validate the configuration.
///
/// Creates a commented default file on first use.
pub fn load_config() -> Result<Config> {
    let config = load_config_at(&config_dir()?)?.with_env_overrides();
    validate_config(&config).map_err(|e| QaHubError::Config(e.to_string()))?;
    Ok(config)
}

/// Load `config.toml` from `dir`, writing defaults if the file is missing.
pub fn load_config_at(dir: &Path) -> Result<Config> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        fs::create_dir_all(dir)?;
        fs::write(&config_path, generate_config_with_comments(&Config::default()))?;
        return Ok(Config::default());
    }

    read_config_file(&config_path)
}

/// Parse a config file without creating anything.
pub fn read_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        QaHubError::Config(format!("Failed to parse config file at {:?}: {}", path, e))
    })
}

/// Save the configuration (with comments) to the default location.
pub fn save_config(config: &Config) -> Result<()> {
    save_config_at(&config_dir()?, config)
}

pub fn save_config_at(dir: &Path, config: &Config) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(CONFIG_FILENAME), generate_config_with_comments(config))?;
    Ok(())
}

/// Keys accepted by `qahub config set`.
pub const VALID_KEYS: &[&str] = &[
    "api_url",
    "broker_url",
    "request_timeout_secs",
    "reconnect_delay_ms",
    "heartbeat_ms",
    "notification_secs",
    "default_days",
    "sample_fallback",
];

/// Set one key from its string form, validating the resulting config.
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let mut updated = config.clone();
    match key {
        "api_url" => updated.api_url = value.to_string(),
        "broker_url" => updated.broker_url = value.to_string(),
        "request_timeout_secs" => updated.request_timeout_secs = parse_number(key, value)?,
        "reconnect_delay_ms" => updated.reconnect_delay_ms = parse_number(key, value)?,
        "heartbeat_ms" => updated.heartbeat_ms = parse_number(key, value)?,
        "notification_secs" => updated.notification_secs = parse_number(key, value)?,
        "default_days" => updated.default_days = parse_number(key, value)?,
        "sample_fallback" => {
            updated.sample_fallback = match value.to_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(QaHubError::Config(format!(
                        "Invalid value for '{}': expected true or false, got '{}'",
                        key, value
                    )))
                }
            }
        }
        _ => {
            return Err(QaHubError::Config(format!(
                "Unknown config key: '{}'\n\nValid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    validate_config(&updated).map_err(|e| QaHubError::Config(e.to_string()))?;
    *config = updated;
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        QaHubError::Config(format!(
            "Invalid value for '{}': expected a number, got '{}'",
            key, value
        ))
    })
}

/// Generate config file content with explanatory comments.
fn generate_config_with_comments(config: &Config) -> String {
    format!(
        r#"# qahub configuration

# REST API base URL (override with QAHUB_API_URL)
api_url = "{}"

# STOMP-over-WebSocket broker URL for live run notifications (override with QAHUB_BROKER_URL)
broker_url = "{}"

# Per-request timeout in seconds
request_timeout_secs = {}

# Delay between broker reconnect attempts, in milliseconds
reconnect_delay_ms = {}

# STOMP heart-beat interval in milliseconds (0 disables heart-beats)
heartbeat_ms = {}

# How long a run notification stays on screen, in seconds
notification_secs = {}

# Initial date range in days: one of 7, 15, 30, 60, 90
default_days = {}

# Show bundled sample data when the backend cannot be reached.
# Sample data is always labelled as such.
sample_fallback = {}
"#,
        config.api_url,
        config.broker_url,
        config.request_timeout_secs,
        config.reconnect_delay_ms,
        config.heartbeat_ms,
        config.notification_secs,
        config.default_days,
        config.sample_fallback,
    )
}
