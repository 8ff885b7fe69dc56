use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QaHubError {
    #[error("Not logged in. Run 'qahub login' first.")]
    NotLoggedIn,

    #[error("No project selected. Run 'qahub projects use <id|name>' first.")]
    NoProjectSelected,

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Unauthorized: the session token was rejected. Please log in again.")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from backend: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error("Report file not found: {0}")]
    ReportNotFound(PathBuf),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Session file error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shell completion error: {0}")]
    ShellCompletion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QaHubError {
    /// Whether the backend refused the request for authorization reasons.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, QaHubError::Unauthorized | QaHubError::Forbidden(_))
    }
}

impl From<reqwest::Error> for QaHubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            QaHubError::Decode(err.to_string())
        } else {
            QaHubError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, QaHubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        assert!(QaHubError::Unauthorized.is_auth_failure());
        assert!(QaHubError::Forbidden("nope".into()).is_auth_failure());
        assert!(!QaHubError::Network("refused".into()).is_auth_failure());
        assert!(!QaHubError::Http {
            status: 500,
            body: String::new()
        }
        .is_auth_failure());
    }

    #[test]
    fn test_http_error_message_includes_status_and_body() {
        let err = QaHubError::Http {
            status: 409,
            body: "duplicate".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request failed with status 409: duplicate"
        );
    }
}
