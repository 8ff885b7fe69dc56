//! API key management for the current project.
//!
//! Keys are only listed and mutated for managers and admins. After every
//! generate or revoke the list is fetched again rather than patched locally.

use crate::api::types::{ApiKey, ApiKeyId, ProjectId, User};
use crate::api::ApiClient;
use crate::error::{QaHubError, Result};

pub const EMPTY_MESSAGE: &str =
    "No API keys found. Generate one to integrate with your CI pipeline.";
pub const ACCESS_DENIED_MESSAGE: &str = "Only Managers can manage API Keys for this project.";

pub fn ensure_can_manage(user: Option<&User>) -> Result<()> {
    match user {
        Some(user) if user.can_manage_keys() => Ok(()),
        _ => Err(QaHubError::Forbidden(ACCESS_DENIED_MESSAGE.to_string())),
    }
}

/// Trimmed name, or a validation error for blank input.
pub fn validate_key_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QaHubError::Validation(
            "API key name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

pub async fn list(api: &ApiClient, user: Option<&User>, project: ProjectId) -> Result<Vec<ApiKey>> {
    ensure_can_manage(user)?;
    api.project_keys(project).await
}

/// Create a key and return it together with the refreshed list.
pub async fn generate(
    api: &ApiClient,
    user: Option<&User>,
    project: ProjectId,
    name: &str,
) -> Result<(ApiKey, Vec<ApiKey>)> {
    ensure_can_manage(user)?;
    let name = validate_key_name(name)?;
    let key = api.generate_key(project, &name).await?;
    let keys = api.project_keys(project).await?;
    Ok((key, keys))
}

/// Revoke a key and return the refreshed list.
pub async fn revoke(
    api: &ApiClient,
    user: Option<&User>,
    project: ProjectId,
    key: ApiKeyId,
) -> Result<Vec<ApiKey>> {
    ensure_can_manage(user)?;
    api.revoke_key(key).await?;
    api.project_keys(project).await
}

/// "Jan 07, 2024" or "Never".
pub fn last_used_label(key: &ApiKey) -> String {
    key.last_used_at
        .map(|t| t.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "Never".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn user(role: &str) -> User {
        User {
            username: "sam".into(),
            role: role.into(),
        }
    }

    #[test]
    fn test_role_gate() {
        assert!(ensure_can_manage(Some(&user("ADMIN"))).is_ok());
        assert!(ensure_can_manage(Some(&user("MANAGER"))).is_ok());
        assert!(matches!(
            ensure_can_manage(Some(&user("USER"))),
            Err(QaHubError::Forbidden(_))
        ));
        assert!(ensure_can_manage(None).is_err());
    }

    #[test]
    fn test_validate_key_name() {
        assert_eq!(validate_key_name("  GitHub Actions ").unwrap(), "GitHub Actions");
        assert!(validate_key_name("   ").is_err());
        assert!(validate_key_name("").is_err());
    }

    #[tokio::test]
    async fn test_viewer_cannot_list_keys_without_request() {
        // Unroutable backend: a request would surface as Network.
        let api = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let err = list(&api, Some(&user("USER")), 1).await.unwrap_err();
        assert!(matches!(err, QaHubError::Forbidden(_)));

        let err = generate(&api, Some(&user("ADMIN")), 1, " ").await.unwrap_err();
        assert!(matches!(err, QaHubError::Validation(_)));
    }

    #[test]
    fn test_last_used_label() {
        let mut key = ApiKey {
            id: 1,
            name: "ci".into(),
            secret_key: "qa_secret".into(),
            created_at: Utc::now(),
            last_used_at: None,
        };
        assert_eq!(last_used_label(&key), "Never");
        key.last_used_at = Utc.with_ymd_and_hms(2024, 1, 7, 9, 0, 0).single();
        assert_eq!(last_used_label(&key), "Jan 07, 2024");
    }
}
