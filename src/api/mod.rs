//! HTTP client for the test-results backend.
//!
//! Every call attaches the session's bearer token when one is present. There
//! is no retry, caching or request de-duplication: failures surface to the
//! caller as-is.

pub mod types;
pub mod upload;

use crate::config::Config;
use crate::error::{QaHubError, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

pub use types::*;
pub use upload::{stage_reports, StagedReport, StagedUpload};

/// Page size the dashboard uses for its "recent" panels.
pub const DASHBOARD_PANEL_LIMIT: u32 = 5;

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| QaHubError::Config(format!("invalid api_url '{}': {}", base_url, e)))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QaHubError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_url, config.request_timeout())
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| QaHubError::Config(format!("invalid request url: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(target: "qahub::api", %method, %url, "request");
        let req = self.http.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send and map non-2xx statuses onto the error enum.
    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        error!(target: "qahub::api", %status, body = %body, "request failed");
        Err(match status {
            StatusCode::UNAUTHORIZED => QaHubError::Unauthorized,
            StatusCode::FORBIDDEN => QaHubError::Forbidden(body),
            _ => QaHubError::Http {
                status: status.as_u16(),
                body,
            },
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path, query)?;
        let resp = self.send(self.request(Method::GET, url)).await?;
        Ok(resp.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path, &[])?;
        let resp = self.send(self.request(Method::POST, url).json(body)).await?;
        Ok(resp.json().await?)
    }

    // ------------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------------

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let body = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post_json("/api/auth/login", &body).await
    }

    /// Returns the server's confirmation text.
    pub async fn register(&self, username: &str, password: &str) -> Result<String> {
        let body = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let url = self.url("/api/auth/register", &[])?;
        let resp = self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(resp.text().await?)
    }

    /// Usernames known to the backend.
    pub async fn list_users(&self) -> Result<Vec<String>> {
        self.get_json("/api/users", &[]).await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get_json("/api/projects", &[]).await
    }

    // ------------------------------------------------------------------------
    // Dashboard aggregates
    // ------------------------------------------------------------------------

    pub async fn trends(&self, days: u32, project: ProjectId) -> Result<TrendsResponse> {
        self.get_json(
            "/api/dashboard/trends",
            &[("days", days.to_string()), ("projectId", project.to_string())],
        )
        .await
    }

    pub async fn top_failures(
        &self,
        limit: u32,
        days: u32,
        project: ProjectId,
    ) -> Result<Vec<TopFailure>> {
        self.get_json(
            "/api/dashboard/top-failures",
            &[
                ("limit", limit.to_string()),
                ("days", days.to_string()),
                ("projectId", project.to_string()),
            ],
        )
        .await
    }

    pub async fn flaky_tests(
        &self,
        days: u32,
        threshold: f64,
        project: ProjectId,
    ) -> Result<FlakyTestsResponse> {
        self.get_json(
            "/api/dashboard/flaky-tests",
            &[
                ("days", days.to_string()),
                ("flakyThreshold", threshold.to_string()),
                ("projectId", project.to_string()),
            ],
        )
        .await
    }

    pub async fn failure_patterns(&self, days: u32, project: ProjectId) -> Result<Vec<FailurePattern>> {
        self.get_json(
            "/api/dashboard/failure-patterns",
            &[("days", days.to_string()), ("projectId", project.to_string())],
        )
        .await
    }

    pub async fn update_flaky_status(&self, update: &FlakyStatusUpdate) -> Result<()> {
        let url = self.url("/api/dashboard/flaky-tests/update", &[])?;
        self.send(self.request(Method::POST, url).json(update)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Runs
    // ------------------------------------------------------------------------

    pub async fn runs(
        &self,
        limit: Option<u32>,
        days: Option<u32>,
        project: ProjectId,
    ) -> Result<Vec<TestRun>> {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(days) = days {
            query.push(("days", days.to_string()));
        }
        query.push(("projectId", project.to_string()));
        self.get_json("/api/runs", &query).await
    }

    pub async fn run_details(&self, id: RunId) -> Result<RunDetails> {
        self.get_json(&format!("/api/runs/{}", id), &[]).await
    }

    pub async fn delete_run(&self, id: RunId) -> Result<()> {
        let url = self.url(&format!("/api/runs/{}", id), &[])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    pub async fn analyze_run(&self, id: RunId) -> Result<Analysis> {
        let url = self.url(&format!("/api/runs/{}/analyze-run", id), &[])?;
        let resp = self.send(self.request(Method::POST, url)).await?;
        let body: AnalyzeResponse = resp.json().await?;
        Ok(body.analysis)
    }

    /// Upload staged reports; the backend answers with the created run ids.
    pub async fn upload_reports(
        &self,
        reports: &[StagedReport],
        project: ProjectId,
    ) -> Result<Vec<RunId>> {
        if reports.is_empty() {
            return Err(QaHubError::Validation(
                "No XML report files to upload".to_string(),
            ));
        }
        let mut form = reqwest::multipart::Form::new();
        for report in reports {
            let bytes = tokio::fs::read(&report.path).await?;
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(report.file_name.clone())
                .mime_str("text/xml")?;
            form = form.part("files", part);
        }
        form = form.text("projectId", project.to_string());

        let url = self.url("/upload-report", &[])?;
        let resp = self.send(self.request(Method::POST, url).multipart(form)).await?;
        Ok(resp.json().await?)
    }

    // ------------------------------------------------------------------------
    // API keys
    // ------------------------------------------------------------------------

    pub async fn project_keys(&self, project: ProjectId) -> Result<Vec<ApiKey>> {
        self.get_json(&format!("/api/projects/{}/keys", project), &[])
            .await
    }

    /// Blank names are rejected before any request is made.
    pub async fn generate_key(&self, project: ProjectId, name: &str) -> Result<ApiKey> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QaHubError::Validation(
                "API key name must not be empty".to_string(),
            ));
        }
        self.post_json(
            &format!("/api/projects/{}/keys", project),
            &GenerateKeyRequest {
                name: name.to_string(),
            },
        )
        .await
    }

    pub async fn revoke_key(&self, id: ApiKeyId) -> Result<()> {
        let url = self.url(&format!("/api/keys/{}", id), &[])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_url_joins_path_and_query() {
        let api = client("http://localhost:8080/");
        let url = api
            .url(
                "/api/dashboard/trends",
                &[("days", "30".into()), ("projectId", "2".into())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/dashboard/trends?days=30&projectId=2"
        );
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let api = client("https://qa.example.com/backend");
        let url = api.url("/api/runs/4", &[]).unwrap();
        assert_eq!(url.as_str(), "https://qa.example.com/backend/api/runs/4");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(ApiClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let api = client("http://localhost:8080").with_token(Some(String::new()));
        assert!(api.token.is_none());
    }

    #[tokio::test]
    async fn test_blank_key_name_never_sent() {
        // Unroutable port: a request would fail with Network, not Validation.
        let api = client("http://127.0.0.1:1");
        let err = api.generate_key(1, "   ").await.unwrap_err();
        assert!(matches!(err, QaHubError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_upload_never_sent() {
        let api = client("http://127.0.0.1:1");
        let err = api.upload_reports(&[], 1).await.unwrap_err();
        assert!(matches!(err, QaHubError::Validation(_)));
    }
}
