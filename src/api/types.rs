//! Wire types mirrored from the backend's JSON (camelCase).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub type ProjectId = i64;
pub type RunId = i64;
pub type ApiKeyId = i64;

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: String,
}

/// The logged-in user as persisted in the session file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub role: String,
}

impl User {
    /// Managers and admins may create and revoke API keys.
    pub fn can_manage_keys(&self) -> bool {
        matches!(self.role.as_str(), "MANAGER" | "ADMIN")
    }
}

impl From<&LoginResponse> for User {
    fn from(resp: &LoginResponse) -> Self {
        Self {
            username: resp.username.clone(),
            role: resp.role.clone(),
        }
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// ============================================================================
// Runs
// ============================================================================

/// Overall health of a run.
///
/// Older backends reported `PASSED`/`FAILED`; those map onto the same two
/// states. Anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Other(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl From<String> for HealthStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Healthy" | "PASSED" => HealthStatus::Healthy,
            "Unhealthy" | "FAILED" => HealthStatus::Unhealthy,
            _ => HealthStatus::Other(s),
        }
    }
}

impl From<HealthStatus> for String {
    fn from(status: HealthStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Unhealthy => write!(f, "Unhealthy"),
            HealthStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailureAnalysisItem {
    pub root_cause: String,
    pub count: u32,
    #[serde(default)]
    pub affected_features: Vec<String>,
    pub suggested_fix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub executive_summary: String,
    #[serde(default)]
    pub failure_analysis: Vec<FailureAnalysisItem>,
    #[serde(default)]
    pub flakiness_check: String,
}

/// AI output is either the structured report or free-form markdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Analysis {
    Structured(AiAnalysis),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub id: RunId,
    #[serde(deserialize_with = "timestamp")]
    pub execution_date: DateTime<Utc>,
    pub total_tests: u32,
    pub pass_count: u32,
    pub fail_count: u32,
    #[serde(default)]
    pub skip_count: u32,
    pub status: HealthStatus,
    #[serde(default)]
    pub ai_analysis: Option<Analysis>,
}

impl TestRun {
    /// Pass percentage over executed (non-skipped) and skipped tests alike.
    pub fn pass_rate(&self) -> f64 {
        if self.total_tests == 0 {
            return 0.0;
        }
        self.pass_count as f64 * 100.0 / self.total_tests as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunDetails {
    #[serde(flatten)]
    pub run: TestRun,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Outcome of a single test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Unknown(String),
}

impl TestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::Skipped => "SKIPPED",
            TestStatus::Unknown(s) => s,
        }
    }
}

impl From<String> for TestStatus {
    fn from(s: String) -> Self {
        match s.to_uppercase().as_str() {
            "PASSED" => TestStatus::Passed,
            "FAILED" => TestStatus::Failed,
            "SKIPPED" => TestStatus::Skipped,
            _ => TestStatus::Unknown(s),
        }
    }
}

impl From<TestStatus> for String {
    fn from(status: TestStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestFailure {
    pub id: i64,
    pub failure_hash: String,
    pub message: String,
    #[serde(default)]
    pub stack_trace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: i64,
    #[serde(default)]
    pub test_name: String,
    pub class_name: String,
    pub status: TestStatus,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub test_failure: Option<TestFailure>,
}

// ============================================================================
// Dashboard aggregates
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendData {
    pub date: NaiveDate,
    pub pass_rate: f64,
    pub fail_count: u32,
    pub total_tests: u32,
    #[serde(default)]
    pub avg_duration: Option<f64>,
    #[serde(default)]
    pub max_duration: Option<f64>,
    #[serde(default)]
    pub min_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardMetrics {
    pub total_runs: u32,
    pub avg_pass_rate: f64,
    pub latest_pass_rate: f64,
    pub pass_rate_trend: f64,
    pub total_unique_failures: u32,
    pub avg_execution_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendsResponse {
    #[serde(default)]
    pub metrics: DashboardMetrics,
    #[serde(default)]
    pub daily_trends: Vec<TrendData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopFailure {
    pub error_message: String,
    pub count: u32,
    #[serde(default)]
    pub test_name: Option<String>,
}

/// Direction of a failure category. Words the client does not know are
/// kept verbatim and shown without an arrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    Other(String),
}

impl TrendDirection {
    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Up => "↑",
            TrendDirection::Down => "↓",
            TrendDirection::Stable => "→",
            TrendDirection::Other(_) => "·",
        }
    }
}

impl From<String> for TrendDirection {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "up" | "increasing" | "rising" => TrendDirection::Up,
            "down" | "decreasing" | "falling" => TrendDirection::Down,
            "stable" | "flat" => TrendDirection::Stable,
            _ => TrendDirection::Other(s),
        }
    }
}

impl From<TrendDirection> for String {
    fn from(trend: TrendDirection) -> Self {
        match trend {
            TrendDirection::Up => "up".to_string(),
            TrendDirection::Down => "down".to_string(),
            TrendDirection::Stable => "stable".to_string(),
            TrendDirection::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailurePattern {
    pub category: String,
    pub count: u32,
    pub trend: TrendDirection,
}

// ============================================================================
// Flaky tests
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStatus {
    #[default]
    Unresolved,
    Investigating,
    InProgress,
    Resolved,
}

impl ResolutionStatus {
    pub fn all() -> &'static [ResolutionStatus] {
        &[
            ResolutionStatus::Unresolved,
            ResolutionStatus::Investigating,
            ResolutionStatus::InProgress,
            ResolutionStatus::Resolved,
        ]
    }

    /// Wire form, e.g. `in-progress`.
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionStatus::Unresolved => "unresolved",
            ResolutionStatus::Investigating => "investigating",
            ResolutionStatus::InProgress => "in-progress",
            ResolutionStatus::Resolved => "resolved",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResolutionStatus::Unresolved => "Unresolved",
            ResolutionStatus::Investigating => "Investigating",
            ResolutionStatus::InProgress => "In Progress",
            ResolutionStatus::Resolved => "Resolved",
        }
    }

    /// Cycle order used by the dashboard's status key.
    pub fn next(self) -> ResolutionStatus {
        let all = ResolutionStatus::all();
        let idx = all.iter().position(|s| *s == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    pub fn parse(s: &str) -> Option<ResolutionStatus> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        ResolutionStatus::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
    }
}

/// Accepts any spelling [`ResolutionStatus::parse`] does. A status this
/// client does not know reads as unresolved.
impl<'de> Deserialize<'de> for ResolutionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ResolutionStatus::parse(&s).unwrap_or_default())
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlakyTest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub test_name: String,
    pub class_name: String,
    pub flakiness_score: f64,
    pub pass_count: u32,
    pub fail_count: u32,
    #[serde(default)]
    pub acknowledged: Option<bool>,
    #[serde(default)]
    pub resolution_status: Option<ResolutionStatus>,
    #[serde(default)]
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlakyMetrics {
    pub total_flaky_tests: u32,
    pub acknowledged_count: u32,
    pub in_progress_count: u32,
    pub resolved_count: u32,
    pub investigating_count: u32,
    pub unresolved_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlakyTestsResponse {
    #[serde(default)]
    pub metrics: FlakyMetrics,
    #[serde(default)]
    pub tests: Vec<FlakyTest>,
}

/// Body of the flaky-test status update call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlakyStatusUpdate {
    pub class_name: String,
    pub test_name: String,
    pub acknowledged: bool,
    pub resolution_status: ResolutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

// ============================================================================
// API keys
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub name: String,
    pub secret_key: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// First 8 characters of the secret followed by an ellipsis.
    pub fn masked_secret(&self) -> String {
        let prefix: String = self.secret_key.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateKeyRequest {
    pub name: String,
}

// ============================================================================
// Push events
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEventType {
    NewRun,
    Update,
}

/// Payload pushed on `/topic/project/{id}/runs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestRunEvent {
    pub run_id: RunId,
    pub status: HealthStatus,
    pub project_id: ProjectId,
    pub project_name: String,
    pub total_tests: u32,
    pub fail_count: u32,
    #[serde(rename = "type")]
    pub event_type: RunEventType,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// RFC 3339, or a timestamp without an offset, which is read as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s)))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_decodes_with_text_analysis() {
        let run: TestRun = serde_json::from_value(json!({
            "id": 7,
            "executionDate": "2024-01-07T14:30:00Z",
            "totalTests": 83,
            "passCount": 78,
            "failCount": 5,
            "skipCount": 0,
            "status": "Healthy",
            "aiAnalysis": "## Root cause"
        }))
        .unwrap();

        assert_eq!(run.id, 7);
        assert!(run.status.is_healthy());
        assert_eq!(run.ai_analysis, Some(Analysis::Text("## Root cause".into())));
    }

    #[test]
    fn test_run_decodes_structured_and_null_analysis() {
        let run: TestRun = serde_json::from_value(json!({
            "id": 1,
            "executionDate": "2024-01-07T14:30:00Z",
            "totalTests": 2, "passCount": 1, "failCount": 1,
            "status": "Unhealthy",
            "aiAnalysis": {
                "executiveSummary": "Gateway timeouts",
                "failureAnalysis": [{
                    "rootCause": "Timeout", "count": 1,
                    "affectedFeatures": ["payments"], "suggestedFix": "Retry"
                }],
                "flakinessCheck": "none"
            }
        }))
        .unwrap();
        match run.ai_analysis {
            Some(Analysis::Structured(a)) => {
                assert_eq!(a.executive_summary, "Gateway timeouts");
                assert_eq!(a.failure_analysis[0].affected_features, vec!["payments"]);
            }
            other => panic!("expected structured analysis, got {:?}", other),
        }

        let run: TestRun = serde_json::from_value(json!({
            "id": 2,
            "executionDate": "2024-01-07T14:30:00Z",
            "totalTests": 0, "passCount": 0, "failCount": 0,
            "status": "PASSED",
            "aiAnalysis": null
        }))
        .unwrap();
        assert!(run.ai_analysis.is_none());
        assert_eq!(run.skip_count, 0);
        assert!(run.status.is_healthy());
    }

    #[test]
    fn test_unknown_health_status_is_preserved() {
        let status: HealthStatus = serde_json::from_value(json!("Degraded")).unwrap();
        assert_eq!(status, HealthStatus::Other("Degraded".into()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("Degraded"));
    }

    #[test]
    fn test_timestamps_without_offset_read_as_utc() {
        let run: TestRun = serde_json::from_value(json!({
            "id": 3,
            "executionDate": "2024-01-07T14:30:00",
            "totalTests": 1, "passCount": 1, "failCount": 0,
            "status": "Healthy"
        }))
        .unwrap();
        assert_eq!(run.execution_date.to_rfc3339(), "2024-01-07T14:30:00+00:00");

        let key: ApiKey = serde_json::from_value(json!({
            "id": 1,
            "name": "ci",
            "secretKey": "qa_0123456789",
            "createdAt": "2024-01-05T09:15:30.123456",
            "lastUsedAt": "2024-01-06T10:00:00+02:00"
        }))
        .unwrap();
        assert_eq!(key.created_at.timestamp_subsec_micros(), 123456);
        assert_eq!(
            key.last_used_at.unwrap().to_rfc3339(),
            "2024-01-06T08:00:00+00:00"
        );

        let key: ApiKey = serde_json::from_value(json!({
            "id": 2, "name": "nightly", "secretKey": "qa_x",
            "createdAt": "2024-01-05T09:15:30Z", "lastUsedAt": null
        }))
        .unwrap();
        assert!(key.last_used_at.is_none());

        let bad = serde_json::from_value::<TestRun>(json!({
            "id": 4, "executionDate": "yesterday",
            "totalTests": 0, "passCount": 0, "failCount": 0, "status": "Healthy"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_unknown_trend_word_is_kept() {
        let pattern: FailurePattern =
            serde_json::from_value(json!({"category": "Timeout", "count": 4, "trend": "increasing"}))
                .unwrap();
        assert_eq!(pattern.trend, TrendDirection::Up);

        let pattern: FailurePattern =
            serde_json::from_value(json!({"category": "Other", "count": 1, "trend": "volatile"}))
                .unwrap();
        assert_eq!(pattern.trend, TrendDirection::Other("volatile".into()));
        assert_eq!(pattern.trend.arrow(), "·");
        assert_eq!(serde_json::to_value(&pattern.trend).unwrap(), json!("volatile"));
        assert_eq!(serde_json::to_value(TrendDirection::Down).unwrap(), json!("down"));
    }

    #[test]
    fn test_unknown_resolution_status_reads_as_unresolved() {
        let test: FlakyTest = serde_json::from_value(json!({
            "testName": "testRefund", "className": "PaymentTest",
            "flakinessScore": 0.3, "passCount": 7, "failCount": 3,
            "resolutionStatus": "wont-fix"
        }))
        .unwrap();
        assert_eq!(test.resolution_status, Some(ResolutionStatus::Unresolved));

        let status: ResolutionStatus = serde_json::from_value(json!("IN_PROGRESS")).unwrap();
        assert_eq!(status, ResolutionStatus::InProgress);
    }

    #[test]
    fn test_flaky_test_defaults_and_numeric_id() {
        let test: FlakyTest = serde_json::from_value(json!({
            "id": 42,
            "testName": "testUserLogin",
            "className": "AuthenticationTest",
            "flakinessScore": 0.45,
            "passCount": 55,
            "failCount": 45
        }))
        .unwrap();
        assert_eq!(test.id.as_deref(), Some("42"));
        assert_eq!(test.acknowledged, None);
        assert_eq!(test.resolution_status, None);
    }

    #[test]
    fn test_resolution_status_wire_format() {
        assert_eq!(
            serde_json::to_value(ResolutionStatus::InProgress).unwrap(),
            json!("in-progress")
        );
        assert_eq!(
            ResolutionStatus::parse("In Progress"),
            Some(ResolutionStatus::InProgress)
        );
        assert_eq!(ResolutionStatus::parse("in_progress"), Some(ResolutionStatus::InProgress));
        assert_eq!(ResolutionStatus::parse("done"), None);
        assert_eq!(ResolutionStatus::Resolved.next(), ResolutionStatus::Unresolved);
    }

    #[test]
    fn test_status_update_omits_missing_assignee() {
        let body = serde_json::to_value(FlakyStatusUpdate {
            class_name: "PaymentTest".into(),
            test_name: "testRefund".into(),
            acknowledged: true,
            resolution_status: ResolutionStatus::Investigating,
            assignee: None,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "className": "PaymentTest",
                "testName": "testRefund",
                "acknowledged": true,
                "resolutionStatus": "investigating"
            })
        );
    }

    #[test]
    fn test_run_event_decodes() {
        let event: TestRunEvent = serde_json::from_str(
            r#"{"runId":12,"status":"Unhealthy","projectId":3,"projectName":"web",
                "totalTests":40,"failCount":4,"type":"NEW_RUN"}"#,
        )
        .unwrap();
        assert_eq!(event.run_id, 12);
        assert_eq!(event.event_type, RunEventType::NewRun);
        assert!(!event.status.is_healthy());
    }

    #[test]
    fn test_run_details_flattens_run() {
        let details: RunDetails = serde_json::from_value(json!({
            "id": 5,
            "executionDate": "2024-01-05T16:45:00Z",
            "totalTests": 1, "passCount": 0, "failCount": 1, "skipCount": 0,
            "status": "Unhealthy",
            "testCases": [{
                "id": 1, "testName": "testPasswordReset", "className": "AuthTest",
                "status": "FAILED", "duration": 2.5,
                "testFailure": {"id": 1, "failureHash": "abc", "message": "no email", "stackTrace": "at X"}
            }]
        }))
        .unwrap();
        assert_eq!(details.run.id, 5);
        assert_eq!(details.test_cases[0].status, TestStatus::Failed);
        assert_eq!(
            details.test_cases[0].test_failure.as_ref().unwrap().failure_hash,
            "abc"
        );
    }

    #[test]
    fn test_masked_secret_and_roles() {
        let key = ApiKey {
            id: 1,
            name: "GitHub Actions".into(),
            secret_key: "qa_1234567890abcdef".into(),
            created_at: Utc::now(),
            last_used_at: None,
        };
        assert_eq!(key.masked_secret(), "qa_12345...");

        let manager = User {
            username: "m".into(),
            role: "MANAGER".into(),
        };
        let viewer = User {
            username: "v".into(),
            role: "USER".into(),
        };
        assert!(manager.can_manage_keys());
        assert!(!viewer.can_manage_keys());
    }
}
