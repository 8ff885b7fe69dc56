//! Bundled datasets shown when the backend cannot be reached.
//!
//! Anything rendered from here is tagged [`DataSource::Sample`] so the user
//! can tell it apart from live data.

use crate::api::types::*;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Where a page's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    #[default]
    Live,
    Sample,
}

impl DataSource {
    pub fn is_sample(self) -> bool {
        self == DataSource::Sample
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap_or_default()
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

pub fn trends() -> Vec<TrendData> {
    [
        (1, 85.0, 12, 80, 98.0),
        (2, 88.0, 10, 83, 104.0),
        (3, 82.0, 15, 83, 131.0),
        (4, 90.0, 8, 80, 87.0),
        (5, 92.0, 6, 75, 76.0),
        (6, 87.0, 11, 85, 112.0),
        (7, 94.0, 5, 83, 69.0),
    ]
    .into_iter()
    .map(|(day, pass_rate, fail_count, total_tests, avg)| TrendData {
        date: date(day),
        pass_rate,
        fail_count,
        total_tests,
        avg_duration: Some(avg),
        max_duration: Some(avg * 2.5),
        min_duration: Some(avg / 6.0),
    })
    .collect()
}

/// Metrics derived from [`trends`] so the sample dashboard is self-consistent.
pub fn dashboard_metrics() -> DashboardMetrics {
    let trends = trends();
    let n = trends.len() as f64;
    let avg_pass_rate = trends.iter().map(|t| t.pass_rate).sum::<f64>() / n;
    let latest = trends.last().map(|t| t.pass_rate).unwrap_or_default();
    let avg_execution_time = trends.iter().filter_map(|t| t.avg_duration).sum::<f64>() / n;
    DashboardMetrics {
        total_runs: runs().len() as u32,
        avg_pass_rate,
        latest_pass_rate: latest,
        pass_rate_trend: latest - avg_pass_rate,
        total_unique_failures: top_failures().len() as u32,
        avg_execution_time,
    }
}

pub fn top_failures() -> Vec<TopFailure> {
    [
        ("NullPointerException at UserService.java:42", 15, "testUserLogin"),
        ("Timeout waiting for element to be visible", 12, "testCheckout"),
        ("AssertionError: expected 200 but was 500", 8, "testAPIResponse"),
        ("Connection refused to database", 5, "testDatabaseQuery"),
    ]
    .into_iter()
    .map(|(message, count, test)| TopFailure {
        error_message: message.to_string(),
        count,
        test_name: Some(test.to_string()),
    })
    .collect()
}

fn flaky(
    test: &str,
    class: &str,
    score: f64,
    pass: u32,
    fail: u32,
    ack: Option<bool>,
    status: Option<ResolutionStatus>,
) -> FlakyTest {
    FlakyTest {
        id: None,
        test_name: test.to_string(),
        class_name: class.to_string(),
        flakiness_score: score,
        pass_count: pass,
        fail_count: fail,
        acknowledged: ack,
        resolution_status: status,
        assignee: None,
    }
}

/// The short list shown on the dashboard panel.
pub fn dashboard_flaky_tests() -> Vec<FlakyTest> {
    vec![
        flaky("testAsyncDataLoad", "DataLoaderTest", 0.45, 11, 9, None, None),
        flaky("testWebSocketConnection", "WebSocketTest", 0.38, 13, 7, None, None),
    ]
}

pub fn flaky_tests() -> Vec<FlakyTest> {
    use ResolutionStatus::*;
    vec![
        flaky("testUserLogin", "AuthenticationTest", 0.45, 55, 45, Some(false), Some(Unresolved)),
        flaky("testPaymentProcessing", "PaymentTest", 0.30, 70, 30, Some(true), Some(Investigating)),
        flaky("testDatabaseConnection", "DatabaseTest", 0.25, 75, 25, Some(false), Some(Unresolved)),
        flaky("testAPITimeout", "IntegrationTest", 0.20, 80, 20, Some(true), Some(InProgress)),
        flaky("testFileUpload", "FileHandlingTest", 0.15, 85, 15, Some(false), Some(Unresolved)),
        flaky("testCacheInvalidation", "CacheTest", 0.12, 88, 12, Some(true), Some(Resolved)),
    ]
}

fn run(id: RunId, when: DateTime<Utc>, total: u32, pass: u32, fail: u32) -> TestRun {
    let status = if fail >= 10 {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Healthy
    };
    TestRun {
        id,
        execution_date: when,
        total_tests: total,
        pass_count: pass,
        fail_count: fail,
        skip_count: 0,
        status,
        ai_analysis: None,
    }
}

pub fn runs() -> Vec<TestRun> {
    vec![
        run(1, at(7, 14, 30), 83, 78, 5),
        run(2, at(6, 10, 15), 85, 74, 11),
        run(3, at(5, 16, 45), 75, 69, 6),
        run(4, at(4, 9, 0), 80, 72, 8),
        run(5, at(3, 11, 30), 83, 68, 15),
        run(6, at(2, 8, 0), 79, 75, 4),
        run(7, at(1, 15, 20), 82, 70, 12),
    ]
}

/// The five most recent sample runs.
pub fn recent_runs() -> Vec<TestRun> {
    runs().into_iter().take(5).collect()
}

fn case(id: i64, test: &str, class: &str, status: TestStatus, duration: f64) -> TestCase {
    TestCase {
        id,
        test_name: test.to_string(),
        class_name: class.to_string(),
        status,
        duration,
        test_failure: None,
    }
}

fn failed(id: i64, test: &str, class: &str, duration: f64, hash: &str, message: &str, trace: &str) -> TestCase {
    TestCase {
        test_failure: Some(TestFailure {
            id: 1,
            failure_hash: hash.to_string(),
            message: message.to_string(),
            stack_trace: trace.to_string(),
        }),
        ..case(id, test, class, TestStatus::Failed, duration)
    }
}

/// Details for any requested run id, built on the run #1 case list.
pub fn run_details(id: RunId) -> RunDetails {
    use TestStatus::*;
    let mut summary = runs()
        .into_iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| run(id, at(7, 14, 30), 83, 78, 5));
    summary.id = id;
    RunDetails {
        run: summary,
        test_cases: vec![
            case(1, "testUserLogin", "AuthenticationTest", Passed, 1.2),
            case(2, "testUserLogout", "AuthenticationTest", Passed, 0.8),
            failed(
                3,
                "testPasswordReset",
                "AuthenticationTest",
                2.5,
                "abcdef123",
                "Expected email to be sent but no email was received",
                "at AuthenticationTest.testPasswordReset(AuthenticationTest.java:45)\n\
                 at sun.reflect.NativeMethodAccessorImpl.invoke0(Native Method)\n\
                 at org.junit.runners.model.FrameworkMethod.invokeExplosively(FrameworkMethod.java:47)",
            ),
            case(4, "testCheckoutFlow", "E2ETest", Passed, 5.4),
            failed(
                5,
                "testPaymentProcessing",
                "PaymentTest",
                3.2,
                "ghijkl456",
                "Connection timeout to payment gateway",
                "at PaymentTest.testPaymentProcessing(PaymentTest.java:78)\n\
                 at java.net.SocketInputStream.read(SocketInputStream.java:141)",
            ),
            case(6, "testProductSearch", "SearchTest", Passed, 1.8),
            case(7, "testAddToCart", "CartTest", Passed, 1.1),
            case(8, "testRemoveFromCart", "CartTest", Passed, 0.9),
            case(9, "testInventoryUpdate", "InventoryTest", Skipped, 0.0),
            case(10, "testOrderConfirmation", "OrderTest", Passed, 2.3),
        ],
    }
}

pub fn failure_patterns() -> Vec<FailurePattern> {
    use TrendDirection::*;
    [
        ("Timeout", 45, Up),
        ("Assertion", 32, Down),
        ("Connection", 28, Up),
        ("Null Pointer", 18, Stable),
        ("Out of Memory", 12, Down),
        ("Other", 8, Stable),
    ]
    .into_iter()
    .map(|(category, count, trend)| FailurePattern {
        category: category.to_string(),
        count,
        trend,
    })
    .collect()
}

pub const ANALYSIS_MARKDOWN: &str = "## Root Cause Analysis

### Critical Findings

1. **Authentication Service Timeout**
   - The password reset test failed due to email delivery timeout
   - Recommendation: Increase SMTP timeout or implement async email verification

2. **Payment Gateway Connection Issues**
   - Connection timeout suggests network instability or gateway overload
   - Consider implementing retry logic with exponential backoff

### Suggested Actions
- Review network configuration for payment service
- Add circuit breaker pattern for external service calls
- Implement email delivery queue with retry mechanism

### Test Health Score: 78%
The overall test suite is healthy, with isolated failures in external integrations.";

pub fn analysis() -> Analysis {
    Analysis::Text(ANALYSIS_MARKDOWN.to_string())
}
