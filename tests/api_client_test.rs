use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use qahub::api::types::{HealthStatus, ResolutionStatus};
use qahub::api::{stage_reports, ApiClient};
use qahub::config::Config;
use qahub::error::QaHubError;
use qahub::pages::flaky::{self, FlakyBoard};
use qahub::pages::{dashboard, runs, Loaded, PageContext};
use qahub::sample::DataSource;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base: &str) -> ApiClient {
    ApiClient::new(base, Duration::from_secs(5)).unwrap()
}

fn run_json(id: i64) -> Value {
    json!({
        "id": id,
        "executionDate": "2024-01-07T14:30:00Z",
        "totalTests": 10,
        "passCount": 9,
        "failCount": 1,
        "skipCount": 0,
        "status": "Healthy"
    })
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn test_login_then_bearer_token_is_sent() {
    let router = Router::new()
        .route(
            "/api/auth/login",
            post(|Json(body): Json<Value>| async move {
                if body["username"] == "sam" && body["password"] == "pw" {
                    (
                        StatusCode::OK,
                        Json(json!({"token": "tok-1", "username": "sam", "role": "MANAGER"})),
                    )
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({})))
                }
            }),
        )
        .route(
            "/api/projects",
            get(|headers: HeaderMap| async move {
                match bearer(&headers).as_deref() {
                    Some("Bearer tok-1") => (
                        StatusCode::OK,
                        Json(json!([
                            {"id": 1, "name": "Web"},
                            {"id": 2, "name": "Mobile", "description": "iOS and Android"}
                        ])),
                    ),
                    _ => (StatusCode::FORBIDDEN, Json(json!("no token"))),
                }
            }),
        );
    let base = serve(router).await;
    let api = client(&base);

    assert!(matches!(
        api.login("sam", "wrong").await,
        Err(QaHubError::Unauthorized)
    ));

    let login = api.login("sam", "pw").await.unwrap();
    assert_eq!(login.token, "tok-1");
    assert_eq!(login.role, "MANAGER");

    assert!(matches!(
        api.list_projects().await,
        Err(QaHubError::Forbidden(_))
    ));

    let api = api.with_token(Some(login.token));
    let projects = api.list_projects().await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].description, "");
    assert_eq!(projects[1].name, "Mobile");
}

#[tokio::test]
async fn test_error_statuses_map_to_variants() {
    let router = Router::new()
        .route("/api/users", get(|| async { StatusCode::UNAUTHORIZED }))
        .route(
            "/api/runs/{id}",
            get(|Path(id): Path<i64>| async move {
                (StatusCode::NOT_FOUND, format!("run {} not found", id))
            }),
        )
        .route(
            "/api/runs/{id}/analyze-run",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    let base = serve(router).await;
    let api = client(&base).with_token(Some("t".into()));

    assert!(matches!(api.list_users().await, Err(QaHubError::Unauthorized)));

    match api.run_details(7).await {
        Err(QaHubError::Http { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "run 7 not found");
        }
        other => panic!("expected 404, got {:?}", other.map(|_| ())),
    }

    match api.analyze_run(8).await {
        Err(QaHubError::Http { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected 500, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_runs_query_parameters() {
    let router = Router::new().route(
        "/api/runs",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            let expected = q.get("limit").map(String::as_str) == Some("5")
                && q.get("days").map(String::as_str) == Some("7")
                && q.get("projectId").map(String::as_str) == Some("3");
            if expected {
                (StatusCode::OK, Json(json!([run_json(1), run_json(2)])))
            } else {
                (StatusCode::BAD_REQUEST, Json(json!(q)))
            }
        }),
    );
    let base = serve(router).await;
    let api = client(&base);

    let runs = api.runs(Some(5), Some(7), 3).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].status, HealthStatus::Healthy);
    assert!((runs[0].pass_rate() - 90.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_empty_run_list_is_live_not_sample() {
    let router = Router::new().route("/api/runs", get(|| async { Json(json!([])) }));
    let base = serve(router).await;
    let ctx = PageContext::new(client(&base), Some(1), 30, &Config::default());

    let loaded = runs::load(&ctx).await.unwrap();
    assert_eq!(loaded.source, DataSource::Live);
    assert!(loaded.data.is_empty());
}

#[derive(Default)]
struct UploadSeen {
    files: Vec<String>,
    project: Option<String>,
}

#[tokio::test]
async fn test_upload_sends_only_staged_xml() {
    let seen = Arc::new(Mutex::new(UploadSeen::default()));
    let router = Router::new()
        .route(
            "/upload-report",
            post(
                |State(seen): State<Arc<Mutex<UploadSeen>>>, mut form: Multipart| async move {
                    let mut created = Vec::new();
                    while let Some(field) = form.next_field().await.unwrap() {
                        let name = field.name().unwrap_or_default().to_string();
                        if name == "files" {
                            let file = field.file_name().unwrap_or_default().to_string();
                            seen.lock().unwrap().files.push(file);
                            created.push(100 + created.len() as i64);
                        } else if name == "projectId" {
                            let text = field.text().await.unwrap();
                            seen.lock().unwrap().project = Some(text);
                        }
                    }
                    Json(created)
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    let base = serve(router).await;

    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for name in ["a.xml", "b.xml", "notes.txt", "c.xml.bak"] {
        let path = dir.path().join(name);
        std::fs::write(&path, "<testsuite/>").unwrap();
        paths.push(path);
    }

    let staged = stage_reports(&paths).unwrap();
    assert_eq!(staged.staged.len(), 2);
    assert_eq!(staged.skipped.len(), 2);

    let api = client(&base).with_token(Some("t".into()));
    let created = api.upload_reports(&staged.staged, 4).await.unwrap();
    assert_eq!(created, vec![100, 101]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.files, vec!["a.xml".to_string(), "b.xml".to_string()]);
    assert_eq!(seen.project.as_deref(), Some("4"));
}

#[tokio::test]
async fn test_blank_key_name_is_never_sent() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/api/projects/{id}/keys",
            post(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::CREATED
            }),
        )
        .with_state(Arc::clone(&hits));
    let base = serve(router).await;
    let api = client(&base).with_token(Some("t".into()));

    assert!(matches!(
        api.generate_key(1, "   ").await,
        Err(QaHubError::Validation(_))
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_key_lifecycle() {
    let router = Router::new()
        .route(
            "/api/projects/{id}/keys",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "id": 9,
                    "name": body["name"],
                    "secretKey": "abcdefghijklmnop",
                    "createdAt": "2024-01-05T10:00:00Z"
                }))
            })
            .get(|| async {
                Json(json!([{
                    "id": 9,
                    "name": "jenkins",
                    "secretKey": "abcdefghijklmnop",
                    "createdAt": "2024-01-05T10:00:00Z",
                    "lastUsedAt": null
                }]))
            }),
        )
        .route("/api/keys/{id}", delete(|| async { StatusCode::NO_CONTENT }));
    let base = serve(router).await;
    let api = client(&base).with_token(Some("t".into()));

    let key = api.generate_key(1, "  jenkins ").await.unwrap();
    assert_eq!(key.name, "jenkins");
    assert_eq!(key.masked_secret(), "abcdefgh...");

    let keys = api.project_keys(1).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].last_used_at.is_none());

    api.revoke_key(9).await.unwrap();
}

#[tokio::test]
async fn test_dashboard_falls_back_to_sample_when_backend_unreachable() {
    // Bind then drop so the port is known to be closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let ctx = PageContext::new(api.clone(), Some(1), 30, &Config::default());

    let loaded = dashboard::load(&ctx).await.unwrap();
    assert_eq!(loaded.source, DataSource::Sample);
    assert_eq!(loaded.data, dashboard::DashboardData::sample());

    let strict = PageContext {
        sample_fallback: false,
        ..ctx
    };
    assert!(matches!(
        dashboard::load(&strict).await,
        Err(QaHubError::Network(_))
    ));
}

#[tokio::test]
async fn test_dashboard_one_failing_panel_switches_all_to_sample() {
    let router = Router::new()
        .route(
            "/api/dashboard/trends",
            get(|| async { Json(json!({"metrics": {}, "dailyTrends": []})) }),
        )
        .route(
            "/api/dashboard/top-failures",
            get(|| async { Json(json!([])) }),
        )
        .route(
            "/api/dashboard/flaky-tests",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/api/runs", get(|| async { Json(json!([run_json(1)])) }));
    let base = serve(router).await;
    let ctx = PageContext::new(client(&base), Some(1), 7, &Config::default());

    let loaded = dashboard::load(&ctx).await.unwrap();
    assert_eq!(loaded.source, DataSource::Sample);
    assert_eq!(loaded.data.runs, dashboard::DashboardData::sample().runs);
}

#[tokio::test]
async fn test_flaky_update_failure_restores_exact_state() {
    let router = Router::new().route(
        "/api/dashboard/flaky-tests/update",
        post(|Json(body): Json<Value>| async move {
            if body["resolutionStatus"] == "resolved" {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }),
    );
    let base = serve(router).await;
    let api = client(&base).with_token(Some("t".into()));

    let mut board = FlakyBoard::new(Loaded::live(qahub::sample::flaky_tests()));
    let id = board.find("AuthenticationTest.testUserLogin").unwrap().id.clone();
    let before = board.get(&id).unwrap().clone();

    // Acknowledge: the backend rejects it, so the flag flips back.
    let pending = board.begin_toggle_ack(&id).unwrap();
    assert!(board.get(&id).unwrap().acknowledged);
    let outcome = flaky::commit(&api, &pending).await;
    assert!(outcome.is_err());
    let toast = board.settle(&pending, &outcome);
    assert_eq!(toast.message, "Failed to update acknowledgement status");
    assert_eq!(board.get(&id).unwrap(), &before);

    // Resolve: accepted, so the change sticks.
    let pending = board.begin_set_status(&id, ResolutionStatus::Resolved).unwrap();
    let outcome = flaky::commit(&api, &pending).await;
    assert!(outcome.is_ok());
    board.settle(&pending, &outcome);
    assert_eq!(
        board.get(&id).unwrap().resolution_status,
        ResolutionStatus::Resolved
    );
}
