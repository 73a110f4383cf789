//! Integration tests for `DashboardApi` against an in-process mock backend.
//!
//! Each test spins up an axum router on an ephemeral port that mimics the
//! job-runner endpoints and records what the client sent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

use etx_client::schemas::RunJobRequest;
use etx_client::{ApiError, DashboardApi, DashboardBackend};
use etx_core::job::{JobStatus, JobType};
use etx_core::settings::{SettingValue, Settings};
use etx_core::terminal::TerminalMode;

#[derive(Default)]
struct Recorded {
    bodies: Vec<Value>,
    settings: Option<Value>,
    settings_text: Option<String>,
}

type Shared = Arc<Mutex<Recorded>>;

async fn run_job(State(rec): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let job_type = body["job_type"].as_str().unwrap_or_default().to_string();
    rec.lock().unwrap().bodies.push(body);
    match job_type.as_str() {
        "pipeline" | "run_etx_commands" => (
            StatusCode::OK,
            Json(json!({ "job_id": format!("{job_type}_20250101_120000") })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Unknown job type" })),
        ),
    }
}

async fn job_log(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "log": format!("log of {id}\nline 2\n") }))
}

async fn job_status(Path(id): Path<String>) -> Json<Value> {
    let status = if id == "done" { "success" } else { "whatever" };
    Json(json!({ "status": status }))
}

async fn job_history() -> Json<Value> {
    Json(json!({
        "history": [
            { "id": "a", "type": "pipeline", "start": "2025-01-01 10:00:00",
              "end": "2025-01-01 10:05:00", "status": "success", "log_file": "job_logs/a.log" },
            { "id": "b", "type": "local_to_etx", "start": "2025-01-01 11:00:00",
              "end": "2025-01-01 11:01:00", "status": "error", "log_file": "job_logs/b.log" },
        ]
    }))
}

async fn download_log(Path(id): Path<String>) -> (StatusCode, String) {
    if id == "a" {
        (StatusCode::OK, "raw log a\n".to_string())
    } else {
        (StatusCode::NOT_FOUND, String::new())
    }
}

async fn get_settings(State(rec): State<Shared>) -> Json<Value> {
    let stored = rec.lock().unwrap().settings.clone();
    Json(stored.unwrap_or_else(|| json!({ "REMOTE_HOST": "login04" })))
}

async fn post_settings(State(rec): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    rec.lock().unwrap().settings = Some(body);
    Json(json!({ "success": true }))
}

async fn get_settings_text(State(rec): State<Shared>) -> Json<Value> {
    let text = rec.lock().unwrap().settings_text.clone().unwrap_or_default();
    Json(json!({ "settings": text }))
}

async fn post_settings_text(
    State(rec): State<Shared>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    rec.lock().unwrap().settings_text = form.get("settings").cloned();
    Json(json!({ "success": true }))
}

async fn terminal_start(
    State(rec): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mode = body["mode"].as_str().unwrap_or_default().to_string();
    rec.lock().unwrap().bodies.push(body);
    if mode == "interactive" {
        (StatusCode::OK, Json(json!({ "success": true, "session_id": "s-1" })))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "ssh: cannot resolve login04" })),
        )
    }
}

async fn terminal_stop(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "success": id == "s-1" }))
}

async fn terminal_send(State(rec): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    rec.lock().unwrap().bodies.push(body);
    Json(json!({ "success": true }))
}

async fn terminal_output(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "output": format!("$ whoami\n{id}\n"), "active": false }))
}

async fn spawn_backend() -> (DashboardApi, Shared) {
    let rec: Shared = Arc::new(Mutex::new(Recorded::default()));

    let app = Router::new()
        .route("/run_job", post(run_job))
        .route("/job_log/{id}", get(job_log))
        .route("/job_status/{id}", get(job_status))
        .route("/job_history", get(job_history))
        .route("/download_log/{id}", get(download_log))
        .route("/settings_json", get(get_settings).post(post_settings))
        .route("/settings", get(get_settings_text).post(post_settings_text))
        .route("/terminal/start", post(terminal_start))
        .route("/terminal/stop/{id}", post(terminal_stop))
        .route("/terminal/send", post(terminal_send))
        .route("/terminal/output/{id}", get(terminal_output))
        .with_state(Arc::clone(&rec));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (DashboardApi::new(format!("http://{addr}/")), rec)
}

// ---------------------------------------------------------------------------
// Test: run_job omits hostname and is_gpu when not set
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_job_sends_minimal_body() {
    let (api, rec) = spawn_backend().await;

    let resp = api.run_job(&RunJobRequest::new(JobType::Pipeline)).await.unwrap();

    assert_eq!(resp.job_id.as_deref(), Some("pipeline_20250101_120000"));
    let bodies = &rec.lock().unwrap().bodies;
    assert_eq!(bodies[0], json!({ "job_type": "pipeline" }));
}

// ---------------------------------------------------------------------------
// Test: run_job includes hostname and is_gpu when set
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_job_sends_hostname_and_gpu_flag() {
    let (api, rec) = spawn_backend().await;

    let request = RunJobRequest {
        job_type: JobType::RunEtxCommands,
        hostname: Some("login10".into()),
        is_gpu: Some(true),
    };
    api.run_job(&request).await.unwrap();

    let bodies = &rec.lock().unwrap().bodies;
    assert_eq!(
        bodies[0],
        json!({ "job_type": "run_etx_commands", "hostname": "login10", "is_gpu": true })
    );
}

// ---------------------------------------------------------------------------
// Test: a rejected job type surfaces as an API error with the status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_job_rejection_is_api_error() {
    let (api, _rec) = spawn_backend().await;

    let err = api
        .run_job(&RunJobRequest::new(JobType::LocalToEtx))
        .await
        .unwrap_err();

    assert_matches!(err, ApiError::Api { status: 400, body } if body.contains("Unknown job type"));
}

// ---------------------------------------------------------------------------
// Test: log, status and history decode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn polling_endpoints_decode() {
    let (api, _rec) = spawn_backend().await;

    assert_eq!(api.job_log("abc").await.unwrap(), "log of abc\nline 2\n");
    assert_eq!(api.job_status("done").await.unwrap(), JobStatus::Success);
    assert_eq!(api.job_status("other").await.unwrap(), JobStatus::Unknown);

    let history = api.job_history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, "a");
    assert_eq!(history[1].status, JobStatus::Error);
}

// ---------------------------------------------------------------------------
// Test: download_log returns the raw body, 404 is an error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_log_returns_text_or_404() {
    let (api, _rec) = spawn_backend().await;

    assert_eq!(api.download_log("a").await.unwrap(), "raw log a\n");
    assert_matches!(
        api.download_log("missing").await,
        Err(ApiError::Api { status: 404, .. })
    );
    assert!(DashboardBackend::download_url(&api, "a").ends_with("/download_log/a"));
}

// ---------------------------------------------------------------------------
// Test: settings JSON save then load returns the same object
// ---------------------------------------------------------------------------

#[tokio::test]
async fn settings_json_round_trip() {
    let (api, _rec) = spawn_backend().await;

    let mut settings = Settings::new();
    settings.insert("DELETE_FILES".into(), SettingValue::Bool(false));
    settings.insert(
        "REMOTE_COMMANDS".into(),
        SettingValue::List(vec!["ls".into(), "pwd".into()]),
    );

    assert!(api.save_settings(&settings).await.unwrap());
    assert_eq!(api.load_settings().await.unwrap(), settings);
}

// ---------------------------------------------------------------------------
// Test: legacy settings save is form-encoded under `settings`
// ---------------------------------------------------------------------------

#[tokio::test]
async fn legacy_settings_are_form_encoded() {
    let (api, rec) = spawn_backend().await;

    let text = "REMOTE_HOST=login04\nREMOTE_COMMANDS=\nls -la\n";
    assert!(api.save_settings_text(text).await.unwrap());

    assert_eq!(rec.lock().unwrap().settings_text.as_deref(), Some(text));
    assert_eq!(api.load_settings_text().await.unwrap(), text);
}

// ---------------------------------------------------------------------------
// Test: terminal start failure body is returned even with a 500
// ---------------------------------------------------------------------------

#[tokio::test]
async fn terminal_start_failure_keeps_error_message() {
    let (api, _rec) = spawn_backend().await;

    let ok = api.terminal_start(TerminalMode::Interactive).await.unwrap();
    assert!(ok.success);
    assert_eq!(ok.session_id.as_deref(), Some("s-1"));

    let failed = api.terminal_start(TerminalMode::Automated).await.unwrap();
    assert!(!failed.success);
    assert_eq!(failed.error.as_deref(), Some("ssh: cannot resolve login04"));
}

// ---------------------------------------------------------------------------
// Test: terminal send, output and stop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn terminal_session_endpoints() {
    let (api, rec) = spawn_backend().await;

    let sent = api.terminal_send("s-1", "whoami").await.unwrap();
    assert!(sent.success);
    assert_eq!(
        rec.lock().unwrap().bodies[0],
        json!({ "session_id": "s-1", "command": "whoami" })
    );

    let out = api.terminal_output("s-1").await.unwrap();
    assert_eq!(out.output, "$ whoami\ns-1\n");
    assert!(!out.active);

    assert!(api.terminal_stop("s-1").await.unwrap());
    assert!(!api.terminal_stop("s-2").await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: an unreachable backend is a request error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_backend_is_request_error() {
    let api = DashboardApi::new("http://127.0.0.1:9");

    assert_matches!(api.job_history().await, Err(ApiError::Request(_)));
}
