use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use benchline_server::config::CorsConfig;
use benchline_server::{app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    app(AppState::new(), &CorsConfig::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed_session(app: &Router) -> String {
    let (status, session) = send(
        app,
        "POST",
        "/api/sessions",
        Some(json!({ "name": "Pump bench" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    session["id"].as_str().unwrap().to_string()
}

async fn seed_task(app: &Router, sid: &str, chunk: &str) -> Value {
    let (status, task) = send(
        app,
        "POST",
        &format!("/api/sessions/{sid}/stt/tasks"),
        Some(json!({ "audio_chunk_id": chunk, "duration_seconds": 4.2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    task
}

#[tokio::test]
async fn create_task_starts_pending() {
    let app = test_app();
    let sid = seed_session(&app).await;

    let task = seed_task(&app, &sid, "chunk-001").await;

    assert!(task["id"].as_str().unwrap().starts_with("stt_"));
    assert_eq!(task["session_id"], sid);
    assert_eq!(task["audio_chunk_id"], "chunk-001");
    assert_eq!(task["duration_seconds"], 4.2);
    assert_eq!(task["status"], "pending");
    assert!(task["transcript"].is_null());
    assert!(task["error"].is_null());
}

#[tokio::test]
async fn create_task_missing_session_is_404() {
    let app = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/sessions/sess_missing/stt/tasks",
        Some(json!({ "audio_chunk_id": "chunk-001" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_tasks_returns_session_tasks() {
    let app = test_app();
    let sid = seed_session(&app).await;
    let other = seed_session(&app).await;

    seed_task(&app, &sid, "chunk-001").await;
    seed_task(&app, &sid, "chunk-002").await;
    seed_task(&app, &other, "chunk-xxx").await;

    let (status, tasks) = send(&app, "GET", &format!("/api/sessions/{sid}/stt/tasks"), None).await;

    assert_eq!(status, StatusCode::OK);
    let chunks: Vec<&str> = tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["audio_chunk_id"].as_str().unwrap())
        .collect();
    assert_eq!(chunks.len(), 2);
    assert!(chunks.contains(&"chunk-001"));
    assert!(chunks.contains(&"chunk-002"));
}

#[tokio::test]
async fn resolving_done_records_the_transcript() {
    let app = test_app();
    let sid = seed_session(&app).await;
    let task = seed_task(&app, &sid, "chunk-001").await;
    let task_id = task["id"].as_str().unwrap();

    let (status, resolved) = send(
        &app,
        "PUT",
        &format!("/api/sessions/{sid}/stt/tasks/{task_id}"),
        Some(json!({ "status": "done", "transcript": "pressure holding at 40 bar" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "done");
    assert_eq!(resolved["transcript"], "pressure holding at 40 bar");

    let (_, fetched) = send(
        &app,
        "GET",
        &format!("/api/sessions/{sid}/stt/tasks/{task_id}"),
        None,
    )
    .await;
    assert_eq!(fetched["status"], "done");
}

#[tokio::test]
async fn resolving_failed_records_the_error() {
    let app = test_app();
    let sid = seed_session(&app).await;
    let task = seed_task(&app, &sid, "chunk-001").await;
    let task_id = task["id"].as_str().unwrap();

    let (status, resolved) = send(
        &app,
        "PUT",
        &format!("/api/sessions/{sid}/stt/tasks/{task_id}"),
        Some(json!({ "status": "failed", "error": "decoder crashed" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "failed");
    assert_eq!(resolved["error"], "decoder crashed");
    assert!(resolved["transcript"].is_null());
}

#[tokio::test]
async fn resolving_a_terminal_task_is_409() {
    let app = test_app();
    let sid = seed_session(&app).await;
    let task = seed_task(&app, &sid, "chunk-001").await;
    let task_id = task["id"].as_str().unwrap();

    let uri = format!("/api/sessions/{sid}/stt/tasks/{task_id}");
    let (status, _) = send(&app, "PUT", &uri, Some(json!({ "status": "done" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "status": "failed" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["detail"],
        format!("stt task {task_id} is already done")
    );
}

#[tokio::test]
async fn resolving_to_pending_is_rejected() {
    let app = test_app();
    let sid = seed_session(&app).await;
    let task = seed_task(&app, &sid, "chunk-001").await;
    let task_id = task["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/sessions/{sid}/stt/tasks/{task_id}"),
        Some(json!({ "status": "pending" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["field"], "status");
}

#[tokio::test]
async fn get_unknown_task_is_404() {
    let app = test_app();
    let sid = seed_session(&app).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/sessions/{sid}/stt/tasks/stt_missing"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "stt task stt_missing not found");
}
