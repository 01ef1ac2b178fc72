//! Benchline server library logic.

pub mod api_notes;
pub mod api_sessions;
pub mod api_stt;
pub mod api_telemetry;
pub mod api_ws;
pub mod config;
pub mod error;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use benchline_events::Broadcaster;
use benchline_store::Store;
use benchline_types::EventPayload;
use config::CorsConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all request handlers.
#[derive(Clone, Default)]
pub struct AppState {
    /// In-memory entity store.
    pub store: Arc<Store>,
    /// Per-session WebSocket fan-out.
    pub broadcaster: Broadcaster,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the events of one committed mutation to the owning
    /// session's subscribers. Delivery failures are handled inside the
    /// broadcaster and never surface to the HTTP caller.
    pub(crate) async fn publish_all(&self, session_id: &str, events: &[EventPayload]) {
        for event in events {
            self.broadcaster.publish(session_id, event).await;
        }
    }
}

/// Maximum request body size (2 MiB). Protects against OOM from oversized payloads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Service banner handler.
async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "benchline",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the CORS layer from the configured origin allow-list.
///
/// Origins that fail to parse as header values are skipped. Credentials
/// are allowed, which is why the methods and headers are enumerated
/// instead of using wildcards.
fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Builds the application router with all routes.
pub fn app(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/api/sessions",
            post(api_sessions::create_session_handler)
                .get(api_sessions::list_sessions_handler),
        )
        .route(
            "/api/sessions/{sid}",
            get(api_sessions::get_session_handler).patch(api_sessions::update_session_handler),
        )
        .route(
            "/api/sessions/{sid}/notes",
            post(api_notes::create_note_handler).get(api_notes::list_notes_handler),
        )
        .route(
            "/api/sessions/{sid}/notes/export",
            get(api_notes::export_notes_handler),
        )
        .route(
            "/api/sessions/{sid}/notes/{note_id}",
            get(api_notes::get_note_handler)
                .put(api_notes::update_note_handler)
                .delete(api_notes::delete_note_handler),
        )
        .route(
            "/api/sessions/{sid}/telemetry",
            post(api_telemetry::create_sample_handler)
                .get(api_telemetry::list_telemetry_handler),
        )
        .route(
            "/api/sessions/{sid}/telemetry/batch",
            post(api_telemetry::create_batch_handler),
        )
        .route(
            "/api/sessions/{sid}/telemetry/latest",
            get(api_telemetry::latest_telemetry_handler),
        )
        .route(
            "/api/sessions/{sid}/telemetry/channels",
            get(api_telemetry::list_channels_handler),
        )
        .route(
            "/api/sessions/{sid}/stt/tasks",
            post(api_stt::create_task_handler).get(api_stt::list_tasks_handler),
        )
        .route(
            "/api/sessions/{sid}/stt/tasks/{task_id}",
            get(api_stt::get_task_handler).put(api_stt::update_task_handler),
        )
        .route("/ws/sessions/{sid}", get(api_ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(cors_layer(cors))
        .layer(Extension(Arc::new(state)))
}
