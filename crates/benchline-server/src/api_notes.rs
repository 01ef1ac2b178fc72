//! Note API handlers, including the notes export endpoint.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Extension, Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use benchline_store::{CreateNoteParams, ExportFormat, NoteFilter, UpdateNoteParams};
use benchline_types::Note;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Handler for `POST /api/sessions/{sid}/notes`. Broadcasts `note.created`.
pub async fn create_note_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Json(params): Json<CreateNoteParams>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let committed = state.store.create_note(&sid, params)?;
    state.publish_all(&sid, &committed.events).await;
    Ok((StatusCode::CREATED, Json(committed.record)))
}

/// Handler for `GET /api/sessions/{sid}/notes`.
///
/// Accepts `speaker`, `type`, `from` and `to` query filters; the time
/// bounds are inclusive. Results are ascending by note timestamp.
pub async fn list_notes_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.store.list_notes(&sid, &filter)?))
}

/// Query parameters for the notes export endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ExportFormat,
}

/// Handler for `GET /api/sessions/{sid}/notes/export`.
///
/// Serves the rendered document with the content type matching the
/// requested format (`text/markdown` or `application/json`).
pub async fn export_notes_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let export = state.store.export_notes(&sid, params.format)?;
    Ok(([(header::CONTENT_TYPE, export.content_type)], export.body).into_response())
}

/// Handler for `GET /api/sessions/{sid}/notes/{note_id}`.
pub async fn get_note_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((sid, note_id)): Path<(String, String)>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(state.store.get_note(&sid, &note_id)?))
}

/// Handler for `PUT /api/sessions/{sid}/notes/{note_id}`. Broadcasts
/// `note.updated`.
pub async fn update_note_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((sid, note_id)): Path<(String, String)>,
    Json(updates): Json<UpdateNoteParams>,
) -> Result<Json<Note>, ApiError> {
    let committed = state.store.update_note(&sid, &note_id, updates)?;
    state.publish_all(&sid, &committed.events).await;
    Ok(Json(committed.record))
}

/// Handler for `DELETE /api/sessions/{sid}/notes/{note_id}`. Broadcasts
/// `note.deleted`.
pub async fn delete_note_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((sid, note_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let committed = state.store.delete_note(&sid, &note_id)?;
    state.publish_all(&sid, &committed.events).await;
    Ok(Json(json!({ "message": format!("Note {note_id} deleted") })))
}
