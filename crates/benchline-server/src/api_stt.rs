//! STT task API handlers.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use benchline_store::{CreateSttTaskParams, UpdateSttTaskParams};
use benchline_types::SttTask;
use std::sync::Arc;

/// Handler for `POST /api/sessions/{sid}/stt/tasks`. Broadcasts
/// `stt.task.created`.
pub async fn create_task_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Json(params): Json<CreateSttTaskParams>,
) -> Result<(StatusCode, Json<SttTask>), ApiError> {
    let committed = state.store.create_task(&sid, params)?;
    state.publish_all(&sid, &committed.events).await;
    Ok((StatusCode::CREATED, Json(committed.record)))
}

/// Handler for `GET /api/sessions/{sid}/stt/tasks`.
pub async fn list_tasks_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
) -> Result<Json<Vec<SttTask>>, ApiError> {
    Ok(Json(state.store.list_tasks(&sid)?))
}

/// Handler for `GET /api/sessions/{sid}/stt/tasks/{task_id}`.
pub async fn get_task_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((sid, task_id)): Path<(String, String)>,
) -> Result<Json<SttTask>, ApiError> {
    Ok(Json(state.store.get_task(&sid, &task_id)?))
}

/// Handler for `PUT /api/sessions/{sid}/stt/tasks/{task_id}`.
///
/// Resolves a pending task to `done` or `failed`. A completed task
/// broadcasts `stt.task.done`; a failed one broadcasts `error.occurred`
/// carrying the failure message. Re-resolving a terminal task is a 409.
pub async fn update_task_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((sid, task_id)): Path<(String, String)>,
    Json(updates): Json<UpdateSttTaskParams>,
) -> Result<Json<SttTask>, ApiError> {
    let committed = state.store.update_task(&sid, &task_id, updates)?;
    state.publish_all(&sid, &committed.events).await;
    Ok(Json(committed.record))
}
