//! Session API handlers.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use benchline_store::{CreateSessionParams, UpdateSessionParams};
use benchline_types::Session;
use std::sync::Arc;

/// Handler for `POST /api/sessions`.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(params): Json<CreateSessionParams>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state.store.create_session(params)?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Handler for `GET /api/sessions`.
pub async fn list_sessions_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<Vec<Session>> {
    Json(state.store.list_sessions())
}

/// Handler for `GET /api/sessions/{sid}`.
pub async fn get_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.store.get_session(&sid)?))
}

/// Handler for `PATCH /api/sessions/{sid}`.
///
/// Setting `status` to `ended` stamps `ended_at` on the first transition
/// only; ending an already ended session leaves the original timestamp.
pub async fn update_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Json(updates): Json<UpdateSessionParams>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.store.update_session(&sid, updates)?))
}
