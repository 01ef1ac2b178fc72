//! Telemetry API handlers.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use benchline_store::{CreateTelemetryParams, TelemetryFilter};
use benchline_types::TelemetrySample;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Handler for `POST /api/sessions/{sid}/telemetry`.
pub async fn create_sample_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Json(params): Json<CreateTelemetryParams>,
) -> Result<(StatusCode, Json<TelemetrySample>), ApiError> {
    let sample = state.store.create_sample(&sid, params)?;
    Ok((StatusCode::CREATED, Json(sample)))
}

/// Request body for the batch ingest endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryBatch {
    pub data: Vec<CreateTelemetryParams>,
}

/// Handler for `POST /api/sessions/{sid}/telemetry/batch`.
///
/// The whole batch is validated before anything is stored; a single bad
/// sample rejects the entire request.
pub async fn create_batch_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Json(batch): Json<TelemetryBatch>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let created = state.store.create_batch(&sid, batch.data)?;
    Ok((StatusCode::CREATED, Json(json!({ "created": created }))))
}

/// Handler for `GET /api/sessions/{sid}/telemetry`.
///
/// Accepts `channel`, `from`, `to` and `limit` query filters. Results are
/// newest first, capped at `limit` (default 1000).
pub async fn list_telemetry_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Query(filter): Query<TelemetryFilter>,
) -> Result<Json<Vec<TelemetrySample>>, ApiError> {
    Ok(Json(state.store.list_telemetry(&sid, &filter)?))
}

/// Query parameters for the latest-sample endpoint.
#[derive(Debug, Deserialize)]
pub struct LatestParams {
    pub channel: String,
}

/// Handler for `GET /api/sessions/{sid}/telemetry/latest`.
pub async fn latest_telemetry_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
    Query(params): Query<LatestParams>,
) -> Result<Json<TelemetrySample>, ApiError> {
    Ok(Json(state.store.latest_telemetry(&sid, &params.channel)?))
}

/// Handler for `GET /api/sessions/{sid}/telemetry/channels`.
pub async fn list_channels_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(sid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let channels = state.store.list_channels(&sid)?;
    Ok(Json(json!({ "channels": channels })))
}
