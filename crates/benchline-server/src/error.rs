//! API error surface shared by all request handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use benchline_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Errors returned by API handlers, mapped onto HTTP status codes.
///
/// Every variant renders as a JSON body with a top-level `detail` field.
/// Validation failures carry a list of per-field messages; everything else
/// carries a single string.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{entity} {id} not found"))
            }
            StoreError::Validation { field, message } => ApiError::Validation { field, message },
            StoreError::Conflict(message) => ApiError::Conflict(message),
            StoreError::Json(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!(message)),
            ApiError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!([{ "field": field, "message": message }]),
            ),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, json!(message)),
            ApiError::Internal(message) => {
                tracing::error!("request failed: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("internal server error"),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_404_detail() {
        let err: ApiError = StoreError::NotFound {
            entity: "session",
            id: "sess_1a2b3c4d".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "session sess_1a2b3c4d not found"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_validation_maps_to_422() {
        let err: ApiError = StoreError::Validation {
            field: "name",
            message: "must not be empty",
        }
        .into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn store_conflict_maps_to_409() {
        let err: ApiError =
            StoreError::Conflict("stt task stt_1a2b3c4d is already done".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
