//! Typed API error for HTTP handlers.
//!
//! Converts domain errors into proper HTTP responses with a JSON body,
//! so handlers can return `Result<Json<T>, ApiError>` without losing
//! error context to a bare status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use specdeck_core::PortalError;

/// API error with HTTP status code and human-readable message.
///
/// Serialized as `{"error": "message"}`. The `Internal` variant logs the
/// real error server-side and returns a static message to the client.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request — malformed log or unparseable URL.
    BadRequest(String),
    /// 404 Not Found — unconfigured host or no matching operation.
    NotFound(String),
    /// 500 Internal Server Error — engine or replay failure.
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        let body = serde_json::json!({"error": message});
        (status, Json(body)).into_response()
    }
}

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::MalformedLog(_) | PortalError::InvalidUrl { .. } => {
                Self::BadRequest(err.to_string())
            }
            PortalError::UnknownHost(_) | PortalError::NoOperation { .. } => {
                Self::NotFound(err.to_string())
            }
            _ => Self::Internal(err.into()),
        }
    }
}
