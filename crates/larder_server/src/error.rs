//! Mapping engine errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use larder_error::{LarderError, LarderErrorKind, ServerErrorKind, StorageErrorKind};
use serde_json::json;

/// Engine error carried out of a handler.
#[derive(Debug, derive_more::From)]
pub struct ApiError(LarderError);

impl ApiError {
    /// HTTP status for the wrapped error.
    ///
    /// Absent content and references outside the public namespace are
    /// indistinguishable to clients; both are 404.
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            LarderErrorKind::Storage(e) => match e.kind {
                StorageErrorKind::NotFound(_) | StorageErrorKind::InvalidPath(_) => {
                    StatusCode::NOT_FOUND
                }
                StorageErrorKind::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            LarderErrorKind::Upload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LarderErrorKind::Server(e) if matches!(e.kind, ServerErrorKind::Multipart(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ if self.0.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
            match self.0.kind() {
                LarderErrorKind::Upload(e) => e.kind.to_string(),
                LarderErrorKind::Server(e) => e.kind.to_string(),
                _ => "Not Found".to_string(),
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
