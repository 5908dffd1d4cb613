use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rmq_permissions_core::PermissionError;
use serde_json::json;
use tracing::error;

/// Error returned by every `/rmq/v1` handler, rendered as
/// `{"error": <code>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "decode_error", message)
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        let (status, code) = match &err {
            PermissionError::InvalidRecord(_) => (StatusCode::BAD_REQUEST, "invalid_record"),
            PermissionError::Rejected(_) => (StatusCode::BAD_REQUEST, "rejected"),
            PermissionError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            PermissionError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
            PermissionError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            PermissionError::NotAuthorized(_) => (StatusCode::BAD_GATEWAY, "cluster_unauthorized"),
            PermissionError::ClusterUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "cluster_unavailable")
            }
            PermissionError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            error!(error = %err, code, "permission operation failed");
        }

        Self::new(status, code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.code, "message": self.message}))).into_response()
    }
}
