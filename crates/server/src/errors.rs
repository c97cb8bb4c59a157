use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use service::errors::ServiceError;

/// HTTP-facing wrapper around the shared service error taxonomy. Repository
/// failures are logged and surface as a generic 500.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            ServiceError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({"success": false, "error": msg}),
            ),
            ServiceError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                serde_json::json!({"success": false, "error": msg}),
            ),
            ServiceError::NotFound(entity) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({"success": false, "error": format!("{entity} not found")}),
            ),
            ServiceError::Validation { message, fields } => {
                let mut body = serde_json::json!({"success": false, "error": message});
                if let Some(fields) = fields {
                    body["field_errors"] = serde_json::json!(fields);
                }
                (StatusCode::BAD_REQUEST, body)
            }
            ServiceError::Conflict(msg) => (
                StatusCode::CONFLICT,
                serde_json::json!({"success": false, "error": msg}),
            ),
            ServiceError::Repository(msg) => {
                error!(error = %msg, "repository error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({"success": false, "error": "server error"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
