//! Maps [`coordinator_core::CoreError`] to HTTP responses, §7.
//!
//! Every handler returns `Result<T, ApiError>`; this is the single place a
//! `CoreError` becomes a status code and JSON body, generalizing the
//! teacher's `McpError` -> JSON-RPC error mapping to plain HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coordinator_core::CoreError;
use serde_json::json;

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }
        let body = Json(json!({
            "error": self.0.kind(),
            "detail": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
