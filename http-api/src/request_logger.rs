//! Correlation-id and structured request logging middleware, §4.7.
//!
//! Assigns each request a short correlation id, logs method/path/status/
//! duration at `info`, and escalates to `warn`/`error` for 4xx/5xx --
//! generalizing the teacher's `mcp_request_logging_middleware` (which
//! parsed JSON-RPC method names out of the body) to plain REST routes,
//! where the method is already in the URI.

use std::time::Instant;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

pub async fn correlation_and_logging_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    request.headers_mut().insert(
        CORRELATION_HEADER,
        HeaderValue::from_str(&correlation_id).unwrap_or_else(|_| HeaderValue::from_static("invalid")),
    );

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let span = tracing::info_span!("request", %correlation_id, %method, %path);
    let _enter = span.enter();

    let mut response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(%method, %path, %status, ms = duration.as_millis(), "request failed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %path, %status, ms = duration.as_millis(), "request rejected");
    } else {
        tracing::info!(%method, %path, %status, ms = duration.as_millis(), "request completed");
    }

    response.headers_mut().insert(
        CORRELATION_HEADER,
        HeaderValue::from_str(&correlation_id).unwrap_or_else(|_| HeaderValue::from_static("invalid")),
    );
    response
}
