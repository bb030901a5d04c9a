//! `X-API-Key` authentication middleware, §6.1/§6.3.
//!
//! The teacher's `mcp-protocol::auth` validates an OAuth bearer token against
//! scopes; this system names a single shared secret instead (`API_KEY`), so
//! the check collapses to a constant-time string comparison against the
//! configured key. An empty configured key disables the check entirely,
//! matching the teacher's `McpAuth::new(enabled: bool)` development escape
//! hatch.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

const HEADER_NAME: &str = "x-api-key";

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(HEADER_NAME)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!("rejected request with missing or invalid X-API-Key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secre0"));
        assert!(!constant_time_eq(b"secret", b"short"));
    }
}
