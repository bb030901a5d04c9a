//! Per-API-key token-bucket rate limiter, `API_RATE_LIMIT`/`API_RATE_LIMIT_PERIOD`.
//!
//! A plain `Mutex<HashMap>` bucket table, the same shape as `wake::WakeHub`'s
//! lazily-created per-project entries, rather than pulling in a dedicated
//! rate-limiting crate the teacher never depended on.

use std::{collections::HashMap, sync::Mutex, time::Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    capacity: f64,
    refill_per_second: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(limit: u32, period_seconds: u32) -> Self {
        let period = period_seconds.max(1) as f64;
        Self {
            capacity: limit as f64,
            refill_per_second: limit as f64 / period,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Keys buckets by `X-API-Key` when present, falling back to the peer
/// address so unauthenticated `/health` traffic is still bounded.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<std::net::SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    if state.rate_limiter.try_acquire(&key) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(%key, "rate limit exceeded");
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_capacity_then_blocks() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.try_acquire("a"));
        assert!(limiter.try_acquire("a"));
        assert!(!limiter.try_acquire("a"));
    }

    #[test]
    fn buckets_are_independent_per_key() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.try_acquire("a"));
        assert!(limiter.try_acquire("b"));
    }
}
