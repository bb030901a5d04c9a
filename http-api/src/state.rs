//! Shared axum handler state: the store, the wake hub, and boundary-level config.

use std::sync::Arc;

use coordinator_core::{liveness::LivenessWindows, Store, WakeHub};

use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct ApiConfig {
    /// `API_KEY`; `None` disables the `X-API-Key` check (local/dev only).
    pub api_key: Option<String>,
    /// `API_RATE_LIMIT` tokens per `API_RATE_LIMIT_PERIOD` seconds, per key.
    pub rate_limit: u32,
    pub rate_limit_period_seconds: u32,
    /// Default long-poll window for `/tasks/next` and `/changes` when the
    /// caller does not specify `wait_seconds`.
    pub default_wait_seconds: u64,
    /// Windows used to derive `AgentLiveness`/`Availability`/`ServiceStatus`
    /// for list responses, §4.5.
    pub liveness: LivenessWindows,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            rate_limit: 120,
            rate_limit_period_seconds: 60,
            default_wait_seconds: coordinator_core::dispatcher::DEFAULT_WAIT_SECONDS,
            liveness: LivenessWindows::default(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub hub: Arc<WakeHub>,
    pub config: Arc<ApiConfig>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, hub: Arc<WakeHub>, config: ApiConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit,
            config.rate_limit_period_seconds,
        ));
        Self {
            store,
            hub,
            config: Arc::new(config),
            rate_limiter,
        }
    }
}
