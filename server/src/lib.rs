//! Process wiring: load configuration, stand up the `SqliteStore`, run
//! migrations, build the `axum` app, and serve it with graceful shutdown.
//! Generalizes the teacher's `mcp-server::setup` module to this system's
//! plain-REST boundary.

pub mod config;
pub mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use coordinator_core::WakeHub;
use database::SqliteStore;

use crate::config::Config;

/// A bound, ready-to-serve application: the axum router and the address it
/// should listen on.
pub struct App {
    pub router: axum::Router,
    pub address: String,
}

/// Stand up the store (connect + migrate), the wake hub, and the HTTP router,
/// generalizing the teacher's `setup::initialize_app`.
pub async fn initialize_app(config: &Config) -> Result<App> {
    let store = SqliteStore::new(&config.database_url())
        .await
        .context("failed to connect to the database")?;
    store.migrate().await.context("failed to run database migrations")?;

    let hub = Arc::new(WakeHub::new(config.dispatcher.waiter_cap_per_project));

    let api_config = http_api::ApiConfig {
        api_key: config.api_key.clone(),
        rate_limit: config.rate_limit.limit,
        rate_limit_period_seconds: config.rate_limit.period_seconds,
        default_wait_seconds: config.dispatcher.wait_seconds,
        liveness: coordinator_core::liveness::LivenessWindows {
            agent_online_seconds: config.liveness.agent_online_window_seconds,
            agent_recent_seconds: config.liveness.agent_recent_window_seconds,
            service_stale_seconds: config.liveness.service_stale_seconds,
        },
    };

    let state = http_api::AppState::new(Arc::new(store), hub, api_config);
    let router = http_api::build_router(state);

    Ok(App {
        router,
        address: config.server_address(),
    })
}
