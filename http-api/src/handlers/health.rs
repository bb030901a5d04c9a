//! `GET /health` — unauthenticated, project-less liveness probe.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::ApiResult, state::AppState};

pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.store.health_check().await?;
    Ok(Json(json!({ "status": "ok" })))
}
