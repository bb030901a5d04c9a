//! `GET /api/v1/changes` — the unified change-since-timestamp feed, §4.6.

use axum::{
    extract::{Query, State},
    Json,
};
use coordinator_core::{
    aggregator::{changes, changes_wait, Viewer},
    time::MonotonicTimestamp,
};

use crate::{dto::{ChangesQuery, ChangesResponse}, error::ApiResult, state::AppState};

pub async fn get_changes(
    State(state): State<AppState>,
    Query(query): Query<ChangesQuery>,
) -> ApiResult<Json<ChangesResponse>> {
    let since = match &query.since {
        Some(raw) => raw.parse::<MonotonicTimestamp>().unwrap_or(MonotonicTimestamp::EPOCH),
        None => MonotonicTimestamp::EPOCH,
    };

    let viewer_role_is_pm = match &query.agent_id {
        Some(agent_id) => state
            .store
            .get_agent(query.project_id, agent_id)
            .await?
            .map(|a| a.role.is_pm())
            .unwrap_or(false),
        None => true,
    };
    let viewer = match (&query.agent_id, viewer_role_is_pm) {
        (_, true) => Viewer::ProjectPm,
        (Some(agent_id), false) => Viewer::Agent(agent_id),
        (None, false) => Viewer::ProjectPm,
    };

    let wait_seconds = query.wait_seconds.unwrap_or(state.config.default_wait_seconds);
    let window = if query.wait {
        changes_wait(
            state.store.as_ref(),
            &state.hub,
            query.project_id,
            since,
            viewer,
            true,
            wait_seconds,
        )
        .await?
    } else {
        changes(state.store.as_ref(), query.project_id, since, viewer).await?
    };

    Ok(Json(ChangesResponse::from(window)))
}
