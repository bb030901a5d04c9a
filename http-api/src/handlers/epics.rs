//! `/api/v1/epics` — epic creation and listing.

use axum::{
    extract::{Query, State},
    Json,
};
use coordinator_core::{models::NewEpic, validation::require_non_empty};

use crate::{
    dto::{CreateEpicRequest, ListEpicsQuery},
    error::ApiResult,
    state::AppState,
};

pub async fn create_epic(
    State(state): State<AppState>,
    Json(body): Json<CreateEpicRequest>,
) -> ApiResult<Json<coordinator_core::models::Epic>> {
    require_non_empty("name", &body.name)?;
    let epic = state
        .store
        .create_epic(NewEpic {
            project_id: body.project_id,
            name: body.name,
            description: body.description,
            created_by_agent: body.created_by_agent,
        })
        .await?;
    Ok(Json(epic))
}

pub async fn list_epics(
    State(state): State<AppState>,
    Query(query): Query<ListEpicsQuery>,
) -> ApiResult<Json<Vec<coordinator_core::models::Epic>>> {
    let epics = state.store.list_epics(query.project_id).await?;
    Ok(Json(epics))
}
