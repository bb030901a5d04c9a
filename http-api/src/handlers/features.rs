//! `/api/v1/features` — feature creation and listing under an epic.

use axum::{
    extract::{Query, State},
    Json,
};
use coordinator_core::{models::NewFeature, validation::require_non_empty};

use crate::{
    dto::{CreateFeatureRequest, ListFeaturesQuery},
    error::ApiResult,
    state::AppState,
};

pub async fn create_feature(
    State(state): State<AppState>,
    Json(body): Json<CreateFeatureRequest>,
) -> ApiResult<Json<coordinator_core::models::Feature>> {
    require_non_empty("name", &body.name)?;
    let feature = state
        .store
        .create_feature(NewFeature {
            epic_id: body.epic_id,
            name: body.name,
            description: body.description,
        })
        .await?;
    Ok(Json(feature))
}

pub async fn list_features(
    State(state): State<AppState>,
    Query(query): Query<ListFeaturesQuery>,
) -> ApiResult<Json<Vec<coordinator_core::models::Feature>>> {
    let features = state
        .store
        .list_features(query.project_id, query.epic_id)
        .await?;
    Ok(Json(features))
}
