//! `/api/v1/projects`, `/api/v1/context` — project creation and lookup.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use coordinator_core::{error::CoreError, models::NewProject, validation::validate_project_name};

use crate::{
    dto::{ContextQuery, CreateProjectRequest},
    error::ApiResult,
    state::AppState,
};

pub async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<Json<coordinator_core::models::Project>> {
    validate_project_name(&body.name)?;
    let project = state
        .store
        .create_project(NewProject {
            name: body.name,
            shared_path: body.shared_path,
            instructions_path: body.instructions_path,
            docs_path: body.docs_path,
            guidelines_path: body.guidelines_path,
            repo_url: body.repo_url,
            repo_main_branch: body.repo_main_branch,
            repo_clone_path: body.repo_clone_path,
        })
        .await?;
    Ok(Json(project))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<coordinator_core::models::Project>> {
    let project = state
        .store
        .get_project(id)
        .await?
        .ok_or_else(|| CoreError::not_found_entity("project", id))?;
    Ok(Json(project))
}

/// Alias of `get_project` scoped by query string, §6.1.
pub async fn get_context(
    State(state): State<AppState>,
    Query(query): Query<ContextQuery>,
) -> ApiResult<Json<coordinator_core::models::Project>> {
    get_project(State(state), Path(query.project_id)).await
}
