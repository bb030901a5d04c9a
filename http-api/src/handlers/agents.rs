//! `/api/v1/register`, `/api/v1/agents` — agent registration and directory.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use coordinator_core::{
    error::CoreError,
    liveness::{agent_availability, agent_liveness},
    models::NewAgent,
    validation::validate_agent_id,
};

use crate::{
    dto::{AgentView, DeleteAgentQuery, ListAgentsQuery, RegisterAgentRequest},
    error::ApiResult,
    state::AppState,
};

pub async fn register_agent(
    State(state): State<AppState>,
    Json(body): Json<RegisterAgentRequest>,
) -> ApiResult<Json<AgentView>> {
    validate_agent_id(&body.agent_id)?;
    let agent = state
        .store
        .upsert_agent(NewAgent {
            agent_id: body.agent_id,
            project_id: body.project_id,
            role: body.role,
            level: body.level,
            connection_type: body.connection_type,
        })
        .await?;

    state.hub.publish(body.project_id);

    let now = Utc::now();
    let liveness = agent_liveness(agent.last_seen, now, state.config.liveness);
    let availability = agent_availability(&agent, now, state.config.liveness);
    Ok(Json(AgentView::new(agent, liveness, availability)))
}

pub async fn list_agents(
    State(state): State<AppState>,
    Query(query): Query<ListAgentsQuery>,
) -> ApiResult<Json<Vec<AgentView>>> {
    let agents = state.store.list_agents(query.project_id).await?;
    let now = Utc::now();
    let views = agents
        .into_iter()
        .map(|agent| {
            let liveness = agent_liveness(agent.last_seen, now, state.config.liveness);
            let availability = agent_availability(&agent, now, state.config.liveness);
            AgentView::new(agent, liveness, availability)
        })
        .collect();
    Ok(Json(views))
}

/// PM-only per §6.1; the requester's role is checked against the agent
/// directory rather than trusted from the request body.
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<DeleteAgentQuery>,
) -> ApiResult<()> {
    let requester = state
        .store
        .get_agent(query.project_id, &query.requester_agent_id)
        .await?
        .ok_or_else(|| CoreError::not_found_entity("agent", &query.requester_agent_id))?;
    if !requester.role.is_pm() {
        return Err(CoreError::Forbidden("only a pm may remove an agent".to_string()).into());
    }

    state.store.delete_agent(query.project_id, &agent_id).await?;
    state.hub.publish(query.project_id);
    Ok(())
}
