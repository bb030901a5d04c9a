//! `/api/v1/services` — the service registry, §4.5.
//!
//! Staleness is evaluated at read time (`list_services`) rather than by a
//! background prober: the optional `ping_url` probe described in the spec is
//! a "may" and this build ships none, matching `DESIGN.md`'s recorded
//! decision. Heartbeats still re-assert `up` at write time.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use coordinator_core::{liveness::service_liveness, models::NewService, validation::validate_service_name};

use crate::{
    dto::{ListServicesQuery, RegisterServiceRequest, ServiceNameQuery, ServiceView},
    error::ApiResult,
    state::AppState,
};

pub async fn register_service(
    State(state): State<AppState>,
    Json(body): Json<RegisterServiceRequest>,
) -> ApiResult<Json<ServiceView>> {
    validate_service_name(&body.name)?;
    let service = state
        .store
        .register_service(NewService {
            project_id: body.project_id,
            name: body.name,
            owner_agent_id: body.owner_agent_id,
            port: body.port,
            ping_url: body.ping_url,
            meta: body.meta,
        })
        .await?;
    state.hub.publish(service.project_id);
    let status = service.status;
    Ok(Json(ServiceView::new(service, status)))
}

pub async fn heartbeat_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ServiceNameQuery>,
) -> ApiResult<Json<ServiceView>> {
    let service = state
        .store
        .heartbeat_service(query.project_id, &name)
        .await?;
    state.hub.publish(query.project_id);
    let status = service.status;
    Ok(Json(ServiceView::new(service, status)))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ServiceNameQuery>,
) -> ApiResult<()> {
    state.store.delete_service(query.project_id, &name).await?;
    state.hub.publish(query.project_id);
    Ok(())
}

pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ListServicesQuery>,
) -> ApiResult<Json<Vec<ServiceView>>> {
    let services = state.store.list_services(query.project_id).await?;
    let now = Utc::now();
    let views = services
        .into_iter()
        .map(|service| {
            let status = service_liveness(
                service.status,
                service.last_heartbeat,
                now,
                state.config.liveness,
            );
            ServiceView::new(service, status)
        })
        .collect();
    Ok(Json(views))
}
