//! `axum::Router` assembly: route table plus the auth/rate-limit/logging
//! middleware stack, mirroring the teacher's layered `mcp-protocol` router
//! construction with the MCP transport swapped for plain REST, §4.7.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::{auth, handlers, rate_limit, request_logger, state::AppState};

/// 10 MiB cap on request bodies; unbounded text fields (§6) still fit
/// comfortably, this only guards against abuse.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/projects", post(handlers::projects::create_project))
        .route("/projects/:id", get(handlers::projects::get_project))
        .route("/context", get(handlers::projects::get_context))
        .route("/register", post(handlers::agents::register_agent))
        .route(
            "/agents/:agent_id",
            delete(handlers::agents::delete_agent),
        )
        .route("/agents", get(handlers::agents::list_agents))
        .route("/epics", post(handlers::epics::create_epic).get(handlers::epics::list_epics))
        .route(
            "/features",
            post(handlers::features::create_feature).get(handlers::features::list_features),
        )
        .route("/tasks/create", post(handlers::tasks::create_task))
        .route("/tasks/next", get(handlers::tasks::dispatch_next_task))
        .route(
            "/tasks/:id",
            get(handlers::tasks::get_task),
        )
        .route("/tasks", get(handlers::tasks::list_tasks))
        .route("/tasks/:id/lock", post(handlers::tasks::lock_task))
        .route("/tasks/:id/status", put(handlers::tasks::set_task_status))
        .route(
            "/tasks/:id/comment",
            post(handlers::tasks::create_comment),
        )
        .route(
            "/tasks/:id/comments",
            get(handlers::tasks::list_comments),
        )
        .route(
            "/tasks/:id/evaluate",
            post(handlers::tasks::evaluate_task),
        )
        .route(
            "/documents",
            post(handlers::documents::create_document).get(handlers::documents::list_documents),
        )
        .route("/mentions", get(handlers::mentions::list_mentions))
        .route(
            "/mentions/:id/read",
            post(handlers::mentions::mark_mention_read),
        )
        .route(
            "/services/register",
            post(handlers::services::register_service),
        )
        .route(
            "/services/:name/heartbeat",
            post(handlers::services::heartbeat_service),
        )
        .route(
            "/services/:name",
            delete(handlers::services::delete_service),
        )
        .route("/services", get(handlers::services::list_services))
        .route("/changes", get(handlers::changes::get_changes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce_rate_limit,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn(
            request_logger::correlation_and_logging_middleware,
        ))
        .with_state(state)
}
