//! `/api/v1/tasks*` — task creation, the dispatcher entry point, locking,
//! lifecycle transitions, comments, and evaluation.
//!
//! §4.3's `RoleGate::TargetRoleHolder`/QA-only authority for the lock-start
//! edges is intentionally left to the caller by
//! `lifecycle::validate_transition` (see its doc comment); this module is
//! that caller, and enforces it against `task.target_role` before the
//! transition is attempted.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use coordinator_core::{
    dispatcher::{self, DispatchOutcome},
    error::CoreError,
    lifecycle::{self, TransitionKind},
    models::{MentionSourceType, NewTask, NewTaskComment, Role, TaskFilter, TaskStatus},
    notifier::extract_handles,
    validation::require_non_empty,
};

use crate::{
    dto::{
        CreateCommentRequest, CreateTaskRequest, DispatchQuery, DispatchResponse,
        EvaluateTaskRequest, GetTaskQuery, ListTasksQuery, LockTaskRequest, SetTaskStatusRequest,
        SetTaskStatusResponse,
    },
    error::ApiResult,
    state::AppState,
};

async fn load_task_in_project(
    state: &AppState,
    task_id: i64,
    project_id: i64,
) -> ApiResult<coordinator_core::models::Task> {
    let task = state
        .store
        .get_task(task_id)
        .await?
        .ok_or_else(|| CoreError::not_found_entity("task", task_id))?;
    if task.project_id != project_id {
        return Err(CoreError::not_found_entity("task", task_id).into());
    }
    Ok(task)
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(body): Json<CreateTaskRequest>,
) -> ApiResult<Json<coordinator_core::models::Task>> {
    require_non_empty("title", &body.title)?;
    require_non_empty("description", &body.description)?;

    let task = state
        .store
        .create_task(NewTask {
            feature_id: body.feature_id,
            title: body.title,
            description: body.description,
            target_role: body.target_role,
            difficulty: body.difficulty,
            complexity: body.complexity,
            branch: body.branch,
            created_by: body.created_by,
        })
        .await?;
    state.hub.publish(task.project_id);
    Ok(Json(task))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Query(query): Query<GetTaskQuery>,
) -> ApiResult<Json<coordinator_core::models::Task>> {
    let task = load_task_in_project(&state, task_id, query.project_id).await?;
    Ok(Json(task))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<coordinator_core::models::Task>>> {
    let project_id = query.project_id.ok_or_else(CoreError::no_project_selected)?;
    let tasks = state
        .store
        .list_tasks(TaskFilter {
            project_id: Some(project_id),
            feature_id: query.feature_id,
            status: query.status,
            target_role: query.target_role,
            locked_by_agent_id: query.locked_by_agent_id,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;
    Ok(Json(tasks))
}

pub async fn dispatch_next_task(
    State(state): State<AppState>,
    Query(query): Query<DispatchQuery>,
) -> ApiResult<Json<DispatchResponse>> {
    let wait_seconds = query.wait_seconds.unwrap_or(state.config.default_wait_seconds);
    let outcome = dispatcher::dispatch_next(
        state.store.as_ref(),
        &state.hub,
        query.project_id,
        query.role,
        query.level,
        &query.agent_id,
        query.wait,
        wait_seconds,
    )
    .await?;

    let response = match outcome {
        DispatchOutcome::Assigned(task) => {
            state.hub.publish(query.project_id);
            DispatchResponse::Assigned { task }
        }
        DispatchOutcome::Waiting => DispatchResponse::Waiting,
    };
    Ok(Json(response))
}

pub async fn lock_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(body): Json<LockTaskRequest>,
) -> ApiResult<Json<coordinator_core::models::Task>> {
    load_task_in_project(&state, task_id, body.project_id).await?;
    let task = state.store.lock_task(task_id, &body.agent_id).await?;
    state.hub.publish(body.project_id);
    Ok(Json(task))
}

/// Whether `actor_role` holds the authority the lock-acquiring edges reserve
/// for "the role the task targets", §4.3. `approved -> under_work` and
/// `under_work -> dev_done` are gated on the task's own `target_role`;
/// `dev_done -> testing` is reserved for QA regardless of `target_role`
/// (a task's `target_role` is set once at creation to the developer
/// flavor, not QA), per `lifecycle::validate_transition`'s doc comment.
fn check_lock_start_authority(
    from: TaskStatus,
    to: TaskStatus,
    actor_role: Role,
    task_target_role: Role,
) -> ApiResult<()> {
    let ok = match (from, to) {
        (TaskStatus::Approved, TaskStatus::UnderWork) => actor_role == task_target_role,
        (TaskStatus::UnderWork, TaskStatus::DevDone) => actor_role == task_target_role,
        (TaskStatus::DevDone, TaskStatus::Testing) => actor_role == Role::Qa,
        (TaskStatus::DocumentationDone, TaskStatus::Committed) => actor_role == task_target_role,
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "role {actor_role:?} may not perform transition {from} -> {to}"
        ))
        .into())
    }
}

pub async fn set_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(body): Json<SetTaskStatusRequest>,
) -> ApiResult<Json<SetTaskStatusResponse>> {
    let task = load_task_in_project(&state, task_id, body.project_id).await?;
    let actor = state
        .store
        .get_agent(body.project_id, &body.actor_agent_id)
        .await?
        .ok_or_else(|| CoreError::not_found_entity("agent", &body.actor_agent_id))?;

    let kind = if body.override_transition {
        TransitionKind::Override
    } else {
        TransitionKind::Normal
    };
    if kind == TransitionKind::Normal {
        check_lock_start_authority(task.status, body.new_status, actor.role, task.target_role)?;
    }

    let task_is_locked = task.locked_by_agent_id.is_some();
    let actor_is_locker = task.locked_by_agent_id.as_deref() == Some(body.actor_agent_id.as_str());
    let effect = lifecycle::validate_transition(
        task.status,
        body.new_status,
        kind,
        actor.role,
        task_is_locked,
        actor_is_locker,
    )?;

    if effect.requires_note && body.note.as_deref().map(str::trim).unwrap_or("").is_empty() {
        return Err(CoreError::BadRequest(
            "a note is required for this transition".to_string(),
        )
        .into());
    }

    let updated = state
        .store
        .apply_transition(
            task_id,
            body.new_status,
            &body.actor_agent_id,
            body.note.clone(),
            effect.acquires_lock,
            effect.releases_lock,
            kind == TransitionKind::Override,
        )
        .await?;
    state.hub.publish(body.project_id);

    let next = if body.chain_next {
        let chained = dispatcher::try_dispatch(
            state.store.as_ref(),
            body.project_id,
            actor.role,
            actor.level,
            &body.actor_agent_id,
        )
        .await?;
        if chained.is_some() {
            state.hub.publish(body.project_id);
        }
        chained
    } else {
        None
    };

    Ok(Json(SetTaskStatusResponse { task: updated, next }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<Json<coordinator_core::models::TaskComment>> {
    require_non_empty("body", &body.body)?;
    let task = load_task_in_project(&state, task_id, body.project_id).await?;

    let comment = state
        .store
        .create_task_comment(NewTaskComment {
            task_id,
            author_agent_id: body.author_agent_id,
            body: body.body.clone(),
        })
        .await?;

    let handles = extract_handles(&body.body);
    if !handles.is_empty() {
        state
            .store
            .create_mentions(
                task.project_id,
                MentionSourceType::TaskComment,
                comment.id,
                &handles,
            )
            .await?;
    }

    state.hub.publish(task.project_id);
    Ok(Json(comment))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<coordinator_core::models::TaskComment>>> {
    let comments = state.store.list_task_comments(task_id).await?;
    Ok(Json(comments))
}

pub async fn evaluate_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(body): Json<EvaluateTaskRequest>,
) -> ApiResult<Json<coordinator_core::models::Task>> {
    let task = load_task_in_project(&state, task_id, body.project_id).await?;
    let actor = state
        .store
        .get_agent(body.project_id, &body.actor_agent_id)
        .await?
        .ok_or_else(|| CoreError::not_found_entity("agent", &body.actor_agent_id))?;

    let target_status = if body.approve {
        TaskStatus::Approved
    } else {
        TaskStatus::Created
    };
    let effect = lifecycle::validate_transition(
        task.status,
        target_status,
        TransitionKind::Normal,
        actor.role,
        task.locked_by_agent_id.is_some(),
        false,
    )?;

    if effect.requires_note && body.note.as_deref().map(str::trim).unwrap_or("").is_empty() {
        return Err(CoreError::BadRequest(
            "a note is required to reject a task".to_string(),
        )
        .into());
    }

    let updated = state
        .store
        .apply_transition(
            task_id,
            target_status,
            &body.actor_agent_id,
            body.note.clone(),
            effect.acquires_lock,
            effect.releases_lock,
            false,
        )
        .await?;
    state.hub.publish(body.project_id);
    Ok(Json(updated))
}
