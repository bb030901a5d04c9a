//! The `Store` trait: the single persistence seam every backend (sqlite today,
//! a networked backend later) implements. §4.1.
//!
//! Every method that can mutate task ownership, agent assignment, or status
//! is expected to run inside one implementation-internal transaction with
//! row-level locking (or SQLite's `BEGIN IMMEDIATE` equivalent) and to append
//! any resulting changelog entry in that same transaction, per §4.1 and §5.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    models::{
        Agent, ChangeKind, ChangelogEntry, Document, Epic, Feature, Mention, MentionSourceType,
        NewAgent, NewDocument, NewEpic, NewFeature, NewProject, NewService, NewTask,
        NewTaskComment, Project, Service, Task, TaskComment, TaskFilter, TaskPatch, TaskStatus,
    },
    time::MonotonicTimestamp,
};

/// A page of changelog entries plus whatever denormalized view the caller
/// asked for; see `aggregator::changes`.
#[derive(Debug, Clone, Default)]
pub struct ChangeWindow {
    pub tasks_new: Vec<Task>,
    pub tasks_updated: Vec<Task>,
    pub documents_new: Vec<Document>,
    pub mentions: Vec<Mention>,
    pub agents_registered: Vec<Agent>,
    pub services_changed: Vec<Service>,
    pub timestamp: MonotonicTimestamp,
}

#[async_trait]
pub trait Store: Send + Sync {
    // -- Projects ---------------------------------------------------------
    async fn create_project(&self, project: NewProject) -> Result<Project>;
    async fn get_project(&self, id: i64) -> Result<Option<Project>>;
    async fn get_project_by_name(&self, name: &str) -> Result<Option<Project>>;
    async fn soft_delete_project(&self, id: i64) -> Result<()>;

    // -- Agents -------------------------------------------------------------
    /// Register a new agent or refresh `last_seen`/role/level for an
    /// existing one; idempotent on `(project_id, agent_id)`.
    async fn upsert_agent(&self, agent: NewAgent) -> Result<Agent>;
    async fn get_agent(&self, project_id: i64, agent_id: &str) -> Result<Option<Agent>>;
    async fn list_agents(&self, project_id: i64) -> Result<Vec<Agent>>;
    async fn delete_agent(&self, project_id: i64, agent_id: &str) -> Result<()>;
    async fn touch_agent_last_seen(&self, project_id: i64, agent_id: &str) -> Result<()>;

    // -- Epics / Features -----------------------------------------------
    async fn create_epic(&self, epic: NewEpic) -> Result<Epic>;
    async fn list_epics(&self, project_id: i64) -> Result<Vec<Epic>>;
    async fn create_feature(&self, feature: NewFeature) -> Result<Feature>;
    async fn list_features(&self, project_id: i64, epic_id: Option<i64>) -> Result<Vec<Feature>>;
    async fn get_feature(&self, id: i64) -> Result<Option<Feature>>;

    // -- Tasks ------------------------------------------------------------
    async fn create_task(&self, task: NewTask) -> Result<Task>;
    async fn get_task(&self, id: i64) -> Result<Option<Task>>;
    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>>;
    async fn patch_task(&self, id: i64, patch: TaskPatch) -> Result<Task>;

    /// Atomically select the next eligible task for `agent_id` and lock it,
    /// per §4.2.2. Implementations must: select-for-update the candidate,
    /// re-verify eligibility, select-for-update the agent row and check
    /// `current_task_id`, set the lock fields, update the agent, append a
    /// `task_locked` changelog entry, commit. Returns `Ok(None)` if no
    /// candidate is currently eligible (caller decides whether to wait).
    async fn dispatch_next(
        &self,
        project_id: i64,
        role: crate::models::Role,
        level: crate::models::Level,
        agent_id: &str,
    ) -> Result<Option<Task>>;

    /// Explicit lock without a status transition (`POST /tasks/{id}/lock`).
    async fn lock_task(&self, task_id: i64, agent_id: &str) -> Result<Task>;

    /// Apply a validated lifecycle transition (legality/authority already
    /// checked by `lifecycle::validate_transition`); sets/clears lock fields
    /// per the returned [`crate::lifecycle::TransitionEffect`], records the
    /// `task_status` changelog entry, and returns the updated task.
    #[allow(clippy::too_many_arguments)]
    async fn apply_transition(
        &self,
        task_id: i64,
        new_status: TaskStatus,
        actor_agent_id: &str,
        note: Option<String>,
        acquires_lock: bool,
        releases_lock: bool,
        is_override: bool,
    ) -> Result<Task>;

    // -- Comments ----------------------------------------------------------
    async fn create_task_comment(&self, comment: NewTaskComment) -> Result<TaskComment>;
    async fn list_task_comments(&self, task_id: i64) -> Result<Vec<TaskComment>>;

    // -- Documents -----------------------------------------------------
    async fn create_document(&self, document: NewDocument) -> Result<Document>;
    async fn list_documents(
        &self,
        project_id: i64,
        doc_type: Option<crate::models::DocType>,
    ) -> Result<Vec<Document>>;

    // -- Mentions ------------------------------------------------------
    /// Insert one mention row per resolved recipient for `(source_type,
    /// source_id)`, coalescing duplicate `(source, recipient)` pairs, and
    /// append one `mention_created` changelog entry per inserted row. §4.4.
    async fn create_mentions(
        &self,
        project_id: i64,
        source_type: MentionSourceType,
        source_id: i64,
        handles: &[String],
    ) -> Result<Vec<Mention>>;
    async fn list_mentions(
        &self,
        agent_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Mention>>;
    async fn mark_mention_read(&self, mention_id: i64) -> Result<()>;

    // -- Services --------------------------------------------------------
    async fn register_service(&self, service: NewService) -> Result<Service>;
    async fn heartbeat_service(&self, project_id: i64, name: &str) -> Result<Service>;
    async fn delete_service(&self, project_id: i64, name: &str) -> Result<()>;
    async fn list_services(&self, project_id: i64) -> Result<Vec<Service>>;
    async fn set_service_status(
        &self,
        project_id: i64,
        name: &str,
        status: crate::models::ServiceStatus,
    ) -> Result<Option<Service>>;

    // -- Changelog / change feed -----------------------------------------
    async fn insert_changelog(
        &self,
        project_id: i64,
        kind: ChangeKind,
        ref_id: &str,
        actor_agent_id: Option<&str>,
        detail: serde_json::Value,
    ) -> Result<ChangelogEntry>;

    /// Raw changelog entries for `project_id` strictly after `since`,
    /// ordered by `(created_at, id)`. The aggregator composes these into the
    /// categorized [`ChangeWindow`].
    async fn changelog_since(
        &self,
        project_id: i64,
        since: MonotonicTimestamp,
    ) -> Result<Vec<ChangelogEntry>>;

    async fn tasks_by_ids(&self, ids: &[i64]) -> Result<Vec<Task>>;
    async fn documents_by_ids(&self, ids: &[i64]) -> Result<Vec<Document>>;
    async fn mentions_by_ids(&self, ids: &[i64]) -> Result<Vec<Mention>>;
    async fn agents_by_ids(&self, project_id: i64, agent_ids: &[String]) -> Result<Vec<Agent>>;
    async fn services_by_names(&self, project_id: i64, names: &[String]) -> Result<Vec<Service>>;

    /// Strictly-increasing composite timestamp; §4.1, §9.
    fn monotonic_now(&self) -> MonotonicTimestamp;

    async fn health_check(&self) -> Result<()>;
}

/// Helper shared by backends for the `last_seen`/heartbeat wall clock; kept
/// separate from `monotonic_now` since only changelog ordering needs the
/// tie-break counter.
pub fn wall_clock_now() -> DateTime<Utc> {
    Utc::now()
}
