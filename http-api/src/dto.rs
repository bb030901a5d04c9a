//! Wire-level request/response shapes for the `/api/v1` surface, §6.1.
//!
//! Kept separate from `coordinator_core::models` so the HTTP contract can
//! diverge from the storage model (flattened query params, derived fields
//! like liveness) without coupling `core` to serde's `rename`/`flatten`
//! attributes it doesn't otherwise need.

use serde::{Deserialize, Serialize};

use coordinator_core::{
    models::{
        Agent, AgentLiveness, Availability, Complexity, ConnectionType, Difficulty, DocType,
        Document, Level, Mention, MentionSourceType, Role, Service, ServiceStatus, Task,
        TaskStatus,
    },
    repository::ChangeWindow,
};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub shared_path: String,
    pub instructions_path: String,
    pub docs_path: String,
    pub guidelines_path: Option<String>,
    pub repo_url: Option<String>,
    pub repo_main_branch: Option<String>,
    pub repo_clone_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    pub project_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub project_id: i64,
    pub agent_id: String,
    pub role: Role,
    pub level: Level,
    #[serde(default = "default_connection_type")]
    pub connection_type: ConnectionType,
}

fn default_connection_type() -> ConnectionType {
    ConnectionType::Client
}

#[derive(Debug, Deserialize)]
pub struct ListAgentsQuery {
    pub project_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AgentView {
    pub agent_id: String,
    pub project_id: i64,
    pub role: Role,
    pub level: Level,
    pub connection_type: ConnectionType,
    pub last_seen: chrono::DateTime<chrono::Utc>,
    pub current_task_id: Option<i64>,
    pub liveness: AgentLiveness,
    pub availability: Availability,
}

impl AgentView {
    pub fn new(agent: Agent, liveness: AgentLiveness, availability: Availability) -> Self {
        Self {
            agent_id: agent.agent_id,
            project_id: agent.project_id,
            role: agent.role,
            level: agent.level,
            connection_type: agent.connection_type,
            last_seen: agent.last_seen,
            current_task_id: agent.current_task_id,
            liveness,
            availability,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEpicRequest {
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub created_by_agent: String,
}

#[derive(Debug, Deserialize)]
pub struct ListEpicsQuery {
    pub project_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateFeatureRequest {
    pub epic_id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ListFeaturesQuery {
    pub project_id: i64,
    pub epic_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub feature_id: i64,
    pub title: String,
    pub description: String,
    pub target_role: Role,
    pub difficulty: Difficulty,
    pub complexity: Complexity,
    pub branch: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub project_id: Option<i64>,
    pub feature_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub target_role: Option<Role>,
    pub locked_by_agent_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DispatchQuery {
    pub project_id: i64,
    pub role: Role,
    pub level: Level,
    pub agent_id: String,
    #[serde(default)]
    pub wait: bool,
    pub wait_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchResponse {
    Assigned { task: Task },
    Waiting,
}

#[derive(Debug, Deserialize)]
pub struct LockTaskRequest {
    pub project_id: i64,
    pub agent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetTaskStatusRequest {
    pub project_id: i64,
    pub actor_agent_id: String,
    pub new_status: TaskStatus,
    pub note: Option<String>,
    /// Requests an override transition (architect/PM authority) instead of a
    /// normal table-driven edge, §4.3.
    #[serde(default)]
    pub override_transition: bool,
    /// If set, chains directly into `/tasks/next` for the same actor after
    /// the transition commits, §4.3 point 6.
    #[serde(default)]
    pub chain_next: bool,
}

#[derive(Debug, Serialize)]
pub struct SetTaskStatusResponse {
    pub task: Task,
    pub next: Option<Task>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub project_id: i64,
    pub author_agent_id: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateTaskRequest {
    pub project_id: i64,
    pub actor_agent_id: String,
    pub approve: bool,
    /// Required when `approve` is false, §4.3.
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub project_id: i64,
    pub author_agent_id: String,
    pub doc_type: DocType,
    pub title: String,
    pub body: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    pub project_id: i64,
    pub doc_type: Option<DocType>,
}

#[derive(Debug, Deserialize)]
pub struct ListMentionsQuery {
    pub agent_id: String,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct MentionView {
    pub id: i64,
    pub project_id: i64,
    pub source_type: MentionSourceType,
    pub source_id: i64,
    pub mentioned_handle: String,
    pub recipient_agent_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Mention> for MentionView {
    fn from(m: Mention) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            source_type: m.source_type,
            source_id: m.source_id,
            mentioned_handle: m.mentioned_handle,
            recipient_agent_id: m.recipient_agent_id,
            created_at: m.created_at,
            read_at: m.read_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterServiceRequest {
    pub project_id: i64,
    pub name: String,
    pub owner_agent_id: String,
    pub port: u16,
    pub ping_url: Option<String>,
    #[serde(default)]
    pub meta: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ListServicesQuery {
    pub project_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ServiceView {
    pub name: String,
    pub project_id: i64,
    pub owner_agent_id: String,
    pub port: u16,
    pub status: ServiceStatus,
    pub ping_url: Option<String>,
    pub meta: serde_json::Value,
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ServiceView {
    pub fn new(service: Service, status: ServiceStatus) -> Self {
        Self {
            name: service.name,
            project_id: service.project_id,
            owner_agent_id: service.owner_agent_id,
            port: service.port,
            status,
            ping_url: service.ping_url,
            meta: service.meta,
            last_heartbeat: service.last_heartbeat,
            created_at: service.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    pub project_id: i64,
    /// Monotonic timestamp cursor, formatted `millis.seq`; absent means "from
    /// the beginning".
    pub since: Option<String>,
    pub agent_id: Option<String>,
    #[serde(default)]
    pub wait: bool,
    pub wait_seconds: Option<u64>,
}

/// Scoping + authority query shared by PM-only operations (§6.1 "PM-only").
#[derive(Debug, Deserialize)]
pub struct DeleteAgentQuery {
    pub project_id: i64,
    pub requester_agent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetTaskQuery {
    pub project_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ServiceNameQuery {
    pub project_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MarkMentionReadQuery {
    pub agent_id: String,
}

/// Wire shape of [`ChangeWindow`] (§4.6); `since` is the cursor the caller
/// should pass back on the next poll.
#[derive(Debug, Serialize)]
pub struct ChangesResponse {
    pub tasks_new: Vec<Task>,
    pub tasks_updated: Vec<Task>,
    pub documents_new: Vec<Document>,
    pub mentions: Vec<MentionView>,
    pub agents_registered: Vec<Agent>,
    pub services_changed: Vec<ServiceView>,
    pub since: String,
}

impl From<ChangeWindow> for ChangesResponse {
    fn from(window: ChangeWindow) -> Self {
        Self {
            tasks_new: window.tasks_new,
            tasks_updated: window.tasks_updated,
            documents_new: window.documents_new,
            mentions: window.mentions.into_iter().map(MentionView::from).collect(),
            agents_registered: window.agents_registered,
            services_changed: window
                .services_changed
                .into_iter()
                .map(|s| {
                    let status = s.status;
                    ServiceView::new(s, status)
                })
                .collect(),
            since: window.timestamp.to_string(),
        }
    }
}
