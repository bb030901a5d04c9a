use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::MonotonicTimestamp;

/// A project is the root of all scoping; nearly every other entity carries a
/// `project_id` and no operation implicitly crosses project boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub shared_path: String,
    pub instructions_path: String,
    pub docs_path: String,
    pub guidelines_path: Option<String>,
    pub repo_url: Option<String>,
    pub repo_main_branch: Option<String>,
    pub repo_clone_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub shared_path: String,
    pub instructions_path: String,
    pub docs_path: String,
    pub guidelines_path: Option<String>,
    pub repo_url: Option<String>,
    pub repo_main_branch: Option<String>,
    pub repo_clone_path: Option<String>,
}

/// Role an agent (human or model process) plays within a project.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    FrontendDev,
    BackendDev,
    Qa,
    Architect,
    ProjectPm,
    GlobalPm,
    UiAdmin,
}

impl Role {
    /// §9 Open Question: Global-PM and Project-PM are the same *authority*
    /// role; they differ only in cross-project task-creation visibility,
    /// which `core` does not model (out of scope) and `http-api` enforces.
    pub fn is_pm(self) -> bool {
        matches!(self, Role::ProjectPm | Role::GlobalPm)
    }

    pub fn is_architect(self) -> bool {
        matches!(self, Role::Architect)
    }

    pub fn has_evaluation_authority(self) -> bool {
        self.is_pm() || self.is_architect()
    }
}

/// Skill level, used by the dispatcher's `difficulty <= level` filter.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Junior,
    Senior,
    Principal,
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Client,
    Mcp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub agent_id: String,
    pub project_id: i64,
    pub role: Role,
    pub level: Level,
    pub connection_type: ConnectionType,
    pub last_seen: DateTime<Utc>,
    pub current_task_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAgent {
    pub agent_id: String,
    pub project_id: i64,
    pub role: Role,
    pub level: Level,
    pub connection_type: ConnectionType,
}

/// Bucketed liveness derived from `last_seen`; see `liveness::agent_liveness`.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentLiveness {
    Online,
    RecentlyActive,
    Offline,
}

/// Availability for assignment purposes; see `liveness::agent_availability`.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Idle,
    Working,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Epic {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub created_by_agent: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewEpic {
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub created_by_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    pub id: i64,
    pub epic_id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFeature {
    pub epic_id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Junior,
    Senior,
    Principal,
}

impl Difficulty {
    /// Dispatcher rule 3: `difficulty <= level` where `principal >= senior >=
    /// junior`. Both `Difficulty` and `Level` share the same three-tier
    /// ordinal scale, so the comparison is a direct ordinal compare.
    pub fn fits(self, level: Level) -> bool {
        self.rank() <= level.rank()
    }

    fn rank(self) -> u8 {
        match self {
            Difficulty::Junior => 0,
            Difficulty::Senior => 1,
            Difficulty::Principal => 2,
        }
    }
}

impl Level {
    fn rank(self) -> u8 {
        match self {
            Level::Junior => 0,
            Level::Senior => 1,
            Level::Principal => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Major,
    Minor,
}

/// Task lifecycle states, §4.3. `Committed` is terminal.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Approved,
    UnderWork,
    DevDone,
    Testing,
    QaDone,
    DocumentationDone,
    Committed,
}

impl TaskStatus {
    /// Task is locked in exactly these two states, per the §3 Task invariant.
    pub fn is_lockable_state(self) -> bool {
        matches!(self, TaskStatus::UnderWork | TaskStatus::Testing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Committed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Created => "created",
            TaskStatus::Approved => "approved",
            TaskStatus::UnderWork => "under_work",
            TaskStatus::DevDone => "dev_done",
            TaskStatus::Testing => "testing",
            TaskStatus::QaDone => "qa_done",
            TaskStatus::DocumentationDone => "documentation_done",
            TaskStatus::Committed => "committed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub feature_id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub target_role: Role,
    pub difficulty: Difficulty,
    pub complexity: Complexity,
    pub branch: Option<String>,
    pub status: TaskStatus,
    pub locked_by_agent_id: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTask {
    pub feature_id: i64,
    pub title: String,
    pub description: String,
    pub target_role: Role,
    pub difficulty: Difficulty,
    pub complexity: Complexity,
    pub branch: Option<String>,
    pub created_by: String,
}

/// Fields the lifecycle engine/HTTP layer may update outside a status
/// transition (e.g. assignment, branch, notes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub branch: Option<String>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub project_id: Option<i64>,
    pub feature_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub target_role: Option<Role>,
    pub locked_by_agent_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskComment {
    pub id: i64,
    pub task_id: i64,
    pub project_id: i64,
    pub author_agent_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTaskComment {
    pub task_id: i64,
    pub author_agent_id: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Prd,
    DesignNote,
    Runbook,
    Announcement,
    Handoff,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: i64,
    pub project_id: i64,
    pub author_agent_id: String,
    pub doc_type: DocType,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDocument {
    pub project_id: i64,
    pub author_agent_id: String,
    pub doc_type: DocType,
    pub title: String,
    pub body: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MentionSourceType {
    Document,
    TaskComment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mention {
    pub id: i64,
    pub project_id: i64,
    pub source_type: MentionSourceType,
    pub source_id: i64,
    pub mentioned_handle: String,
    pub recipient_agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Up,
    Down,
    Starting,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub name: String,
    pub project_id: i64,
    pub owner_agent_id: String,
    pub port: u16,
    pub status: ServiceStatus,
    pub ping_url: Option<String>,
    pub meta: serde_json::Value,
    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewService {
    pub project_id: i64,
    pub name: String,
    pub owner_agent_id: String,
    pub port: u16,
    pub ping_url: Option<String>,
    pub meta: serde_json::Value,
}

/// Append-only changelog event kinds, §3/§8.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    TaskCreated,
    TaskStatus,
    TaskLocked,
    TaskUnlocked,
    DocumentCreated,
    MentionCreated,
    AgentRegistered,
    ServiceRegistered,
    ServiceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangelogEntry {
    pub id: i64,
    pub project_id: i64,
    pub kind: ChangeKind,
    /// Identifier of the entity the event concerns. Stored as text since
    /// some kinds (`agent_registered`, `service_registered`/`service_status`)
    /// reference string-keyed entities rather than integer row ids; task,
    /// document, and mention kinds store the numeric id as a decimal string.
    pub ref_id: String,
    pub actor_agent_id: Option<String>,
    pub created_at: MonotonicTimestamp,
    /// Free-form JSON payload (e.g. `{old, new, note}` for `task_status`).
    pub detail: serde_json::Value,
}
