//! Enum <-> string conversions and row mapping shared by the sqlite backend.

use chrono::{DateTime, Utc};
use coordinator_core::error::CoreError;
use coordinator_core::models::{
    Complexity, ConnectionType, DocType, Level, MentionSourceType, Role, ServiceStatus,
    TaskStatus,
};
use sqlx::{sqlite::SqliteRow, Row};

pub fn sqlx_error_to_core_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                CoreError::Conflict(format!("unique constraint violated: {db_err}"))
            } else if db_err
                .message()
                .to_lowercase()
                .contains("database is locked")
            {
                CoreError::Conflict("database is busy, retry".to_string())
            } else {
                CoreError::StorageFault(db_err.to_string())
            }
        }
        sqlx::Error::RowNotFound => CoreError::NotFound("row not found".to_string()),
        other => CoreError::StorageFault(other.to_string()),
    }
}

pub fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::FrontendDev => "frontend_dev",
        Role::BackendDev => "backend_dev",
        Role::Qa => "qa",
        Role::Architect => "architect",
        Role::ProjectPm => "project_pm",
        Role::GlobalPm => "global_pm",
        Role::UiAdmin => "ui_admin",
    }
}

pub fn str_to_role(s: &str) -> coordinator_core::Result<Role> {
    Ok(match s {
        "frontend_dev" => Role::FrontendDev,
        "backend_dev" => Role::BackendDev,
        "qa" => Role::Qa,
        "architect" => Role::Architect,
        "project_pm" => Role::ProjectPm,
        "global_pm" => Role::GlobalPm,
        "ui_admin" => Role::UiAdmin,
        other => return Err(CoreError::StorageFault(format!("invalid role in database row: {other}"))),
    })
}

pub fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::Junior => "junior",
        Level::Senior => "senior",
        Level::Principal => "principal",
    }
}

pub fn str_to_level(s: &str) -> coordinator_core::Result<Level> {
    Ok(match s {
        "junior" => Level::Junior,
        "senior" => Level::Senior,
        "principal" => Level::Principal,
        other => return Err(CoreError::StorageFault(format!("invalid level in database row: {other}"))),
    })
}

pub fn connection_type_to_str(c: ConnectionType) -> &'static str {
    match c {
        ConnectionType::Client => "client",
        ConnectionType::Mcp => "mcp",
    }
}

pub fn str_to_connection_type(s: &str) -> coordinator_core::Result<ConnectionType> {
    Ok(match s {
        "client" => ConnectionType::Client,
        "mcp" => ConnectionType::Mcp,
        other => {
            return Err(CoreError::StorageFault(format!(
                "invalid connection_type in database row: {other}"
            )))
        }
    })
}

pub fn difficulty_to_str(d: coordinator_core::models::Difficulty) -> &'static str {
    use coordinator_core::models::Difficulty::*;
    match d {
        Junior => "junior",
        Senior => "senior",
        Principal => "principal",
    }
}

pub fn str_to_difficulty(s: &str) -> coordinator_core::Result<coordinator_core::models::Difficulty> {
    use coordinator_core::models::Difficulty::*;
    Ok(match s {
        "junior" => Junior,
        "senior" => Senior,
        "principal" => Principal,
        other => {
            return Err(CoreError::StorageFault(format!(
                "invalid difficulty in database row: {other}"
            )))
        }
    })
}

pub fn complexity_to_str(c: Complexity) -> &'static str {
    match c {
        Complexity::Major => "major",
        Complexity::Minor => "minor",
    }
}

pub fn str_to_complexity(s: &str) -> coordinator_core::Result<Complexity> {
    Ok(match s {
        "major" => Complexity::Major,
        "minor" => Complexity::Minor,
        other => {
            return Err(CoreError::StorageFault(format!(
                "invalid complexity in database row: {other}"
            )))
        }
    })
}

pub fn task_status_to_str(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Created => "created",
        TaskStatus::Approved => "approved",
        TaskStatus::UnderWork => "under_work",
        TaskStatus::DevDone => "dev_done",
        TaskStatus::Testing => "testing",
        TaskStatus::QaDone => "qa_done",
        TaskStatus::DocumentationDone => "documentation_done",
        TaskStatus::Committed => "committed",
    }
}

pub fn str_to_task_status(s: &str) -> coordinator_core::Result<TaskStatus> {
    Ok(match s {
        "created" => TaskStatus::Created,
        "approved" => TaskStatus::Approved,
        "under_work" => TaskStatus::UnderWork,
        "dev_done" => TaskStatus::DevDone,
        "testing" => TaskStatus::Testing,
        "qa_done" => TaskStatus::QaDone,
        "documentation_done" => TaskStatus::DocumentationDone,
        "committed" => TaskStatus::Committed,
        other => {
            return Err(CoreError::StorageFault(format!(
                "invalid task status in database row: {other}"
            )))
        }
    })
}

pub fn doc_type_to_str(d: DocType) -> &'static str {
    match d {
        DocType::Prd => "prd",
        DocType::DesignNote => "design_note",
        DocType::Runbook => "runbook",
        DocType::Announcement => "announcement",
        DocType::Handoff => "handoff",
        DocType::Other => "other",
    }
}

pub fn str_to_doc_type(s: &str) -> coordinator_core::Result<DocType> {
    Ok(match s {
        "prd" => DocType::Prd,
        "design_note" => DocType::DesignNote,
        "runbook" => DocType::Runbook,
        "announcement" => DocType::Announcement,
        "handoff" => DocType::Handoff,
        "other" => DocType::Other,
        other => {
            return Err(CoreError::StorageFault(format!(
                "invalid doc_type in database row: {other}"
            )))
        }
    })
}

pub fn mention_source_type_to_str(s: MentionSourceType) -> &'static str {
    match s {
        MentionSourceType::Document => "document",
        MentionSourceType::TaskComment => "task_comment",
    }
}

pub fn str_to_mention_source_type(s: &str) -> coordinator_core::Result<MentionSourceType> {
    Ok(match s {
        "document" => MentionSourceType::Document,
        "task_comment" => MentionSourceType::TaskComment,
        other => {
            return Err(CoreError::StorageFault(format!(
                "invalid mention source_type in database row: {other}"
            )))
        }
    })
}

pub fn service_status_to_str(s: ServiceStatus) -> &'static str {
    match s {
        ServiceStatus::Up => "up",
        ServiceStatus::Down => "down",
        ServiceStatus::Starting => "starting",
    }
}

pub fn str_to_service_status(s: &str) -> coordinator_core::Result<ServiceStatus> {
    Ok(match s {
        "up" => ServiceStatus::Up,
        "down" => ServiceStatus::Down,
        "starting" => ServiceStatus::Starting,
        other => {
            return Err(CoreError::StorageFault(format!(
                "invalid service status in database row: {other}"
            )))
        }
    })
}

pub fn change_kind_to_str(k: coordinator_core::models::ChangeKind) -> &'static str {
    use coordinator_core::models::ChangeKind::*;
    match k {
        TaskCreated => "task_created",
        TaskStatus => "task_status",
        TaskLocked => "task_locked",
        TaskUnlocked => "task_unlocked",
        DocumentCreated => "document_created",
        MentionCreated => "mention_created",
        AgentRegistered => "agent_registered",
        ServiceRegistered => "service_registered",
        ServiceStatus => "service_status",
    }
}

pub fn str_to_change_kind(s: &str) -> coordinator_core::Result<coordinator_core::models::ChangeKind> {
    use coordinator_core::models::ChangeKind::*;
    Ok(match s {
        "task_created" => TaskCreated,
        "task_status" => TaskStatus,
        "task_locked" => TaskLocked,
        "task_unlocked" => TaskUnlocked,
        "document_created" => DocumentCreated,
        "mention_created" => MentionCreated,
        "agent_registered" => AgentRegistered,
        "service_registered" => ServiceRegistered,
        "service_status" => ServiceStatus,
        other => {
            return Err(CoreError::StorageFault(format!(
                "invalid changelog kind in database row: {other}"
            )))
        }
    })
}

pub fn row_to_task(row: &SqliteRow) -> coordinator_core::Result<coordinator_core::models::Task> {
    use coordinator_core::models::Task;
    Ok(Task {
        id: row.try_get::<i64, _>("id").map_err(sqlx_error_to_core_error)?,
        feature_id: row.try_get("feature_id").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        title: row.try_get("title").map_err(sqlx_error_to_core_error)?,
        description: row.try_get("description").map_err(sqlx_error_to_core_error)?,
        target_role: str_to_role(row.try_get::<String, _>("target_role").map_err(sqlx_error_to_core_error)?.as_str())?,
        difficulty: str_to_difficulty(row.try_get::<String, _>("difficulty").map_err(sqlx_error_to_core_error)?.as_str())?,
        complexity: str_to_complexity(row.try_get::<String, _>("complexity").map_err(sqlx_error_to_core_error)?.as_str())?,
        branch: row.try_get("branch").map_err(sqlx_error_to_core_error)?,
        status: str_to_task_status(row.try_get::<String, _>("status").map_err(sqlx_error_to_core_error)?.as_str())?,
        locked_by_agent_id: row.try_get("locked_by_agent_id").map_err(sqlx_error_to_core_error)?,
        locked_at: row
            .try_get::<Option<String>, _>("locked_at")
            .map_err(sqlx_error_to_core_error)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
        created_by: row.try_get("created_by").map_err(sqlx_error_to_core_error)?,
        assigned_to: row.try_get("assigned_to").map_err(sqlx_error_to_core_error)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(sqlx_error_to_core_error)?)?,
        updated_at: parse_datetime(&row.try_get::<String, _>("updated_at").map_err(sqlx_error_to_core_error)?)?,
        notes: row.try_get("notes").map_err(sqlx_error_to_core_error)?,
    })
}

pub fn parse_datetime(s: &str) -> coordinator_core::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::StorageFault(format!("invalid timestamp '{s}' in database row: {e}")))
}

pub fn fmt_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
