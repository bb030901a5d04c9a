use thiserror::Error;

use crate::models::TaskStatus;

/// Result type alias used throughout `core`, `database`, and `http-api`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error taxonomy for the coordination server, §7. Each variant maps to
/// exactly one HTTP status code via [`CoreError::status_code`]; the HTTP
/// boundary never invents additional mappings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("illegal status transition from {from} to {to}")]
    UnprocessableStatus { from: TaskStatus, to: TaskStatus },

    #[error("too many requests")]
    TooManyRequests,

    #[error("storage fault: {0}")]
    StorageFault(String),
}

impl CoreError {
    pub fn no_project_selected() -> Self {
        Self::BadRequest("project_id is required".to_string())
    }

    pub fn already_holds_task(agent_id: &str) -> Self {
        Self::Conflict(format!("agent '{agent_id}' already holds a task"))
    }

    pub fn not_found_entity(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} '{id}' not found"))
    }

    pub fn empty_field(field: &str) -> Self {
        Self::BadRequest(format!("field '{field}' cannot be empty"))
    }

    pub fn illegal_transition(from: TaskStatus, to: TaskStatus) -> Self {
        Self::UnprocessableStatus { from, to }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }

    /// HTTP status code per §7's mapping table.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::BadRequest(_) => 400,
            CoreError::Unauthorized => 401,
            CoreError::Forbidden(_) => 403,
            CoreError::NotFound(_) => 404,
            CoreError::Conflict(_) => 409,
            CoreError::UnprocessableStatus { .. } => 422,
            CoreError::TooManyRequests => 429,
            CoreError::StorageFault(_) => 500,
        }
    }

    /// The `kind` field of the `{error: kind, detail: human_message}` body.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "BadRequest",
            CoreError::Unauthorized => "Unauthorized",
            CoreError::Forbidden(_) => "Forbidden",
            CoreError::NotFound(_) => "NotFound",
            CoreError::Conflict(_) => "Conflict",
            CoreError::UnprocessableStatus { .. } => "UnprocessableStatus",
            CoreError::TooManyRequests => "TooManyRequests",
            CoreError::StorageFault(_) => "StorageFault",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_spec_table() {
        assert_eq!(CoreError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(CoreError::Unauthorized.status_code(), 401);
        assert_eq!(CoreError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(CoreError::NotFound("x".into()).status_code(), 404);
        assert_eq!(CoreError::Conflict("x".into()).status_code(), 409);
        assert_eq!(
            CoreError::illegal_transition(TaskStatus::Created, TaskStatus::Committed)
                .status_code(),
            422
        );
        assert_eq!(CoreError::TooManyRequests.status_code(), 429);
        assert_eq!(CoreError::StorageFault("x".into()).status_code(), 500);
    }

    #[test]
    fn predicates() {
        assert!(CoreError::NotFound("x".into()).is_not_found());
        assert!(!CoreError::Conflict("x".into()).is_not_found());
        assert!(CoreError::Conflict("x".into()).is_conflict());
    }
}
