//! Shared input validation helpers used by `Store` implementations and the
//! HTTP boundary before a value reaches persistence.

use crate::error::{CoreError, Result};

/// Validate that a free-text field is non-empty after trimming. Text fields
/// for description/notes/body/comment are explicitly *unbounded* (§6), so no
/// maximum length is enforced here.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::empty_field(field));
    }
    Ok(())
}

/// Agent handles double as `@mention` targets, so they are restricted to the
/// same character class the mention regex accepts (§4.4).
pub fn validate_agent_id(agent_id: &str) -> Result<()> {
    require_non_empty("agent_id", agent_id)?;
    let valid = agent_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return Err(CoreError::BadRequest(format!(
            "agent_id '{agent_id}' may only contain letters, digits, '_', '.', '-'"
        )));
    }
    Ok(())
}

pub fn validate_service_name(name: &str) -> Result<()> {
    require_non_empty("name", name)?;
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    if !valid {
        return Err(CoreError::BadRequest(format!(
            "service name '{name}' may only contain letters, digits, '_', '-'"
        )));
    }
    Ok(())
}

pub fn validate_project_name(name: &str) -> Result<()> {
    require_non_empty("name", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace_only() {
        assert!(require_non_empty("x", "").is_err());
        assert!(require_non_empty("x", "   ").is_err());
        assert!(require_non_empty("x", "ok").is_ok());
    }

    #[test]
    fn agent_id_allows_mention_safe_characters() {
        assert!(validate_agent_id("qa.lead-2").is_ok());
        assert!(validate_agent_id("dev_a").is_ok());
        assert!(validate_agent_id("bad id").is_err());
        assert!(validate_agent_id("bad@id").is_err());
    }
}
