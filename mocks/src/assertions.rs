//! Custom assertion helpers for testing
//!
//! Provides specialized assertions for:
//! - Task equality with clear error messages
//! - Lock/status invariants
//! - Collection-based assertions

use coordinator_core::models::{Task, TaskStatus};

/// Assert tasks are equal ignoring timestamps.
pub fn assert_task_equals(actual: &Task, expected: &Task) {
    assert_eq!(actual.id, expected.id, "task ids don't match");
    assert_eq!(actual.title, expected.title, "task titles don't match");
    assert_eq!(
        actual.description, expected.description,
        "task descriptions don't match"
    );
    assert_eq!(actual.status, expected.status, "task statuses don't match");
    assert_eq!(
        actual.target_role, expected.target_role,
        "task target roles don't match"
    );
}

/// Assert the §3 task invariant: locked iff status is `under_work` or
/// `testing`.
pub fn assert_lock_invariant(task: &Task) {
    if task.status.is_lockable_state() {
        assert!(
            task.locked_by_agent_id.is_some(),
            "task {} in status {} should be locked",
            task.id,
            task.status
        );
    } else {
        assert!(
            task.locked_by_agent_id.is_none(),
            "task {} in status {} should not be locked",
            task.id,
            task.status
        );
    }
}

/// Assert a task list contains a task with the given title.
pub fn assert_contains_task_with_title(tasks: &[Task], title: &str) {
    assert!(
        tasks.iter().any(|t| t.title == title),
        "expected to find task titled '{}', available: {:?}",
        title,
        tasks.iter().map(|t| &t.title).collect::<Vec<_>>()
    );
}

/// Assert tasks are ordered by `created_at` ascending.
pub fn assert_tasks_sorted_by_created_at(tasks: &[Task]) {
    for window in tasks.windows(2) {
        assert!(
            window[0].created_at <= window[1].created_at,
            "tasks not sorted by created_at: '{}' ({}) after '{}' ({})",
            window[0].title,
            window[0].created_at,
            window[1].title,
            window[1].created_at
        );
    }
}

/// Flexible task matcher for partial assertions.
#[derive(Debug, Default)]
pub struct TaskMatcher {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }
}

pub fn assert_task_matches(task: &Task, matcher: &TaskMatcher) {
    if let Some(id) = matcher.id {
        assert_eq!(task.id, id, "task id doesn't match expected");
    }
    if let Some(ref title) = matcher.title {
        assert_eq!(&task.title, title, "task title doesn't match expected");
    }
    if let Some(status) = matcher.status {
        assert_eq!(task.status, status, "task status doesn't match expected");
    }
}
