//! Dispatcher: candidate selection/ordering (§4.2.1), the atomic lock
//! protocol (§4.2.2, delegated to `Store::dispatch_next`), and the
//! long-polling wait loop (§4.2.3).

use std::cmp::Ordering;
use std::time::Duration;

use crate::{
    error::{CoreError, Result},
    models::{Level, Role, Task, TaskStatus},
    repository::Store,
    wake::WakeHub,
};

/// Bound on step-2 re-selection retries inside the atomic lock protocol,
/// §4.2.2. Store implementations own the retry loop since it must happen
/// inside the same transaction machinery that does the row locking; this
/// constant documents the contract every `Store::dispatch_next` impl must
/// honor.
pub const MAX_LOCK_RETRIES: u8 = 5;
pub const DEFAULT_WAIT_SECONDS: u64 = 180;

/// Result of a `next task` request, distinguishing a genuine timeout from an
/// error per §4.2.4 ("Timeout expressed as an in-band 'waiting' synthetic
/// task, never as an error").
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Assigned(Task),
    Waiting,
}

/// Order candidates per §4.2.1's tie-break sequence:
/// 1. major before minor, 2. difficulty descending, 3. created_at ascending,
/// 4. id ascending. `eligible_candidates` has already applied the filter
/// predicate (status/role/difficulty/lock/requester); this only orders.
pub fn order_candidates(mut candidates: Vec<Task>) -> Vec<Task> {
    candidates.sort_by(compare_candidates);
    candidates
}

fn compare_candidates(a: &Task, b: &Task) -> Ordering {
    use crate::models::Complexity::*;
    let complexity_rank = |c: crate::models::Complexity| if c == Major { 0 } else { 1 };

    complexity_rank(a.complexity)
        .cmp(&complexity_rank(b.complexity))
        .then_with(|| b.difficulty.cmp(&a.difficulty)) // descending
        .then_with(|| a.created_at.cmp(&b.created_at)) // ascending
        .then_with(|| a.id.cmp(&b.id))
}

/// Filter predicate for §4.2.1 rules 1-4 (rule 5, "requester does not already
/// hold another task", is checked against the agent row by `Store::dispatch_next`
/// inside the lock transaction, since it must be read-consistent with the
/// lock acquisition itself).
pub fn is_eligible(task: &Task, role: Role, level: Level) -> bool {
    task.status == TaskStatus::Approved
        && task.target_role == role
        && task.difficulty.fits(level)
        && task.locked_by_agent_id.is_none()
}

/// Find and lock the next task for `agent_id`. The bounded re-selection
/// retry of §4.2.2 step 2 happens inside `Store::dispatch_next` itself (it
/// owns the transaction the race is resolved within); this returns whatever
/// the store decides: `Ok(Some(task))` on success, `Ok(None)` when nothing is
/// currently eligible, or `Err(CoreError::Conflict(..))` when the requester
/// already holds another task (§4.2.4) — a genuine caller error, not a race,
/// so it is propagated rather than retried.
pub async fn try_dispatch(
    store: &dyn Store,
    project_id: i64,
    role: Role,
    level: Level,
    agent_id: &str,
) -> Result<Option<Task>> {
    store.dispatch_next(project_id, role, level, agent_id).await
}

/// Full dispatcher entry point for `GET /tasks/next`, §4.2.3/§4.2.4. If
/// nothing is eligible and `wait` is requested, suspends on the project's
/// wake signal until either something becomes eligible, the deadline
/// elapses, or the waiter cap is hit (in which case it returns `Waiting`
/// immediately, shedding load per §9). If `wait` was *not* requested and
/// nothing is eligible, this is a genuine "no candidates" result, not a
/// timeout, so it is reported as `CoreError::NotFound` rather than the
/// synthetic `Waiting` outcome reserved for the `wait == true` path.
pub async fn dispatch_next(
    store: &dyn Store,
    hub: &WakeHub,
    project_id: i64,
    role: Role,
    level: Level,
    agent_id: &str,
    wait: bool,
    wait_seconds: u64,
) -> Result<DispatchOutcome> {
    if let Some(task) = try_dispatch(store, project_id, role, level, agent_id).await? {
        return Ok(DispatchOutcome::Assigned(task));
    }
    if !wait {
        return Err(CoreError::not_found_entity(
            "dispatchable task",
            format!("role={role:?}, level={level:?}"),
        ));
    }

    let Some((mut rx, _permit)) = hub.try_admit(project_id) else {
        // over capacity: shed load immediately rather than queue (§9)
        return Ok(DispatchOutcome::Waiting);
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(wait_seconds);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Ok(DispatchOutcome::Waiting);
        }
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Ok(())) | Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(_))) => {
                // spurious-wake-tolerant: always re-run selection, never
                // trust the wake payload itself.
                if let Some(task) = try_dispatch(store, project_id, role, level, agent_id).await? {
                    return Ok(DispatchOutcome::Assigned(task));
                }
                // keep waiting until the deadline
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                return Ok(DispatchOutcome::Waiting);
            }
            Err(_elapsed) => return Ok(DispatchOutcome::Waiting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Complexity, Difficulty};
    use chrono::{TimeZone, Utc};

    fn task(id: i64, complexity: Complexity, difficulty: Difficulty, created_secs: i64) -> Task {
        Task {
            id,
            feature_id: 1,
            project_id: 1,
            title: format!("t{id}"),
            description: String::new(),
            target_role: Role::BackendDev,
            difficulty,
            complexity,
            branch: None,
            status: TaskStatus::Approved,
            locked_by_agent_id: None,
            locked_at: None,
            created_by: "pm".into(),
            assigned_to: None,
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
            updated_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
            notes: None,
        }
    }

    #[test]
    fn major_before_minor() {
        let a = task(1, Complexity::Minor, Difficulty::Junior, 100);
        let b = task(2, Complexity::Major, Difficulty::Junior, 200);
        let ordered = order_candidates(vec![a, b]);
        assert_eq!(ordered[0].id, 2);
    }

    #[test]
    fn difficulty_descending_within_same_complexity() {
        let a = task(1, Complexity::Major, Difficulty::Junior, 100);
        let b = task(2, Complexity::Major, Difficulty::Principal, 100);
        let c = task(3, Complexity::Major, Difficulty::Senior, 100);
        let ordered = order_candidates(vec![a, b, c]);
        assert_eq!(
            ordered.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![2, 3, 1]
        );
    }

    #[test]
    fn fifo_among_equals() {
        let a = task(1, Complexity::Major, Difficulty::Junior, 200);
        let b = task(2, Complexity::Major, Difficulty::Junior, 100);
        let ordered = order_candidates(vec![a, b]);
        assert_eq!(ordered[0].id, 2); // earlier created_at first
    }

    #[test]
    fn id_ascending_as_final_tiebreak() {
        let a = task(2, Complexity::Major, Difficulty::Junior, 100);
        let b = task(1, Complexity::Major, Difficulty::Junior, 100);
        let ordered = order_candidates(vec![a, b]);
        assert_eq!(ordered[0].id, 1);
    }

    #[test]
    fn eligibility_checks_all_four_filters() {
        let mut t = task(1, Complexity::Major, Difficulty::Senior, 100);
        assert!(is_eligible(&t, Role::BackendDev, Level::Senior));
        assert!(!is_eligible(&t, Role::FrontendDev, Level::Senior));
        assert!(!is_eligible(&t, Role::BackendDev, Level::Junior));
        t.status = TaskStatus::Created;
        assert!(!is_eligible(&t, Role::BackendDev, Level::Senior));
        t.status = TaskStatus::Approved;
        t.locked_by_agent_id = Some("someone".into());
        assert!(!is_eligible(&t, Role::BackendDev, Level::Senior));
    }
}
