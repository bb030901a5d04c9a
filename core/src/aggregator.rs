//! Change Aggregator, §4.6. Answers "what changed in project P since T for
//! agent A" by reading the changelog and hydrating the referenced entities,
//! then (optionally) long-polls the same wake signal the dispatcher uses.

use std::time::Duration;

use crate::{
    error::Result,
    models::{ChangeKind, ChangelogEntry},
    repository::{ChangeWindow, Store},
    time::MonotonicTimestamp,
    wake::WakeHub,
};

/// §4.6: "Mentions are filtered to those whose recipient is `viewer_agent_id`
/// (or all, if viewer is a project-level PM)."
pub enum Viewer<'a> {
    Agent(&'a str),
    ProjectPm,
}

/// Build a [`ChangeWindow`] for every changelog entry in `(project_id,
/// since]`, ordering each category by `created_at` ascending (changelog order
/// already satisfies this, §4.1). `timestamp` is stamped from
/// `store.monotonic_now()` at the start of the query so the caller can pass
/// it back as the next `since` with no gap or duplication (§4.6).
pub async fn changes(
    store: &dyn Store,
    project_id: i64,
    since: MonotonicTimestamp,
    viewer: Viewer<'_>,
) -> Result<ChangeWindow> {
    let timestamp = store.monotonic_now();
    let entries = store.changelog_since(project_id, since).await?;
    hydrate(store, project_id, entries, viewer, timestamp).await
}

async fn hydrate(
    store: &dyn Store,
    project_id: i64,
    entries: Vec<ChangelogEntry>,
    viewer: Viewer<'_>,
    timestamp: MonotonicTimestamp,
) -> Result<ChangeWindow> {
    let mut task_created_ids = Vec::new();
    let mut task_updated_ids = Vec::new();
    let mut document_ids = Vec::new();
    let mut mention_ids = Vec::new();
    let mut agent_ids: Vec<String> = Vec::new();
    let mut service_names: Vec<String> = Vec::new();

    for entry in &entries {
        match entry.kind {
            ChangeKind::TaskCreated => push_id(&mut task_created_ids, &entry.ref_id),
            ChangeKind::TaskStatus | ChangeKind::TaskLocked | ChangeKind::TaskUnlocked => {
                push_id(&mut task_updated_ids, &entry.ref_id)
            }
            ChangeKind::DocumentCreated => push_id(&mut document_ids, &entry.ref_id),
            ChangeKind::MentionCreated => push_id(&mut mention_ids, &entry.ref_id),
            ChangeKind::AgentRegistered => agent_ids.push(entry.ref_id.clone()),
            ChangeKind::ServiceRegistered | ChangeKind::ServiceStatus => {
                service_names.push(entry.ref_id.clone())
            }
        }
    }

    let tasks_new = store.tasks_by_ids(&dedup(task_created_ids)).await?;
    let tasks_updated = store.tasks_by_ids(&dedup(task_updated_ids)).await?;
    let documents_new = store.documents_by_ids(&dedup(document_ids)).await?;
    let mut mentions = store.mentions_by_ids(&dedup(mention_ids)).await?;

    match viewer {
        Viewer::Agent(agent_id) => {
            mentions.retain(|m| m.recipient_agent_id.as_deref() == Some(agent_id));
        }
        Viewer::ProjectPm => {}
    }

    agent_ids.sort();
    agent_ids.dedup();
    let agents_registered = store.agents_by_ids(project_id, &agent_ids).await?;

    service_names.sort();
    service_names.dedup();
    let services_changed = store.services_by_names(project_id, &service_names).await?;

    Ok(ChangeWindow {
        tasks_new,
        tasks_updated,
        documents_new,
        mentions,
        agents_registered,
        services_changed,
        timestamp,
    })
}

fn push_id(ids: &mut Vec<i64>, ref_id: &str) {
    if let Ok(parsed) = ref_id.parse::<i64>() {
        ids.push(parsed);
    }
}

fn dedup(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Whether `window` has anything in it; used to decide whether a
/// `wait=true` call should suspend (§4.6's long-poll variant of §4.2.3).
pub fn is_empty(window: &ChangeWindow) -> bool {
    window.tasks_new.is_empty()
        && window.tasks_updated.is_empty()
        && window.documents_new.is_empty()
        && window.mentions.is_empty()
        && window.agents_registered.is_empty()
        && window.services_changed.is_empty()
}

/// Long-polling variant of [`changes`]: if the window is empty and `wait` is
/// set, suspend on the project's wake signal (shared with the dispatcher)
/// until a changelog append occurs or `wait_seconds` elapses, then re-query.
pub async fn changes_wait(
    store: &dyn Store,
    hub: &WakeHub,
    project_id: i64,
    since: MonotonicTimestamp,
    viewer: Viewer<'_>,
    wait: bool,
    wait_seconds: u64,
) -> Result<ChangeWindow> {
    let window = changes(store, project_id, since, viewer_copy(&viewer)).await?;
    if !wait || !is_empty(&window) {
        return Ok(window);
    }

    let Some((mut rx, _permit)) = hub.try_admit(project_id) else {
        return Ok(window);
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(wait_seconds);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return changes(store, project_id, since, viewer).await;
        }
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Ok(())) | Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(_))) => {
                let window = changes(store, project_id, since, viewer_copy(&viewer)).await?;
                if !is_empty(&window) {
                    return Ok(window);
                }
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                return changes(store, project_id, since, viewer).await;
            }
            Err(_elapsed) => return changes(store, project_id, since, viewer).await,
        }
    }
}

fn viewer_copy<'a>(viewer: &Viewer<'a>) -> Viewer<'a> {
    match viewer {
        Viewer::Agent(a) => Viewer::Agent(a),
        Viewer::ProjectPm => Viewer::ProjectPm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_is_empty() {
        let window = ChangeWindow::default();
        assert!(is_empty(&window));
    }
}
