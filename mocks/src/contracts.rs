//! Contract test helpers for validating `Store` implementations
//!
//! Provides standardized tests that any [`coordinator_core::Store`]
//! implementation should pass, so the in-memory and SQLite backends stay
//! behaviorally aligned.

use coordinator_core::error::CoreError;
use coordinator_core::models::*;
use coordinator_core::time::MonotonicTimestamp;
use coordinator_core::Store;

use crate::{NewAgentBuilder, NewProjectBuilder, NewTaskBuilder};

/// Run the full contract suite against a fresh `store`.
pub async fn test_store_contract(store: &dyn Store) {
    test_project_contract(store).await;
    test_agent_contract(store).await;
    test_task_lifecycle_contract(store).await;
    test_dispatch_contract(store).await;
    test_lock_theft_is_rejected_contract(store).await;
    test_document_and_mention_contract(store).await;
    test_service_contract(store).await;
    test_changelog_contract(store).await;
}

pub async fn test_project_contract(store: &dyn Store) {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("contract-project").build())
        .await
        .expect("create project should succeed");
    assert!(project.id > 0, "created project should have a positive id");

    let fetched = store
        .get_project(project.id)
        .await
        .expect("get_project should not error")
        .expect("project should exist");
    assert_eq!(fetched.name, project.name);

    let by_name = store
        .get_project_by_name(&project.name)
        .await
        .expect("get_project_by_name should not error")
        .expect("project should be found by name");
    assert_eq!(by_name.id, project.id);

    store
        .soft_delete_project(project.id)
        .await
        .expect("soft delete should succeed");
    assert!(
        store
            .get_project_by_name(&project.name)
            .await
            .expect("lookup after delete should not error")
            .is_none(),
        "soft-deleted project should not resolve by name"
    );
}

pub async fn test_agent_contract(store: &dyn Store) {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("agent-contract").build())
        .await
        .unwrap();

    let first = store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("dev-x")
                .with_project_id(project.id)
                .with_role(Role::BackendDev)
                .build(),
        )
        .await
        .expect("register should succeed");
    assert_eq!(first.current_task_id, None);

    // idempotent re-registration with a role change
    let second = store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("dev-x")
                .with_project_id(project.id)
                .with_role(Role::FrontendDev)
                .build(),
        )
        .await
        .expect("re-register should succeed");
    assert_eq!(second.role, Role::FrontendDev, "role should update on re-register");

    let listed = store.list_agents(project.id).await.expect("list should succeed");
    assert_eq!(listed.len(), 1, "re-registration should not create a duplicate row");

    store
        .delete_agent(project.id, "dev-x")
        .await
        .expect("delete should succeed");
    assert!(store
        .get_agent(project.id, "dev-x")
        .await
        .unwrap()
        .is_none());
}

pub async fn test_task_lifecycle_contract(store: &dyn Store) {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("task-contract").build())
        .await
        .unwrap();
    let epic = store
        .create_epic(NewEpic {
            project_id: project.id,
            name: "epic".into(),
            description: "d".into(),
            created_by_agent: "pm".into(),
        })
        .await
        .unwrap();
    let feature = store
        .create_feature(NewFeature {
            epic_id: epic.id,
            name: "feature".into(),
            description: "d".into(),
        })
        .await
        .unwrap();
    store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("dev-y")
                .with_project_id(project.id)
                .with_role(Role::BackendDev)
                .build(),
        )
        .await
        .unwrap();

    let task = store
        .create_task(
            NewTaskBuilder::new()
                .with_feature_id(feature.id)
                .with_title("lifecycle task")
                .with_target_role(Role::BackendDev)
                .build(),
        )
        .await
        .expect("create_task should succeed");
    assert_eq!(task.status, TaskStatus::Created);
    assert!(task.locked_by_agent_id.is_none());

    let approved = store
        .apply_transition(task.id, TaskStatus::Approved, "pm", None, false, false, false)
        .await
        .expect("approve should succeed");
    assert_eq!(approved.status, TaskStatus::Approved);

    let under_work = store
        .apply_transition(
            task.id,
            TaskStatus::UnderWork,
            "dev-y",
            None,
            true,
            false,
            false,
        )
        .await
        .expect("start work should succeed");
    assert_eq!(under_work.locked_by_agent_id.as_deref(), Some("dev-y"));

    let dev_done = store
        .apply_transition(
            task.id,
            TaskStatus::DevDone,
            "dev-y",
            None,
            false,
            true,
            false,
        )
        .await
        .expect("finish dev should succeed");
    assert!(dev_done.locked_by_agent_id.is_none(), "dev_done is an unlocked state");
}

pub async fn test_dispatch_contract(store: &dyn Store) {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("dispatch-contract").build())
        .await
        .unwrap();
    let epic = store
        .create_epic(NewEpic {
            project_id: project.id,
            name: "epic".into(),
            description: "d".into(),
            created_by_agent: "pm".into(),
        })
        .await
        .unwrap();
    let feature = store
        .create_feature(NewFeature {
            epic_id: epic.id,
            name: "feature".into(),
            description: "d".into(),
        })
        .await
        .unwrap();
    store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("dev-z")
                .with_project_id(project.id)
                .with_role(Role::BackendDev)
                .with_level(Level::Senior)
                .build(),
        )
        .await
        .unwrap();

    let task = store
        .create_task(
            NewTaskBuilder::new()
                .with_feature_id(feature.id)
                .with_title("dispatchable")
                .with_target_role(Role::BackendDev)
                .with_difficulty(Difficulty::Senior)
                .build(),
        )
        .await
        .unwrap();
    store
        .apply_transition(task.id, TaskStatus::Approved, "pm", None, false, false, false)
        .await
        .unwrap();

    let dispatched = store
        .dispatch_next(project.id, Role::BackendDev, Level::Senior, "dev-z")
        .await
        .expect("dispatch should succeed")
        .expect("a dispatchable task exists");
    assert_eq!(dispatched.id, task.id);
    assert_eq!(dispatched.locked_by_agent_id.as_deref(), Some("dev-z"));

    let nothing_left = store
        .dispatch_next(project.id, Role::BackendDev, Level::Senior, "dev-z")
        .await;
    assert!(
        nothing_left.is_err(),
        "an agent already holding a task should be rejected, not handed a second one"
    );
}

/// A task locked by `dispatch_next` while its status is still `approved`
/// must not be stealable: a second same-role agent trying the same
/// lock-acquiring `apply_transition` call (the `approved -> under_work`
/// edge) should be rejected rather than overwrite the first agent's lock.
pub async fn test_lock_theft_is_rejected_contract(store: &dyn Store) {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("lock-theft-contract").build())
        .await
        .unwrap();
    let epic = store
        .create_epic(NewEpic {
            project_id: project.id,
            name: "epic".into(),
            description: "d".into(),
            created_by_agent: "pm".into(),
        })
        .await
        .unwrap();
    let feature = store
        .create_feature(NewFeature {
            epic_id: epic.id,
            name: "feature".into(),
            description: "d".into(),
        })
        .await
        .unwrap();
    store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("dev-first")
                .with_project_id(project.id)
                .with_role(Role::BackendDev)
                .with_level(Level::Senior)
                .build(),
        )
        .await
        .unwrap();
    store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("dev-second")
                .with_project_id(project.id)
                .with_role(Role::BackendDev)
                .with_level(Level::Senior)
                .build(),
        )
        .await
        .unwrap();

    let task = store
        .create_task(
            NewTaskBuilder::new()
                .with_feature_id(feature.id)
                .with_title("contested")
                .with_target_role(Role::BackendDev)
                .with_difficulty(Difficulty::Senior)
                .build(),
        )
        .await
        .unwrap();
    store
        .apply_transition(task.id, TaskStatus::Approved, "pm", None, false, false, false)
        .await
        .unwrap();

    let dispatched = store
        .dispatch_next(project.id, Role::BackendDev, Level::Senior, "dev-first")
        .await
        .expect("dispatch should succeed")
        .expect("a dispatchable task exists");
    assert_eq!(dispatched.status, TaskStatus::Approved, "dispatch_next locks without advancing status");
    assert_eq!(dispatched.locked_by_agent_id.as_deref(), Some("dev-first"));

    let stolen = store
        .apply_transition(
            task.id,
            TaskStatus::UnderWork,
            "dev-second",
            None,
            true,
            false,
            false,
        )
        .await;
    assert!(
        stolen.is_err(),
        "a second agent must not be able to walk the lock-start edge on a task already locked by someone else"
    );
    let err = stolen.unwrap_err();
    assert!(
        err.is_conflict() || matches!(err, CoreError::Forbidden(_)),
        "expected Conflict or Forbidden, got {err:?}"
    );

    let reloaded = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(
        reloaded.locked_by_agent_id.as_deref(),
        Some("dev-first"),
        "the original locker must still hold the task after the theft attempt"
    );
}

pub async fn test_document_and_mention_contract(store: &dyn Store) {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("doc-contract").build())
        .await
        .unwrap();
    store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("reader")
                .with_project_id(project.id)
                .build(),
        )
        .await
        .unwrap();

    let doc = store
        .create_document(NewDocument {
            project_id: project.id,
            author_agent_id: "writer".into(),
            doc_type: DocType::Handoff,
            title: "handoff".into(),
            body: "ping @reader".into(),
            expires_at: None,
        })
        .await
        .expect("create_document should succeed");

    let mentions = store
        .create_mentions(
            project.id,
            MentionSourceType::Document,
            doc.id,
            &["reader".to_string()],
        )
        .await
        .expect("create_mentions should succeed");
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].recipient_agent_id.as_deref(), Some("reader"));

    let unread = store
        .list_mentions("reader", true)
        .await
        .expect("list_mentions should succeed");
    assert_eq!(unread.len(), 1);

    store
        .mark_mention_read(mentions[0].id)
        .await
        .expect("mark_mention_read should succeed");
    let unread_after = store.list_mentions("reader", true).await.unwrap();
    assert!(unread_after.is_empty(), "mention should be read now");
}

pub async fn test_service_contract(store: &dyn Store) {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("service-contract").build())
        .await
        .unwrap();

    let service = store
        .register_service(NewService {
            project_id: project.id,
            name: "api".into(),
            owner_agent_id: "dev".into(),
            port: 9000,
            ping_url: None,
            meta: serde_json::json!({}),
        })
        .await
        .expect("register_service should succeed");
    assert_eq!(service.status, ServiceStatus::Starting);

    let beat = store
        .heartbeat_service(project.id, "api")
        .await
        .expect("heartbeat should succeed");
    assert_eq!(beat.status, ServiceStatus::Up);

    let listed = store.list_services(project.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    store
        .delete_service(project.id, "api")
        .await
        .expect("delete should succeed");
    assert!(store.list_services(project.id).await.unwrap().is_empty());
}

pub async fn test_changelog_contract(store: &dyn Store) {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("changelog-contract").build())
        .await
        .unwrap();

    let before = store.monotonic_now();
    store
        .insert_changelog(
            project.id,
            ChangeKind::AgentRegistered,
            "someone",
            Some("someone"),
            serde_json::json!({}),
        )
        .await
        .expect("insert_changelog should succeed");

    let entries = store
        .changelog_since(project.id, before)
        .await
        .expect("changelog_since should succeed");
    assert_eq!(entries.len(), 1);
    assert!(entries[0].created_at > before);

    let none_yet = store
        .changelog_since(project.id, entries[0].created_at)
        .await
        .unwrap();
    assert!(
        none_yet.is_empty(),
        "changelog_since is strictly-after, the entry itself must not repeat"
    );

    let none_at_future = store.changelog_since(project.id, MonotonicTimestamp::EPOCH).await.unwrap();
    assert_eq!(none_at_future.len(), 1, "EPOCH should return everything recorded so far");
}
