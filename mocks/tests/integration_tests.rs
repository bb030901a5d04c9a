//! Integration tests for the mocks crate
//!
//! Exercises the builders, fixtures, generators, assertions, and contract
//! suite together against [`InMemoryStore`], the way the teacher's `mocks`
//! integration suite exercised its own repository mock.

use mocks::*;
use coordinator_core::models::{Complexity, Difficulty, Level, Role, TaskFilter, TaskStatus};
use coordinator_core::Store;

#[tokio::test]
async fn fixture_seeds_a_dispatchable_project() {
    let store = InMemoryStore::new();
    let fixture = seed_project(&store).await;

    assert_eq!(fixture.backend_dev.role, Role::BackendDev);
    assert_eq!(fixture.qa.role, Role::Qa);
    assert!(fixture.pm.role.is_pm());

    let task = seed_approved_task(&store, &fixture, "wire up the dashboard").await;
    assert_eq!(task.status, TaskStatus::Approved);
    assert!(task.locked_by_agent_id.is_none());
}

#[tokio::test]
async fn builders_produce_overridable_defaults() {
    let task = NewTaskBuilder::new()
        .with_feature_id(7)
        .with_title("custom title")
        .with_target_role(Role::Qa)
        .with_difficulty(Difficulty::Principal)
        .with_complexity(Complexity::Major)
        .build();

    assert_eq!(task.feature_id, 7);
    assert_eq!(task.title, "custom title");
    assert_eq!(task.target_role, Role::Qa);
    assert_eq!(task.difficulty, Difficulty::Principal);
    assert_eq!(task.complexity, Complexity::Major);
}

#[tokio::test]
async fn generators_produce_realistic_non_empty_data() {
    let handle = generate_agent_handle();
    assert!(!handle.is_empty());
    assert!(handle.contains('-'));

    let title = generate_task_title();
    let description = generate_task_description();
    assert!(!title.is_empty());
    assert!(!description.is_empty());

    let generator = TaskGenerator {
        feature_id: 1,
        role_pool: vec![Role::BackendDev],
        created_by: "pm-1".to_string(),
    };
    let generated = generator.generate();
    assert_eq!(generated.target_role, Role::BackendDev);
}

#[tokio::test]
async fn assertions_catch_dispatch_invariant_violations() {
    let store = InMemoryStore::new();
    let fixture = seed_project(&store).await;
    let task = seed_approved_task(&store, &fixture, "dispatch me").await;

    let locked = store
        .dispatch_next(
            fixture.project.id,
            Role::BackendDev,
            Level::Senior,
            &fixture.backend_dev.agent_id,
        )
        .await
        .expect("dispatch should succeed")
        .expect("a task should be dispatched");
    assert_eq!(locked.id, task.id);

    let tasks = store
        .list_tasks(TaskFilter {
            project_id: Some(fixture.project.id),
            ..Default::default()
        })
        .await
        .expect("list tasks");
    for task in &tasks {
        assert_lock_invariant(task);
    }
}

#[tokio::test]
async fn contract_suite_passes_against_in_memory_store() {
    let store = InMemoryStore::new();
    test_store_contract(&store).await;
}

#[tokio::test]
async fn concurrent_dispatch_respects_single_owner_invariant() {
    use std::sync::Arc;
    use tokio::task::JoinSet;

    let store = Arc::new(InMemoryStore::new());
    let fixture = seed_project(&store).await;
    let task = seed_approved_task(&store, &fixture, "only one winner").await;

    let second_dev = store
        .upsert_agent(NewAgentBuilder::new()
            .with_agent_id("dev-2")
            .with_project_id(fixture.project.id)
            .with_role(Role::BackendDev)
            .with_level(Level::Senior)
            .build())
        .await
        .expect("register second dev");

    let mut set = JoinSet::new();
    for agent_id in [fixture.backend_dev.agent_id.clone(), second_dev.agent_id.clone()] {
        let store = store.clone();
        let project_id = fixture.project.id;
        set.spawn(async move {
            store
                .dispatch_next(project_id, Role::BackendDev, Level::Senior, &agent_id)
                .await
        });
    }

    let mut winners = 0;
    while let Some(result) = set.join_next().await {
        if let Ok(Some(locked)) = result.unwrap() {
            assert_eq!(locked.id, task.id);
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one requester should win the race");
}
