//! Standard test fixtures for consistent testing
//!
//! Seeds an [`InMemoryStore`] with a project, a handful of agents, and tasks
//! across the lifecycle so integration tests don't each re-derive the same
//! setup boilerplate.

use coordinator_core::models::*;
use coordinator_core::Store;

use crate::repository::InMemoryStore;
use crate::{NewAgentBuilder, NewProjectBuilder, NewTaskBuilder};

/// A populated project plus the agents/feature id commonly needed by
/// dispatcher and lifecycle tests.
pub struct ProjectFixture {
    pub project: Project,
    pub epic: Epic,
    pub feature: Feature,
    pub backend_dev: Agent,
    pub qa: Agent,
    pub pm: Agent,
}

/// Seed a store with one project, one epic/feature, and three agents
/// (backend dev, QA, PM) covering the roles most lifecycle tests need.
pub async fn seed_project(store: &InMemoryStore) -> ProjectFixture {
    let project = store
        .create_project(NewProjectBuilder::new().with_name("fixture-project").build())
        .await
        .expect("create project");

    let epic = store
        .create_epic(NewEpic {
            project_id: project.id,
            name: "fixture-epic".to_string(),
            description: "seeded by fixtures".to_string(),
            created_by_agent: "pm".to_string(),
        })
        .await
        .expect("create epic");

    let feature = store
        .create_feature(NewFeature {
            epic_id: epic.id,
            name: "fixture-feature".to_string(),
            description: "seeded by fixtures".to_string(),
        })
        .await
        .expect("create feature");

    let backend_dev = store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("dev-1")
                .with_project_id(project.id)
                .with_role(Role::BackendDev)
                .with_level(Level::Senior)
                .build(),
        )
        .await
        .expect("register backend dev");

    let qa = store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("qa-1")
                .with_project_id(project.id)
                .with_role(Role::Qa)
                .with_level(Level::Senior)
                .build(),
        )
        .await
        .expect("register qa");

    let pm = store
        .upsert_agent(
            NewAgentBuilder::new()
                .with_agent_id("pm-1")
                .with_project_id(project.id)
                .with_role(Role::ProjectPm)
                .with_level(Level::Principal)
                .build(),
        )
        .await
        .expect("register pm");

    ProjectFixture {
        project,
        epic,
        feature,
        backend_dev,
        qa,
        pm,
    }
}

/// Create a task in `Created` status against `fixture.feature`.
pub async fn seed_task(store: &InMemoryStore, fixture: &ProjectFixture, title: &str) -> Task {
    store
        .create_task(
            NewTaskBuilder::new()
                .with_feature_id(fixture.feature.id)
                .with_title(title)
                .with_target_role(Role::BackendDev)
                .with_created_by(fixture.pm.agent_id.clone())
                .build(),
        )
        .await
        .expect("create task")
}

/// Create a task and drive it straight to `Approved`, ready for dispatch.
pub async fn seed_approved_task(store: &InMemoryStore, fixture: &ProjectFixture, title: &str) -> Task {
    let task = seed_task(store, fixture, title).await;
    store
        .apply_transition(
            task.id,
            TaskStatus::Approved,
            &fixture.pm.agent_id,
            None,
            false,
            false,
            false,
        )
        .await
        .expect("approve task")
}
