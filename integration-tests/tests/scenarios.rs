//! End-to-end acceptance scenarios for the agent fleet coordination server,
//! each driving a real server process over HTTP through [`TestHarness`].

use std::time::Duration;

use integration_tests::{with_deadline, TestHarness};
use serde_json::Value;

fn as_i64(v: &Value, field: &str) -> i64 {
    v.get(field)
        .unwrap_or_else(|| panic!("missing field {field} in {v}"))
        .as_i64()
        .unwrap_or_else(|| panic!("field {field} is not an integer in {v}"))
}

/// Registers a project with one epic/feature and returns their ids.
async fn seed_feature(harness: &TestHarness, project_name: &str) -> (i64, i64, i64) {
    let project = harness.create_project(project_name).await.unwrap();
    let project_id = as_i64(&project, "id");
    let epic = harness.create_epic(project_id, "epic").await.unwrap();
    let feature = harness.create_feature(as_i64(&epic, "id"), "feature").await.unwrap();
    (project_id, as_i64(&epic, "id"), as_i64(&feature, "id"))
}

/// S1: two senior backend_devs poll `/tasks/next` at once against exactly one
/// eligible task. Exactly one gets it; the other is told to wait.
#[tokio::test]
async fn dispatch_race_hands_the_task_to_exactly_one_agent() {
    let harness = TestHarness::spawn().await.unwrap();
    let (project_id, _epic_id, feature_id) = seed_feature(&harness, "s1-dispatch-race").await;

    harness
        .register_agent(project_id, "dev_a", "backend_dev", "senior")
        .await
        .unwrap();
    harness
        .register_agent(project_id, "dev_b", "backend_dev", "senior")
        .await
        .unwrap();

    let task = harness
        .create_task(feature_id, "only task", "backend_dev", "senior", "major", "pm")
        .await
        .unwrap();
    let task_id = as_i64(&task, "id");
    harness
        .set_task_status(task_id, project_id, "pm", "approved", None)
        .await
        .unwrap();

    let (resp_a, resp_b) = tokio::join!(
        harness.dispatch_next(project_id, "backend_dev", "senior", "dev_a", false),
        harness.dispatch_next(project_id, "backend_dev", "senior", "dev_b", false),
    );
    let body_a: Value = resp_a.unwrap().json().await.unwrap();
    let body_b: Value = resp_b.unwrap().json().await.unwrap();

    let outcomes: Vec<&str> = [&body_a, &body_b]
        .iter()
        .map(|b| b.get("outcome").unwrap().as_str().unwrap())
        .collect();
    let assigned_count = outcomes.iter().filter(|o| **o == "assigned").count();
    assert_eq!(assigned_count, 1, "exactly one agent should be assigned the task, got {outcomes:?}");

    let assigned_body = if outcomes[0] == "assigned" { &body_a } else { &body_b };
    assert_eq!(as_i64(&assigned_body["task"], "id"), task_id);
    assert_eq!(assigned_body["task"]["status"], "under_work");
}

/// S2: QA rejects a locked `testing` task back to `created` with a note.
/// The task unlocks and the rejecting agent's `current_task_id` clears.
#[tokio::test]
async fn qa_rejection_unlocks_the_task_and_frees_the_agent() {
    let harness = TestHarness::spawn().await.unwrap();
    let (project_id, _epic_id, feature_id) = seed_feature(&harness, "s2-qa-rejection").await;

    harness
        .register_agent(project_id, "dev_1", "backend_dev", "senior")
        .await
        .unwrap();
    harness
        .register_agent(project_id, "qa_1", "qa", "senior")
        .await
        .unwrap();

    let task = harness
        .create_task(feature_id, "needs qa", "backend_dev", "senior", "major", "pm")
        .await
        .unwrap();
    let task_id = as_i64(&task, "id");

    harness
        .set_task_status(task_id, project_id, "pm", "approved", None)
        .await
        .unwrap();
    harness
        .set_task_status(task_id, project_id, "dev_1", "under_work", None)
        .await
        .unwrap();
    harness
        .set_task_status(task_id, project_id, "dev_1", "dev_done", None)
        .await
        .unwrap();
    harness
        .set_task_status(task_id, project_id, "qa_1", "testing", None)
        .await
        .unwrap();

    let resp = harness
        .set_task_status(
            task_id,
            project_id,
            "qa_1",
            "created",
            Some("missing empty-password test"),
        )
        .await
        .unwrap();
    assert!(resp.status().is_success(), "rejection should succeed: {:?}", resp.status());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["task"]["status"], "created");
    assert!(body["task"]["locked_by_agent_id"].is_null(), "rejected task should be unlocked");

    // a created (not approved) task is not yet dispatchable; with no wait
    // requested this is a genuine "no candidates" result, reported as 404
    // rather than the synthetic "waiting" outcome reserved for wait=true.
    let waiter = with_deadline(
        3,
        harness.dispatch_next(project_id, "backend_dev", "senior", "dev_1", false),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(waiter.status(), reqwest::StatusCode::NOT_FOUND);
}

/// S3: a document mentioning two real agents and one nonexistent handle
/// fans out to exactly the resolvable recipients.
#[tokio::test]
async fn document_mentions_fan_out_to_known_agents_only() {
    let harness = TestHarness::spawn().await.unwrap();
    let (project_id, _epic_id, _feature_id) = seed_feature(&harness, "s3-mention-fanout").await;

    harness
        .register_agent(project_id, "dev_a", "backend_dev", "senior")
        .await
        .unwrap();
    harness
        .register_agent(project_id, "dev_b", "frontend_dev", "senior")
        .await
        .unwrap();

    harness
        .create_document(
            project_id,
            "writer",
            "handoff notes",
            "cc @dev_a @dev_b @ghost, please review",
        )
        .await
        .unwrap();

    let mentions_a = harness.list_mentions("dev_a", true).await.unwrap();
    let mentions_b = harness.list_mentions("dev_b", true).await.unwrap();
    assert_eq!(mentions_a.as_array().unwrap().len(), 1, "dev_a should have one unread mention");
    assert_eq!(mentions_b.as_array().unwrap().len(), 1, "dev_b should have one unread mention");
}

/// S4: a service that stopped heartbeating past `SERVICE_STALE_SECONDS`
/// reports `down` even though its persisted status is still `up`.
#[tokio::test]
async fn stale_service_reports_down_despite_persisted_up_status() {
    let harness = TestHarness::spawn_with_env(&[("SERVICE_STALE_SECONDS", "1")])
        .await
        .unwrap();
    let project = harness.create_project("s4-service-staleness").await.unwrap();
    let project_id = as_i64(&project, "id");
    harness
        .register_agent(project_id, "dev_1", "backend_dev", "senior")
        .await
        .unwrap();

    harness
        .register_service(project_id, "dev_1", "web", 8080)
        .await
        .unwrap();
    harness.heartbeat_service(project_id, "web").await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;

    let services = harness.list_services(project_id).await.unwrap();
    let services = services.as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0]["status"], "down", "service past its stale window should report down");
}

/// S5: a waiting long-poll dispatch is woken within ~1s of a matching task
/// becoming approved; a second identical waiter times out empty.
#[tokio::test]
async fn long_poll_dispatch_wakes_on_matching_approval() {
    let harness = TestHarness::spawn().await.unwrap();
    let (project_id, _epic_id, feature_id) = seed_feature(&harness, "s5-long-poll-wake").await;

    harness
        .register_agent(project_id, "dev_a", "backend_dev", "senior")
        .await
        .unwrap();
    harness
        .register_agent(project_id, "dev_b", "backend_dev", "senior")
        .await
        .unwrap();

    let waiter = tokio::spawn({
        let base = harness.dispatch_next(project_id, "backend_dev", "senior", "dev_a", true);
        async move { with_deadline(5, base).await }
    });

    // give the waiter time to register before the task exists
    tokio::time::sleep(Duration::from_millis(200)).await;

    let task = harness
        .create_task(feature_id, "woken task", "backend_dev", "senior", "major", "pm")
        .await
        .unwrap();
    let task_id = as_i64(&task, "id");
    harness
        .set_task_status(task_id, project_id, "pm", "approved", None)
        .await
        .unwrap();

    let resp = waiter.await.unwrap().unwrap().unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"], "assigned");
    assert_eq!(as_i64(&body["task"], "id"), task_id);

    // a concurrent identical waiter with nothing left times out empty
    let second = with_deadline(
        5,
        harness.dispatch_next(project_id, "backend_dev", "senior", "dev_b", true),
    )
    .await
    .unwrap()
    .unwrap();
    let second_body: Value = second.json().await.unwrap();
    assert_eq!(second_body["outcome"], "waiting");
}

/// S6: the first `/changes` call returns a cursor; polling again with that
/// cursor and no further activity blocks and comes back empty with a later
/// timestamp.
#[tokio::test]
async fn changes_round_trip_advances_the_cursor_on_empty_wait() {
    let harness = TestHarness::spawn().await.unwrap();
    let project = harness.create_project("s6-changes-round-trip").await.unwrap();
    let project_id = as_i64(&project, "id");
    harness
        .register_agent(project_id, "dev_1", "backend_dev", "senior")
        .await
        .unwrap();

    let first = harness.changes(project_id, "0.0", false).await.unwrap();
    assert!(first.status().is_success());
    let first_body: Value = first.json().await.unwrap();
    let cursor_1 = first_body["since"].as_str().unwrap().to_string();

    let started = std::time::Instant::now();
    let second = with_deadline(10, harness.changes(project_id, &cursor_1, true))
        .await
        .unwrap()
        .unwrap();
    let elapsed = started.elapsed();
    let second_body: Value = second.json().await.unwrap();
    let cursor_2 = second_body["since"].as_str().unwrap().to_string();

    assert!(
        elapsed >= Duration::from_secs(1),
        "empty long-poll should block for roughly the dispatcher wait window, took {elapsed:?}"
    );
    assert!(second_body["tasks_new"].as_array().unwrap().is_empty());
    assert_ne!(cursor_1, cursor_2, "the cursor should advance even on an empty wait");
}

/// S7: polling `/tasks/next` with `wait=false` and no eligible candidates is
/// a genuine "nothing to dispatch" result, reported as 404, not the
/// synthetic "waiting" outcome reserved for `wait=true`.
#[tokio::test]
async fn no_wait_empty_poll_returns_not_found() {
    let harness = TestHarness::spawn().await.unwrap();
    let (project_id, ..) = seed_feature(&harness, "s7-no-wait-empty-poll").await;

    harness
        .register_agent(project_id, "dev_a", "backend_dev", "senior")
        .await
        .unwrap();

    let resp = harness
        .dispatch_next(project_id, "backend_dev", "senior", "dev_a", false)
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

/// S8: a task dispatch-locked while still `approved` cannot be stolen by a
/// second same-role agent walking the `approved -> under_work` edge
/// directly via `PUT /tasks/{id}/status`.
#[tokio::test]
async fn locked_approved_task_rejects_a_second_agents_start_attempt() {
    let harness = TestHarness::spawn().await.unwrap();
    let (project_id, _epic_id, feature_id) = seed_feature(&harness, "s8-lock-theft").await;

    harness
        .register_agent(project_id, "dev_first", "backend_dev", "senior")
        .await
        .unwrap();
    harness
        .register_agent(project_id, "dev_second", "backend_dev", "senior")
        .await
        .unwrap();

    let task = harness
        .create_task(feature_id, "contested", "backend_dev", "senior", "major", "pm")
        .await
        .unwrap();
    let task_id = as_i64(&task, "id");
    harness
        .set_task_status(task_id, project_id, "pm", "approved", None)
        .await
        .unwrap();

    let dispatched = harness
        .dispatch_next(project_id, "backend_dev", "senior", "dev_first", false)
        .await
        .unwrap();
    assert!(dispatched.status().is_success());
    let dispatched_body: Value = dispatched.json().await.unwrap();
    assert_eq!(as_i64(&dispatched_body["task"], "id"), task_id);
    assert_eq!(dispatched_body["task"]["status"], "approved");
    assert_eq!(dispatched_body["task"]["locked_by_agent_id"], "dev_first");

    let theft = harness
        .set_task_status(task_id, project_id, "dev_second", "under_work", None)
        .await
        .unwrap();
    assert!(
        theft.status() == reqwest::StatusCode::CONFLICT || theft.status() == reqwest::StatusCode::FORBIDDEN,
        "a second agent must not be able to start a task locked by someone else, got {:?}",
        theft.status()
    );
}
