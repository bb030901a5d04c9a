//! End-to-end test harness: spawns a real `coordinator-server` process
//! against a throwaway SQLite file and drives it over HTTP, the way the
//! teacher's integration suite drove `axon-mcp` as a child process rather
//! than calling into its library directly.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};

/// A running `coordinator-server` bound to a free local port, with a
/// throwaway SQLite database that is deleted when the harness drops.
pub struct TestHarness {
    child: Child,
    client: reqwest::Client,
    base_url: String,
    _db_dir: tempfile::TempDir,
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .unwrap()
        .port()
}

impl TestHarness {
    /// Start a fresh server instance. Each call gets its own SQLite file and
    /// port, so tests can run concurrently.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_env(&[]).await
    }

    /// Like [`Self::spawn`] but with additional environment overrides, e.g.
    /// a short `SERVICE_STALE_SECONDS` for liveness tests that would
    /// otherwise need to sleep for minutes.
    pub async fn spawn_with_env(extra_env: &[(&str, &str)]) -> Result<Self> {
        let binary = PathBuf::from(env!("CARGO_BIN_EXE_coordinator-server"));
        let db_dir = tempfile::tempdir().context("create temp dir for sqlite file")?;
        let db_path = db_dir.path().join("coordinator.sqlite");
        let port = free_port();

        let mut command = Command::new(&binary);
        command
            .env("DATABASE_URL", format!("sqlite://{}", db_path.display()))
            .env("SERVICE_PORT", port.to_string())
            .env("LOG_LEVEL", "warn")
            .env("DISPATCHER_WAIT_SECONDS", "2")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true);
        for (key, value) in extra_env {
            command.env(key, value);
        }
        let child = command.spawn().context("failed to spawn coordinator-server")?;

        let base_url = format!("http://127.0.0.1:{port}");
        let client = reqwest::Client::new();

        let mut harness = Self {
            child,
            client,
            base_url,
            _db_dir: db_dir,
        };
        harness.wait_until_ready().await?;
        Ok(harness)
    }

    async fn wait_until_ready(&mut self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(status) = self.child.try_wait()? {
                bail!("coordinator-server exited early with {status}");
            }
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("coordinator-server did not become healthy in time");
            }
            sleep(Duration::from_millis(50)).await;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    pub async fn create_project(&self, name: &str) -> Result<Value> {
        let resp = self
            .client
            .post(self.url("/projects"))
            .json(&json!({
                "name": name,
                "shared_path": "/shared",
                "instructions_path": "/instructions",
                "docs_path": "/docs",
            }))
            .send()
            .await?;
        ok_json(resp).await
    }

    pub async fn register_agent(
        &self,
        project_id: i64,
        agent_id: &str,
        role: &str,
        level: &str,
    ) -> Result<Value> {
        let resp = self
            .client
            .post(self.url("/register"))
            .json(&json!({
                "project_id": project_id,
                "agent_id": agent_id,
                "role": role,
                "level": level,
                "connection_type": "client",
            }))
            .send()
            .await?;
        ok_json(resp).await
    }

    pub async fn create_epic(&self, project_id: i64, name: &str) -> Result<Value> {
        let resp = self
            .client
            .post(self.url("/epics"))
            .json(&json!({ "project_id": project_id, "name": name, "description": "d", "created_by_agent": "pm" }))
            .send()
            .await?;
        ok_json(resp).await
    }

    pub async fn create_feature(&self, epic_id: i64, name: &str) -> Result<Value> {
        let resp = self
            .client
            .post(self.url("/features"))
            .json(&json!({ "epic_id": epic_id, "name": name, "description": "d" }))
            .send()
            .await?;
        ok_json(resp).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_task(
        &self,
        feature_id: i64,
        title: &str,
        target_role: &str,
        difficulty: &str,
        complexity: &str,
        created_by: &str,
    ) -> Result<Value> {
        let resp = self
            .client
            .post(self.url("/tasks/create"))
            .json(&json!({
                "feature_id": feature_id,
                "title": title,
                "description": "d",
                "target_role": target_role,
                "difficulty": difficulty,
                "complexity": complexity,
                "created_by": created_by,
            }))
            .send()
            .await?;
        ok_json(resp).await
    }

    pub async fn set_task_status(
        &self,
        task_id: i64,
        project_id: i64,
        actor_agent_id: &str,
        status: &str,
        note: Option<&str>,
    ) -> Result<reqwest::Response> {
        self.client
            .put(self.url(&format!("/tasks/{task_id}/status")))
            .json(&json!({
                "project_id": project_id,
                "actor_agent_id": actor_agent_id,
                "new_status": status,
                "note": note,
            }))
            .send()
            .await
            .context("PUT /tasks/{id}/status")
    }

    pub async fn dispatch_next(
        &self,
        project_id: i64,
        role: &str,
        level: &str,
        agent_id: &str,
        wait: bool,
    ) -> Result<reqwest::Response> {
        self.client
            .get(self.url("/tasks/next"))
            .query(&[
                ("project_id", project_id.to_string()),
                ("role", role.to_string()),
                ("level", level.to_string()),
                ("agent_id", agent_id.to_string()),
                ("wait", wait.to_string()),
            ])
            .send()
            .await
            .context("GET /tasks/next")
    }

    pub async fn create_document(
        &self,
        project_id: i64,
        author_agent_id: &str,
        title: &str,
        body: &str,
    ) -> Result<Value> {
        let resp = self
            .client
            .post(self.url("/documents"))
            .json(&json!({
                "project_id": project_id,
                "author_agent_id": author_agent_id,
                "doc_type": "handoff",
                "title": title,
                "body": body,
            }))
            .send()
            .await?;
        ok_json(resp).await
    }

    pub async fn register_service(
        &self,
        project_id: i64,
        owner_agent_id: &str,
        name: &str,
        port: u16,
    ) -> Result<Value> {
        let resp = self
            .client
            .post(self.url("/services/register"))
            .json(&json!({
                "project_id": project_id,
                "owner_agent_id": owner_agent_id,
                "name": name,
                "port": port,
                "meta": {},
            }))
            .send()
            .await?;
        ok_json(resp).await
    }

    pub async fn heartbeat_service(&self, project_id: i64, name: &str) -> Result<Value> {
        let resp = self
            .client
            .post(self.url(&format!("/services/{name}/heartbeat")))
            .query(&[("project_id", project_id.to_string())])
            .send()
            .await?;
        ok_json(resp).await
    }

    pub async fn list_services(&self, project_id: i64) -> Result<Value> {
        let resp = self
            .client
            .get(self.url("/services"))
            .query(&[("project_id", project_id.to_string())])
            .send()
            .await?;
        ok_json(resp).await
    }

    pub async fn changes(&self, project_id: i64, since: &str, wait: bool) -> Result<reqwest::Response> {
        self.client
            .get(self.url("/changes"))
            .query(&[
                ("project_id", project_id.to_string()),
                ("since", since.to_string()),
                ("wait", wait.to_string()),
            ])
            .send()
            .await
            .context("GET /changes")
    }

    pub async fn list_mentions(&self, agent_id: &str, unread_only: bool) -> Result<Value> {
        let resp = self
            .client
            .get(self.url("/mentions"))
            .query(&[("agent_id", agent_id.to_string()), ("unread_only", unread_only.to_string())])
            .send()
            .await?;
        ok_json(resp).await
    }
}

async fn ok_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        bail!("request failed with {status}: {body}");
    }
    serde_json::from_str(&body).context("parse JSON response")
}

/// Small helper for tests that need to bound a long-poll wait.
pub async fn with_deadline<F, T>(seconds: u64, fut: F) -> Result<T>
where
    F: std::future::Future<Output = T>,
{
    timeout(Duration::from_secs(seconds), fut)
        .await
        .context("operation timed out")
}
