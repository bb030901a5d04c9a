use async_trait::async_trait;
use chrono::Utc;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};

use coordinator_core::{
    dispatcher,
    error::{CoreError, Result},
    models::{
        Agent, ChangeKind, ChangelogEntry, ConnectionType, DocType, Document, Epic, Feature,
        Level, Mention, MentionSourceType, NewAgent, NewDocument, NewEpic, NewFeature, NewProject,
        NewService, NewTask, NewTaskComment, Project, Role, Service, ServiceStatus, Task,
        TaskComment, TaskFilter, TaskPatch, TaskStatus,
    },
    repository::Store,
    time::{MonotonicClock, MonotonicTimestamp},
    validation::{require_non_empty, validate_service_name},
};

use crate::common::*;

/// SQLite-backed implementation of [`Store`].
///
/// Mutations that touch task ownership, agent assignment, or status run in a
/// `BEGIN IMMEDIATE` transaction and use conditional `UPDATE ... WHERE`
/// statements in place of `SELECT ... FOR UPDATE` (SQLite has no row-level
/// locking); a zero `rows_affected()` means the precondition no longer held
/// and the caller sees `Conflict`, matching the teacher's
/// `SqliteTaskRepository::claim_task` pattern generalized to this schema.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    clock: std::sync::Arc<MonotonicClock>,
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_url = if database_url.starts_with(":memory:") || database_url.starts_with("sqlite://") {
            database_url.to_string()
        } else {
            format!("sqlite://{database_url}")
        };

        if !db_url.contains(":memory:") && !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            Sqlite::create_database(&db_url)
                .await
                .map_err(|e| CoreError::StorageFault(format!("failed to create database: {e}")))?;
        }

        let connect_options = if db_url.contains(":memory:") {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_url)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Memory)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        } else {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(db_url.replace("sqlite://", ""))
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        };

        let pool = SqlitePool::connect_with(connect_options)
            .await
            .map_err(sqlx_error_to_core_error)?;

        Ok(Self {
            pool,
            clock: std::sync::Arc::new(MonotonicClock::new()),
        })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::StorageFault(format!("migration failed: {e}")))?;
        tracing::info!("database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert_changelog_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        project_id: i64,
        kind: ChangeKind,
        ref_id: &str,
        actor_agent_id: Option<&str>,
        detail: serde_json::Value,
    ) -> Result<ChangelogEntry> {
        let ts = self.clock.now();
        let detail_str = detail.to_string();
        let row = sqlx::query(
            r#"
            INSERT INTO changelog (project_id, kind, ref_id, actor_agent_id, created_at_ms, created_at_seq, detail)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(project_id)
        .bind(change_kind_to_str(kind))
        .bind(ref_id)
        .bind(actor_agent_id)
        .bind(ts.unix_millis)
        .bind(ts.seq)
        .bind(&detail_str)
        .fetch_one(&mut **tx)
        .await
        .map_err(sqlx_error_to_core_error)?;

        Ok(ChangelogEntry {
            id: row.try_get("id").map_err(sqlx_error_to_core_error)?,
            project_id,
            kind,
            ref_id: ref_id.to_string(),
            actor_agent_id: actor_agent_id.map(str::to_string),
            created_at: ts,
            detail,
        })
    }

    async fn fetch_task_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        id: i64,
    ) -> Result<Task> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(sqlx_error_to_core_error)?
            .ok_or_else(|| CoreError::not_found_entity("task", id))?;
        row_to_task(&row)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_project(&self, project: NewProject) -> Result<Project> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO projects (name, shared_path, instructions_path, docs_path, guidelines_path, repo_url, repo_main_branch, repo_clone_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&project.name)
        .bind(&project.shared_path)
        .bind(&project.instructions_path)
        .bind(&project.docs_path)
        .bind(&project.guidelines_path)
        .bind(&project.repo_url)
        .bind(&project.repo_main_branch)
        .bind(&project.repo_clone_path)
        .bind(fmt_datetime(now))
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;

        let id: i64 = row.try_get("id").map_err(sqlx_error_to_core_error)?;
        Ok(Project {
            id,
            name: project.name,
            shared_path: project.shared_path,
            instructions_path: project.instructions_path,
            docs_path: project.docs_path,
            guidelines_path: project.guidelines_path,
            repo_url: project.repo_url,
            repo_main_branch: project.repo_main_branch,
            repo_clone_path: project.repo_clone_path,
            created_at: now,
            deleted_at: None,
        })
    }

    async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        row.map(row_to_project).transpose()
    }

    async fn get_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE name = ? AND deleted_at IS NULL")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        row.map(row_to_project).transpose()
    }

    async fn soft_delete_project(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE projects SET deleted_at = ? WHERE id = ?")
            .bind(fmt_datetime(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        Ok(())
    }

    async fn upsert_agent(&self, agent: NewAgent) -> Result<Agent> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO agents (project_id, agent_id, role, level, connection_type, last_seen, current_task_id)
            VALUES (?, ?, ?, ?, ?, ?, NULL)
            ON CONFLICT (project_id, agent_id) DO UPDATE SET
                role = excluded.role,
                level = excluded.level,
                connection_type = excluded.connection_type,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(agent.project_id)
        .bind(&agent.agent_id)
        .bind(role_to_str(agent.role))
        .bind(level_to_str(agent.level))
        .bind(connection_type_to_str(agent.connection_type))
        .bind(fmt_datetime(now))
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;

        let stored = self
            .get_agent(agent.project_id, &agent.agent_id)
            .await?
            .ok_or_else(|| CoreError::StorageFault("agent upsert did not persist".to_string()))?;

        self.insert_changelog(
            agent.project_id,
            ChangeKind::AgentRegistered,
            &agent.agent_id,
            Some(&agent.agent_id),
            serde_json::json!({"role": role_to_str(agent.role), "level": level_to_str(agent.level)}),
        )
        .await?;

        Ok(stored)
    }

    async fn get_agent(&self, project_id: i64, agent_id: &str) -> Result<Option<Agent>> {
        let row = sqlx::query("SELECT * FROM agents WHERE project_id = ? AND agent_id = ?")
            .bind(project_id)
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        row.map(row_to_agent).transpose()
    }

    async fn list_agents(&self, project_id: i64) -> Result<Vec<Agent>> {
        let rows = sqlx::query("SELECT * FROM agents WHERE project_id = ? ORDER BY agent_id")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_agent).collect()
    }

    async fn delete_agent(&self, project_id: i64, agent_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM agents WHERE project_id = ? AND agent_id = ?")
            .bind(project_id)
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        Ok(())
    }

    async fn touch_agent_last_seen(&self, project_id: i64, agent_id: &str) -> Result<()> {
        sqlx::query("UPDATE agents SET last_seen = ? WHERE project_id = ? AND agent_id = ?")
            .bind(fmt_datetime(Utc::now()))
            .bind(project_id)
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        Ok(())
    }

    async fn create_epic(&self, epic: NewEpic) -> Result<Epic> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO epics (project_id, name, description, created_by_agent, created_at) VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(epic.project_id)
        .bind(&epic.name)
        .bind(&epic.description)
        .bind(&epic.created_by_agent)
        .bind(fmt_datetime(now))
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;
        let id: i64 = row.try_get("id").map_err(sqlx_error_to_core_error)?;
        Ok(Epic {
            id,
            project_id: epic.project_id,
            name: epic.name,
            description: epic.description,
            created_by_agent: epic.created_by_agent,
            created_at: now,
        })
    }

    async fn list_epics(&self, project_id: i64) -> Result<Vec<Epic>> {
        let rows = sqlx::query("SELECT * FROM epics WHERE project_id = ? ORDER BY id")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_epic).collect()
    }

    async fn create_feature(&self, feature: NewFeature) -> Result<Feature> {
        let epic = sqlx::query("SELECT project_id FROM epics WHERE id = ?")
            .bind(feature.epic_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?
            .ok_or_else(|| CoreError::not_found_entity("epic", feature.epic_id))?;
        let project_id: i64 = epic.try_get("project_id").map_err(sqlx_error_to_core_error)?;

        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO features (epic_id, project_id, name, description, created_at) VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(feature.epic_id)
        .bind(project_id)
        .bind(&feature.name)
        .bind(&feature.description)
        .bind(fmt_datetime(now))
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;
        let id: i64 = row.try_get("id").map_err(sqlx_error_to_core_error)?;
        Ok(Feature {
            id,
            epic_id: feature.epic_id,
            project_id,
            name: feature.name,
            description: feature.description,
            created_at: now,
        })
    }

    async fn list_features(&self, project_id: i64, epic_id: Option<i64>) -> Result<Vec<Feature>> {
        let rows = if let Some(epic_id) = epic_id {
            sqlx::query("SELECT * FROM features WHERE project_id = ? AND epic_id = ? ORDER BY id")
                .bind(project_id)
                .bind(epic_id)
                .fetch_all(&self.pool)
                .await
        } else {
            sqlx::query("SELECT * FROM features WHERE project_id = ? ORDER BY id")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await
        }
        .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_feature).collect()
    }

    async fn get_feature(&self, id: i64) -> Result<Option<Feature>> {
        let row = sqlx::query("SELECT * FROM features WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        row.map(row_to_feature).transpose()
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        require_non_empty("title", &task.title)?;
        require_non_empty("description", &task.description)?;

        let feature = self
            .get_feature(task.feature_id)
            .await?
            .ok_or_else(|| CoreError::not_found_entity("feature", task.feature_id))?;

        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_core_error)?;
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO tasks (feature_id, project_id, title, description, target_role, difficulty, complexity, branch, status, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(task.feature_id)
        .bind(feature.project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(role_to_str(task.target_role))
        .bind(difficulty_to_str(task.difficulty))
        .bind(complexity_to_str(task.complexity))
        .bind(&task.branch)
        .bind(task_status_to_str(TaskStatus::Created))
        .bind(&task.created_by)
        .bind(fmt_datetime(now))
        .bind(fmt_datetime(now))
        .fetch_one(&mut *tx)
        .await
        .map_err(sqlx_error_to_core_error)?;
        let id: i64 = row.try_get("id").map_err(sqlx_error_to_core_error)?;

        self.insert_changelog_tx(
            &mut tx,
            feature.project_id,
            ChangeKind::TaskCreated,
            &id.to_string(),
            Some(&task.created_by),
            serde_json::json!({"title": task.title}),
        )
        .await?;

        tx.commit().await.map_err(sqlx_error_to_core_error)?;

        Ok(Task {
            id,
            feature_id: task.feature_id,
            project_id: feature.project_id,
            title: task.title,
            description: task.description,
            target_role: task.target_role,
            difficulty: task.difficulty,
            complexity: task.complexity,
            branch: task.branch,
            status: TaskStatus::Created,
            locked_by_agent_id: None,
            locked_at: None,
            created_by: task.created_by,
            assigned_to: None,
            created_at: now,
            updated_at: now,
            notes: None,
        })
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        row.map(|r| row_to_task(&r)).transpose()
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM tasks WHERE 1 = 1");
        if let Some(project_id) = filter.project_id {
            qb.push(" AND project_id = ").push_bind(project_id);
        }
        if let Some(feature_id) = filter.feature_id {
            qb.push(" AND feature_id = ").push_bind(feature_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(task_status_to_str(status));
        }
        if let Some(role) = filter.target_role {
            qb.push(" AND target_role = ").push_bind(role_to_str(role));
        }
        if let Some(locked_by) = &filter.locked_by_agent_id {
            qb.push(" AND locked_by_agent_id = ").push_bind(locked_by.clone());
        }
        qb.push(" ORDER BY created_at ASC, id ASC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_task).collect()
    }

    async fn patch_task(&self, id: i64, patch: TaskPatch) -> Result<Task> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE tasks SET
                branch = COALESCE(?, branch),
                assigned_to = COALESCE(?, assigned_to),
                notes = COALESCE(?, notes),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&patch.branch)
        .bind(&patch.assigned_to)
        .bind(&patch.notes)
        .bind(fmt_datetime(now))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;

        self.get_task(id)
            .await?
            .ok_or_else(|| CoreError::not_found_entity("task", id))
    }

    async fn dispatch_next(
        &self,
        project_id: i64,
        role: Role,
        level: Level,
        agent_id: &str,
    ) -> Result<Option<Task>> {
        for _attempt in 0..dispatcher::MAX_LOCK_RETRIES {
            let mut tx = self.pool.begin().await.map_err(sqlx_error_to_core_error)?;

            let agent_row = sqlx::query(
                "SELECT current_task_id FROM agents WHERE project_id = ? AND agent_id = ?",
            )
            .bind(project_id)
            .bind(agent_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?
            .ok_or_else(|| CoreError::not_found_entity("agent", agent_id))?;

            let current_task_id: Option<i64> = agent_row
                .try_get("current_task_id")
                .map_err(sqlx_error_to_core_error)?;
            if current_task_id.is_some() {
                return Err(CoreError::already_holds_task(agent_id));
            }

            let candidate_rows = sqlx::query(
                r#"
                SELECT * FROM tasks
                WHERE project_id = ? AND status = ? AND target_role = ? AND locked_by_agent_id IS NULL
                "#,
            )
            .bind(project_id)
            .bind(task_status_to_str(TaskStatus::Approved))
            .bind(role_to_str(role))
            .fetch_all(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?;

            let candidates: Vec<Task> = candidate_rows
                .iter()
                .map(row_to_task)
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .filter(|t| t.difficulty.fits(level))
                .collect();

            let ordered = dispatcher::order_candidates(candidates);
            let Some(chosen) = ordered.into_iter().next() else {
                return Ok(None);
            };

            let now = Utc::now();
            let locked = sqlx::query(
                r#"
                UPDATE tasks SET locked_by_agent_id = ?, locked_at = ?
                WHERE id = ? AND status = ? AND locked_by_agent_id IS NULL
                "#,
            )
            .bind(agent_id)
            .bind(fmt_datetime(now))
            .bind(chosen.id)
            .bind(task_status_to_str(TaskStatus::Approved))
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?;

            if locked.rows_affected() == 0 {
                // lost the race (step 2 re-verification failed): retry selection
                tx.rollback().await.map_err(sqlx_error_to_core_error)?;
                continue;
            }

            let agent_updated = sqlx::query(
                "UPDATE agents SET current_task_id = ? WHERE project_id = ? AND agent_id = ? AND current_task_id IS NULL",
            )
            .bind(chosen.id)
            .bind(project_id)
            .bind(agent_id)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?;

            if agent_updated.rows_affected() == 0 {
                tx.rollback().await.map_err(sqlx_error_to_core_error)?;
                return Err(CoreError::already_holds_task(agent_id));
            }

            self.insert_changelog_tx(
                &mut tx,
                project_id,
                ChangeKind::TaskLocked,
                &chosen.id.to_string(),
                Some(agent_id),
                serde_json::json!({}),
            )
            .await?;

            let task = self.fetch_task_tx(&mut tx, chosen.id).await?;
            tx.commit().await.map_err(sqlx_error_to_core_error)?;
            return Ok(Some(task));
        }
        Ok(None)
    }

    async fn lock_task(&self, task_id: i64, agent_id: &str) -> Result<Task> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_core_error)?;
        let task = self.fetch_task_tx(&mut tx, task_id).await?;

        if task.locked_by_agent_id.is_some() {
            return Err(CoreError::Conflict(format!(
                "task {task_id} is already locked"
            )));
        }

        let agent_row = sqlx::query(
            "SELECT current_task_id FROM agents WHERE project_id = ? AND agent_id = ?",
        )
        .bind(task.project_id)
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(sqlx_error_to_core_error)?
        .ok_or_else(|| CoreError::not_found_entity("agent", agent_id))?;
        let current_task_id: Option<i64> = agent_row
            .try_get("current_task_id")
            .map_err(sqlx_error_to_core_error)?;
        if current_task_id.is_some() {
            return Err(CoreError::already_holds_task(agent_id));
        }

        let now = Utc::now();
        let locked = sqlx::query(
            "UPDATE tasks SET locked_by_agent_id = ?, locked_at = ? WHERE id = ? AND locked_by_agent_id IS NULL",
        )
        .bind(agent_id)
        .bind(fmt_datetime(now))
        .bind(task_id)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_core_error)?;
        if locked.rows_affected() == 0 {
            return Err(CoreError::Conflict(format!(
                "task {task_id} was locked concurrently"
            )));
        }

        sqlx::query(
            "UPDATE agents SET current_task_id = ? WHERE project_id = ? AND agent_id = ? AND current_task_id IS NULL",
        )
        .bind(task_id)
        .bind(task.project_id)
        .bind(agent_id)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_core_error)?;

        self.insert_changelog_tx(
            &mut tx,
            task.project_id,
            ChangeKind::TaskLocked,
            &task_id.to_string(),
            Some(agent_id),
            serde_json::json!({}),
        )
        .await?;

        let updated = self.fetch_task_tx(&mut tx, task_id).await?;
        tx.commit().await.map_err(sqlx_error_to_core_error)?;
        Ok(updated)
    }

    async fn apply_transition(
        &self,
        task_id: i64,
        new_status: TaskStatus,
        actor_agent_id: &str,
        note: Option<String>,
        acquires_lock: bool,
        releases_lock: bool,
        is_override: bool,
    ) -> Result<Task> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_core_error)?;
        let task = self.fetch_task_tx(&mut tx, task_id).await?;
        let old_status = task.status;
        let now = Utc::now();

        if acquires_lock {
            let agent_row = sqlx::query(
                "SELECT current_task_id FROM agents WHERE project_id = ? AND agent_id = ?",
            )
            .bind(task.project_id)
            .bind(actor_agent_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?
            .ok_or_else(|| CoreError::not_found_entity("agent", actor_agent_id))?;
            let current_task_id: Option<i64> = agent_row
                .try_get("current_task_id")
                .map_err(sqlx_error_to_core_error)?;
            if current_task_id.is_some_and(|id| id != task_id) {
                return Err(CoreError::already_holds_task(actor_agent_id));
            }

            // A task can already be locked here while its status is still the
            // `from` state (dispatch_next locks without advancing status): the
            // WHERE guard below makes the lock-acquiring write a no-op when a
            // different agent holds the lock, so a racing steal loses instead
            // of silently overwriting the locker.
            let result = sqlx::query(
                r#"
                UPDATE tasks SET status = ?, locked_by_agent_id = ?, locked_at = ?, updated_at = ?,
                    notes = COALESCE(?, notes)
                WHERE id = ? AND (locked_by_agent_id IS NULL OR locked_by_agent_id = ?)
                "#,
            )
            .bind(task_status_to_str(new_status))
            .bind(actor_agent_id)
            .bind(fmt_datetime(now))
            .bind(fmt_datetime(now))
            .bind(&note)
            .bind(task_id)
            .bind(actor_agent_id)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?;
            if result.rows_affected() == 0 {
                return Err(CoreError::Conflict(
                    "task is locked by a different agent".to_string(),
                ));
            }

            sqlx::query(
                "UPDATE agents SET current_task_id = ? WHERE project_id = ? AND agent_id = ?",
            )
            .bind(task_id)
            .bind(task.project_id)
            .bind(actor_agent_id)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?;
        } else if releases_lock {
            let locker = task.locked_by_agent_id.clone();
            sqlx::query(
                r#"
                UPDATE tasks SET status = ?, locked_by_agent_id = NULL, locked_at = NULL, updated_at = ?,
                    notes = COALESCE(?, notes)
                WHERE id = ?
                "#,
            )
            .bind(task_status_to_str(new_status))
            .bind(fmt_datetime(now))
            .bind(&note)
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?;

            if let Some(locker) = locker {
                sqlx::query(
                    "UPDATE agents SET current_task_id = NULL WHERE project_id = ? AND agent_id = ? AND current_task_id = ?",
                )
                .bind(task.project_id)
                .bind(&locker)
                .bind(task_id)
                .execute(&mut *tx)
                .await
                .map_err(sqlx_error_to_core_error)?;
            }

            self.insert_changelog_tx(
                &mut tx,
                task.project_id,
                ChangeKind::TaskUnlocked,
                &task_id.to_string(),
                Some(actor_agent_id),
                serde_json::json!({}),
            )
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE tasks SET status = ?, updated_at = ?, notes = COALESCE(?, notes)
                WHERE id = ?
                "#,
            )
            .bind(task_status_to_str(new_status))
            .bind(fmt_datetime(now))
            .bind(&note)
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?;
        }

        self.insert_changelog_tx(
            &mut tx,
            task.project_id,
            ChangeKind::TaskStatus,
            &task_id.to_string(),
            Some(actor_agent_id),
            serde_json::json!({
                "old": old_status.to_string(),
                "new": new_status.to_string(),
                "note": note,
                "override": is_override,
            }),
        )
        .await?;

        let updated = self.fetch_task_tx(&mut tx, task_id).await?;
        tx.commit().await.map_err(sqlx_error_to_core_error)?;
        Ok(updated)
    }

    async fn create_task_comment(&self, comment: NewTaskComment) -> Result<TaskComment> {
        require_non_empty("body", &comment.body)?;
        let task = self
            .get_task(comment.task_id)
            .await?
            .ok_or_else(|| CoreError::not_found_entity("task", comment.task_id))?;

        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO task_comments (task_id, project_id, author_agent_id, body, created_at) VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(comment.task_id)
        .bind(task.project_id)
        .bind(&comment.author_agent_id)
        .bind(&comment.body)
        .bind(fmt_datetime(now))
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;
        let id: i64 = row.try_get("id").map_err(sqlx_error_to_core_error)?;
        Ok(TaskComment {
            id,
            task_id: comment.task_id,
            project_id: task.project_id,
            author_agent_id: comment.author_agent_id,
            body: comment.body,
            created_at: now,
        })
    }

    async fn list_task_comments(&self, task_id: i64) -> Result<Vec<TaskComment>> {
        let rows = sqlx::query("SELECT * FROM task_comments WHERE task_id = ? ORDER BY created_at ASC, id ASC")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_task_comment).collect()
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        require_non_empty("title", &document.title)?;
        require_non_empty("body", &document.body)?;

        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO documents (project_id, author_agent_id, doc_type, title, body, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(document.project_id)
        .bind(&document.author_agent_id)
        .bind(doc_type_to_str(document.doc_type))
        .bind(&document.title)
        .bind(&document.body)
        .bind(fmt_datetime(now))
        .bind(document.expires_at.map(fmt_datetime))
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;
        let id: i64 = row.try_get("id").map_err(sqlx_error_to_core_error)?;

        self.insert_changelog(
            document.project_id,
            ChangeKind::DocumentCreated,
            &id.to_string(),
            Some(&document.author_agent_id),
            serde_json::json!({"title": document.title}),
        )
        .await?;

        Ok(Document {
            id,
            project_id: document.project_id,
            author_agent_id: document.author_agent_id,
            doc_type: document.doc_type,
            title: document.title,
            body: document.body,
            created_at: now,
            expires_at: document.expires_at,
        })
    }

    async fn list_documents(&self, project_id: i64, doc_type: Option<DocType>) -> Result<Vec<Document>> {
        let rows = if let Some(doc_type) = doc_type {
            sqlx::query("SELECT * FROM documents WHERE project_id = ? AND doc_type = ? ORDER BY created_at ASC, id ASC")
                .bind(project_id)
                .bind(doc_type_to_str(doc_type))
                .fetch_all(&self.pool)
                .await
        } else {
            sqlx::query("SELECT * FROM documents WHERE project_id = ? ORDER BY created_at ASC, id ASC")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await
        }
        .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_document).collect()
    }

    async fn create_mentions(
        &self,
        project_id: i64,
        source_type: MentionSourceType,
        source_id: i64,
        handles: &[String],
    ) -> Result<Vec<Mention>> {
        let mut created = Vec::new();
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_core_error)?;
        let now = Utc::now();

        for handle in handles {
            let recipient = sqlx::query(
                "SELECT agent_id FROM agents WHERE project_id = ? AND agent_id = ? COLLATE NOCASE",
            )
            .bind(project_id)
            .bind(handle)
            .fetch_optional(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?
            .map(|r| r.try_get::<String, _>("agent_id"))
            .transpose()
            .map_err(sqlx_error_to_core_error)?;

            let row = sqlx::query(
                r#"
                INSERT INTO mentions (project_id, source_type, source_id, mentioned_handle, recipient_agent_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (source_type, source_id, mentioned_handle) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(project_id)
            .bind(mention_source_type_to_str(source_type))
            .bind(source_id)
            .bind(handle)
            .bind(&recipient)
            .bind(fmt_datetime(now))
            .fetch_optional(&mut *tx)
            .await
            .map_err(sqlx_error_to_core_error)?;

            let Some(row) = row else { continue }; // duplicate (source, recipient) pair coalesced

            let id: i64 = row.try_get("id").map_err(sqlx_error_to_core_error)?;
            let mention = Mention {
                id,
                project_id,
                source_type,
                source_id,
                mentioned_handle: handle.clone(),
                recipient_agent_id: recipient.clone(),
                created_at: now,
                read_at: None,
            };

            if recipient.is_some() {
                self.insert_changelog_tx(
                    &mut tx,
                    project_id,
                    ChangeKind::MentionCreated,
                    &id.to_string(),
                    None,
                    serde_json::json!({"handle": handle}),
                )
                .await?;
            }

            created.push(mention);
        }

        tx.commit().await.map_err(sqlx_error_to_core_error)?;
        Ok(created)
    }

    async fn list_mentions(&self, agent_id: &str, unread_only: bool) -> Result<Vec<Mention>> {
        let rows = if unread_only {
            sqlx::query(
                "SELECT * FROM mentions WHERE recipient_agent_id = ? AND read_at IS NULL ORDER BY created_at DESC, id DESC",
            )
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                "SELECT * FROM mentions WHERE recipient_agent_id = ? ORDER BY created_at DESC, id DESC",
            )
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_mention).collect()
    }

    async fn mark_mention_read(&self, mention_id: i64) -> Result<()> {
        sqlx::query("UPDATE mentions SET read_at = COALESCE(read_at, ?) WHERE id = ?")
            .bind(fmt_datetime(Utc::now()))
            .bind(mention_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        Ok(())
    }

    async fn register_service(&self, service: NewService) -> Result<Service> {
        validate_service_name(&service.name)?;
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO services (project_id, name, owner_agent_id, port, status, ping_url, meta, last_heartbeat, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (project_id, name) DO UPDATE SET
                owner_agent_id = excluded.owner_agent_id,
                port = excluded.port,
                status = excluded.status,
                ping_url = excluded.ping_url,
                meta = excluded.meta,
                last_heartbeat = excluded.last_heartbeat
            "#,
        )
        .bind(service.project_id)
        .bind(&service.name)
        .bind(&service.owner_agent_id)
        .bind(service.port as i64)
        .bind(service_status_to_str(ServiceStatus::Starting))
        .bind(&service.ping_url)
        .bind(service.meta.to_string())
        .bind(fmt_datetime(now))
        .bind(fmt_datetime(now))
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;

        self.insert_changelog(
            service.project_id,
            ChangeKind::ServiceRegistered,
            &service.name,
            Some(&service.owner_agent_id),
            serde_json::json!({"port": service.port}),
        )
        .await?;

        self.get_service(service.project_id, &service.name)
            .await?
            .ok_or_else(|| CoreError::StorageFault("service registration did not persist".to_string()))
    }

    async fn heartbeat_service(&self, project_id: i64, name: &str) -> Result<Service> {
        let before = self.get_service(project_id, name).await?;
        let before_status = before
            .as_ref()
            .map(|s| s.status)
            .ok_or_else(|| CoreError::not_found_entity("service", name))?;

        sqlx::query(
            "UPDATE services SET status = ?, last_heartbeat = ? WHERE project_id = ? AND name = ?",
        )
        .bind(service_status_to_str(ServiceStatus::Up))
        .bind(fmt_datetime(Utc::now()))
        .bind(project_id)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;

        // §8 property 5 / idempotent heartbeat: only log a status change when
        // the status actually flips.
        if before_status != ServiceStatus::Up {
            self.insert_changelog(
                project_id,
                ChangeKind::ServiceStatus,
                name,
                None,
                serde_json::json!({"old": service_status_to_str(before_status), "new": "up"}),
            )
            .await?;
        }

        self.get_service(project_id, name)
            .await?
            .ok_or_else(|| CoreError::not_found_entity("service", name))
    }

    async fn delete_service(&self, project_id: i64, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM services WHERE project_id = ? AND name = ?")
            .bind(project_id)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        Ok(())
    }

    async fn list_services(&self, project_id: i64) -> Result<Vec<Service>> {
        let rows = sqlx::query("SELECT * FROM services WHERE project_id = ? ORDER BY name")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_service).collect()
    }

    async fn set_service_status(
        &self,
        project_id: i64,
        name: &str,
        status: ServiceStatus,
    ) -> Result<Option<Service>> {
        let before = self.get_service(project_id, name).await?;
        let Some(before) = before else { return Ok(None) };
        if before.status == status {
            return Ok(Some(before));
        }

        sqlx::query("UPDATE services SET status = ? WHERE project_id = ? AND name = ?")
            .bind(service_status_to_str(status))
            .bind(project_id)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;

        self.insert_changelog(
            project_id,
            ChangeKind::ServiceStatus,
            name,
            None,
            serde_json::json!({"old": service_status_to_str(before.status), "new": service_status_to_str(status)}),
        )
        .await?;

        self.get_service(project_id, name).await
    }

    async fn insert_changelog(
        &self,
        project_id: i64,
        kind: ChangeKind,
        ref_id: &str,
        actor_agent_id: Option<&str>,
        detail: serde_json::Value,
    ) -> Result<ChangelogEntry> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_core_error)?;
        let entry = self
            .insert_changelog_tx(&mut tx, project_id, kind, ref_id, actor_agent_id, detail)
            .await?;
        tx.commit().await.map_err(sqlx_error_to_core_error)?;
        Ok(entry)
    }

    async fn changelog_since(&self, project_id: i64, since: MonotonicTimestamp) -> Result<Vec<ChangelogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM changelog
            WHERE project_id = ?
              AND (created_at_ms > ? OR (created_at_ms = ? AND created_at_seq > ?))
            ORDER BY created_at_ms ASC, created_at_seq ASC, id ASC
            "#,
        )
        .bind(project_id)
        .bind(since.unix_millis)
        .bind(since.unix_millis)
        .bind(since.seq)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_changelog_entry).collect()
    }

    async fn tasks_by_ids(&self, ids: &[i64]) -> Result<Vec<Task>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM tasks WHERE id IN (");
        push_id_list(&mut qb, ids);
        qb.push(") ORDER BY created_at ASC, id ASC");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_task).collect()
    }

    async fn documents_by_ids(&self, ids: &[i64]) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM documents WHERE id IN (");
        push_id_list(&mut qb, ids);
        qb.push(") ORDER BY created_at ASC, id ASC");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_document).collect()
    }

    async fn mentions_by_ids(&self, ids: &[i64]) -> Result<Vec<Mention>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM mentions WHERE id IN (");
        push_id_list(&mut qb, ids);
        qb.push(") ORDER BY created_at ASC, id ASC");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_mention).collect()
    }

    async fn agents_by_ids(&self, project_id: i64, agent_ids: &[String]) -> Result<Vec<Agent>> {
        if agent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM agents WHERE project_id = ");
        qb.push_bind(project_id).push(" AND agent_id IN (");
        let mut separated = qb.separated(", ");
        for id in agent_ids {
            separated.push_bind(id.clone());
        }
        qb.push(") ORDER BY agent_id");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_agent).collect()
    }

    async fn services_by_names(&self, project_id: i64, names: &[String]) -> Result<Vec<Service>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM services WHERE project_id = ");
        qb.push_bind(project_id).push(" AND name IN (");
        let mut separated = qb.separated(", ");
        for name in names {
            separated.push_bind(name.clone());
        }
        qb.push(") ORDER BY name");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(sqlx_error_to_core_error)?;
        rows.iter().map(row_to_service).collect()
    }

    fn monotonic_now(&self) -> MonotonicTimestamp {
        self.clock.now()
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        Ok(())
    }
}

impl SqliteStore {
    async fn get_service(&self, project_id: i64, name: &str) -> Result<Option<Service>> {
        let row = sqlx::query("SELECT * FROM services WHERE project_id = ? AND name = ?")
            .bind(project_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_core_error)?;
        row.map(|r| row_to_service(&r)).transpose()
    }
}

fn push_id_list(qb: &mut sqlx::QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
}

fn row_to_project(row: sqlx::sqlite::SqliteRow) -> Result<Project> {
    Ok(Project {
        id: row.try_get("id").map_err(sqlx_error_to_core_error)?,
        name: row.try_get("name").map_err(sqlx_error_to_core_error)?,
        shared_path: row.try_get("shared_path").map_err(sqlx_error_to_core_error)?,
        instructions_path: row.try_get("instructions_path").map_err(sqlx_error_to_core_error)?,
        docs_path: row.try_get("docs_path").map_err(sqlx_error_to_core_error)?,
        guidelines_path: row.try_get("guidelines_path").map_err(sqlx_error_to_core_error)?,
        repo_url: row.try_get("repo_url").map_err(sqlx_error_to_core_error)?,
        repo_main_branch: row.try_get("repo_main_branch").map_err(sqlx_error_to_core_error)?,
        repo_clone_path: row.try_get("repo_clone_path").map_err(sqlx_error_to_core_error)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(sqlx_error_to_core_error)?)?,
        deleted_at: row
            .try_get::<Option<String>, _>("deleted_at")
            .map_err(sqlx_error_to_core_error)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
    })
}

fn row_to_agent(row: &sqlx::sqlite::SqliteRow) -> Result<Agent> {
    Ok(Agent {
        agent_id: row.try_get("agent_id").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        role: str_to_role(&row.try_get::<String, _>("role").map_err(sqlx_error_to_core_error)?)?,
        level: str_to_level(&row.try_get::<String, _>("level").map_err(sqlx_error_to_core_error)?)?,
        connection_type: str_to_connection_type(
            &row.try_get::<String, _>("connection_type").map_err(sqlx_error_to_core_error)?,
        )?,
        last_seen: parse_datetime(&row.try_get::<String, _>("last_seen").map_err(sqlx_error_to_core_error)?)?,
        current_task_id: row.try_get("current_task_id").map_err(sqlx_error_to_core_error)?,
    })
}

fn row_to_epic(row: &sqlx::sqlite::SqliteRow) -> Result<Epic> {
    Ok(Epic {
        id: row.try_get("id").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        name: row.try_get("name").map_err(sqlx_error_to_core_error)?,
        description: row.try_get("description").map_err(sqlx_error_to_core_error)?,
        created_by_agent: row.try_get("created_by_agent").map_err(sqlx_error_to_core_error)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(sqlx_error_to_core_error)?)?,
    })
}

fn row_to_feature(row: &sqlx::sqlite::SqliteRow) -> Result<Feature> {
    Ok(Feature {
        id: row.try_get("id").map_err(sqlx_error_to_core_error)?,
        epic_id: row.try_get("epic_id").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        name: row.try_get("name").map_err(sqlx_error_to_core_error)?,
        description: row.try_get("description").map_err(sqlx_error_to_core_error)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(sqlx_error_to_core_error)?)?,
    })
}

fn row_to_task_comment(row: &sqlx::sqlite::SqliteRow) -> Result<TaskComment> {
    Ok(TaskComment {
        id: row.try_get("id").map_err(sqlx_error_to_core_error)?,
        task_id: row.try_get("task_id").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        author_agent_id: row.try_get("author_agent_id").map_err(sqlx_error_to_core_error)?,
        body: row.try_get("body").map_err(sqlx_error_to_core_error)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(sqlx_error_to_core_error)?)?,
    })
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    Ok(Document {
        id: row.try_get("id").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        author_agent_id: row.try_get("author_agent_id").map_err(sqlx_error_to_core_error)?,
        doc_type: str_to_doc_type(&row.try_get::<String, _>("doc_type").map_err(sqlx_error_to_core_error)?)?,
        title: row.try_get("title").map_err(sqlx_error_to_core_error)?,
        body: row.try_get("body").map_err(sqlx_error_to_core_error)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(sqlx_error_to_core_error)?)?,
        expires_at: row
            .try_get::<Option<String>, _>("expires_at")
            .map_err(sqlx_error_to_core_error)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
    })
}

fn row_to_mention(row: &sqlx::sqlite::SqliteRow) -> Result<Mention> {
    Ok(Mention {
        id: row.try_get("id").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        source_type: str_to_mention_source_type(
            &row.try_get::<String, _>("source_type").map_err(sqlx_error_to_core_error)?,
        )?,
        source_id: row.try_get("source_id").map_err(sqlx_error_to_core_error)?,
        mentioned_handle: row.try_get("mentioned_handle").map_err(sqlx_error_to_core_error)?,
        recipient_agent_id: row.try_get("recipient_agent_id").map_err(sqlx_error_to_core_error)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(sqlx_error_to_core_error)?)?,
        read_at: row
            .try_get::<Option<String>, _>("read_at")
            .map_err(sqlx_error_to_core_error)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
    })
}

fn row_to_service(row: &sqlx::sqlite::SqliteRow) -> Result<Service> {
    let meta_str: String = row.try_get("meta").map_err(sqlx_error_to_core_error)?;
    Ok(Service {
        name: row.try_get("name").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        owner_agent_id: row.try_get("owner_agent_id").map_err(sqlx_error_to_core_error)?,
        port: row.try_get::<i64, _>("port").map_err(sqlx_error_to_core_error)? as u16,
        status: str_to_service_status(&row.try_get::<String, _>("status").map_err(sqlx_error_to_core_error)?)?,
        ping_url: row.try_get("ping_url").map_err(sqlx_error_to_core_error)?,
        meta: serde_json::from_str(&meta_str).unwrap_or(serde_json::Value::Null),
        last_heartbeat: parse_datetime(&row.try_get::<String, _>("last_heartbeat").map_err(sqlx_error_to_core_error)?)?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at").map_err(sqlx_error_to_core_error)?)?,
    })
}

fn row_to_changelog_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ChangelogEntry> {
    let detail_str: String = row.try_get("detail").map_err(sqlx_error_to_core_error)?;
    Ok(ChangelogEntry {
        id: row.try_get("id").map_err(sqlx_error_to_core_error)?,
        project_id: row.try_get("project_id").map_err(sqlx_error_to_core_error)?,
        kind: str_to_change_kind(&row.try_get::<String, _>("kind").map_err(sqlx_error_to_core_error)?)?,
        ref_id: row.try_get("ref_id").map_err(sqlx_error_to_core_error)?,
        actor_agent_id: row.try_get("actor_agent_id").map_err(sqlx_error_to_core_error)?,
        created_at: MonotonicTimestamp {
            unix_millis: row.try_get("created_at_ms").map_err(sqlx_error_to_core_error)?,
            seq: row.try_get("created_at_seq").map_err(sqlx_error_to_core_error)?,
        },
        detail: serde_json::from_str(&detail_str).unwrap_or(serde_json::Value::Null),
    })
}
