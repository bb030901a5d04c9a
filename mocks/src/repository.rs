//! In-memory [`Store`] implementation.
//!
//! Everything lives behind one `parking_lot::Mutex<Inner>`, so there is no
//! SQLite-style retry loop: holding the mutex across a whole operation is
//! already the atomicity the sqlite backend gets from `BEGIN IMMEDIATE`.
//! Behavior (ordering, error taxonomy, changelog semantics) mirrors
//! `database::SqliteStore` so `core`'s tests and `integration-tests`' HTTP
//! scenarios can run against either backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use coordinator_core::{
    dispatcher,
    error::{CoreError, Result},
    models::*,
    repository::Store,
    time::{MonotonicClock, MonotonicTimestamp},
    validation::{require_non_empty, validate_service_name},
};

#[derive(Default)]
struct Inner {
    projects: HashMap<i64, Project>,
    agents: HashMap<(i64, String), Agent>,
    epics: HashMap<i64, Epic>,
    features: HashMap<i64, Feature>,
    tasks: HashMap<i64, Task>,
    comments: HashMap<i64, TaskComment>,
    documents: HashMap<i64, Document>,
    mentions: HashMap<i64, Mention>,
    services: HashMap<(i64, String), Service>,
    changelog: Vec<ChangelogEntry>,
}

/// Thread-safe in-memory [`Store`]. Intended for unit/contract tests; not
/// persistent and not meant to be shared across processes.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    next_id: AtomicI64,
    clock: MonotonicClock,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_id: AtomicI64::new(1),
            clock: MonotonicClock::new(),
        }
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn push_changelog(
        &self,
        inner: &mut Inner,
        project_id: i64,
        kind: ChangeKind,
        ref_id: &str,
        actor_agent_id: Option<&str>,
        detail: serde_json::Value,
    ) -> ChangelogEntry {
        let entry = ChangelogEntry {
            id: self.alloc_id(),
            project_id,
            kind,
            ref_id: ref_id.to_string(),
            actor_agent_id: actor_agent_id.map(str::to_string),
            created_at: self.clock.now(),
            detail,
        };
        inner.changelog.push(entry.clone());
        entry
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_project(&self, project: NewProject) -> Result<Project> {
        require_non_empty("name", &project.name)?;
        let mut inner = self.inner.lock();
        if inner.projects.values().any(|p| p.name == project.name && p.deleted_at.is_none()) {
            return Err(CoreError::Conflict(format!(
                "project '{}' already exists",
                project.name
            )));
        }
        let id = self.alloc_id();
        let row = Project {
            id,
            name: project.name,
            shared_path: project.shared_path,
            instructions_path: project.instructions_path,
            docs_path: project.docs_path,
            guidelines_path: project.guidelines_path,
            repo_url: project.repo_url,
            repo_main_branch: project.repo_main_branch,
            repo_clone_path: project.repo_clone_path,
            created_at: Utc::now(),
            deleted_at: None,
        };
        inner.projects.insert(id, row.clone());
        Ok(row)
    }

    async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.inner.lock().projects.get(&id).cloned())
    }

    async fn get_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        Ok(self
            .inner
            .lock()
            .projects
            .values()
            .find(|p| p.name == name && p.deleted_at.is_none())
            .cloned())
    }

    async fn soft_delete_project(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock();
        let project = inner
            .projects
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found_entity("project", id))?;
        project.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn upsert_agent(&self, agent: NewAgent) -> Result<Agent> {
        let mut inner = self.inner.lock();
        let key = (agent.project_id, agent.agent_id.clone());
        let now = Utc::now();
        let is_new = !inner.agents.contains_key(&key);
        let row = inner.agents.entry(key.clone()).or_insert_with(|| Agent {
            agent_id: agent.agent_id.clone(),
            project_id: agent.project_id,
            role: agent.role,
            level: agent.level,
            connection_type: agent.connection_type,
            last_seen: now,
            current_task_id: None,
        });
        row.role = agent.role;
        row.level = agent.level;
        row.connection_type = agent.connection_type;
        row.last_seen = now;
        let row = row.clone();

        if is_new {
            self.push_changelog(
                &mut inner,
                agent.project_id,
                ChangeKind::AgentRegistered,
                &agent.agent_id,
                Some(&agent.agent_id),
                serde_json::json!({ "role": row.role, "level": row.level }),
            );
        }
        Ok(row)
    }

    async fn get_agent(&self, project_id: i64, agent_id: &str) -> Result<Option<Agent>> {
        Ok(self
            .inner
            .lock()
            .agents
            .get(&(project_id, agent_id.to_string()))
            .cloned())
    }

    async fn list_agents(&self, project_id: i64) -> Result<Vec<Agent>> {
        Ok(self
            .inner
            .lock()
            .agents
            .values()
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete_agent(&self, project_id: i64, agent_id: &str) -> Result<()> {
        self.inner.lock().agents.remove(&(project_id, agent_id.to_string()));
        Ok(())
    }

    async fn touch_agent_last_seen(&self, project_id: i64, agent_id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let agent = inner
            .agents
            .get_mut(&(project_id, agent_id.to_string()))
            .ok_or_else(|| CoreError::not_found_entity("agent", agent_id))?;
        agent.last_seen = Utc::now();
        Ok(())
    }

    async fn create_epic(&self, epic: NewEpic) -> Result<Epic> {
        require_non_empty("name", &epic.name)?;
        let mut inner = self.inner.lock();
        let id = self.alloc_id();
        let row = Epic {
            id,
            project_id: epic.project_id,
            name: epic.name,
            description: epic.description,
            created_by_agent: epic.created_by_agent,
            created_at: Utc::now(),
        };
        inner.epics.insert(id, row.clone());
        Ok(row)
    }

    async fn list_epics(&self, project_id: i64) -> Result<Vec<Epic>> {
        Ok(self
            .inner
            .lock()
            .epics
            .values()
            .filter(|e| e.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_feature(&self, feature: NewFeature) -> Result<Feature> {
        require_non_empty("name", &feature.name)?;
        let mut inner = self.inner.lock();
        let epic = inner
            .epics
            .get(&feature.epic_id)
            .ok_or_else(|| CoreError::not_found_entity("epic", feature.epic_id))?;
        let project_id = epic.project_id;
        let id = self.alloc_id();
        let row = Feature {
            id,
            epic_id: feature.epic_id,
            project_id,
            name: feature.name,
            description: feature.description,
            created_at: Utc::now(),
        };
        inner.features.insert(id, row.clone());
        Ok(row)
    }

    async fn list_features(&self, project_id: i64, epic_id: Option<i64>) -> Result<Vec<Feature>> {
        Ok(self
            .inner
            .lock()
            .features
            .values()
            .filter(|f| f.project_id == project_id && epic_id.map_or(true, |e| f.epic_id == e))
            .cloned()
            .collect())
    }

    async fn get_feature(&self, id: i64) -> Result<Option<Feature>> {
        Ok(self.inner.lock().features.get(&id).cloned())
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        require_non_empty("title", &task.title)?;
        let mut inner = self.inner.lock();
        let feature = inner
            .features
            .get(&task.feature_id)
            .ok_or_else(|| CoreError::not_found_entity("feature", task.feature_id))?;
        let project_id = feature.project_id;
        let id = self.alloc_id();
        let now = Utc::now();
        let row = Task {
            id,
            feature_id: task.feature_id,
            project_id,
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
        };
        inner.tasks.insert(id, row.clone());
        self.push_changelog(
            &mut inner,
            project_id,
            ChangeKind::TaskCreated,
            &id.to_string(),
            Some(&row.created_by),
            serde_json::json!({}),
        );
        Ok(row)
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>> {
        Ok(self.inner.lock().tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let inner = self.inner.lock();
        let mut rows: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| filter.project_id.map_or(true, |p| t.project_id == p))
            .filter(|t| filter.feature_id.map_or(true, |f| t.feature_id == f))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.target_role.map_or(true, |r| t.target_role == r))
            .filter(|t| {
                filter
                    .locked_by_agent_id
                    .as_ref()
                    .map_or(true, |agent| t.locked_by_agent_id.as_deref() == Some(agent.as_str()))
            })
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.id);
        if let Some(offset) = filter.offset {
            rows = rows.into_iter().skip(offset as usize).collect();
        }
        if let Some(limit) = filter.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn patch_task(&self, id: i64, patch: TaskPatch) -> Result<Task> {
        let mut inner = self.inner.lock();
        let task = inner
            .tasks
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found_entity("task", id))?;
        if let Some(branch) = patch.branch {
            task.branch = Some(branch);
        }
        if let Some(assigned_to) = patch.assigned_to {
            task.assigned_to = Some(assigned_to);
        }
        if let Some(notes) = patch.notes {
            task.notes = Some(notes);
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn dispatch_next(
        &self,
        project_id: i64,
        role: Role,
        level: Level,
        agent_id: &str,
    ) -> Result<Option<Task>> {
        let mut inner = self.inner.lock();

        let agent_key = (project_id, agent_id.to_string());
        let agent = inner
            .agents
            .get(&agent_key)
            .ok_or_else(|| CoreError::not_found_entity("agent", agent_id))?;
        if agent.current_task_id.is_some() {
            return Err(CoreError::already_holds_task(agent_id));
        }

        let candidates: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.project_id == project_id && dispatcher::is_eligible(t, role, level))
            .cloned()
            .collect();
        let ordered = dispatcher::order_candidates(candidates);
        let Some(chosen) = ordered.into_iter().next() else {
            return Ok(None);
        };

        let now = Utc::now();
        {
            let task = inner.tasks.get_mut(&chosen.id).expect("candidate exists");
            task.locked_by_agent_id = Some(agent_id.to_string());
            task.locked_at = Some(now);
            task.updated_at = now;
        }
        inner.agents.get_mut(&agent_key).expect("agent exists").current_task_id = Some(chosen.id);

        self.push_changelog(
            &mut inner,
            project_id,
            ChangeKind::TaskLocked,
            &chosen.id.to_string(),
            Some(agent_id),
            serde_json::json!({}),
        );

        Ok(inner.tasks.get(&chosen.id).cloned())
    }

    async fn lock_task(&self, task_id: i64, agent_id: &str) -> Result<Task> {
        let mut inner = self.inner.lock();
        let project_id = {
            let task = inner
                .tasks
                .get(&task_id)
                .ok_or_else(|| CoreError::not_found_entity("task", task_id))?;
            if task.locked_by_agent_id.is_some() {
                return Err(CoreError::Conflict(format!("task {task_id} is already locked")));
            }
            task.project_id
        };
        let agent_key = (project_id, agent_id.to_string());
        let agent = inner
            .agents
            .get(&agent_key)
            .ok_or_else(|| CoreError::not_found_entity("agent", agent_id))?;
        if agent.current_task_id.is_some() {
            return Err(CoreError::already_holds_task(agent_id));
        }

        let now = Utc::now();
        {
            let task = inner.tasks.get_mut(&task_id).expect("task exists");
            task.locked_by_agent_id = Some(agent_id.to_string());
            task.locked_at = Some(now);
            task.updated_at = now;
        }
        inner.agents.get_mut(&agent_key).expect("agent exists").current_task_id = Some(task_id);

        self.push_changelog(
            &mut inner,
            project_id,
            ChangeKind::TaskLocked,
            &task_id.to_string(),
            Some(agent_id),
            serde_json::json!({}),
        );
        Ok(inner.tasks.get(&task_id).cloned().expect("task exists"))
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
        let mut inner = self.inner.lock();
        let (project_id, old_status) = {
            let task = inner
                .tasks
                .get(&task_id)
                .ok_or_else(|| CoreError::not_found_entity("task", task_id))?;
            (task.project_id, task.status)
        };

        if acquires_lock {
            // A task can already be locked here while its status is still
            // the `from` state (dispatch_next locks without advancing
            // status): reject the write instead of overwriting the locker.
            let existing_locker = inner.tasks.get(&task_id).unwrap().locked_by_agent_id.clone();
            if existing_locker.is_some_and(|locker| locker != actor_agent_id) {
                return Err(CoreError::Conflict(
                    "task is locked by a different agent".to_string(),
                ));
            }

            let agent_key = (project_id, actor_agent_id.to_string());
            let agent = inner
                .agents
                .get(&agent_key)
                .ok_or_else(|| CoreError::not_found_entity("agent", actor_agent_id))?;
            if agent.current_task_id.is_some_and(|id| id != task_id) {
                return Err(CoreError::already_holds_task(actor_agent_id));
            }
            inner.agents.get_mut(&agent_key).expect("agent exists").current_task_id = Some(task_id);
        } else if releases_lock {
            let locker = inner.tasks.get(&task_id).unwrap().locked_by_agent_id.clone();
            if let Some(locker) = locker {
                let key = (project_id, locker);
                if let Some(agent) = inner.agents.get_mut(&key) {
                    if agent.current_task_id == Some(task_id) {
                        agent.current_task_id = None;
                    }
                }
            }
            self.push_changelog(
                &mut inner,
                project_id,
                ChangeKind::TaskUnlocked,
                &task_id.to_string(),
                Some(actor_agent_id),
                serde_json::json!({}),
            );
        }

        let now = Utc::now();
        {
            let task = inner.tasks.get_mut(&task_id).expect("task exists");
            task.status = new_status;
            if acquires_lock {
                task.locked_by_agent_id = Some(actor_agent_id.to_string());
                task.locked_at = Some(now);
            } else if releases_lock {
                task.locked_by_agent_id = None;
                task.locked_at = None;
            }
            if let Some(note) = &note {
                task.notes = Some(note.clone());
            }
            task.updated_at = now;
        }

        self.push_changelog(
            &mut inner,
            project_id,
            ChangeKind::TaskStatus,
            &task_id.to_string(),
            Some(actor_agent_id),
            serde_json::json!({
                "old": old_status.to_string(),
                "new": new_status.to_string(),
                "note": note,
                "override": is_override,
            }),
        );

        Ok(inner.tasks.get(&task_id).cloned().expect("task exists"))
    }

    async fn create_task_comment(&self, comment: NewTaskComment) -> Result<TaskComment> {
        require_non_empty("body", &comment.body)?;
        let mut inner = self.inner.lock();
        let project_id = inner
            .tasks
            .get(&comment.task_id)
            .ok_or_else(|| CoreError::not_found_entity("task", comment.task_id))?
            .project_id;
        let id = self.alloc_id();
        let row = TaskComment {
            id,
            task_id: comment.task_id,
            project_id,
            author_agent_id: comment.author_agent_id,
            body: comment.body,
            created_at: Utc::now(),
        };
        inner.comments.insert(id, row.clone());
        Ok(row)
    }

    async fn list_task_comments(&self, task_id: i64) -> Result<Vec<TaskComment>> {
        let inner = self.inner.lock();
        let mut rows: Vec<TaskComment> = inner
            .comments
            .values()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.created_at);
        Ok(rows)
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        require_non_empty("title", &document.title)?;
        let mut inner = self.inner.lock();
        let id = self.alloc_id();
        let row = Document {
            id,
            project_id: document.project_id,
            author_agent_id: document.author_agent_id,
            doc_type: document.doc_type,
            title: document.title,
            body: document.body,
            created_at: Utc::now(),
            expires_at: document.expires_at,
        };
        inner.documents.insert(id, row.clone());
        self.push_changelog(
            &mut inner,
            row.project_id,
            ChangeKind::DocumentCreated,
            &id.to_string(),
            Some(&row.author_agent_id),
            serde_json::json!({}),
        );
        Ok(row)
    }

    async fn list_documents(&self, project_id: i64, doc_type: Option<DocType>) -> Result<Vec<Document>> {
        Ok(self
            .inner
            .lock()
            .documents
            .values()
            .filter(|d| d.project_id == project_id)
            .filter(|d| doc_type.map_or(true, |t| d.doc_type == t))
            .cloned()
            .collect())
    }

    async fn create_mentions(
        &self,
        project_id: i64,
        source_type: MentionSourceType,
        source_id: i64,
        handles: &[String],
    ) -> Result<Vec<Mention>> {
        let mut inner = self.inner.lock();
        let mut created = Vec::new();
        for handle in handles {
            let recipient = inner
                .agents
                .values()
                .find(|a| a.project_id == project_id && a.agent_id.eq_ignore_ascii_case(handle))
                .map(|a| a.agent_id.clone());

            let id = self.alloc_id();
            let row = Mention {
                id,
                project_id,
                source_type,
                source_id,
                mentioned_handle: handle.clone(),
                recipient_agent_id: recipient,
                created_at: Utc::now(),
                read_at: None,
            };
            inner.mentions.insert(id, row.clone());
            self.push_changelog(
                &mut inner,
                project_id,
                ChangeKind::MentionCreated,
                &id.to_string(),
                None,
                serde_json::json!({ "handle": handle }),
            );
            created.push(row);
        }
        Ok(created)
    }

    async fn list_mentions(&self, agent_id: &str, unread_only: bool) -> Result<Vec<Mention>> {
        let inner = self.inner.lock();
        let mut rows: Vec<Mention> = inner
            .mentions
            .values()
            .filter(|m| m.recipient_agent_id.as_deref() == Some(agent_id))
            .filter(|m| !unread_only || m.read_at.is_none())
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn mark_mention_read(&self, mention_id: i64) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(mention) = inner.mentions.get_mut(&mention_id) {
            if mention.read_at.is_none() {
                mention.read_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn register_service(&self, service: NewService) -> Result<Service> {
        validate_service_name(&service.name)?;
        let mut inner = self.inner.lock();
        let key = (service.project_id, service.name.clone());
        let now = Utc::now();
        let created_at = inner.services.get(&key).map_or(now, |s| s.created_at);
        let row = Service {
            name: service.name.clone(),
            project_id: service.project_id,
            owner_agent_id: service.owner_agent_id,
            port: service.port,
            status: ServiceStatus::Starting,
            ping_url: service.ping_url,
            meta: service.meta,
            last_heartbeat: now,
            created_at,
        };
        inner.services.insert(key, row.clone());
        self.push_changelog(
            &mut inner,
            service.project_id,
            ChangeKind::ServiceRegistered,
            &row.name,
            Some(&row.owner_agent_id),
            serde_json::json!({ "port": row.port }),
        );
        Ok(row)
    }

    async fn heartbeat_service(&self, project_id: i64, name: &str) -> Result<Service> {
        let mut inner = self.inner.lock();
        let key = (project_id, name.to_string());
        let before_status = inner
            .services
            .get(&key)
            .ok_or_else(|| CoreError::not_found_entity("service", name))?
            .status;

        let service = inner.services.get_mut(&key).expect("checked above");
        service.last_heartbeat = Utc::now();
        service.status = ServiceStatus::Up;
        let row = service.clone();

        // §8 property 5 / idempotent heartbeat: only log a status change when
        // the status actually flips.
        if before_status != ServiceStatus::Up {
            self.push_changelog(
                &mut inner,
                project_id,
                ChangeKind::ServiceStatus,
                name,
                None,
                serde_json::json!({ "old": before_status, "new": ServiceStatus::Up }),
            );
        }
        Ok(row)
    }

    async fn delete_service(&self, project_id: i64, name: &str) -> Result<()> {
        self.inner.lock().services.remove(&(project_id, name.to_string()));
        Ok(())
    }

    async fn list_services(&self, project_id: i64) -> Result<Vec<Service>> {
        Ok(self
            .inner
            .lock()
            .services
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn set_service_status(
        &self,
        project_id: i64,
        name: &str,
        status: ServiceStatus,
    ) -> Result<Option<Service>> {
        let mut inner = self.inner.lock();
        let key = (project_id, name.to_string());
        let Some(service) = inner.services.get_mut(&key) else {
            return Ok(None);
        };
        service.status = status;
        let row = service.clone();
        self.push_changelog(
            &mut inner,
            project_id,
            ChangeKind::ServiceStatus,
            name,
            None,
            serde_json::json!({ "status": status }),
        );
        Ok(Some(row))
    }

    async fn insert_changelog(
        &self,
        project_id: i64,
        kind: ChangeKind,
        ref_id: &str,
        actor_agent_id: Option<&str>,
        detail: serde_json::Value,
    ) -> Result<ChangelogEntry> {
        let mut inner = self.inner.lock();
        Ok(self.push_changelog(&mut inner, project_id, kind, ref_id, actor_agent_id, detail))
    }

    async fn changelog_since(&self, project_id: i64, since: MonotonicTimestamp) -> Result<Vec<ChangelogEntry>> {
        let inner = self.inner.lock();
        let mut rows: Vec<ChangelogEntry> = inner
            .changelog
            .iter()
            .filter(|e| e.project_id == project_id && e.created_at > since)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.created_at);
        Ok(rows)
    }

    async fn tasks_by_ids(&self, ids: &[i64]) -> Result<Vec<Task>> {
        let inner = self.inner.lock();
        Ok(ids.iter().filter_map(|id| inner.tasks.get(id).cloned()).collect())
    }

    async fn documents_by_ids(&self, ids: &[i64]) -> Result<Vec<Document>> {
        let inner = self.inner.lock();
        Ok(ids.iter().filter_map(|id| inner.documents.get(id).cloned()).collect())
    }

    async fn mentions_by_ids(&self, ids: &[i64]) -> Result<Vec<Mention>> {
        let inner = self.inner.lock();
        Ok(ids.iter().filter_map(|id| inner.mentions.get(id).cloned()).collect())
    }

    async fn agents_by_ids(&self, project_id: i64, agent_ids: &[String]) -> Result<Vec<Agent>> {
        let inner = self.inner.lock();
        Ok(agent_ids
            .iter()
            .filter_map(|id| inner.agents.get(&(project_id, id.clone())).cloned())
            .collect())
    }

    async fn services_by_names(&self, project_id: i64, names: &[String]) -> Result<Vec<Service>> {
        let inner = self.inner.lock();
        Ok(names
            .iter()
            .filter_map(|name| inner.services.get(&(project_id, name.clone())).cloned())
            .collect())
    }

    fn monotonic_now(&self) -> MonotonicTimestamp {
        self.clock.now()
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
