//! Builder pattern implementations for easy test data construction
//!
//! Provides fluent builders for:
//! - NewTask / NewProject / NewAgent / NewDocument / NewService and friends
//! - TaskFilter construction for query testing

use chrono::Utc;
use coordinator_core::models::*;

pub struct NewProjectBuilder {
    project: NewProject,
}

impl Default for NewProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewProjectBuilder {
    pub fn new() -> Self {
        Self {
            project: NewProject {
                name: "test-project".to_string(),
                shared_path: "/shared".to_string(),
                instructions_path: "/instructions".to_string(),
                docs_path: "/docs".to_string(),
                guidelines_path: None,
                repo_url: None,
                repo_main_branch: None,
                repo_clone_path: None,
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.project.name = name.into();
        self
    }

    pub fn build(self) -> NewProject {
        self.project
    }
}

pub struct NewAgentBuilder {
    agent: NewAgent,
}

impl Default for NewAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewAgentBuilder {
    pub fn new() -> Self {
        Self {
            agent: NewAgent {
                agent_id: "test-agent".to_string(),
                project_id: 1,
                role: Role::BackendDev,
                level: Level::Senior,
                connection_type: ConnectionType::Mcp,
            },
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent.agent_id = agent_id.into();
        self
    }

    pub fn with_project_id(mut self, project_id: i64) -> Self {
        self.agent.project_id = project_id;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.agent.role = role;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.agent.level = level;
        self
    }

    pub fn build(self) -> NewAgent {
        self.agent
    }
}

/// Builder for constructing NewTask instances in tests
pub struct NewTaskBuilder {
    task: NewTask,
}

impl Default for NewTaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewTaskBuilder {
    pub fn new() -> Self {
        Self {
            task: NewTask {
                feature_id: 1,
                title: "Test Task".to_string(),
                description: "A test task".to_string(),
                target_role: Role::BackendDev,
                difficulty: Difficulty::Senior,
                complexity: Complexity::Minor,
                branch: None,
                created_by: "pm".to_string(),
            },
        }
    }

    pub fn with_feature_id(mut self, feature_id: i64) -> Self {
        self.task.feature_id = feature_id;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn with_target_role(mut self, role: Role) -> Self {
        self.task.target_role = role;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.task.difficulty = difficulty;
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.task.complexity = complexity;
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.task.created_by = created_by.into();
        self
    }

    pub fn build(self) -> NewTask {
        self.task
    }
}

/// Builder for constructing TaskFilter instances in tests
pub struct TaskFilterBuilder {
    filter: TaskFilter,
}

impl Default for TaskFilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskFilterBuilder {
    pub fn new() -> Self {
        Self {
            filter: TaskFilter::default(),
        }
    }

    pub fn with_project_id(mut self, project_id: i64) -> Self {
        self.filter.project_id = Some(project_id);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.filter.status = Some(status);
        self
    }

    pub fn with_target_role(mut self, role: Role) -> Self {
        self.filter.target_role = Some(role);
        self
    }

    pub fn with_locked_by(mut self, agent_id: impl Into<String>) -> Self {
        self.filter.locked_by_agent_id = Some(agent_id.into());
        self
    }

    pub fn build(self) -> TaskFilter {
        self.filter
    }
}

pub struct NewDocumentBuilder {
    document: NewDocument,
}

impl Default for NewDocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewDocumentBuilder {
    pub fn new() -> Self {
        Self {
            document: NewDocument {
                project_id: 1,
                author_agent_id: "test-agent".to_string(),
                doc_type: DocType::Handoff,
                title: "Test Document".to_string(),
                body: "Body text".to_string(),
                expires_at: None,
            },
        }
    }

    pub fn with_project_id(mut self, project_id: i64) -> Self {
        self.document.project_id = project_id;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.document.author_agent_id = author.into();
        self
    }

    pub fn with_doc_type(mut self, doc_type: DocType) -> Self {
        self.document.doc_type = doc_type;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.document.body = body.into();
        self
    }

    pub fn with_expires_at(mut self, expires_at: chrono::DateTime<Utc>) -> Self {
        self.document.expires_at = Some(expires_at);
        self
    }

    pub fn build(self) -> NewDocument {
        self.document
    }
}

pub struct NewServiceBuilder {
    service: NewService,
}

impl Default for NewServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewServiceBuilder {
    pub fn new() -> Self {
        Self {
            service: NewService {
                project_id: 1,
                name: "web".to_string(),
                owner_agent_id: "test-agent".to_string(),
                port: 8080,
                ping_url: None,
                meta: serde_json::json!({}),
            },
        }
    }

    pub fn with_project_id(mut self, project_id: i64) -> Self {
        self.service.project_id = project_id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.service.name = name.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.service.port = port;
        self
    }

    pub fn build(self) -> NewService {
        self.service
    }
}
