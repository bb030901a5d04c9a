//! Random test data generators using the fake crate
//!
//! Provides realistic random data for fleet-coordination entities: agent
//! handles, task titles/descriptions, and whole task/agent rows.

use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use rand::Rng;

use coordinator_core::models::{Complexity, Difficulty, Level, Role};

/// Generate a realistic agent handle, safe to use as an `@mention` target.
pub fn generate_agent_handle() -> String {
    let pools = ["dev", "qa", "arch", "pm"];
    let pool = pools[rand::thread_rng().gen_range(0..pools.len())];
    let number: u32 = (1..999).fake();
    format!("{pool}-{number:03}")
}

/// Generate a realistic task title.
pub fn generate_task_title() -> String {
    Sentence(3..8).fake()
}

/// Generate a realistic task description.
pub fn generate_task_description() -> String {
    Paragraph(2..5).fake()
}

pub fn generate_random_role() -> Role {
    let roles = [
        Role::FrontendDev,
        Role::BackendDev,
        Role::Qa,
        Role::Architect,
        Role::ProjectPm,
        Role::GlobalPm,
        Role::UiAdmin,
    ];
    roles[rand::thread_rng().gen_range(0..roles.len())]
}

pub fn generate_random_level() -> Level {
    let levels = [Level::Junior, Level::Senior, Level::Principal];
    levels[rand::thread_rng().gen_range(0..levels.len())]
}

pub fn generate_random_difficulty() -> Difficulty {
    let difficulties = [Difficulty::Junior, Difficulty::Senior, Difficulty::Principal];
    difficulties[rand::thread_rng().gen_range(0..difficulties.len())]
}

pub fn generate_random_complexity() -> Complexity {
    if rand::thread_rng().gen_bool(0.5) {
        Complexity::Major
    } else {
        Complexity::Minor
    }
}

/// Configurable task generator, producing `NewTask`s against a fixed feature
/// and role pool.
pub struct TaskGenerator {
    pub feature_id: i64,
    pub role_pool: Vec<Role>,
    pub created_by: String,
}

impl Default for TaskGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGenerator {
    pub fn new() -> Self {
        Self {
            feature_id: 1,
            role_pool: vec![Role::BackendDev, Role::FrontendDev, Role::Qa],
            created_by: "pm".to_string(),
        }
    }

    pub fn generate(&self) -> coordinator_core::models::NewTask {
        let role = self.role_pool[rand::thread_rng().gen_range(0..self.role_pool.len())];
        coordinator_core::models::NewTask {
            feature_id: self.feature_id,
            title: generate_task_title(),
            description: generate_task_description(),
            target_role: role,
            difficulty: generate_random_difficulty(),
            complexity: generate_random_complexity(),
            branch: None,
            created_by: self.created_by.clone(),
        }
    }
}
