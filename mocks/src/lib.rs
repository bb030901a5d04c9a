//! Mock implementations and test utilities for the agent fleet coordination
//! server.
//!
//! This crate provides:
//! - [`repository::InMemoryStore`], a full in-memory [`coordinator_core::Store`]
//! - builders for every entity's `New*` constructor
//! - fixtures that seed a populated project in one call
//! - realistic data generators built on `fake`/`rand`
//! - custom assertion helpers
//! - contract tests any `Store` implementation should pass

pub mod assertions;
pub mod builders;
pub mod contracts;
pub mod fixtures;
pub mod generators;
pub mod repository;

pub use assertions::*;
pub use builders::*;
pub use contracts::*;
pub use fixtures::*;
pub use generators::*;
pub use repository::InMemoryStore;
