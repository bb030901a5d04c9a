//! SQLite persistence backend for the agent fleet coordination server.
//!
//! Implements [`coordinator_core::Store`] against a SQLite database, using
//! `BEGIN IMMEDIATE` transactions and conditional `UPDATE ... WHERE` checks
//! in place of row-level locking for the dispatcher's atomic lock protocol
//! (§4.2.2) and the lifecycle engine's lock acquire/release (§4.3).
//!
//! # Usage
//!
//! ```rust,no_run
//! use coordinator_core::Store;
//! use database::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::new(":memory:").await?;
//!     store.migrate().await?;
//!     store.health_check().await?;
//!     Ok(())
//! }
//! ```

mod common;
mod sqlite;

pub use sqlite::SqliteStore;

pub use coordinator_core::{
    error::{CoreError, Result},
    models, Store,
};
