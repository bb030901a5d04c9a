//! The HTTP Boundary (§4.7): an `axum` router exposing the `/api/v1` surface
//! in front of a `coordinator_core::Store`, generalizing the teacher's
//! `mcp-protocol` crate (handler ↔ serialization ↔ transport layering) with
//! the MCP/JSON-RPC transport swapped for plain REST.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod request_logger;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::{ApiConfig, AppState};
