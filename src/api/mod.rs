//! HTTP API for the orchestrator: chat streaming, file/task/error
//! mutation, preview build + static serving, and project backend lifecycle.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
