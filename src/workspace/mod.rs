pub mod layout;
pub mod materializer;

pub use layout::Workspace;
pub use materializer::{ensure, spawn_venv_creation, venv_ready, WorkspaceError};
