pub mod loader;
pub mod snapshot;

pub use loader::ContextLoader;
pub use snapshot::{ContextLimits, FilesByFolder, ProjectInfo, Snapshot, TasksSection};
