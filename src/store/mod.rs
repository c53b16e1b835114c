pub mod mock;
pub mod models;
pub mod sqlite;
pub mod traits;

pub use models::*;
pub use sqlite::SqliteStore;
pub use traits::{
    AgentContextStore, ChatStore, ErrorRecordStore, FileStore, ProjectStore, Store, StoreError,
    StoreResult, TaskStore,
};
