//! Trait boundary between the orchestrator core and the relational store.
//!
//! The core never talks to a database directly — every read/write goes
//! through one of these traits, the same split the teacher uses for
//! `neo4j::GraphStore` / `meilisearch::SearchStore`. Production code is
//! backed by [`crate::store::sqlite::SqliteStore`]; tests use
//! [`crate::store::mock::MockStore`].

use super::models::*;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file already exists: {project_id}/{path}")]
    FileAlreadyExists { project_id: Uuid, path: String },
    #[error("file not found: {project_id}/{path}")]
    FileNotFound { project_id: Uuid, path: String },
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),
    #[error("error record not found: {0}")]
    ErrorRecordNotFound(Uuid),
    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),
    #[error("backing store failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, title: &str, description: &str) -> StoreResult<Project>;
    async fn get_project(&self, id: Uuid) -> StoreResult<Project>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Rejects if `(project_id, path)` already has an active row.
    async fn create_file(
        &self,
        project_id: Uuid,
        path: &str,
        content: &str,
    ) -> StoreResult<GeneratedFile>;

    /// Requires an existing active row at `(project_id, path)`.
    async fn update_file(
        &self,
        project_id: Uuid,
        path: &str,
        content: &str,
    ) -> StoreResult<GeneratedFile>;

    async fn read_file(&self, project_id: Uuid, path: &str) -> StoreResult<Option<GeneratedFile>>;

    async fn list_active_files(&self, project_id: Uuid) -> StoreResult<Vec<GeneratedFile>>;

    /// Soft delete: flips `is_active` without removing the row.
    async fn delete_file(&self, project_id: Uuid, path: &str) -> StoreResult<()>;

    async fn search_files(&self, project_id: Uuid, query: &str) -> StoreResult<Vec<GeneratedFile>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(
        &self,
        project_id: Uuid,
        title: &str,
        description: &str,
        priority: TaskPriority,
    ) -> StoreResult<Task>;

    async fn update_task(
        &self,
        task_id: Uuid,
        status: Option<TaskStatus>,
        description: Option<&str>,
    ) -> StoreResult<Task>;

    async fn list_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn delete_task(&self, task_id: Uuid) -> StoreResult<()>;

    async fn add_comment(&self, task_id: Uuid, comment: &str) -> StoreResult<Task>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn append_message(
        &self,
        project_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> StoreResult<ChatMessage>;

    async fn recent_messages(&self, project_id: Uuid, limit: usize) -> StoreResult<Vec<ChatMessage>>;
}

#[async_trait]
pub trait ErrorRecordStore: Send + Sync {
    async fn insert(&self, record: ErrorRecord) -> StoreResult<ErrorRecord>;

    async fn list_open(&self, project_id: Uuid) -> StoreResult<Vec<ErrorRecord>>;

    async fn resolve(&self, id: Uuid, resolution_notes: Option<&str>) -> StoreResult<ErrorRecord>;

    async fn increment_attempts(&self, id: Uuid) -> StoreResult<ErrorRecord>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Find the still-open record at the same `(project_id, file, line)`
    /// coordinates, used by the healer to decide if a rebuild cleared it.
    async fn find_open_at(
        &self,
        project_id: Uuid,
        file: &str,
        line: Option<i64>,
    ) -> StoreResult<Option<ErrorRecord>>;
}

#[async_trait]
pub trait AgentContextStore: Send + Sync {
    async fn get(&self, project_id: Uuid) -> StoreResult<Option<AgentContext>>;

    /// Upsert by `project_id`. When `merge` is true the caller has already
    /// folded the update into the previous value (see
    /// `ContextData::merge`); when false this replaces it outright.
    async fn upsert(&self, context: AgentContext) -> StoreResult<AgentContext>;
}

/// Convenience aggregate so the orchestrator can hold one handle instead of
/// five. Concrete stores implement every trait and are registered once.
pub trait Store:
    ProjectStore + FileStore + TaskStore + ChatStore + ErrorRecordStore + AgentContextStore
{
}

impl<T> Store for T where
    T: ProjectStore + FileStore + TaskStore + ChatStore + ErrorRecordStore + AgentContextStore
{
}
