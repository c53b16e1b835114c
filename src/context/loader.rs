//! Assembles a [`Snapshot`] from the store traits and applies the memory
//! update rule on the way back out.
//!
//! Grounded on `ai_context_loader.py`'s `AIContextLoader.load_context` /
//! `update_memory`, and on the teacher's pattern of a builder struct held
//! over `Arc<dyn ...Store>` handles.

use super::snapshot::{ContextLimits, FilesByFolder, ProjectInfo, Snapshot, TasksSection};
use crate::store::{AgentContext, ContextData, StoreResult};
use crate::store::{AgentContextStore, ChatStore, ErrorRecordStore, FileStore, ProjectStore, TaskStore};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct ContextLoader {
    projects: Arc<dyn ProjectStore>,
    files: Arc<dyn FileStore>,
    tasks: Arc<dyn TaskStore>,
    chat: Arc<dyn ChatStore>,
    errors: Arc<dyn ErrorRecordStore>,
    contexts: Arc<dyn AgentContextStore>,
}

impl ContextLoader {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        files: Arc<dyn FileStore>,
        tasks: Arc<dyn TaskStore>,
        chat: Arc<dyn ChatStore>,
        errors: Arc<dyn ErrorRecordStore>,
        contexts: Arc<dyn AgentContextStore>,
    ) -> Self {
        Self {
            projects,
            files,
            tasks,
            chat,
            errors,
            contexts,
        }
    }

    pub async fn load(&self, project_id: Uuid, limits: ContextLimits) -> StoreResult<Snapshot> {
        let project = self.projects.get_project(project_id).await?;
        let tasks = self.tasks.list_tasks(project_id).await?;
        let errors = self.errors.list_open(project_id).await?;
        let active_files = self.files.list_active_files(project_id).await?;
        let stored_context = self.contexts.get(project_id).await?;
        let chat_history = self
            .chat
            .recent_messages(project_id, limits.max_chat_messages)
            .await?;

        let paths: Vec<String> = active_files.iter().map(|f| f.path.clone()).collect();
        let file_contents = active_files
            .iter()
            .take(limits.max_files)
            .map(|f| (f.path.clone(), f.content.clone()))
            .collect();

        let mut snapshot = Snapshot {
            project_info: ProjectInfo::from(&project),
            tasks: TasksSection::from_tasks(tasks),
            errors,
            files: FilesByFolder::from_paths(paths),
            file_contents,
            stored_context,
            chat_history,
        };

        snapshot.optimise(limits.max_chars);
        Ok(snapshot)
    }

    /// Apply the §4.7 merge rule and upsert by `project_id`. When `merge`
    /// is false the previous `context_data` is discarded outright.
    pub async fn update_memory(
        &self,
        project_id: Uuid,
        update: ContextData,
        merge: bool,
    ) -> StoreResult<AgentContext> {
        let context_data = if merge {
            match self.contexts.get(project_id).await? {
                Some(existing) => {
                    let mut merged = existing.context_data;
                    merged.merge(update);
                    merged
                }
                None => update,
            }
        } else {
            update
        };

        let session_id = self
            .contexts
            .get(project_id)
            .await?
            .and_then(|c| c.session_id);

        self.contexts
            .upsert(AgentContext {
                project_id,
                session_id,
                context_data,
                updated_at: Utc::now(),
            })
            .await
    }

    pub async fn reset_memory(&self, project_id: Uuid) -> StoreResult<AgentContext> {
        self.contexts
            .upsert(AgentContext {
                project_id,
                session_id: None,
                context_data: ContextData::default(),
                updated_at: Utc::now(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;
    use std::collections::HashSet;

    fn loader(store: Arc<MockStore>) -> ContextLoader {
        ContextLoader::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
        )
    }

    #[tokio::test]
    async fn load_renders_fresh_project_with_no_activity() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let loader = loader(store);

        let snapshot = loader.load(project.id, ContextLimits::default()).await.unwrap();
        assert_eq!(snapshot.project_info.name, "Demo");
        assert!(snapshot.tasks.active.is_empty());
        assert!(snapshot.errors.is_empty());
    }

    #[tokio::test]
    async fn update_memory_merge_unions_files_generated() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let loader = loader(store);

        let mut first = ContextData::default();
        first.files_generated = HashSet::from(["a.tsx".to_string()]);
        loader.update_memory(project.id, first, true).await.unwrap();

        let mut second = ContextData::default();
        second.files_generated = HashSet::from(["b.tsx".to_string()]);
        let result = loader.update_memory(project.id, second, true).await.unwrap();

        assert_eq!(result.context_data.files_generated.len(), 2);
    }

    #[tokio::test]
    async fn update_memory_replace_discards_previous_state() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let loader = loader(store);

        let mut first = ContextData::default();
        first.current_phase = Some("planning".to_string());
        loader.update_memory(project.id, first, true).await.unwrap();

        let mut second = ContextData::default();
        second.current_phase = Some("generating".to_string());
        let result = loader.update_memory(project.id, second, false).await.unwrap();

        assert_eq!(result.context_data.current_phase.as_deref(), Some("generating"));
    }

    #[tokio::test]
    async fn update_memory_upserts_without_duplicating_row() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let loader = loader(store.clone());

        loader
            .update_memory(project.id, ContextData::default(), true)
            .await
            .unwrap();
        loader
            .update_memory(project.id, ContextData::default(), true)
            .await
            .unwrap();

        assert!(store.get(project.id).await.unwrap().is_some());
    }
}
