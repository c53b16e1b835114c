//! In-memory store used by tests and by `test_helpers`.
//!
//! Mirrors the teacher's `neo4j::mock::MockGraphStore` shape: a handful of
//! `Mutex`-guarded `HashMap`s behind the same trait the real store
//! implements, so orchestrator code never has to know which one it's
//! holding.

use super::models::*;
use super::traits::*;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MockStore {
    projects: Mutex<HashMap<Uuid, Project>>,
    files: Mutex<HashMap<(Uuid, String), GeneratedFile>>,
    tasks: Mutex<HashMap<Uuid, Task>>,
    chat: Mutex<HashMap<Uuid, Vec<ChatMessage>>>,
    errors: Mutex<HashMap<Uuid, ErrorRecord>>,
    contexts: Mutex<HashMap<Uuid, AgentContext>>,
    task_order_seq: Mutex<i64>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MockStore {
    async fn create_project(&self, title: &str, description: &str) -> StoreResult<Project> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            status: ProjectStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.projects
            .lock()
            .unwrap()
            .insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Project> {
        self.projects
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProjectNotFound(id))
    }
}

#[async_trait]
impl FileStore for MockStore {
    async fn create_file(
        &self,
        project_id: Uuid,
        path: &str,
        content: &str,
    ) -> StoreResult<GeneratedFile> {
        let mut files = self.files.lock().unwrap();
        let key = (project_id, path.to_string());
        if let Some(existing) = files.get(&key) {
            if existing.is_active {
                return Err(StoreError::FileAlreadyExists {
                    project_id,
                    path: path.to_string(),
                });
            }
        }
        let now = Utc::now();
        let file = GeneratedFile {
            project_id,
            path: path.to_string(),
            content: content.to_string(),
            language: FileLanguage::from_path(path),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        files.insert(key, file.clone());
        Ok(file)
    }

    async fn update_file(
        &self,
        project_id: Uuid,
        path: &str,
        content: &str,
    ) -> StoreResult<GeneratedFile> {
        let mut files = self.files.lock().unwrap();
        let key = (project_id, path.to_string());
        let existing = files
            .get_mut(&key)
            .filter(|f| f.is_active)
            .ok_or_else(|| StoreError::FileNotFound {
                project_id,
                path: path.to_string(),
            })?;
        existing.content = content.to_string();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn read_file(&self, project_id: Uuid, path: &str) -> StoreResult<Option<GeneratedFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&(project_id, path.to_string()))
            .filter(|f| f.is_active)
            .cloned())
    }

    async fn list_active_files(&self, project_id: Uuid) -> StoreResult<Vec<GeneratedFile>> {
        let mut out: Vec<GeneratedFile> = self
            .files
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.project_id == project_id && f.is_active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn delete_file(&self, project_id: Uuid, path: &str) -> StoreResult<()> {
        let mut files = self.files.lock().unwrap();
        let key = (project_id, path.to_string());
        let existing = files
            .get_mut(&key)
            .ok_or_else(|| StoreError::FileNotFound {
                project_id,
                path: path.to_string(),
            })?;
        existing.is_active = false;
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn search_files(&self, project_id: Uuid, query: &str) -> StoreResult<Vec<GeneratedFile>> {
        let needle = query.to_lowercase();
        let mut out: Vec<GeneratedFile> = self
            .files
            .lock()
            .unwrap()
            .values()
            .filter(|f| {
                f.project_id == project_id
                    && f.is_active
                    && (f.path.to_lowercase().contains(&needle)
                        || f.content.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }
}

#[async_trait]
impl TaskStore for MockStore {
    async fn create_task(
        &self,
        project_id: Uuid,
        title: &str,
        description: &str,
        priority: TaskPriority,
    ) -> StoreResult<Task> {
        let now = Utc::now();
        let mut seq = self.task_order_seq.lock().unwrap();
        *seq += 1;
        let task = Task {
            id: Uuid::new_v4(),
            project_id,
            title: title.to_string(),
            description: description.to_string(),
            status: TaskStatus::Todo,
            priority,
            order_index: *seq,
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().unwrap().insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        status: Option<TaskStatus>,
        description: Option<&str>,
    ) -> StoreResult<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(&task_id)
            .ok_or(StoreError::TaskNotFound(task_id))?;
        if let Some(status) = status {
            task.status = status;
        }
        if let Some(description) = description {
            task.description = description.to_string();
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn list_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let mut out: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.order_index);
        Ok(out)
    }

    async fn delete_task(&self, task_id: Uuid) -> StoreResult<()> {
        self.tasks
            .lock()
            .unwrap()
            .remove(&task_id)
            .map(|_| ())
            .ok_or(StoreError::TaskNotFound(task_id))
    }

    async fn add_comment(&self, task_id: Uuid, comment: &str) -> StoreResult<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(&task_id)
            .ok_or(StoreError::TaskNotFound(task_id))?;
        let mut comments = task
            .metadata
            .get("comments")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        comments.push(serde_json::json!({
            "text": comment,
            "at": Utc::now().to_rfc3339(),
        }));
        task.metadata["comments"] = serde_json::Value::Array(comments);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }
}

#[async_trait]
impl ChatStore for MockStore {
    async fn append_message(
        &self,
        project_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> StoreResult<ChatMessage> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            project_id,
            role,
            content: content.to_string(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        };
        self.chat
            .lock()
            .unwrap()
            .entry(project_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn recent_messages(&self, project_id: Uuid, limit: usize) -> StoreResult<Vec<ChatMessage>> {
        let chat = self.chat.lock().unwrap();
        let all = chat.get(&project_id).cloned().unwrap_or_default();
        let start = all.len().saturating_sub(limit);
        Ok(all[start..].to_vec())
    }
}

#[async_trait]
impl ErrorRecordStore for MockStore {
    async fn insert(&self, record: ErrorRecord) -> StoreResult<ErrorRecord> {
        self.errors.lock().unwrap().insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_open(&self, project_id: Uuid) -> StoreResult<Vec<ErrorRecord>> {
        let mut out: Vec<ErrorRecord> = self
            .errors
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.project_id == project_id && e.status == ErrorStatus::Open)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.created_at);
        Ok(out)
    }

    async fn resolve(&self, id: Uuid, resolution_notes: Option<&str>) -> StoreResult<ErrorRecord> {
        let mut errors = self.errors.lock().unwrap();
        let record = errors
            .get_mut(&id)
            .ok_or(StoreError::ErrorRecordNotFound(id))?;
        record.status = ErrorStatus::Resolved;
        record.resolution_notes = resolution_notes.map(|s| s.to_string());
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn increment_attempts(&self, id: Uuid) -> StoreResult<ErrorRecord> {
        let mut errors = self.errors.lock().unwrap();
        let record = errors
            .get_mut(&id)
            .ok_or(StoreError::ErrorRecordNotFound(id))?;
        record.attempts += 1;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.errors
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::ErrorRecordNotFound(id))
    }

    async fn find_open_at(
        &self,
        project_id: Uuid,
        file: &str,
        line: Option<i64>,
    ) -> StoreResult<Option<ErrorRecord>> {
        Ok(self
            .errors
            .lock()
            .unwrap()
            .values()
            .find(|e| {
                e.project_id == project_id
                    && e.status == ErrorStatus::Open
                    && e.file.as_deref() == Some(file)
                    && e.line == line
            })
            .cloned())
    }
}

#[async_trait]
impl AgentContextStore for MockStore {
    async fn get(&self, project_id: Uuid) -> StoreResult<Option<AgentContext>> {
        Ok(self.contexts.lock().unwrap().get(&project_id).cloned())
    }

    async fn upsert(&self, context: AgentContext) -> StoreResult<AgentContext> {
        self.contexts
            .lock()
            .unwrap()
            .insert(context.project_id, context.clone());
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_file_then_duplicate_rejected() {
        let store = MockStore::new();
        let project = store.create_project("demo", "").await.unwrap();
        store
            .create_file(project.id, "app.py", "print(1)")
            .await
            .unwrap();
        let err = store
            .create_file(project.id, "app.py", "print(2)")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::FileAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn delete_then_recreate_file_succeeds() {
        let store = MockStore::new();
        let project = store.create_project("demo", "").await.unwrap();
        store
            .create_file(project.id, "app.py", "print(1)")
            .await
            .unwrap();
        store.delete_file(project.id, "app.py").await.unwrap();
        let file = store
            .create_file(project.id, "app.py", "print(2)")
            .await
            .unwrap();
        assert_eq!(file.content, "print(2)");
    }

    #[tokio::test]
    async fn recent_messages_returns_tail() {
        let store = MockStore::new();
        let project = store.create_project("demo", "").await.unwrap();
        for i in 0..5 {
            store
                .append_message(project.id, ChatRole::User, &format!("msg {i}"))
                .await
                .unwrap();
        }
        let recent = store.recent_messages(project.id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].content, "msg 4");
    }

    #[tokio::test]
    async fn find_open_at_matches_coordinates() {
        let store = MockStore::new();
        let project = store.create_project("demo", "").await.unwrap();
        let record = ErrorRecord {
            id: Uuid::new_v4(),
            project_id: project.id,
            kind: ErrorKind::Build,
            message: "SyntaxError".into(),
            stack: None,
            file: Some("app.py".into()),
            line: Some(12),
            code_snippet: None,
            context: serde_json::json!({}),
            status: ErrorStatus::Open,
            attempts: 0,
            resolution_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert(record).await.unwrap();
        let found = store
            .find_open_at(project.id, "app.py", Some(12))
            .await
            .unwrap();
        assert!(found.is_some());
    }
}
