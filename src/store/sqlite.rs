//! Embedded, local-first store backed by `rusqlite`.
//!
//! WAL mode, a busy timeout and foreign keys on by default, the same
//! connection posture as the teacher's `core::db::db_connect`. `rusqlite`'s
//! `Connection` isn't `Sync`, so every trait method takes the single
//! connection through a `tokio::sync::Mutex` rather than pooling — the
//! workload here is one small embedded database per orchestrator process,
//! not a multi-tenant server.

use super::models::*;
use super::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tokio::sync::Mutex;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS generated_files (
    project_id TEXT NOT NULL,
    path TEXT NOT NULL,
    content TEXT NOT NULL,
    language TEXT NOT NULL,
    is_active INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (project_id, path)
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    order_index INTEGER NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_project_created ON chat_messages(project_id, created_at);

CREATE TABLE IF NOT EXISTS error_records (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    message TEXT NOT NULL,
    stack TEXT,
    file TEXT,
    line INTEGER,
    code_snippet TEXT,
    context TEXT NOT NULL,
    status TEXT NOT NULL,
    attempts INTEGER NOT NULL,
    resolution_notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_errors_project_status ON error_records(project_id, status);

CREATE TABLE IF NOT EXISTS agent_contexts (
    project_id TEXT PRIMARY KEY,
    session_id TEXT,
    context_data TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("create data dir: {e}")))?;
        }
        let conn = Connection::open(db_path)
            .map_err(|e| StoreError::Backend(format!("open sqlite: {e}")))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute("PRAGMA foreign_keys=ON;", [])
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Backend(format!("apply schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Backend(format!("open sqlite: {e}")))?;
        conn.execute("PRAGMA foreign_keys=ON;", [])
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Backend(format!("apply schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_dt(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).unwrap())
}

fn project_status_str(s: ProjectStatus) -> &'static str {
    match s {
        ProjectStatus::Active => "active",
        ProjectStatus::Archived => "archived",
        ProjectStatus::Deleted => "deleted",
    }
}

fn project_status_parse(s: &str) -> ProjectStatus {
    match s {
        "archived" => ProjectStatus::Archived,
        "deleted" => ProjectStatus::Deleted,
        _ => ProjectStatus::Active,
    }
}

fn language_str(l: FileLanguage) -> &'static str {
    match l {
        FileLanguage::Python => "python",
        FileLanguage::Typescript => "typescript",
        FileLanguage::Other => "other",
    }
}

fn language_parse(s: &str) -> FileLanguage {
    match s {
        "python" => FileLanguage::Python,
        "typescript" => FileLanguage::Typescript,
        _ => FileLanguage::Other,
    }
}

fn task_status_str(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Done => "done",
        TaskStatus::Blocked => "blocked",
    }
}

fn task_status_parse(s: &str) -> TaskStatus {
    match s {
        "in_progress" => TaskStatus::InProgress,
        "done" => TaskStatus::Done,
        "blocked" => TaskStatus::Blocked,
        _ => TaskStatus::Todo,
    }
}

fn priority_str(p: TaskPriority) -> &'static str {
    match p {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
    }
}

fn priority_parse(s: &str) -> TaskPriority {
    match s {
        "high" => TaskPriority::High,
        "low" => TaskPriority::Low,
        _ => TaskPriority::Medium,
    }
}

fn chat_role_str(r: ChatRole) -> &'static str {
    match r {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::System => "system",
        ChatRole::Tool => "tool",
    }
}

fn chat_role_parse(s: &str) -> ChatRole {
    match s {
        "assistant" => ChatRole::Assistant,
        "system" => ChatRole::System,
        "tool" => ChatRole::Tool,
        _ => ChatRole::User,
    }
}

fn error_kind_str(k: ErrorKind) -> &'static str {
    match k {
        ErrorKind::Build => "build",
        ErrorKind::Runtime => "runtime",
        ErrorKind::Api => "api",
    }
}

fn error_kind_parse(s: &str) -> ErrorKind {
    match s {
        "runtime" => ErrorKind::Runtime,
        "api" => ErrorKind::Api,
        _ => ErrorKind::Build,
    }
}

fn error_status_str(s: ErrorStatus) -> &'static str {
    match s {
        ErrorStatus::Open => "open",
        ErrorStatus::Resolved => "resolved",
    }
}

fn error_status_parse(s: &str) -> ErrorStatus {
    match s {
        "resolved" => ErrorStatus::Resolved,
        _ => ErrorStatus::Open,
    }
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        title: row.get(1)?,
        description: row.get(2)?,
        status: project_status_parse(&row.get::<_, String>(3)?),
        created_at: parse_dt(row.get(4)?),
        updated_at: parse_dt(row.get(5)?),
    })
}

fn row_to_file(row: &Row) -> rusqlite::Result<GeneratedFile> {
    Ok(GeneratedFile {
        project_id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        path: row.get(1)?,
        content: row.get(2)?,
        language: language_parse(&row.get::<_, String>(3)?),
        is_active: row.get::<_, i64>(4)? != 0,
        created_at: parse_dt(row.get(5)?),
        updated_at: parse_dt(row.get(6)?),
    })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let metadata_raw: String = row.get(7)?;
    Ok(Task {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        project_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        title: row.get(2)?,
        description: row.get(3)?,
        status: task_status_parse(&row.get::<_, String>(4)?),
        priority: priority_parse(&row.get::<_, String>(5)?),
        order_index: row.get(6)?,
        metadata: serde_json::from_str(&metadata_raw).unwrap_or(serde_json::json!({})),
        created_at: parse_dt(row.get(8)?),
        updated_at: parse_dt(row.get(9)?),
    })
}

fn row_to_chat(row: &Row) -> rusqlite::Result<ChatMessage> {
    let metadata_raw: String = row.get(4)?;
    Ok(ChatMessage {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        project_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        role: chat_role_parse(&row.get::<_, String>(2)?),
        content: row.get(3)?,
        metadata: serde_json::from_str(&metadata_raw).unwrap_or(serde_json::json!({})),
        created_at: parse_dt(row.get(5)?),
    })
}

fn row_to_error(row: &Row) -> rusqlite::Result<ErrorRecord> {
    let context_raw: String = row.get(8)?;
    Ok(ErrorRecord {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        project_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        kind: error_kind_parse(&row.get::<_, String>(2)?),
        message: row.get(3)?,
        stack: row.get(4)?,
        file: row.get(5)?,
        line: row.get(6)?,
        code_snippet: row.get(7)?,
        context: serde_json::from_str(&context_raw).unwrap_or(serde_json::json!({})),
        status: error_status_parse(&row.get::<_, String>(9)?),
        attempts: row.get(10)?,
        resolution_notes: row.get(11)?,
        created_at: parse_dt(row.get(12)?),
        updated_at: parse_dt(row.get(13)?),
    })
}

fn row_to_context(row: &Row) -> rusqlite::Result<AgentContext> {
    let data_raw: String = row.get(2)?;
    Ok(AgentContext {
        project_id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        session_id: row.get(1)?,
        context_data: serde_json::from_str(&data_raw).unwrap_or_default(),
        updated_at: parse_dt(row.get(3)?),
    })
}

#[async_trait]
impl ProjectStore for SqliteStore {
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
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO projects (id, title, description, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id.to_string(),
                project.title,
                project.description,
                project_status_str(project.status),
                project.created_at.to_rfc3339(),
                project.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Project> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, title, description, status, created_at, updated_at
             FROM projects WHERE id = ?1",
            params![id.to_string()],
            row_to_project,
        )
        .optional()
        .map_err(|e| StoreError::Backend(e.to_string()))?
        .ok_or(StoreError::ProjectNotFound(id))
    }
}

#[async_trait]
impl FileStore for SqliteStore {
    async fn create_file(
        &self,
        project_id: Uuid,
        path: &str,
        content: &str,
    ) -> StoreResult<GeneratedFile> {
        let conn = self.conn.lock().await;
        let existing_active: Option<i64> = conn
            .query_row(
                "SELECT is_active FROM generated_files WHERE project_id = ?1 AND path = ?2",
                params![project_id.to_string(), path],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if existing_active == Some(1) {
            return Err(StoreError::FileAlreadyExists {
                project_id,
                path: path.to_string(),
            });
        }
        let now = Utc::now();
        let language = FileLanguage::from_path(path);
        conn.execute(
            "INSERT INTO generated_files
                (project_id, path, content, language, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
             ON CONFLICT(project_id, path) DO UPDATE SET
                content = excluded.content,
                language = excluded.language,
                is_active = 1,
                updated_at = excluded.updated_at",
            params![
                project_id.to_string(),
                path,
                content,
                language_str(language),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(GeneratedFile {
            project_id,
            path: path.to_string(),
            content: content.to_string(),
            language,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_file(
        &self,
        project_id: Uuid,
        path: &str,
        content: &str,
    ) -> StoreResult<GeneratedFile> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        let changed = conn
            .execute(
                "UPDATE generated_files SET content = ?1, updated_at = ?2
                 WHERE project_id = ?3 AND path = ?4 AND is_active = 1",
                params![content, now.to_rfc3339(), project_id.to_string(), path],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::FileNotFound {
                project_id,
                path: path.to_string(),
            });
        }
        conn.query_row(
            "SELECT project_id, path, content, language, is_active, created_at, updated_at
             FROM generated_files WHERE project_id = ?1 AND path = ?2",
            params![project_id.to_string(), path],
            row_to_file,
        )
        .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn read_file(&self, project_id: Uuid, path: &str) -> StoreResult<Option<GeneratedFile>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT project_id, path, content, language, is_active, created_at, updated_at
             FROM generated_files WHERE project_id = ?1 AND path = ?2 AND is_active = 1",
            params![project_id.to_string(), path],
            row_to_file,
        )
        .optional()
        .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn list_active_files(&self, project_id: Uuid) -> StoreResult<Vec<GeneratedFile>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT project_id, path, content, language, is_active, created_at, updated_at
                 FROM generated_files WHERE project_id = ?1 AND is_active = 1 ORDER BY path",
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![project_id.to_string()], row_to_file)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete_file(&self, project_id: Uuid, path: &str) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE generated_files SET is_active = 0, updated_at = ?1
                 WHERE project_id = ?2 AND path = ?3",
                params![Utc::now().to_rfc3339(), project_id.to_string(), path],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::FileNotFound {
                project_id,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn search_files(&self, project_id: Uuid, query: &str) -> StoreResult<Vec<GeneratedFile>> {
        let conn = self.conn.lock().await;
        let needle = format!("%{}%", query.to_lowercase());
        let mut stmt = conn
            .prepare(
                "SELECT project_id, path, content, language, is_active, created_at, updated_at
                 FROM generated_files
                 WHERE project_id = ?1 AND is_active = 1
                   AND (lower(path) LIKE ?2 OR lower(content) LIKE ?2)
                 ORDER BY path",
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![project_id.to_string(), needle], row_to_file)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn create_task(
        &self,
        project_id: Uuid,
        title: &str,
        description: &str,
        priority: TaskPriority,
    ) -> StoreResult<Task> {
        let conn = self.conn.lock().await;
        let next_order: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(order_index), 0) + 1 FROM tasks WHERE project_id = ?1",
                params![project_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id,
            title: title.to_string(),
            description: description.to_string(),
            status: TaskStatus::Todo,
            priority,
            order_index: next_order,
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            "INSERT INTO tasks
                (id, project_id, title, description, status, priority, order_index, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                task.id.to_string(),
                project_id.to_string(),
                task.title,
                task.description,
                task_status_str(task.status),
                priority_str(task.priority),
                task.order_index,
                task.metadata.to_string(),
                task.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        status: Option<TaskStatus>,
        description: Option<&str>,
    ) -> StoreResult<Task> {
        let conn = self.conn.lock().await;
        let current = conn
            .query_row(
                "SELECT id, project_id, title, description, status, priority, order_index, metadata, created_at, updated_at
                 FROM tasks WHERE id = ?1",
                params![task_id.to_string()],
                row_to_task,
            )
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .ok_or(StoreError::TaskNotFound(task_id))?;
        let new_status = status.unwrap_or(current.status);
        let new_description = description.unwrap_or(&current.description);
        let now = Utc::now();
        conn.execute(
            "UPDATE tasks SET status = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                task_status_str(new_status),
                new_description,
                now.to_rfc3339(),
                task_id.to_string(),
            ],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Task {
            status: new_status,
            description: new_description.to_string(),
            updated_at: now,
            ..current
        })
    }

    async fn list_tasks(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, project_id, title, description, status, priority, order_index, metadata, created_at, updated_at
                 FROM tasks WHERE project_id = ?1 ORDER BY order_index",
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![project_id.to_string()], row_to_task)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete_task(&self, task_id: Uuid) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![task_id.to_string()])
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::TaskNotFound(task_id));
        }
        Ok(())
    }

    async fn add_comment(&self, task_id: Uuid, comment: &str) -> StoreResult<Task> {
        let conn = self.conn.lock().await;
        let current = conn
            .query_row(
                "SELECT id, project_id, title, description, status, priority, order_index, metadata, created_at, updated_at
                 FROM tasks WHERE id = ?1",
                params![task_id.to_string()],
                row_to_task,
            )
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .ok_or(StoreError::TaskNotFound(task_id))?;
        let mut metadata = current.metadata.clone();
        let mut comments = metadata
            .get("comments")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        comments.push(serde_json::json!({
            "text": comment,
            "at": Utc::now().to_rfc3339(),
        }));
        metadata["comments"] = serde_json::Value::Array(comments);
        let now = Utc::now();
        conn.execute(
            "UPDATE tasks SET metadata = ?1, updated_at = ?2 WHERE id = ?3",
            params![metadata.to_string(), now.to_rfc3339(), task_id.to_string()],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Task {
            metadata,
            updated_at: now,
            ..current
        })
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
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
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO chat_messages (id, project_id, role, content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                project_id.to_string(),
                chat_role_str(role),
                message.content,
                message.metadata.to_string(),
                message.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(message)
    }

    async fn recent_messages(&self, project_id: Uuid, limit: usize) -> StoreResult<Vec<ChatMessage>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, project_id, role, content, metadata, created_at
                 FROM chat_messages WHERE project_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![project_id.to_string(), limit as i64], row_to_chat)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut out = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        out.reverse();
        Ok(out)
    }
}

#[async_trait]
impl ErrorRecordStore for SqliteStore {
    async fn insert(&self, record: ErrorRecord) -> StoreResult<ErrorRecord> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO error_records
                (id, project_id, kind, message, stack, file, line, code_snippet, context,
                 status, attempts, resolution_notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.id.to_string(),
                record.project_id.to_string(),
                error_kind_str(record.kind),
                record.message,
                record.stack,
                record.file,
                record.line,
                record.code_snippet,
                record.context.to_string(),
                error_status_str(record.status),
                record.attempts,
                record.resolution_notes,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(record)
    }

    async fn list_open(&self, project_id: Uuid) -> StoreResult<Vec<ErrorRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, project_id, kind, message, stack, file, line, code_snippet, context,
                        status, attempts, resolution_notes, created_at, updated_at
                 FROM error_records WHERE project_id = ?1 AND status = 'open'
                 ORDER BY created_at",
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![project_id.to_string()], row_to_error)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn resolve(&self, id: Uuid, resolution_notes: Option<&str>) -> StoreResult<ErrorRecord> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        let changed = conn
            .execute(
                "UPDATE error_records SET status = 'resolved', resolution_notes = ?1, updated_at = ?2
                 WHERE id = ?3",
                params![resolution_notes, now.to_rfc3339(), id.to_string()],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::ErrorRecordNotFound(id));
        }
        conn.query_row(
            "SELECT id, project_id, kind, message, stack, file, line, code_snippet, context,
                    status, attempts, resolution_notes, created_at, updated_at
             FROM error_records WHERE id = ?1",
            params![id.to_string()],
            row_to_error,
        )
        .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn increment_attempts(&self, id: Uuid) -> StoreResult<ErrorRecord> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        let changed = conn
            .execute(
                "UPDATE error_records SET attempts = attempts + 1, updated_at = ?1 WHERE id = ?2",
                params![now.to_rfc3339(), id.to_string()],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::ErrorRecordNotFound(id));
        }
        conn.query_row(
            "SELECT id, project_id, kind, message, stack, file, line, code_snippet, context,
                    status, attempts, resolution_notes, created_at, updated_at
             FROM error_records WHERE id = ?1",
            params![id.to_string()],
            row_to_error,
        )
        .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute("DELETE FROM error_records WHERE id = ?1", params![id.to_string()])
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if changed == 0 {
            return Err(StoreError::ErrorRecordNotFound(id));
        }
        Ok(())
    }

    async fn find_open_at(
        &self,
        project_id: Uuid,
        file: &str,
        line: Option<i64>,
    ) -> StoreResult<Option<ErrorRecord>> {
        let conn = self.conn.lock().await;
        let query = "SELECT id, project_id, kind, message, stack, file, line, code_snippet, context,
                            status, attempts, resolution_notes, created_at, updated_at
                     FROM error_records
                     WHERE project_id = ?1 AND status = 'open' AND file = ?2
                       AND ((line IS NULL AND ?3 IS NULL) OR line = ?3)
                     LIMIT 1";
        conn.query_row(query, params![project_id.to_string(), file, line], row_to_error)
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl AgentContextStore for SqliteStore {
    async fn get(&self, project_id: Uuid) -> StoreResult<Option<AgentContext>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT project_id, session_id, context_data, updated_at
             FROM agent_contexts WHERE project_id = ?1",
            params![project_id.to_string()],
            row_to_context,
        )
        .optional()
        .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn upsert(&self, context: AgentContext) -> StoreResult<AgentContext> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO agent_contexts (project_id, session_id, context_data, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id) DO UPDATE SET
                session_id = excluded.session_id,
                context_data = excluded.context_data,
                updated_at = excluded.updated_at",
            params![
                context.project_id.to_string(),
                context.session_id,
                serde_json::to_string(&context.context_data).unwrap_or_default(),
                context.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_project_and_file() {
        let store = SqliteStore::open_in_memory().unwrap();
        let project = store.create_project("demo", "a test project").await.unwrap();
        let fetched = store.get_project(project.id).await.unwrap();
        assert_eq!(fetched.title, "demo");

        let file = store
            .create_file(project.id, "src/app.py", "print('hi')")
            .await
            .unwrap();
        assert_eq!(file.language, FileLanguage::Python);

        let again = store.create_file(project.id, "src/app.py", "print('no')").await;
        assert!(again.is_err());

        let updated = store
            .update_file(project.id, "src/app.py", "print('updated')")
            .await
            .unwrap();
        assert_eq!(updated.content, "print('updated')");
    }

    #[tokio::test]
    async fn task_order_index_increments() {
        let store = SqliteStore::open_in_memory().unwrap();
        let project = store.create_project("demo", "").await.unwrap();
        let t1 = store
            .create_task(project.id, "first", "", TaskPriority::Medium)
            .await
            .unwrap();
        let t2 = store
            .create_task(project.id, "second", "", TaskPriority::High)
            .await
            .unwrap();
        assert!(t2.order_index > t1.order_index);
    }

    #[tokio::test]
    async fn agent_context_upsert_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();
        let project = store.create_project("demo", "").await.unwrap();
        let mut data = ContextData::default();
        data.current_phase = Some("planning".into());
        store
            .upsert(AgentContext {
                project_id: project.id,
                session_id: Some("s1".into()),
                context_data: data,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        let fetched = store.get(project.id).await.unwrap().unwrap();
        assert_eq!(fetched.context_data.current_phase.as_deref(), Some("planning"));
    }
}
