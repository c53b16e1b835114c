//! Data model shared by every store trait.
//!
//! These types mirror §3 of the specification: stable opaque identifiers,
//! soft-deleted generated files, ordered tasks, append-only chat, and a
//! single upserted `AgentContext` per project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileLanguage {
    Python,
    Typescript,
    Other,
}

impl FileLanguage {
    pub fn from_path(path: &str) -> Self {
        if path.ends_with(".py") {
            FileLanguage::Python
        } else if path.ends_with(".ts") || path.ends_with(".tsx") || path.ends_with(".js") {
            FileLanguage::Typescript
        } else {
            FileLanguage::Other
        }
    }
}

/// A generated source file. `(project_id, path)` uniquely identifies one
/// *active* file — see the invariant in spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub project_id: Uuid,
    pub path: String,
    pub content: String,
    pub language: FileLanguage,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub order_index: i64,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub project_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Build,
    Runtime,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
    pub stack: Option<String>,
    pub file: Option<String>,
    pub line: Option<i64>,
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub context: serde_json::Value,
    pub status: ErrorStatus,
    pub attempts: i64,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The structured bag inside `AgentContext.context_data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextData {
    #[serde(default)]
    pub current_phase: Option<String>,
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub files_generated: HashSet<String>,
    #[serde(default)]
    pub tasks_completed: HashSet<String>,
    /// Capped at 10 — enforced by every writer, never just by the reader.
    #[serde(default)]
    pub recent_errors: Vec<String>,
    #[serde(default)]
    pub ai_memory: HashMap<String, serde_json::Value>,
}

pub const RECENT_ERRORS_CAP: usize = 10;

impl ContextData {
    pub fn push_recent_error(&mut self, entry: String) {
        self.recent_errors.push(entry);
        let len = self.recent_errors.len();
        if len > RECENT_ERRORS_CAP {
            self.recent_errors.drain(0..len - RECENT_ERRORS_CAP);
        }
    }

    /// Merge `other` into `self` per the §4.7 merge rule: set-union
    /// collections, concatenate-then-truncate `recent_errors`,
    /// shallow-merge `ai_memory`, overwrite scalars when present.
    pub fn merge(&mut self, other: ContextData) {
        if other.current_phase.is_some() {
            self.current_phase = other.current_phase;
        }
        if other.current_task.is_some() {
            self.current_task = other.current_task;
        }
        self.files_generated.extend(other.files_generated);
        self.tasks_completed.extend(other.tasks_completed);
        self.recent_errors.extend(other.recent_errors);
        let len = self.recent_errors.len();
        if len > RECENT_ERRORS_CAP {
            self.recent_errors.drain(0..len - RECENT_ERRORS_CAP);
        }
        for (k, v) in other.ai_memory {
            self.ai_memory.insert(k, v);
        }
    }
}

/// Exactly one per project, upserted by `project_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    pub project_id: Uuid,
    pub session_id: Option<String>,
    pub context_data: ContextData,
    pub updated_at: DateTime<Utc>,
}

/// Process-lifetime-only; never persisted to the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Running,
    Stopped,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningBackend {
    pub project_id: Uuid,
    pub pid: u32,
    pub port: u16,
    pub status: BackendStatus,
    pub started_at: DateTime<Utc>,
    pub workspace_path: String,
}
