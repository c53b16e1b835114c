//! The structured project snapshot handed to an agent turn, and its
//! rendering into a system-prompt-prependable string.
//!
//! Section shape and truncation order are grounded on
//! `ai_context_loader.py`'s `load_context`/`format_for_prompt`; the
//! render marker and section-by-section `String` building follow the
//! teacher's `ContextBuilder::generate_prompt`.

use crate::store::{AgentContext, ChatMessage, ErrorRecord, Project, Task, TaskStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct ContextLimits {
    pub max_files: usize,
    pub max_chat_messages: usize,
    pub max_chars: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_files: 15,
            max_chat_messages: 10,
            max_chars: 25_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub description: String,
}

impl From<&Project> for ProjectInfo {
    fn from(project: &Project) -> Self {
        Self {
            name: project.title.clone(),
            description: project.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksSection {
    pub active: Vec<Task>,
    pub recently_completed: Vec<Task>,
}

impl TasksSection {
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(|t| t.order_index);
        let mut active = Vec::new();
        let mut recently_completed = Vec::new();
        for task in tasks {
            match task.status {
                TaskStatus::Done => recently_completed.push(task),
                _ => active.push(task),
            }
        }
        recently_completed.reverse();
        Self {
            active,
            recently_completed,
        }
    }
}

/// File paths grouped the way `format_for_prompt` buckets them: by
/// substring of the path, not by language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesByFolder {
    pub apis: Vec<String>,
    pub pages: Vec<String>,
    pub components: Vec<String>,
    pub libs: Vec<String>,
    pub utils: Vec<String>,
    pub other: Vec<String>,
    pub total: usize,
}

impl FilesByFolder {
    pub fn from_paths(paths: Vec<String>) -> Self {
        let mut out = FilesByFolder {
            total: paths.len(),
            ..Default::default()
        };
        for path in paths {
            if path.contains("/apis/") {
                out.apis.push(path);
            } else if path.contains("/pages/") {
                out.pages.push(path);
            } else if path.contains("/components/") {
                out.components.push(path);
            } else if path.contains("/libs/") {
                out.libs.push(path);
            } else if path.contains("/utils/") {
                out.utils.push(path);
            } else {
                out.other.push(path);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub project_info: ProjectInfo,
    pub tasks: TasksSection,
    pub errors: Vec<ErrorRecord>,
    pub files: FilesByFolder,
    /// `None` when a file list was requested but every file's content was
    /// already dropped by `optimise`.
    pub file_contents: Vec<(String, String)>,
    pub stored_context: Option<AgentContext>,
    pub chat_history: Vec<ChatMessage>,
}

impl Snapshot {
    /// Drop file contents, then oldest chat messages, then completed
    /// tasks, re-checking the rendered size after each step, until it
    /// fits `max_chars` or there is nothing left to trim.
    pub fn optimise(&mut self, max_chars: usize) {
        if self.render().len() <= max_chars {
            return;
        }
        self.file_contents.clear();
        if self.render().len() <= max_chars {
            return;
        }
        while !self.chat_history.is_empty() {
            self.chat_history.remove(0);
            if self.render().len() <= max_chars {
                return;
            }
        }
        while !self.tasks.recently_completed.is_empty() {
            self.tasks.recently_completed.pop();
            if self.render().len() <= max_chars {
                return;
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("=== CURRENT PROJECT STATE ===\n\n");
        out.push_str("This is the current state of the project you're working on. Use this information to maintain awareness of what exists, what's in progress, and what needs attention.\n\n");

        out.push_str("## Project Overview\n");
        out.push_str(&format!("**Name:** {}\n", self.project_info.name));
        if !self.project_info.description.is_empty() {
            out.push_str(&format!("**Description:** {}\n", self.project_info.description));
        }
        out.push('\n');

        if !self.tasks.active.is_empty() {
            out.push_str("## Active Tasks\n");
            for task in &self.tasks.active {
                out.push_str(&format!(
                    "\n**{}** `[{:?}]` `Priority: {:?}`\n",
                    task.title, task.status, task.priority
                ));
                let desc = truncate(&task.description, 300);
                out.push_str(&desc);
                out.push('\n');
            }
            out.push('\n');
        }
        if !self.tasks.recently_completed.is_empty() {
            out.push_str("## Recently Completed\n");
            for task in self.tasks.recently_completed.iter().take(5) {
                out.push_str(&format!("- {}\n", task.title));
            }
            out.push('\n');
        }

        if !self.errors.is_empty() {
            out.push_str("## Unresolved Errors\n");
            out.push_str(&format!(
                "There are currently {} error(s) that need attention:\n\n",
                self.errors.len()
            ));
            for (i, error) in self.errors.iter().take(3).enumerate() {
                out.push_str(&format!("**Error {}: {:?}**\n", i + 1, error.kind));
                out.push_str(&format!(
                    "- File: `{}`\n",
                    error.file.as_deref().unwrap_or("Unknown")
                ));
                if let Some(line) = error.line {
                    out.push_str(&format!("- Line: {line}\n"));
                }
                out.push_str(&format!("- Message: {}\n", error.message));
                if let Some(stack) = &error.stack {
                    out.push_str(&format!("```\n{}\n```\n", truncate(stack, 200)));
                }
                out.push('\n');
            }
            if self.errors.len() > 3 {
                out.push_str(&format!("*... and {} more errors*\n\n", self.errors.len() - 3));
            }
        }

        if self.files.total > 0 {
            out.push_str("## Project Files\n");
            out.push_str(&format!("The project contains {} file(s):\n\n", self.files.total));
            push_file_group(&mut out, "Backend APIs", &self.files.apis, 5);
            push_file_group(&mut out, "Frontend Pages", &self.files.pages, 5);
            push_file_group(&mut out, "UI Components", &self.files.components, 5);
            push_file_group(&mut out, "Backend Libraries", &self.files.libs, 3);
            push_file_group(&mut out, "Other Files", &self.files.other, 3);
        }

        if !self.file_contents.is_empty() {
            out.push_str("## File Contents\n");
            for (path, content) in &self.file_contents {
                out.push_str(&format!("### {path}\n```\n{content}\n```\n\n"));
            }
        }

        if let Some(stored) = &self.stored_context {
            let data = &stored.context_data;
            let has_any = data.current_phase.is_some()
                || data.current_task.is_some()
                || !data.files_generated.is_empty()
                || !data.tasks_completed.is_empty()
                || !data.ai_memory.is_empty();
            if has_any {
                out.push_str("## AI Memory (From Previous Session)\n");
                if let Some(phase) = &data.current_phase {
                    out.push_str(&format!("**Phase:** {phase}\n"));
                }
                if let Some(task) = &data.current_task {
                    out.push_str(&format!("**Task:** {task}\n"));
                }
                if !data.files_generated.is_empty() {
                    out.push_str(&format!(
                        "**Generated Files:** {}\n",
                        summarize(data.files_generated.iter())
                    ));
                }
                if !data.tasks_completed.is_empty() {
                    out.push_str(&format!(
                        "**Completed:** {}\n",
                        summarize(data.tasks_completed.iter())
                    ));
                }
                if !data.ai_memory.is_empty() {
                    out.push_str("**Notes:**\n");
                    for (key, value) in data.ai_memory.iter().take(3) {
                        out.push_str(&format!("  - {key}: {value}\n"));
                    }
                }
                out.push('\n');
            }
        }

        if !self.chat_history.is_empty() {
            out.push_str("## Recent Conversation Context\n");
            let tail_start = self.chat_history.len().saturating_sub(3);
            for msg in &self.chat_history[tail_start..] {
                out.push_str(&format!(
                    "**{:?}:** {}\n",
                    msg.role,
                    truncate(&msg.content, 150)
                ));
            }
            out.push('\n');
        }

        out.push_str("---\n");
        out.push_str("*Use this context to understand the current state and make informed decisions.*\n");
        out
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}

fn summarize<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let items: Vec<&String> = items.collect();
    let count = items.len();
    let mut examples: Vec<String> = items.into_iter().take(3).cloned().collect();
    if count > 3 {
        examples.push(format!("and {} more", count - 3));
    }
    examples.join(", ")
}

fn push_file_group(out: &mut String, label: &str, paths: &[String], limit: usize) {
    if paths.is_empty() {
        return;
    }
    out.push_str(&format!("**{label}:**\n"));
    for path in paths.iter().take(limit) {
        out.push_str(&format!("- `{path}`\n"));
    }
    if paths.len() > limit {
        out.push_str(&format!("  *... and {} more*\n", paths.len() - limit));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ErrorKind, ErrorStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            project_info: ProjectInfo {
                name: "Demo".to_string(),
                description: String::new(),
            },
            tasks: TasksSection::default(),
            errors: Vec::new(),
            files: FilesByFolder::default(),
            file_contents: Vec::new(),
            stored_context: None,
            chat_history: Vec::new(),
        }
    }

    #[test]
    fn render_includes_marker_and_project_name() {
        let snapshot = empty_snapshot();
        let rendered = snapshot.render();
        assert!(rendered.starts_with("=== CURRENT PROJECT STATE ===\n"));
        assert!(rendered.contains("**Name:** Demo"));
    }

    #[test]
    fn files_by_folder_buckets_by_path_substring() {
        let files = FilesByFolder::from_paths(vec![
            "backend/app/apis/widgets/__init__.py".to_string(),
            "frontend/src/pages/Home.tsx".to_string(),
            "frontend/src/components/Button.tsx".to_string(),
            "frontend/src/lib/app.ts".to_string(),
            "README.md".to_string(),
        ]);
        assert_eq!(files.apis.len(), 1);
        assert_eq!(files.pages.len(), 1);
        assert_eq!(files.components.len(), 1);
        assert_eq!(files.other.len(), 2);
        assert_eq!(files.total, 5);
    }

    #[test]
    fn optimise_drops_file_contents_before_chat_history() {
        let mut snapshot = empty_snapshot();
        snapshot.file_contents.push(("a.py".to_string(), "x".repeat(200)));
        snapshot.chat_history.push(ChatMessage {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            role: crate::store::ChatRole::User,
            content: "hello".to_string(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        });
        let before = snapshot.render().len();
        snapshot.optimise(before - 10);
        assert!(snapshot.file_contents.is_empty());
        assert_eq!(snapshot.chat_history.len(), 1);
    }

    #[test]
    fn optimise_is_noop_when_already_within_bound() {
        let mut snapshot = empty_snapshot();
        let rendered = snapshot.render();
        snapshot.optimise(rendered.len() + 100);
        assert_eq!(snapshot.render(), rendered);
    }

    #[test]
    fn error_section_caps_detail_at_three_and_notes_remainder() {
        let mut snapshot = empty_snapshot();
        for i in 0..5 {
            snapshot.errors.push(ErrorRecord {
                id: Uuid::new_v4(),
                project_id: Uuid::new_v4(),
                kind: ErrorKind::Build,
                message: format!("error {i}"),
                stack: None,
                file: Some("src/main.py".to_string()),
                line: Some(i),
                code_snippet: None,
                context: serde_json::Value::Null,
                status: ErrorStatus::Open,
                attempts: 0,
                resolution_notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
        }
        let rendered = snapshot.render();
        assert!(rendered.contains("5 error(s)"));
        assert!(rendered.contains("and 2 more errors"));
    }
}
