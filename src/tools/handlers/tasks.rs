//! `create_task` / `update_task` / `list_tasks` / `delete_task` /
//! `add_task_comment`.

use crate::store::{Store, TaskPriority, TaskStatus};
use crate::tools::registry::{require_str, Tool};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

fn parse_uuid(raw: &str) -> Result<Uuid, Value> {
    Uuid::parse_str(raw).map_err(|e| json!({"success": false, "error": format!("invalid uuid: {e}")}))
}

fn parse_priority(raw: Option<&str>) -> TaskPriority {
    match raw {
        Some("high") => TaskPriority::High,
        Some("low") => TaskPriority::Low,
        _ => TaskPriority::Medium,
    }
}

fn parse_status(raw: &str) -> Result<TaskStatus, Value> {
    match raw {
        "todo" => Ok(TaskStatus::Todo),
        "in_progress" => Ok(TaskStatus::InProgress),
        "done" => Ok(TaskStatus::Done),
        "blocked" => Ok(TaskStatus::Blocked),
        other => Err(json!({"success": false, "error": format!("unknown task status: {other}")})),
    }
}

pub struct CreateTaskTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for CreateTaskTool {
    fn name(&self) -> &str {
        "create_task"
    }
    fn description(&self) -> &str {
        "Create a new task tracked against this project."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "title": {"type": "string"},
                "description": {"type": "string"},
                "priority": {"type": "string", "enum": ["low", "medium", "high"]}
            },
            "required": ["project_id", "title"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let title = match require_str(&args, "title") {
            Ok(t) => t,
            Err(e) => return e,
        };
        let description = args.get("description").and_then(|v| v.as_str()).unwrap_or("");
        let priority = parse_priority(args.get("priority").and_then(|v| v.as_str()));

        match self
            .store
            .create_task(project_id, title, description, priority)
            .await
        {
            Ok(task) => json!({"success": true, "task": task}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct UpdateTaskTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for UpdateTaskTool {
    fn name(&self) -> &str {
        "update_task"
    }
    fn description(&self) -> &str {
        "Update a task's status and/or description."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {"type": "string"},
                "status": {"type": "string", "enum": ["todo", "in_progress", "done", "blocked"]},
                "description": {"type": "string"}
            },
            "required": ["task_id"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let task_id = match require_str(&args, "task_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let status = match args.get("status").and_then(|v| v.as_str()) {
            Some(raw) => match parse_status(raw) {
                Ok(s) => Some(s),
                Err(e) => return e,
            },
            None => None,
        };
        let description = args.get("description").and_then(|v| v.as_str());

        match self.store.update_task(task_id, status, description).await {
            Ok(task) => json!({"success": true, "task": task}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct ListTasksTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for ListTasksTool {
    fn name(&self) -> &str {
        "list_tasks"
    }
    fn description(&self) -> &str {
        "List all tasks tracked against a project."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"project_id": {"type": "string"}},
            "required": ["project_id"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        match self.store.list_tasks(project_id).await {
            Ok(tasks) => json!({"success": true, "tasks": tasks}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct DeleteTaskTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for DeleteTaskTool {
    fn name(&self) -> &str {
        "delete_task"
    }
    fn description(&self) -> &str {
        "Delete a task."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"task_id": {"type": "string"}},
            "required": ["task_id"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let task_id = match require_str(&args, "task_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        match self.store.delete_task(task_id).await {
            Ok(()) => json!({"success": true}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct AddTaskCommentTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for AddTaskCommentTool {
    fn name(&self) -> &str {
        "add_task_comment"
    }
    fn description(&self) -> &str {
        "Append a comment to a task."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {"type": "string"},
                "comment": {"type": "string"}
            },
            "required": ["task_id", "comment"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let task_id = match require_str(&args, "task_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let comment = match require_str(&args, "comment") {
            Ok(c) => c,
            Err(e) => return e,
        };
        match self.store.add_comment(task_id, comment).await {
            Ok(task) => json!({"success": true, "task": task}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;

    #[tokio::test]
    async fn create_task_round_trips_through_store() {
        let store: Arc<dyn Store> = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let tool = CreateTaskTool { store: store.clone() };

        let result = tool
            .execute(json!({"project_id": project.id.to_string(), "title": "Do thing"}))
            .await;
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["task"]["title"], json!("Do thing"));
    }

    #[tokio::test]
    async fn update_task_rejects_unknown_status() {
        let store: Arc<dyn Store> = Arc::new(MockStore::new());
        let tool = UpdateTaskTool { store };
        let result = tool
            .execute(json!({"task_id": Uuid::new_v4().to_string(), "status": "whenever"}))
            .await;
        assert_eq!(result["success"], json!(false));
    }

    #[tokio::test]
    async fn delete_task_on_unknown_id_reports_error_not_panic() {
        let store: Arc<dyn Store> = Arc::new(MockStore::new());
        let tool = DeleteTaskTool { store };
        let result = tool.execute(json!({"task_id": Uuid::new_v4().to_string()})).await;
        assert_eq!(result["success"], json!(false));
    }
}
