//! `create_file` / `update_file` / `read_files` / `search_code` /
//! `delete_file`.

use crate::store::Store;
use crate::tools::registry::{require_str, Tool};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

fn parse_uuid(raw: &str) -> Result<Uuid, Value> {
    Uuid::parse_str(raw).map_err(|e| json!({"success": false, "error": format!("invalid uuid: {e}")}))
}

pub struct CreateFileTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }
    fn description(&self) -> &str {
        "Create a new generated file. Fails if an active file already exists at this path."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["project_id", "path", "content"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let path = match require_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        let content = args.get("content").and_then(|v| v.as_str()).unwrap_or("");

        match self.store.create_file(project_id, path, content).await {
            Ok(file) => json!({"success": true, "file": {"path": file.path, "language": file.language}}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct UpdateFileTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for UpdateFileTool {
    fn name(&self) -> &str {
        "update_file"
    }
    fn description(&self) -> &str {
        "Overwrite the content of an existing active file."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["project_id", "path", "content"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let path = match require_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        let content = match require_str(&args, "content") {
            Ok(c) => c,
            Err(e) => return e,
        };

        match self.store.update_file(project_id, path, content).await {
            Ok(file) => json!({"success": true, "file": {"path": file.path, "language": file.language}}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct ReadFilesTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for ReadFilesTool {
    fn name(&self) -> &str {
        "read_files"
    }
    fn description(&self) -> &str {
        "Read one or more generated files by path, or every active file when no paths are given."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "paths": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["project_id"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };

        let requested: Vec<String> = args
            .get("paths")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        if requested.is_empty() {
            return match self.store.list_active_files(project_id).await {
                Ok(files) => {
                    let out: Vec<Value> = files
                        .into_iter()
                        .map(|f| json!({"path": f.path, "content": f.content}))
                        .collect();
                    json!({"success": true, "files": out})
                }
                Err(e) => json!({"success": false, "error": e.to_string()}),
            };
        }

        let mut files = Vec::new();
        let mut missing = Vec::new();
        for path in &requested {
            match self.store.read_file(project_id, path).await {
                Ok(Some(file)) => files.push(json!({"path": file.path, "content": file.content})),
                Ok(None) => missing.push(path.clone()),
                Err(e) => return json!({"success": false, "error": e.to_string()}),
            }
        }
        json!({"success": true, "files": files, "missing": missing})
    }
}

pub struct SearchCodeTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for SearchCodeTool {
    fn name(&self) -> &str {
        "search_code"
    }
    fn description(&self) -> &str {
        "Search active file contents for a substring or pattern."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "query": {"type": "string"}
            },
            "required": ["project_id", "query"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let query = match require_str(&args, "query") {
            Ok(q) => q,
            Err(e) => return e,
        };

        match self.store.search_files(project_id, query).await {
            Ok(files) => {
                let out: Vec<Value> = files.into_iter().map(|f| json!({"path": f.path})).collect();
                json!({"success": true, "matches": out})
            }
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct DeleteFileTool {
    pub store: Arc<dyn Store>,
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }
    fn description(&self) -> &str {
        "Soft-delete an active file."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "path": {"type": "string"}
            },
            "required": ["project_id", "path"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let path = match require_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };

        match self.store.delete_file(project_id, path).await {
            Ok(()) => json!({"success": true}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;

    #[tokio::test]
    async fn read_files_with_no_paths_returns_all_active() {
        let store: Arc<dyn Store> = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        store.create_file(project.id, "a.py", "print(1)").await.unwrap();

        let tool = ReadFilesTool { store };
        let result = tool.execute(json!({"project_id": project.id.to_string()})).await;
        assert_eq!(result["files"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn read_files_reports_missing_paths_without_failing() {
        let store: Arc<dyn Store> = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let tool = ReadFilesTool { store };
        let result = tool
            .execute(json!({"project_id": project.id.to_string(), "paths": ["ghost.py"]}))
            .await;
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["missing"][0], json!("ghost.py"));
    }

    #[tokio::test]
    async fn create_file_then_duplicate_is_reported_as_error() {
        let store: Arc<dyn Store> = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let tool = CreateFileTool { store };
        let args = json!({"project_id": project.id.to_string(), "path": "a.py", "content": "x"});
        assert_eq!(tool.execute(args.clone()).await["success"], json!(true));
        assert_eq!(tool.execute(args).await["success"], json!(false));
    }
}
