//! `trigger_build` / `get_open_errors` / `resolve_error`.

use crate::preview::{self, BuildCache};
use crate::store::{ErrorRecordStore, FileStore};
use crate::tools::registry::{require_str, Tool};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

fn parse_uuid(raw: &str) -> Result<Uuid, Value> {
    Uuid::parse_str(raw).map_err(|e| json!({"success": false, "error": format!("invalid uuid: {e}")}))
}

pub struct TriggerBuildTool {
    pub file_store: Arc<dyn FileStore>,
    pub error_store: Arc<dyn ErrorRecordStore>,
    pub workspace_root: PathBuf,
    pub cache: BuildCache,
}

#[async_trait]
impl Tool for TriggerBuildTool {
    fn name(&self) -> &str {
        "trigger_build"
    }
    fn description(&self) -> &str {
        "Materialise the project's active files and run a frontend build, reporting any failures as error records."
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
        let workspace = Workspace::new(&self.workspace_root, project_id);

        match preview::build(
            project_id,
            self.file_store.as_ref(),
            self.error_store.as_ref(),
            &workspace,
            &self.cache,
        )
        .await
        {
            Ok(outcome) => json!({
                "success": outcome.success,
                "logs": outcome.logs,
                "dist_dir": outcome.dist_dir.map(|p| p.to_string_lossy().to_string()),
            }),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct GetOpenErrorsTool {
    pub error_store: Arc<dyn ErrorRecordStore>,
}

#[async_trait]
impl Tool for GetOpenErrorsTool {
    fn name(&self) -> &str {
        "get_open_errors"
    }
    fn description(&self) -> &str {
        "List every unresolved build/runtime error for a project."
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
        match self.error_store.list_open(project_id).await {
            Ok(errors) => json!({"success": true, "errors": errors}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

pub struct ResolveErrorTool {
    pub error_store: Arc<dyn ErrorRecordStore>,
}

#[async_trait]
impl Tool for ResolveErrorTool {
    fn name(&self) -> &str {
        "resolve_error"
    }
    fn description(&self) -> &str {
        "Mark an error record resolved, with an optional note on how it was fixed."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "error_id": {"type": "string"},
                "resolution_notes": {"type": "string"}
            },
            "required": ["error_id"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let error_id = match require_str(&args, "error_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let notes = args.get("resolution_notes").and_then(|v| v.as_str());
        match self.error_store.resolve(error_id, notes).await {
            Ok(record) => json!({"success": true, "error_record": record}),
            Err(e) => json!({"success": false, "error": e.to_string()}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;

    #[tokio::test]
    async fn trigger_build_reports_no_files_as_structured_failure() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let tool = TriggerBuildTool {
            file_store: store.clone(),
            error_store: store,
            workspace_root: dir.path().to_path_buf(),
            cache: BuildCache::new(),
        };
        let result = tool.execute(json!({"project_id": project.id.to_string()})).await;
        assert_eq!(result["success"], json!(false));
    }

    #[tokio::test]
    async fn resolve_error_on_unknown_id_reports_error() {
        let store = Arc::new(MockStore::new());
        let tool = ResolveErrorTool { error_store: store };
        let result = tool.execute(json!({"error_id": Uuid::new_v4().to_string()})).await;
        assert_eq!(result["success"], json!(false));
    }
}
