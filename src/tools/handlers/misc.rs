//! `enable_integration` / `install_packages` / `visualize_data` /
//! `request_data`.
//!
//! `enable_integration`, `visualize_data`, and `request_data` have no
//! backing system in this core (integrations, chart rendering, and a
//! data-request inbox are explicit non-goals) — they return a structured
//! not-supported result rather than failing the dispatch contract.
//! `install_packages` does have a real backing (§C2) and performs a
//! best-effort install, never raising on a single package's failure.

use crate::packages::install;
use crate::tools::registry::{require_str, Tool};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

fn parse_uuid(raw: &str) -> Result<Uuid, Value> {
    Uuid::parse_str(raw).map_err(|e| json!({"success": false, "error": format!("invalid uuid: {e}")}))
}

pub struct EnableIntegrationTool;

#[async_trait]
impl Tool for EnableIntegrationTool {
    fn name(&self) -> &str {
        "enable_integration"
    }
    fn description(&self) -> &str {
        "Enable a third-party integration for the project."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "integration_name": {"type": "string"},
                "config": {"type": "object"}
            },
            "required": ["integration_name"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let name = require_str(&args, "integration_name").unwrap_or("unknown");
        json!({
            "success": false,
            "supported": false,
            "message": format!("integration '{name}' is not supported in this deployment"),
        })
    }
}

pub struct InstallPackagesTool {
    pub workspace_root: PathBuf,
}

#[async_trait]
impl Tool for InstallPackagesTool {
    fn name(&self) -> &str {
        "install_packages"
    }
    fn description(&self) -> &str {
        "Install Python (pip) or npm packages required by generated code."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "packages": {"type": "array", "items": {"type": "string"}},
                "package_manager": {"type": "string", "enum": ["pip", "npm"]}
            },
            "required": ["project_id", "packages", "package_manager"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let packages: Vec<String> = args
            .get("packages")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if packages.is_empty() {
            return json!({"success": true, "installed": Vec::<String>::new()});
        }
        let manager = require_str(&args, "package_manager").unwrap_or("pip");

        let workspace = crate::workspace::Workspace::new(&self.workspace_root, project_id);
        let outcome = if manager == "npm" {
            install::install_node_packages(&workspace.frontend_dir(), &packages).await
        } else {
            install::install_python_packages(&workspace.backend_dir(), &packages).await
        };

        match outcome {
            install::InstallOutcome::Installed(installed) => {
                json!({"success": true, "installed": installed})
            }
            install::InstallOutcome::Warning { installed, failed } => {
                json!({"success": true, "installed": installed, "failed": failed})
            }
        }
    }
}

pub struct VisualizeDataTool;

#[async_trait]
impl Tool for VisualizeDataTool {
    fn name(&self) -> &str {
        "visualize_data"
    }
    fn description(&self) -> &str {
        "Create a data visualization (chart, graph, table) from data."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "data": {"type": "array"},
                "chart_type": {"type": "string", "enum": ["bar", "line", "pie", "table", "scatter"]},
                "title": {"type": "string"}
            },
            "required": ["data", "chart_type"]
        })
    }
    async fn execute(&self, _args: Value) -> Value {
        json!({
            "success": false,
            "supported": false,
            "message": "chart rendering is not implemented in this deployment; generate a component that renders the data client-side instead",
        })
    }
}

pub struct RequestDataTool;

#[async_trait]
impl Tool for RequestDataTool {
    fn name(&self) -> &str {
        "request_data"
    }
    fn description(&self) -> &str {
        "Request data or files from the user."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {"type": "string"},
                "data_type": {"type": "string", "enum": ["file", "text", "json", "csv"]}
            },
            "required": ["message", "data_type"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let message = require_str(&args, "message").unwrap_or("");
        json!({
            "success": true,
            "supported": false,
            "message": format!("relay to user: {message}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enable_integration_reports_unsupported() {
        let tool = EnableIntegrationTool;
        let result = tool.execute(json!({"integration_name": "github"})).await;
        assert_eq!(result["supported"], json!(false));
    }

    #[tokio::test]
    async fn install_packages_with_empty_list_is_a_noop_success() {
        let tool = InstallPackagesTool {
            workspace_root: tempfile::tempdir().unwrap().path().to_path_buf(),
        };
        let result = tool
            .execute(json!({"project_id": Uuid::new_v4().to_string(), "packages": [], "package_manager": "pip"}))
            .await;
        assert_eq!(result["success"], json!(true));
    }

    #[tokio::test]
    async fn visualize_data_reports_unsupported() {
        let tool = VisualizeDataTool;
        let result = tool.execute(json!({"data": [], "chart_type": "bar"})).await;
        assert_eq!(result["supported"], json!(false));
    }
}
