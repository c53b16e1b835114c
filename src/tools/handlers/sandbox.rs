//! `run_sql_query` / `get_sql_schema` / `run_migration` /
//! `run_python_script` / `read_logs` / `test_endpoint` / `troubleshoot`.
//!
//! These operate against a *generated project's* own backend, not the
//! orchestrator's own store: a per-project sqlite file under its
//! workspace, its venv's python interpreter, its log file, and (for
//! `test_endpoint`) its running process via [`ProcessManager`].

use crate::process::ProcessManager;
use crate::tools::registry::{optional_str, require_str, Tool};
use crate::workspace::Workspace;
use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

fn parse_uuid(raw: &str) -> Result<Uuid, Value> {
    Uuid::parse_str(raw).map_err(|e| json!({"success": false, "error": format!("invalid uuid: {e}")}))
}

fn project_db_path(workspace_root: &std::path::Path, project_id: Uuid) -> PathBuf {
    Workspace::new(workspace_root, project_id).backend_dir().join("app.db")
}

pub struct RunSqlQueryTool {
    pub workspace_root: PathBuf,
}

#[async_trait]
impl Tool for RunSqlQueryTool {
    fn name(&self) -> &str {
        "run_sql_query"
    }
    fn description(&self) -> &str {
        "Execute a SQL statement against the generated project's own sqlite database."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "query": {"type": "string"},
                "query_type": {"type": "string", "enum": ["select", "insert", "update", "delete"]}
            },
            "required": ["project_id", "query", "query_type"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let query = match require_str(&args, "query") {
            Ok(q) => q.to_string(),
            Err(e) => return e,
        };
        let is_select = require_str(&args, "query_type").map(|t| t == "select").unwrap_or(false);
        let db_path = project_db_path(&self.workspace_root, project_id);

        let result = tokio::task::spawn_blocking(move || run_query(&db_path, &query, is_select)).await;
        match result {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => json!({"success": false, "error": e}),
            Err(e) => json!({"success": false, "error": format!("query task panicked: {e}")}),
        }
    }
}

fn run_query(db_path: &std::path::Path, query: &str, is_select: bool) -> Result<Value, String> {
    let conn = Connection::open(db_path).map_err(|e| e.to_string())?;
    if is_select {
        let mut stmt = conn.prepare(query).map_err(|e| e.to_string())?;
        let column_count = stmt.column_count();
        let column_names: Vec<String> = (0..column_count)
            .map(|i| stmt.column_name(i).unwrap_or("?").to_string())
            .collect();
        let mut rows_out = Vec::new();
        let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let mut obj = serde_json::Map::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: rusqlite::types::Value = row.get(i).map_err(|e| e.to_string())?;
                obj.insert(name.clone(), sqlite_value_to_json(value));
            }
            rows_out.push(Value::Object(obj));
        }
        Ok(json!({"success": true, "rows": rows_out}))
    } else {
        let affected = conn.execute(query, []).map_err(|e| e.to_string())?;
        Ok(json!({"success": true, "rows_affected": affected}))
    }
}

fn sqlite_value_to_json(value: rusqlite::types::Value) -> Value {
    use rusqlite::types::Value as V;
    match value {
        V::Null => Value::Null,
        V::Integer(i) => json!(i),
        V::Real(f) => json!(f),
        V::Text(s) => json!(s),
        V::Blob(b) => json!(format!("<{} bytes>", b.len())),
    }
}

pub struct GetSqlSchemaTool {
    pub workspace_root: PathBuf,
}

#[async_trait]
impl Tool for GetSqlSchemaTool {
    fn name(&self) -> &str {
        "get_sql_schema"
    }
    fn description(&self) -> &str {
        "Get the table definitions in the generated project's database."
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
        let db_path = project_db_path(&self.workspace_root, project_id);

        let result = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;
            let mut stmt = conn
                .prepare("SELECT name, sql FROM sqlite_master WHERE type = 'table'")
                .map_err(|e| e.to_string())?;
            let mut tables = Vec::new();
            let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
            while let Some(row) = rows.next().map_err(|e| e.to_string())? {
                let name: String = row.get(0).map_err(|e| e.to_string())?;
                let sql: Option<String> = row.get(1).map_err(|e| e.to_string())?;
                tables.push(json!({"name": name, "sql": sql}));
            }
            Ok::<Value, String>(json!({"success": true, "tables": tables}))
        })
        .await;

        match result {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => json!({"success": false, "error": e}),
            Err(e) => json!({"success": false, "error": format!("schema task panicked: {e}")}),
        }
    }
}

pub struct RunMigrationTool {
    pub workspace_root: PathBuf,
}

#[async_trait]
impl Tool for RunMigrationTool {
    fn name(&self) -> &str {
        "run_migration"
    }
    fn description(&self) -> &str {
        "Run a SQL migration script against the generated project's database."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "migration_name": {"type": "string"},
                "sql": {"type": "string"}
            },
            "required": ["project_id", "migration_name", "sql"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let migration_name = match require_str(&args, "migration_name") {
            Ok(n) => n.to_string(),
            Err(e) => return e,
        };
        let sql = match require_str(&args, "sql") {
            Ok(s) => s.to_string(),
            Err(e) => return e,
        };
        let db_path = project_db_path(&self.workspace_root, project_id);

        let result = tokio::task::spawn_blocking(move || {
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;
            conn.execute_batch(&sql).map_err(|e| e.to_string())
        })
        .await;

        match result {
            Ok(Ok(())) => json!({"success": true, "migration_name": migration_name}),
            Ok(Err(e)) => json!({"success": false, "error": e}),
            Err(e) => json!({"success": false, "error": format!("migration task panicked: {e}")}),
        }
    }
}

pub struct RunPythonScriptTool {
    pub workspace_root: PathBuf,
}

#[async_trait]
impl Tool for RunPythonScriptTool {
    fn name(&self) -> &str {
        "run_python_script"
    }
    fn description(&self) -> &str {
        "Execute a short Python script inside the project's virtualenv for testing or prototyping."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "script": {"type": "string"}
            },
            "required": ["project_id", "script"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let script = match require_str(&args, "script") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let workspace = Workspace::new(&self.workspace_root, project_id);
        let python = workspace.backend_venv_dir().join("bin").join("python");

        let run = timeout(
            Duration::from_secs(15),
            Command::new(&python)
                .arg("-c")
                .arg(script)
                .current_dir(workspace.backend_dir())
                .output(),
        )
        .await;

        match run {
            Ok(Ok(output)) => json!({
                "success": output.status.success(),
                "stdout": String::from_utf8_lossy(&output.stdout),
                "stderr": String::from_utf8_lossy(&output.stderr),
            }),
            Ok(Err(e)) => json!({"success": false, "error": format!("failed to spawn python: {e}")}),
            Err(_) => json!({"success": false, "error": "script timed out after 15s"}),
        }
    }
}

pub struct ReadLogsTool {
    pub workspace_root: PathBuf,
}

#[async_trait]
impl Tool for ReadLogsTool {
    fn name(&self) -> &str {
        "read_logs"
    }
    fn description(&self) -> &str {
        "Read the generated project's backend log file, optionally filtered by minimum level."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "level": {"type": "string", "enum": ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]},
                "limit": {"type": "integer"}
            },
            "required": ["project_id"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let level = optional_str(&args, "level");
        let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(100) as usize;
        let workspace = Workspace::new(&self.workspace_root, project_id);
        let log_path = workspace.backend_dir().join("app.log");

        let content = match tokio::fs::read_to_string(&log_path).await {
            Ok(c) => c,
            Err(_) => return json!({"success": true, "lines": Vec::<String>::new()}),
        };

        let filtered: Vec<&str> = content
            .lines()
            .filter(|line| level.map(|lvl| line.contains(lvl)).unwrap_or(true))
            .collect();
        let tail: Vec<&str> = filtered
            .iter()
            .rev()
            .take(limit)
            .rev()
            .copied()
            .collect();

        json!({"success": true, "lines": tail})
    }
}

pub struct TestEndpointTool {
    pub workspace_root: PathBuf,
    pub processes: Arc<ProcessManager>,
}

#[async_trait]
impl Tool for TestEndpointTool {
    fn name(&self) -> &str {
        "test_endpoint"
    }
    fn description(&self) -> &str {
        "Call an endpoint on the project's running backend to verify it behaves as expected."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "string"},
                "endpoint_path": {"type": "string"},
                "method": {"type": "string", "enum": ["GET", "POST", "PUT", "DELETE"]},
                "test_data": {"type": "object"}
            },
            "required": ["project_id", "endpoint_path", "method"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let project_id = match require_str(&args, "project_id").and_then(|s| parse_uuid(s)) {
            Ok(id) => id,
            Err(e) => return e,
        };
        let path = match require_str(&args, "endpoint_path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        let method = require_str(&args, "method").unwrap_or("GET").to_uppercase();

        let Some(backend) = self.processes.status(project_id).await else {
            return json!({"success": false, "error": "backend is not running for this project"});
        };

        let url = format!("http://127.0.0.1:{}{}", backend.port, path);
        let client = reqwest::Client::new();
        let mut request = match method.as_str() {
            "POST" => client.post(&url),
            "PUT" => client.put(&url),
            "DELETE" => client.delete(&url),
            _ => client.get(&url),
        };
        if let Some(body) = args.get("test_data") {
            request = request.json(body);
        }

        match timeout(Duration::from_secs(10), request.send()).await {
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                json!({"success": true, "status": status, "body": body})
            }
            Ok(Err(e)) => json!({"success": false, "error": e.to_string()}),
            Err(_) => json!({"success": false, "error": "request timed out after 10s"}),
        }
    }
}

pub struct TroubleshootTool;

#[async_trait]
impl Tool for TroubleshootTool {
    fn name(&self) -> &str {
        "troubleshoot"
    }
    fn description(&self) -> &str {
        "Offer a best-effort diagnosis for an error message based on common failure patterns."
    }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "error_message": {"type": "string"},
                "context": {"type": "string"}
            },
            "required": ["error_message"]
        })
    }
    async fn execute(&self, args: Value) -> Value {
        let message = match require_str(&args, "error_message") {
            Ok(m) => m,
            Err(e) => return e,
        };
        let suggestion = heuristic_suggestion(message);
        json!({"success": true, "suggestion": suggestion})
    }
}

fn heuristic_suggestion(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("modulenotfounderror") || lower.contains("cannot find module") {
        "A dependency is missing. Run install_packages with the missing module name."
    } else if lower.contains("syntaxerror") {
        "The generated file has invalid syntax; re-read the file and regenerate the broken section."
    } else if lower.contains("econnrefused") || lower.contains("connection refused") {
        "The backend process is not running or hasn't bound its port yet; check status before retrying."
    } else if lower.contains("undefined") && lower.contains("is not a function") {
        "A component or utility is being called before it's defined; check import paths and stub generation."
    } else {
        "No specific pattern matched; inspect the full stack trace and the referenced file/line."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_migration_then_query_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let project_id = Uuid::new_v4();
        let migrate = RunMigrationTool {
            workspace_root: dir.path().to_path_buf(),
        };
        let migrate_result = migrate
            .execute(json!({
                "project_id": project_id.to_string(),
                "migration_name": "init",
                "sql": "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT)"
            }))
            .await;
        assert_eq!(migrate_result["success"], json!(true));

        let query = RunSqlQueryTool {
            workspace_root: dir.path().to_path_buf(),
        };
        let insert = query
            .execute(json!({
                "project_id": project_id.to_string(),
                "query": "INSERT INTO widgets (name) VALUES ('a')",
                "query_type": "insert"
            }))
            .await;
        assert_eq!(insert["success"], json!(true));

        let select = query
            .execute(json!({
                "project_id": project_id.to_string(),
                "query": "SELECT name FROM widgets",
                "query_type": "select"
            }))
            .await;
        assert_eq!(select["rows"][0]["name"], json!("a"));
    }

    #[tokio::test]
    async fn get_sql_schema_lists_created_tables() {
        let dir = tempfile::tempdir().unwrap();
        let project_id = Uuid::new_v4();
        let migrate = RunMigrationTool {
            workspace_root: dir.path().to_path_buf(),
        };
        migrate
            .execute(json!({
                "project_id": project_id.to_string(),
                "migration_name": "init",
                "sql": "CREATE TABLE widgets (id INTEGER PRIMARY KEY)"
            }))
            .await;

        let schema = GetSqlSchemaTool {
            workspace_root: dir.path().to_path_buf(),
        };
        let result = schema.execute(json!({"project_id": project_id.to_string()})).await;
        assert_eq!(result["tables"][0]["name"], json!("widgets"));
    }

    #[tokio::test]
    async fn read_logs_on_missing_file_returns_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadLogsTool {
            workspace_root: dir.path().to_path_buf(),
        };
        let result = tool.execute(json!({"project_id": Uuid::new_v4().to_string()})).await;
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["lines"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn troubleshoot_matches_module_not_found_pattern() {
        let tool = TroubleshootTool;
        let result = tool
            .execute(json!({"error_message": "ModuleNotFoundError: No module named 'pandas'"}))
            .await;
        assert!(result["suggestion"].as_str().unwrap().contains("install_packages"));
    }
}
