//! Turns a feature request into a structured [`Plan`]: tasks, a database
//! schema, API endpoints, and pages — grounded on `ai_orchestrator.py`'s
//! `create_project_plan`, which prompts for exactly this JSON shape.

use crate::model::{ModelClient, ModelError, ModelMessage, ModelRequest};
use serde::{Deserialize, Serialize};

const PLANNING_PROMPT: &str = "\
You are a senior product engineer turning a feature request into an \
implementation plan for a small full-stack app. Respond with a single JSON \
object, no prose before or after it, shaped exactly like:

{
  \"description\": \"one paragraph summary of the feature\",
  \"tasks\": [{\"title\": \"...\", \"description\": \"...\", \"priority\": \"low|medium|high\", \"integrations\": [], \"labels\": []}],
  \"database_schema\": [{\"name\": \"table_name\", \"description\": \"...\", \"columns\": [{\"name\": \"...\", \"type\": \"TEXT|INTEGER|REAL|BOOLEAN\", \"constraints\": \"PRIMARY KEY|NOT NULL|...\"}]}],
  \"apis\": [{\"method\": \"GET|POST|PUT|DELETE\", \"endpoint\": \"/api/...\", \"description\": \"...\"}],
  \"pages\": [{\"name\": \"PageName\", \"route\": \"/path\", \"description\": \"...\"}]
}

Omit a top-level key entirely (rather than an empty array) only if it truly \
does not apply. Keep the plan small and concrete: prefer 1-3 tables, 2-5 \
endpoints, and 1-3 pages over an exhaustive design.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: String,
    #[serde(default)]
    pub constraints: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseTable {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<DatabaseColumn>,
}

impl DatabaseTable {
    /// Builds a `CREATE TABLE IF NOT EXISTS` statement matching the
    /// concatenation pattern used by the original migration generator.
    pub fn to_sql(&self) -> String {
        let column_defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {} {} {}", c.name, c.col_type, c.constraints).trim_end().to_string())
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
            self.name,
            column_defs.join(",\n")
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSpec {
    #[serde(default)]
    pub method: String,
    pub endpoint: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSpec {
    pub name: String,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub integrations: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

fn default_priority() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
    #[serde(default)]
    pub database_schema: Vec<DatabaseTable>,
    #[serde(default)]
    pub apis: Vec<ApiSpec>,
    #[serde(default)]
    pub pages: Vec<PageSpec>,
}

impl Plan {
    /// Concatenates every table's migration into one script, matching the
    /// original's single `auto_generated_schema` migration.
    pub fn migration_sql(&self) -> String {
        let mut sql = String::from("-- Auto-generated migration from project plan\n\n");
        for table in &self.database_schema {
            sql.push_str(&table.to_sql());
            sql.push('\n');
        }
        sql
    }
}

pub async fn create_project_plan(model: &dyn ModelClient, user_request: &str) -> Result<Plan, ModelError> {
    let request = ModelRequest::new(
        PLANNING_PROMPT,
        vec![ModelMessage::user(format!(
            "{user_request}\n\nPlease respond with a valid JSON object."
        ))],
    )
    .with_temperature(0.7);

    let value = model.complete_json(request).await?;
    serde_json::from_value(value).map_err(|e| ModelError::InvalidResponse(format!("plan did not match expected shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModelClient, ModelCompletion};

    #[test]
    fn table_to_sql_matches_expected_shape() {
        let table = DatabaseTable {
            name: "todos".into(),
            description: String::new(),
            columns: vec![
                DatabaseColumn { name: "id".into(), col_type: "INTEGER".into(), constraints: "PRIMARY KEY".into() },
                DatabaseColumn { name: "title".into(), col_type: "TEXT".into(), constraints: "NOT NULL".into() },
            ],
        };
        let sql = table.to_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS todos (\n"));
        assert!(sql.contains("id INTEGER PRIMARY KEY"));
        assert!(sql.contains("title TEXT NOT NULL"));
        assert!(sql.trim_end().ends_with(");"));
    }

    #[tokio::test]
    async fn parses_well_formed_plan_json() {
        let plan_json = serde_json::json!({
            "description": "a todo app",
            "tasks": [{"title": "Build backend", "priority": "high"}],
            "database_schema": [{"name": "todos", "columns": [{"name": "id", "type": "INTEGER", "constraints": "PRIMARY KEY"}]}],
            "apis": [{"method": "GET", "endpoint": "/api/todos", "description": "list todos"}],
            "pages": [{"name": "TodoList", "route": "/todos", "description": "main list page"}]
        });
        let client = MockModelClient::new(vec![ModelCompletion {
            text: plan_json.to_string(),
            ..Default::default()
        }]);
        let plan = create_project_plan(&client, "build me a todo app").await.unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].priority, "high");
        assert_eq!(plan.database_schema.len(), 1);
        assert_eq!(plan.apis[0].endpoint, "/api/todos");
        assert_eq!(plan.pages[0].name, "TodoList");
    }

    #[tokio::test]
    async fn missing_optional_fields_default_sensibly() {
        let plan_json = serde_json::json!({"description": "minimal", "tasks": [{"title": "only task"}]});
        let client = MockModelClient::new(vec![ModelCompletion {
            text: plan_json.to_string(),
            ..Default::default()
        }]);
        let plan = create_project_plan(&client, "minimal request").await.unwrap();
        assert_eq!(plan.tasks[0].priority, "medium");
        assert!(plan.database_schema.is_empty());
        assert!(plan.apis.is_empty());
    }

    #[tokio::test]
    async fn non_json_response_is_an_error() {
        let client = MockModelClient::new(vec![ModelCompletion {
            text: "not json at all".into(),
            ..Default::default()
        }]);
        let result = create_project_plan(&client, "whatever").await;
        assert!(result.is_err());
    }
}
