//! Auto-heal loop: build, read open errors, ask the model for a fix, apply
//! it, and verify the fix actually cleared the error before resolving it.
//!
//! Grounded on `ai_orchestrator.py`'s debugging flow (`trigger_build` /
//! `get_open_errors` / targeted fix / `resolve_error`), tightened per the
//! stricter resolution rule: a record is only marked resolved once a fresh
//! build no longer reports an open error at the same `(file, line)`.

use crate::model::{ModelClient, ModelMessage, ModelRequest};
use crate::store::ErrorRecordStore;
use crate::tools::ToolRegistry;
use crate::validator::{self, Language};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

const MAX_ATTEMPTS: u32 = 3;
const ERRORS_PER_ATTEMPT: usize = 3;

const FIX_SYSTEM_PROMPT: &str = "\
You are debugging a generated application file. You will be given the \
failing file's full content, the error message, and (when available) the \
offending line and a short snippet around it. Reply with the complete, \
corrected file content only — no explanations, no markdown fences.";

const VALIDATION_FIX_SYSTEM_PROMPT: &str = "\
You are fixing a generated application file that fails validation before it \
has even been saved. You will be given the validation errors and the full \
file content. Reply with the complete, corrected file content only — no \
explanations, no markdown fences.";

/// Gives the model one shot at fixing `content` against its own validation
/// errors, before the caller gives up and surfaces them to the client.
/// Returns the corrected content only if it re-validates clean.
pub async fn heal_validation_errors(model: &dyn ModelClient, language: Language, content: &str) -> Option<String> {
    let validation = validator::validate(language, content);
    if validation.is_valid {
        return Some(content.to_string());
    }

    let messages: Vec<String> = validation.errors.iter().map(|e| e.message.clone()).collect();
    let prompt = format!("Validation errors:\n{}\n\nFull file:\n{content}", messages.join("\n"));
    let request =
        ModelRequest::new(VALIDATION_FIX_SYSTEM_PROMPT, vec![ModelMessage::user(prompt)]).with_temperature(0.1);

    let fixed = match model.complete(request).await {
        Ok(completion) => super::generator::strip_code_fences(&completion.text),
        Err(_) => return None,
    };

    if validator::validate(language, &fixed).is_valid {
        Some(fixed)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct HealAttempt {
    pub error_id: Uuid,
    pub file: String,
    pub line: Option<i64>,
    pub message: String,
    pub fixed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HealOutcome {
    pub build_succeeded: bool,
    pub attempts: Vec<HealAttempt>,
}

fn fix_prompt(file: &str, line: Option<i64>, message: &str, snippet: Option<&str>, full_file: &str) -> String {
    format!(
        "File: {file}\nLine: {}\nError: {message}\nSnippet:\n{}\n\nFull file:\n{full_file}",
        line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".into()),
        snippet.unwrap_or("(none)"),
    )
}

/// Drives up to [`MAX_ATTEMPTS`] rounds of build-diagnose-fix for `project_id`.
/// Never panics or propagates: every internal failure degrades to "this
/// attempt fixed nothing" so the loop always returns a summary.
pub async fn auto_heal(
    model: &dyn ModelClient,
    tools: &ToolRegistry,
    error_store: &Arc<dyn ErrorRecordStore>,
    project_id: Uuid,
) -> HealOutcome {
    let mut outcome = HealOutcome::default();

    for attempt_num in 0..MAX_ATTEMPTS {
        let build_result = tools.execute("trigger_build", json!({"project_id": project_id})).await;
        if build_result["success"].as_bool().unwrap_or(false) {
            outcome.build_succeeded = true;
            return outcome;
        }

        let errors_result = tools.execute("get_open_errors", json!({"project_id": project_id})).await;
        let errors: Vec<Value> = errors_result["errors"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        if errors.is_empty() {
            break;
        }

        for error in errors.into_iter().take(ERRORS_PER_ATTEMPT) {
            let Some(error_id) = error["id"].as_str().and_then(|s| Uuid::parse_str(s).ok()) else {
                continue;
            };
            let file = error["file"].as_str().unwrap_or("").to_string();
            let line = error["line"].as_i64();
            let message = error["message"].as_str().unwrap_or("unknown error").to_string();
            let snippet = error["code_snippet"].as_str().map(str::to_string);

            if file.is_empty() {
                continue;
            }

            let read_result = tools
                .execute("read_files", json!({"project_id": project_id, "paths": [file]}))
                .await;
            let full_file = read_result["files"]
                .as_array()
                .and_then(|files| files.first())
                .and_then(|f| f["content"].as_str())
                .unwrap_or("")
                .to_string();

            let prompt = fix_prompt(&file, line, &message, snippet.as_deref(), &full_file);
            let request = ModelRequest::new(FIX_SYSTEM_PROMPT, vec![ModelMessage::user(prompt)])
                .with_temperature(0.1);

            let fixed = match model.complete(request).await {
                Ok(completion) => {
                    let fixed_content = super::generator::strip_code_fences(&completion.text);
                    let update = tools
                        .execute(
                            "update_file",
                            json!({"project_id": project_id, "path": file, "content": fixed_content}),
                        )
                        .await;
                    update["success"].as_bool().unwrap_or(false)
                }
                Err(_) => false,
            };

            // Every error visited this attempt gets its counter bumped,
            // win or lose — only a rebuild confirming the fix clears it
            // resolves the record instead.
            let _ = error_store.increment_attempts(error_id).await;

            outcome.attempts.push(HealAttempt { error_id, file: file.clone(), line, message: message.clone(), fixed });
        }

        // Verify: rebuild and check whether each fixed-candidate coordinate
        // still has an open error before resolving it.
        let _ = tools.execute("trigger_build", json!({"project_id": project_id})).await;
        for attempt in outcome.attempts.iter_mut().filter(|a| a.fixed) {
            let still_open = error_store
                .find_open_at(project_id, &attempt.file, attempt.line)
                .await
                .unwrap_or(None);
            match still_open {
                Some(_) => {
                    attempt.fixed = false;
                }
                None => {
                    let _ = tools
                        .execute(
                            "resolve_error",
                            json!({
                                "error_id": attempt.error_id,
                                "resolution_notes": format!("auto-fixed on attempt {}", attempt_num + 1),
                            }),
                        )
                        .await;
                }
            }
        }
    }

    let final_build = tools.execute("trigger_build", json!({"project_id": project_id})).await;
    outcome.build_succeeded = final_build["success"].as_bool().unwrap_or(false);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModelClient, ModelCompletion};
    use crate::store::mock::MockStore;
    use crate::tools::handlers::build::{GetOpenErrorsTool, ResolveErrorTool, TriggerBuildTool};
    use crate::tools::handlers::files::{ReadFilesTool, UpdateFileTool};
    use crate::preview::BuildCache;

    fn build_registry(store: Arc<MockStore>, workspace_root: std::path::PathBuf) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TriggerBuildTool {
            file_store: store.clone(),
            error_store: store.clone(),
            workspace_root,
            cache: BuildCache::new(),
        }));
        registry.register(Arc::new(GetOpenErrorsTool { error_store: store.clone() }));
        registry.register(Arc::new(ReadFilesTool { store: store.clone() }));
        registry.register(Arc::new(UpdateFileTool { store: store.clone() }));
        registry.register(Arc::new(ResolveErrorTool { error_store: store.clone() }));
        registry
    }

    #[tokio::test]
    async fn no_open_errors_stops_after_first_build_check() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let registry = build_registry(store.clone(), dir.path().to_path_buf());
        let client = MockModelClient::new(vec![]);
        let error_store: Arc<dyn ErrorRecordStore> = store;

        let outcome = auto_heal(&client, &registry, &error_store, project.id).await;
        assert!(!outcome.build_succeeded);
        assert!(outcome.attempts.is_empty());
        assert_eq!(client.requests_seen().await, 0);
    }

    #[tokio::test]
    async fn unfixable_file_yields_failed_attempt() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        store.create_file(project.id, "frontend/src/pages/Broken.tsx", "broken(").await.unwrap();

        let error = crate::store::models::ErrorRecord {
            id: Uuid::new_v4(),
            project_id: project.id,
            kind: crate::store::models::ErrorKind::Build,
            message: "unexpected token".into(),
            stack: None,
            file: Some("frontend/src/pages/Broken.tsx".into()),
            line: Some(1),
            code_snippet: Some("broken(".into()),
            context: Value::Null,
            status: crate::store::models::ErrorStatus::Open,
            attempts: 0,
            resolution_notes: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        store.clone().insert(error).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let registry = build_registry(store.clone(), dir.path().to_path_buf());
        let client = MockModelClient::new(vec![ModelCompletion { text: "still broken(".into(), ..Default::default() }]);
        let error_store: Arc<dyn ErrorRecordStore> = store;

        let outcome = auto_heal(&client, &registry, &error_store, project.id).await;
        assert!(!outcome.attempts.is_empty());
        assert!(outcome.attempts.iter().any(|a| a.file == "frontend/src/pages/Broken.tsx"));
    }
}
