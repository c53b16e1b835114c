//! Glue between the build-log parser and `ErrorRecordStore`.

use super::parser::{parse_build_errors, read_code_snippet};
use crate::store::{ErrorKind, ErrorRecord, ErrorRecordStore, ErrorStatus, StoreResult};
use chrono::Utc;
use std::path::Path;
use uuid::Uuid;

/// Parse `build_output` and insert one `ErrorRecord` per match, reading a
/// best-effort code snippet from `workspace_root` for each.
pub async fn report_build_errors(
    store: &dyn ErrorRecordStore,
    project_id: Uuid,
    build_output: &str,
    workspace_root: &Path,
) -> StoreResult<Vec<ErrorRecord>> {
    let root_str = workspace_root.to_string_lossy();
    let parsed = parse_build_errors(build_output, &root_str);
    let mut inserted = Vec::with_capacity(parsed.len());

    for error in parsed {
        let snippet = error
            .line
            .and_then(|line| read_code_snippet(&workspace_root.join(&error.file), line));
        let now = Utc::now();
        let record = ErrorRecord {
            id: Uuid::new_v4(),
            project_id,
            kind: ErrorKind::Build,
            message: format!(
                "{}: {}",
                error.error_code.as_deref().unwrap_or("ERROR"),
                error.message
            ),
            stack: Some(build_output.to_string()),
            file: Some(error.file),
            line: error.line,
            code_snippet: snippet,
            context: serde_json::json!({ "error_code": error.error_code }),
            status: ErrorStatus::Open,
            attempts: 0,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        };
        inserted.push(store.insert(record).await?);
    }

    Ok(inserted)
}

/// Insert a single runtime error reported from the browser sandbox via
/// `window.onerror` / `window.onunhandledrejection`.
pub async fn report_runtime_error(
    store: &dyn ErrorRecordStore,
    project_id: Uuid,
    message: String,
    stack: Option<String>,
    file: Option<String>,
    line: Option<i64>,
) -> StoreResult<ErrorRecord> {
    let now = Utc::now();
    let record = ErrorRecord {
        id: Uuid::new_v4(),
        project_id,
        kind: ErrorKind::Runtime,
        message,
        stack,
        file,
        line,
        code_snippet: None,
        context: serde_json::json!({}),
        status: ErrorStatus::Open,
        attempts: 0,
        resolution_notes: None,
        created_at: now,
        updated_at: now,
    };
    store.insert(record).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;

    #[tokio::test]
    async fn report_build_errors_inserts_one_record_per_match() {
        let store = MockStore::new();
        let output = "src/App.tsx:10:5 - error TS2304: Cannot find name 'foo'.\n";
        let inserted = report_build_errors(&store, Uuid::new_v4(), output, Path::new("/tmp/nope"))
            .await
            .unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].kind, ErrorKind::Build);
        assert_eq!(inserted[0].status, ErrorStatus::Open);
    }

    #[tokio::test]
    async fn report_runtime_error_inserts_record() {
        let store = MockStore::new();
        let record = report_runtime_error(
            &store,
            Uuid::new_v4(),
            "TypeError: x is not a function".to_string(),
            None,
            Some("src/App.tsx".to_string()),
            Some(42),
        )
        .await
        .unwrap();
        assert_eq!(record.kind, ErrorKind::Runtime);
    }
}
