//! Idempotent on-disk scaffolding for a project workspace.
//!
//! Grounded on `create_backend_workspace` in `original_source`'s preview
//! module: directories and template files are created once and never
//! clobbered on subsequent calls, and the virtual environment is built in
//! the background rather than blocking the caller.

use super::layout::Workspace;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),
}

const BASE_PYPROJECT: &str = r#"[project]
name = "user-project"
version = "1.0.0"
description = "Generated application"
requires-python = ">=3.11,<3.12"
dependencies = []

[dependency-groups]
base = [
  "fastapi>=0.115.7",
  "uvicorn[standard]>=0.34.0",
  "pydantic>=2.10.5",
  "httpx>=0.28.1",
]
app = []
"#;

const BASE_MAIN_PY: &str = r#"from fastapi import FastAPI
from fastapi.middleware.cors import CORSMiddleware


def create_app() -> FastAPI:
    app = FastAPI(title="Generated Application", version="1.0.0")
    app.add_middleware(
        CORSMiddleware,
        allow_origins=["*"],
        allow_credentials=True,
        allow_methods=["*"],
        allow_headers=["*"],
    )

    import importlib
    import pkgutil
    from pathlib import Path

    apis_path = Path(__file__).parent / "app" / "apis"
    if apis_path.exists():
        for module_info in pkgutil.iter_modules([str(apis_path)]):
            module = importlib.import_module(f"app.apis.{module_info.name}")
            if hasattr(module, "router"):
                app.include_router(module.router)

    return app


app = create_app()
"#;

/// Ensure every directory and template file for `workspace` exists.
/// Never overwrites a file that's already there — generated content wins.
pub async fn ensure(workspace: &Workspace) -> Result<(), WorkspaceError> {
    tokio::fs::create_dir_all(workspace.backend_apis_dir()).await?;
    tokio::fs::create_dir_all(workspace.frontend_src_dir()).await?;

    write_if_missing(
        &workspace.backend_dir().join("app").join("__init__.py"),
        "",
    )
    .await?;
    write_if_missing(
        &workspace.backend_apis_dir().join("__init__.py"),
        "",
    )
    .await?;
    write_if_missing(&workspace.backend_pyproject_path(), BASE_PYPROJECT).await?;
    write_if_missing(&workspace.backend_main_path(), BASE_MAIN_PY).await?;

    Ok(())
}

async fn write_if_missing(path: &Path, content: &str) -> Result<(), WorkspaceError> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// True once `backend/.venv` exists — callers poll this rather than
/// blocking on venv creation.
pub async fn venv_ready(workspace: &Workspace) -> bool {
    tokio::fs::try_exists(workspace.backend_venv_dir())
        .await
        .unwrap_or(false)
}

/// Spawn venv creation as a detached background task. The caller does not
/// await this — `venv_ready` is how progress is observed.
pub fn spawn_venv_creation(workspace: Workspace) {
    tokio::spawn(async move {
        let venv_dir = workspace.backend_venv_dir();
        if tokio::fs::try_exists(&venv_dir).await.unwrap_or(false) {
            return;
        }
        let create = Command::new("python3")
            .args(["-m", "venv"])
            .arg(&venv_dir)
            .status()
            .await;
        match create {
            Ok(status) if status.success() => {
                tracing::info!(project_id = %workspace.project_id, "venv created");
            }
            Ok(status) => {
                tracing::warn!(project_id = %workspace.project_id, code = ?status.code(), "venv creation failed");
            }
            Err(e) => {
                tracing::warn!(project_id = %workspace.project_id, error = %e, "failed to spawn venv creation");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn ensure_creates_layout_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), Uuid::new_v4());

        ensure(&ws).await.unwrap();
        assert!(tokio::fs::try_exists(ws.backend_pyproject_path()).await.unwrap());

        tokio::fs::write(ws.backend_pyproject_path(), "custom").await.unwrap();
        ensure(&ws).await.unwrap();
        let content = tokio::fs::read_to_string(ws.backend_pyproject_path()).await.unwrap();
        assert_eq!(content, "custom");
    }

    #[tokio::test]
    async fn venv_ready_false_until_directory_exists() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), Uuid::new_v4());
        ensure(&ws).await.unwrap();
        assert!(!venv_ready(&ws).await);
        tokio::fs::create_dir_all(ws.backend_venv_dir()).await.unwrap();
        assert!(venv_ready(&ws).await);
    }
}
