//! Directory layout helpers — pure path arithmetic, no I/O.

use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Workspace {
    pub project_id: Uuid,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(base: &Path, project_id: Uuid) -> Self {
        Self {
            project_id,
            root: base.join(project_id.to_string()),
        }
    }

    pub fn backend_dir(&self) -> PathBuf {
        self.root.join("backend")
    }

    pub fn backend_apis_dir(&self) -> PathBuf {
        self.backend_dir().join("app").join("apis")
    }

    pub fn backend_venv_dir(&self) -> PathBuf {
        self.backend_dir().join(".venv")
    }

    pub fn backend_pyproject_path(&self) -> PathBuf {
        self.backend_dir().join("pyproject.toml")
    }

    pub fn backend_main_path(&self) -> PathBuf {
        self.backend_dir().join("main.py")
    }

    pub fn frontend_dir(&self) -> PathBuf {
        self.root.join("frontend")
    }

    pub fn frontend_src_dir(&self) -> PathBuf {
        self.frontend_dir().join("src")
    }

    pub fn frontend_package_json_path(&self) -> PathBuf {
        self.frontend_dir().join("package.json")
    }

    pub fn frontend_dist_dir(&self) -> PathBuf {
        self.frontend_dir().join("dist")
    }

    /// Map a stored `GeneratedFile.path` to its on-disk location under
    /// `frontend/`, per §4.3/C4's normalisation rule: strip a leading
    /// `frontend/`, reject anything under `backend/`, root the remainder
    /// at `src/` if it isn't already.
    pub fn normalize_frontend_path(stored_path: &str) -> Option<String> {
        let mut path = stored_path;
        if let Some(rest) = path.strip_prefix("frontend/") {
            path = rest;
        }
        if path.starts_with("backend/") {
            return None;
        }
        if path.starts_with("src/") {
            Some(path.to_string())
        } else {
            Some(format!("src/{path}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_frontend_prefix() {
        assert_eq!(
            Workspace::normalize_frontend_path("frontend/src/App.tsx"),
            Some("src/App.tsx".to_string())
        );
    }

    #[test]
    fn normalize_roots_bare_paths_under_src() {
        assert_eq!(
            Workspace::normalize_frontend_path("App.tsx"),
            Some("src/App.tsx".to_string())
        );
    }

    #[test]
    fn normalize_rejects_backend_paths() {
        assert_eq!(Workspace::normalize_frontend_path("backend/main.py"), None);
        assert_eq!(
            Workspace::normalize_frontend_path("frontend/backend/main.py"),
            None
        );
    }
}
