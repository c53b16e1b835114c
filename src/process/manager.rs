//! Backend process lifecycle: start/stop/restart/status for one generated
//! FastAPI process per project.
//!
//! Grounded on the `project-backend` manager role described in
//! `original_source` (pid/port tracking, health checks, signal-based
//! shutdown) and on the teacher's choice of `dashmap` for a concurrent
//! in-memory process table.

use super::ports::PortPool;
use crate::store::{BackendStatus, RunningBackend};
use crate::workspace::Workspace;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("backend for project {0} is not running")]
    NotRunning(Uuid),
    #[error("no free port available")]
    NoFreePort,
    #[error("venv not ready for project {0}")]
    VenvNotReady(Uuid),
    #[error("failed to spawn backend process: {0}")]
    Spawn(#[from] std::io::Error),
}

struct ManagedProcess {
    backend: RunningBackend,
    child: Child,
}

pub struct ProcessManager {
    processes: DashMap<Uuid, ManagedProcess>,
    ports: Arc<PortPool>,
    http: reqwest::Client,
}

impl ProcessManager {
    pub fn new(ports: Arc<PortPool>) -> Self {
        Self {
            processes: DashMap::new(),
            ports,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .expect("reqwest client"),
        }
    }

    /// Idempotent: returns the existing backend unchanged if already
    /// running for this project.
    pub async fn start(
        &self,
        workspace: &Workspace,
        venv_ready: bool,
    ) -> Result<RunningBackend, ProcessError> {
        let project_id = workspace.project_id;
        if let Some(entry) = self.processes.get(&project_id) {
            return Ok(entry.backend.clone());
        }
        if !venv_ready {
            return Err(ProcessError::VenvNotReady(project_id));
        }
        let port = self.ports.allocate().ok_or(ProcessError::NoFreePort)?;

        let python = workspace.backend_venv_dir().join("bin").join("python");
        let spawn_result = Command::new(&python)
            .arg("main.py")
            .current_dir(workspace.backend_dir())
            .env("PORT", port.to_string())
            .kill_on_drop(true)
            .spawn();

        let child = match spawn_result {
            Ok(child) => child,
            Err(e) => {
                self.ports.release(port);
                return Err(ProcessError::Spawn(e));
            }
        };

        let backend = RunningBackend {
            project_id,
            pid: child.id().unwrap_or_default(),
            port,
            status: BackendStatus::Running,
            started_at: Utc::now(),
            workspace_path: workspace.backend_dir().to_string_lossy().to_string(),
        };

        self.processes.insert(
            project_id,
            ManagedProcess {
                backend: backend.clone(),
                child,
            },
        );

        Ok(backend)
    }

    pub async fn stop(&self, project_id: Uuid) -> Result<(), ProcessError> {
        let Some((_, mut managed)) = self.processes.remove(&project_id) else {
            return Err(ProcessError::NotRunning(project_id));
        };
        self.ports.release(managed.backend.port);

        terminate_gracefully(&mut managed.child, managed.backend.pid).await;
        Ok(())
    }

    pub async fn restart(
        &self,
        workspace: &Workspace,
        venv_ready: bool,
    ) -> Result<RunningBackend, ProcessError> {
        let _ = self.stop(workspace.project_id).await;
        sleep(Duration::from_millis(1000)).await;
        self.start(workspace, venv_ready).await
    }

    /// Probe liveness; removes the entry if the OS process has already
    /// exited, and classifies healthy/unhealthy via an HTTP health check
    /// when alive.
    pub async fn status(&self, project_id: Uuid) -> Option<RunningBackend> {
        let alive = {
            let mut entry = self.processes.get_mut(&project_id)?;
            match entry.child.try_wait() {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(_) => false,
            }
        };

        if !alive {
            if let Some((_, managed)) = self.processes.remove(&project_id) {
                self.ports.release(managed.backend.port);
            }
            return None;
        }

        let mut backend = self.processes.get(&project_id)?.backend.clone();
        backend.status = self.health_check(backend.port).await;
        if let Some(mut entry) = self.processes.get_mut(&project_id) {
            entry.backend.status = backend.status;
        }
        Some(backend)
    }

    async fn health_check(&self, port: u16) -> BackendStatus {
        let url = format!("http://127.0.0.1:{port}/health");
        match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => BackendStatus::Running,
            _ => BackendStatus::Error,
        }
    }

    pub fn list(&self) -> Vec<RunningBackend> {
        self.processes.iter().map(|e| e.backend.clone()).collect()
    }

    pub async fn stop_all(&self) {
        let ids: Vec<Uuid> = self.processes.iter().map(|e| *e.key()).collect();
        for id in ids {
            let _ = self.stop(id).await;
        }
    }
}

#[cfg(unix)]
async fn terminate_gracefully(child: &mut Child, pid: u32) {
    unsafe {
        libc::kill(pid as i32, libc::SIGTERM);
    }

    for _ in 0..50 {
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        sleep(Duration::from_millis(100)).await;
    }

    unsafe {
        libc::kill(pid as i32, libc::SIGKILL);
    }
    let _ = child.wait().await;
}

#[cfg(not(unix))]
async fn terminate_gracefully(child: &mut Child, _pid: u32) {
    let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_without_venv_fails() {
        let manager = ProcessManager::new(Arc::new(PortPool::new(19000, 10)));
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path(), Uuid::new_v4());
        let result = manager.start(&workspace, false).await;
        assert!(matches!(result, Err(ProcessError::VenvNotReady(_))));
    }

    #[tokio::test]
    async fn status_on_unknown_project_is_none() {
        let manager = ProcessManager::new(Arc::new(PortPool::new(19010, 10)));
        assert!(manager.status(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn stop_on_unknown_project_errors() {
        let manager = ProcessManager::new(Arc::new(PortPool::new(19020, 10)));
        let result = manager.stop(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ProcessError::NotRunning(_))));
    }
}
