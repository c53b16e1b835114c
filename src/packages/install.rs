//! Package installation subprocesses.
//!
//! Grounded on `install_packages_in_project` in `original_source`'s
//! preview module: update the manifest first, then best-effort install —
//! a failed install is logged and surfaced as a warning, never aborts the
//! caller (§7 `DependencyError` is non-fatal by design).

use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

const INSTALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub enum InstallOutcome {
    Installed(Vec<String>),
    Warning { installed: Vec<String>, failed: Vec<(String, String)> },
}

pub async fn install_python_packages(workspace: &Path, packages: &[String]) -> InstallOutcome {
    if packages.is_empty() {
        return InstallOutcome::Installed(Vec::new());
    }
    let mut installed = Vec::new();
    let mut failed = Vec::new();

    for package in packages {
        let run = timeout(
            INSTALL_TIMEOUT,
            Command::new("uv")
                .args(["pip", "install", package])
                .current_dir(workspace)
                .output(),
        )
        .await;

        match run {
            Ok(Ok(output)) if output.status.success() => installed.push(package.clone()),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                tracing::warn!(package = %package, %stderr, "python package install failed");
                failed.push((package.clone(), stderr));
            }
            Ok(Err(e)) => {
                tracing::warn!(package = %package, error = %e, "failed to spawn uv pip install");
                failed.push((package.clone(), e.to_string()));
            }
            Err(_) => {
                tracing::warn!(package = %package, "python package install timed out");
                failed.push((package.clone(), "timed out after 30s".to_string()));
            }
        }
    }

    if failed.is_empty() {
        InstallOutcome::Installed(installed)
    } else {
        InstallOutcome::Warning { installed, failed }
    }
}

pub async fn install_node_packages(workspace: &Path, packages: &[String]) -> InstallOutcome {
    if packages.is_empty() {
        return InstallOutcome::Installed(Vec::new());
    }
    let mut args = vec!["install".to_string(), "--no-audit".to_string(), "--no-fund".to_string()];
    args.extend(packages.iter().cloned());

    let run = timeout(
        Duration::from_secs(120),
        Command::new("npm").args(&args).current_dir(workspace).output(),
    )
    .await;

    match run {
        Ok(Ok(output)) if output.status.success() => InstallOutcome::Installed(packages.to_vec()),
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::warn!(%stderr, "npm install failed");
            InstallOutcome::Warning {
                installed: Vec::new(),
                failed: packages.iter().map(|p| (p.clone(), stderr.clone())).collect(),
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to spawn npm install");
            InstallOutcome::Warning {
                installed: Vec::new(),
                failed: packages.iter().map(|p| (p.clone(), e.to_string())).collect(),
            }
        }
        Err(_) => {
            tracing::warn!("npm install timed out");
            InstallOutcome::Warning {
                installed: Vec::new(),
                failed: packages
                    .iter()
                    .map(|p| (p.clone(), "timed out after 120s".to_string()))
                    .collect(),
            }
        }
    }
}
