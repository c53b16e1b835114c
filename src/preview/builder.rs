//! Top-level preview build pipeline.
//!
//! Grounded line-for-line on `build_preview()` in `original_source`'s
//! preview module: materialise files, fill autogen stubs, compose
//! `package.json`, install, bundle, parse failures into error records.

use super::autogen;
use crate::error_feed::report_build_errors;
use crate::packages::detect_packages;
use crate::store::{ErrorRecordStore, FileStore};
use crate::validator::Language;
use crate::workspace::Workspace;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no active files for project")]
    NoFiles,
    #[error("no frontend files after normalisation")]
    NoFrontendFiles,
    #[error("npm install timed out after 120s")]
    InstallTimeout,
    #[error("workspace io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub success: bool,
    pub logs: Vec<String>,
    pub dist_dir: Option<PathBuf>,
}

/// Last-write-wins cache of successful builds, keyed by project id.
#[derive(Default, Clone)]
pub struct BuildCache {
    inner: Arc<DashMap<Uuid, PathBuf>>,
}

impl BuildCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project_id: Uuid) -> Option<PathBuf> {
        self.inner.get(&project_id).map(|entry| entry.clone())
    }

    pub fn insert(&self, project_id: Uuid, dist_dir: PathBuf) {
        self.inner.insert(project_id, dist_dir);
    }
}

const PACKAGE_JSON_TEMPLATE: &str = r#"{
  "name": "preview-app",
  "version": "1.0.0",
  "type": "module",
  "scripts": {
    "dev": "vite",
    "build": "vite build",
    "preview": "vite preview"
  },
  "dependencies": {
    "react": "^18.3.1",
    "react-dom": "^18.3.1",
    "react-router-dom": "^6.20.0"
  },
  "devDependencies": {
    "@vitejs/plugin-react-swc": "^3.3.2",
    "vite": "^4.4.5",
    "typescript": "^5.2.2",
    "@types/react": "^18.2.32",
    "@types/react-dom": "^18.3.1",
    "tailwindcss": "^3.3.0",
    "postcss": "^8.4.31",
    "autoprefixer": "^10.4.16"
  }
}
"#;

const TAILWIND_CONFIG: &str = r#"/** @type {import('tailwindcss').Config} */
export default {
  content: ["./index.html", "./src/**/*.{js,ts,jsx,tsx}"],
  theme: { extend: {} },
  plugins: [],
}
"#;

const POSTCSS_CONFIG: &str = r#"export default {
  plugins: {
    tailwindcss: {},
    autoprefixer: {},
  },
}
"#;

const VITE_CONFIG: &str = r#"import { defineConfig } from 'vite'
import react from '@vitejs/plugin-react-swc'
import path from 'path'

export default defineConfig({
  plugins: [react()],
  base: './',
  resolve: {
    alias: {
      '@': path.resolve(__dirname, './src'),
      'app': path.resolve(__dirname, './src/lib/app.ts'),
    },
  },
  build: {
    outDir: 'dist',
    emptyOutDir: true,
  },
})
"#;

const TSCONFIG: &str = r#"{
  "compilerOptions": {
    "target": "ES2020",
    "useDefineForClassFields": true,
    "lib": ["ES2020", "DOM", "DOM.Iterable"],
    "module": "ESNext",
    "skipLibCheck": true,
    "moduleResolution": "bundler",
    "allowImportingTsExtensions": true,
    "resolveJsonModule": true,
    "isolatedModules": true,
    "noEmit": true,
    "jsx": "react-jsx",
    "strict": true,
    "noUnusedLocals": true,
    "noUnusedParameters": true,
    "noFallthroughCasesInSwitch": true
  },
  "include": ["src"]
}
"#;

fn index_html() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Preview App</title>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/main.tsx"></script>
  </body>
</html>
"#
    .to_string()
}

pub async fn build(
    project_id: Uuid,
    file_store: &dyn FileStore,
    error_store: &dyn ErrorRecordStore,
    workspace: &Workspace,
    cache: &BuildCache,
) -> Result<BuildOutcome, BuildError> {
    let mut logs = Vec::new();

    let files = file_store.list_active_files(project_id).await?;
    if files.is_empty() {
        return Err(BuildError::NoFiles);
    }
    logs.push(format!("found {} active files", files.len()));

    let frontend_dir = workspace.frontend_dir();
    let src_dir = workspace.frontend_src_dir();
    tokio::fs::create_dir_all(&src_dir).await?;

    let mut normalized_count = 0;
    for file in &files {
        let Some(normalized) = Workspace::normalize_frontend_path(&file.path) else {
            continue;
        };
        let dest = frontend_dir.join(&normalized);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, &file.content).await?;
        logs.push(format!("wrote {normalized}"));
        normalized_count += 1;
    }
    if normalized_count == 0 {
        return Err(BuildError::NoFrontendFiles);
    }

    autogen::fill_missing_pages(&src_dir, &mut logs).await?;
    autogen::fill_missing_components(&src_dir, &mut logs).await?;
    autogen::fill_static_stubs(&src_dir, &mut logs).await?;

    let mut package_json: serde_json::Value = serde_json::from_str(PACKAGE_JSON_TEMPLATE).unwrap();
    let mut detected: BTreeSet<String> = BTreeSet::new();
    for file in &files {
        let language = match file.path.rsplit('.').next() {
            Some("ts") | Some("tsx") | Some("js") => Language::Typescript,
            _ => continue,
        };
        detected.extend(detect_packages(language, &file.content));
    }
    if !detected.is_empty() {
        logs.push(format!("auto-detected npm packages: {detected:?}"));
        let deps = package_json["dependencies"].as_object_mut().unwrap();
        for pkg in &detected {
            deps.entry(pkg.clone())
                .or_insert_with(|| serde_json::Value::String("latest".to_string()));
        }
    }

    tokio::fs::write(
        workspace.frontend_package_json_path(),
        serde_json::to_string_pretty(&package_json).unwrap(),
    )
    .await?;
    tokio::fs::write(frontend_dir.join("tailwind.config.js"), TAILWIND_CONFIG).await?;
    tokio::fs::write(frontend_dir.join("postcss.config.js"), POSTCSS_CONFIG).await?;
    tokio::fs::write(frontend_dir.join("vite.config.ts"), VITE_CONFIG).await?;
    tokio::fs::write(frontend_dir.join("tsconfig.json"), TSCONFIG).await?;
    tokio::fs::write(frontend_dir.join("index.html"), index_html()).await?;

    logs.push("installing dependencies".to_string());
    let install = timeout(
        Duration::from_secs(120),
        Command::new("npm")
            .args(["install", "--legacy-peer-deps", "--no-audit", "--no-fund"])
            .current_dir(&frontend_dir)
            .output(),
    )
    .await
    .map_err(|_| BuildError::InstallTimeout)??;

    if !install.status.success() {
        let stderr = String::from_utf8_lossy(&install.stderr).to_string();
        logs.push(format!("npm install failed:\n{stderr}"));
        return Ok(BuildOutcome { success: false, logs, dist_dir: None });
    }
    logs.push("dependencies installed".to_string());

    logs.push("building with vite".to_string());
    let build_run = Command::new("npm")
        .args(["run", "build"])
        .current_dir(&frontend_dir)
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&build_run.stdout).to_string();
    let stderr = String::from_utf8_lossy(&build_run.stderr).to_string();
    if !stdout.is_empty() {
        logs.push(format!("build output:\n{stdout}"));
    }
    if !stderr.is_empty() {
        logs.push(format!("build errors:\n{stderr}"));
    }

    if !build_run.status.success() {
        let combined = format!("{stdout}\n{stderr}");
        let reported = report_build_errors(
            error_store,
            project_id,
            &combined,
            &frontend_dir,
        )
        .await?;
        logs.push(format!("reported {} build errors", reported.len()));
        return Ok(BuildOutcome { success: false, logs, dist_dir: None });
    }

    logs.push("build completed successfully".to_string());
    let dist_dir = workspace.frontend_dist_dir();
    cache.insert(project_id, dist_dir.clone());

    Ok(BuildOutcome {
        success: true,
        logs,
        dist_dir: Some(dist_dir),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_is_last_write_wins() {
        let cache = BuildCache::new();
        let id = Uuid::new_v4();
        cache.insert(id, PathBuf::from("/a"));
        cache.insert(id, PathBuf::from("/b"));
        assert_eq!(cache.get(id), Some(PathBuf::from("/b")));
    }

    #[test]
    fn cache_miss_returns_none() {
        let cache = BuildCache::new();
        assert_eq!(cache.get(Uuid::new_v4()), None);
    }
}
