//! Idempotent stub generation for a materialised frontend workspace.
//!
//! Grounded line-for-line on the auto-fix blocks of `build_preview()` in
//! `original_source`'s preview module: every stub is written only when
//! missing, never clobbering a real generated file.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

fn page_import_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"import\s+(\w+)\s+from\s+['"]\./pages/(\w+)['"]"#).expect("valid regex")
    })
}

fn component_import_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"import\s*\{\s*([^}]+)\s*\}\s*from\s*['"]\./components(?:/\w+)?['"]"#)
            .expect("valid regex")
    })
}

async fn write_if_missing(path: &Path, content: &str) -> std::io::Result<bool> {
    if tokio::fs::try_exists(path).await? {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(true)
}

/// Fill in missing `./pages/<Name>` imports referenced by `App.tsx` with a
/// re-export of an existing page (deterministic: first one found by sorted
/// path). No-op when there are no existing pages to fall back to.
pub async fn fill_missing_pages(src_dir: &Path, log: &mut Vec<String>) -> std::io::Result<()> {
    let app_tsx = src_dir.join("App.tsx");
    let Ok(app_content) = tokio::fs::read_to_string(&app_tsx).await else {
        return Ok(());
    };

    let pages_dir = src_dir.join("pages");
    tokio::fs::create_dir_all(&pages_dir).await?;

    let mut existing_pages: BTreeSet<String> = BTreeSet::new();
    let mut entries = tokio::fs::read_dir(&pages_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("tsx") {
                existing_pages.insert(stem.to_string());
            }
        }
    }

    let fallback = existing_pages.iter().next().cloned();

    for caps in page_import_pattern().captures_iter(&app_content) {
        let file_name = &caps[2];
        if existing_pages.contains(file_name) {
            continue;
        }
        let Some(fallback) = fallback.clone() else {
            continue;
        };
        let stub = format!(
            "import React from 'react';\nimport {fallback} from './{fallback}';\n\nexport default {fallback};\n"
        );
        let path = pages_dir.join(format!("{file_name}.tsx"));
        if write_if_missing(&path, &stub).await? {
            log.push(format!("auto-generated pages/{file_name}.tsx re-exporting {fallback}"));
        }
    }

    Ok(())
}

/// Scan every source file for `import { A, B } from './components[/N]'` and
/// create a minimal function-component stub for any name without a real
/// file, then regenerate the `components/index.tsx` barrel.
pub async fn fill_missing_components(src_dir: &Path, log: &mut Vec<String>) -> std::io::Result<()> {
    let components_dir = src_dir.join("components");
    if !tokio::fs::try_exists(&components_dir).await? {
        return Ok(());
    }

    let mut existing: BTreeSet<String> = BTreeSet::new();
    let mut entries = tokio::fs::read_dir(&components_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.path().extension().and_then(|e| e.to_str()) == Some("tsx") {
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                existing.insert(stem.to_string());
            }
        }
    }

    for entry in WalkDir::new(src_dir).into_iter().filter_map(Result::ok) {
        if entry.path().extension().and_then(|e| e.to_str()) != Some("tsx") {
            continue;
        }
        let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
            continue;
        };
        for caps in component_import_pattern().captures_iter(&content) {
            for name in caps[1].split(',') {
                let name = name.trim();
                if name.is_empty() || existing.contains(name) {
                    continue;
                }
                let stub = format!(
                    "import React from 'react';\n\nexport function {name}() {{\n  return <div>{name} (auto-generated stub)</div>;\n}}\n"
                );
                let path = components_dir.join(format!("{name}.tsx"));
                tokio::fs::write(&path, stub).await?;
                existing.insert(name.to_string());
                log.push(format!("auto-generated components/{name}.tsx stub"));
            }
        }
    }

    if !existing.is_empty() {
        let mut body = String::new();
        for name in &existing {
            body.push_str(&format!("export {{ {name} }} from './{name}';\n"));
        }
        tokio::fs::write(components_dir.join("index.tsx"), body).await?;
        log.push(format!(
            "regenerated components/index.tsx with {} exports",
            existing.len()
        ));
    }

    Ok(())
}

const INDEX_CSS: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

const MAIN_TSX: &str = r#"import React from 'react'
import ReactDOM from 'react-dom/client'
import './index.css'
import App from './App'

ReactDOM.createRoot(document.getElementById('root')!).render(
  <React.StrictMode>
    <App />
  </React.StrictMode>,
)
"#;

const APP_COMPAT_SHIM: &str = r#"export const API_URL = 'http://localhost:8000';
export const WS_API_URL = 'ws://localhost:8000';
export const APP_BASE_PATH = '/';

export const apiClient = {
  get: async (_url: string) => null,
  post: async (_url: string, _data?: any) => null,
  put: async (_url: string, _data?: any) => null,
  delete: async (_url: string) => null,
};

export enum Mode {
  DEV = 'dev',
  PROD = 'prod',
}
export const mode = Mode.DEV;
"#;

const UI_BUTTON: &str = r#"import React from 'react';
export const Button = ({ children, onClick, className = '' }: any) => (
  <button onClick={onClick} className={`px-4 py-2 bg-blue-500 text-white rounded hover:bg-blue-600 ${className}`}>
    {children}
  </button>
);
"#;

const UI_SPINNER: &str = r#"import React from 'react';
export const Spinner = ({ size = 'medium' }: any) => (
  <div
    className="animate-spin rounded-full border-4 border-gray-300 border-t-blue-500"
    style={{ width: size === 'large' ? '48px' : '24px', height: size === 'large' ? '48px' : '24px' }}
  />
);
"#;

const UI_ALERT: &str = r#"import React from 'react';
export const Alert = ({ type = 'info', message }: any) => (
  <div className={`p-4 rounded ${type === 'error' ? 'bg-red-100 text-red-700' : 'bg-blue-100 text-blue-700'}`}>
    {message}
  </div>
);
"#;

const UI_INDEX: &str = "export { Button } from './button';\nexport { Spinner } from './spinner';\nexport { Alert } from './alert';\n";

/// Write the remaining stub files — stylesheet, entry point, framework
/// compatibility shim, and shadcn-style UI primitives — each only if
/// absent.
pub async fn fill_static_stubs(src_dir: &Path, log: &mut Vec<String>) -> std::io::Result<()> {
    if write_if_missing(&src_dir.join("index.css"), INDEX_CSS).await? {
        log.push("auto-generated src/index.css".to_string());
    }
    if write_if_missing(&src_dir.join("main.tsx"), MAIN_TSX).await? {
        log.push("auto-generated src/main.tsx".to_string());
    }
    if write_if_missing(&src_dir.join("lib").join("app.ts"), APP_COMPAT_SHIM).await? {
        log.push("auto-generated src/lib/app.ts".to_string());
    }

    let ui_dir = src_dir.join("components").join("ui");
    if write_if_missing(&ui_dir.join("button.tsx"), UI_BUTTON).await? {
        log.push("auto-generated components/ui/button.tsx".to_string());
    }
    if write_if_missing(&ui_dir.join("spinner.tsx"), UI_SPINNER).await? {
        log.push("auto-generated components/ui/spinner.tsx".to_string());
    }
    if write_if_missing(&ui_dir.join("alert.tsx"), UI_ALERT).await? {
        log.push("auto-generated components/ui/alert.tsx".to_string());
    }
    if write_if_missing(&ui_dir.join("index.ts"), UI_INDEX).await? {
        log.push("auto-generated components/ui/index.ts".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fill_missing_pages_falls_back_to_existing_page() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path();
        tokio::fs::create_dir_all(src.join("pages")).await.unwrap();
        tokio::fs::write(src.join("pages").join("Home.tsx"), "export default function Home() {}\n")
            .await
            .unwrap();
        tokio::fs::write(
            src.join("App.tsx"),
            "import Home from './pages/Home';\nimport About from './pages/About';\n",
        )
        .await
        .unwrap();

        let mut log = Vec::new();
        fill_missing_pages(src, &mut log).await.unwrap();

        assert!(tokio::fs::try_exists(src.join("pages").join("About.tsx")).await.unwrap());
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn fill_missing_components_generates_stub_and_barrel() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path();
        tokio::fs::create_dir_all(src.join("components")).await.unwrap();
        tokio::fs::write(
            src.join("App.tsx"),
            "import { Button, Missing } from './components';\n",
        )
        .await
        .unwrap();

        let mut log = Vec::new();
        fill_missing_components(src, &mut log).await.unwrap();

        assert!(tokio::fs::try_exists(src.join("components").join("Missing.tsx")).await.unwrap());
        assert!(tokio::fs::try_exists(src.join("components").join("index.tsx")).await.unwrap());
    }

    #[tokio::test]
    async fn static_stubs_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path();
        tokio::fs::create_dir_all(src).await.unwrap();

        let mut log = Vec::new();
        fill_static_stubs(src, &mut log).await.unwrap();
        let first_len = log.len();
        assert!(first_len > 0);

        let mut log2 = Vec::new();
        fill_static_stubs(src, &mut log2).await.unwrap();
        assert!(log2.is_empty());
    }
}
