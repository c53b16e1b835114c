//! Read-modify-write helpers for the two manifest files a generated
//! workspace carries: `pyproject.toml`'s `dependency-groups.app` array and
//! `package.json`'s `dependencies` object.
//!
//! Grounded on `update_project_pyproject` / `update_project_package_json`
//! in `original_source`'s preview module, reworked from regex line surgery
//! into typed `toml`/`serde_json` round-trips.

use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid pyproject.toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to serialise pyproject.toml: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid package.json: {0}")]
    Json(#[from] serde_json::Error),
}

/// `pyproject.toml` with exactly the shape the workspace materializer
/// writes: a `[project]` table and `[dependency-groups]` with `base` and
/// `app` arrays. Only `app` is ever mutated after creation — `base` holds
/// the framework's own runtime dependencies.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PyProjectManifest {
    #[serde(flatten)]
    pub raw: toml::Table,
}

impl PyProjectManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        let raw: toml::Table = toml::from_str(&content)?;
        Ok(Self { raw })
    }

    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let content = toml::to_string_pretty(&self.raw)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Merge `packages` into `dependency-groups.app`, deduplicated and
    /// sorted, quoted as TOML strings.
    pub fn add_app_packages(&mut self, packages: &[String]) {
        let groups = self
            .raw
            .entry("dependency-groups")
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        let groups_table = groups.as_table_mut().expect("dependency-groups is a table");
        let app = groups_table
            .entry("app")
            .or_insert_with(|| toml::Value::Array(Vec::new()));
        let app_array = app.as_array_mut().expect("app is an array");

        let mut existing: BTreeSet<String> = app_array
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect();
        existing.extend(packages.iter().cloned());

        *app_array = existing
            .into_iter()
            .map(toml::Value::String)
            .collect();
    }
}

/// `package.json` with just the fields this workspace needs to see.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PackageJsonManifest {
    #[serde(flatten)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl PackageJsonManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;
        Ok(Self { raw })
    }

    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let content = serde_json::to_string_pretty(&self.raw)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Add packages to `dependencies` at version `"latest"`, skipping ones
    /// already present at any version.
    pub fn add_dependencies_latest(&mut self, packages: &[String]) {
        let deps = self
            .raw
            .entry("dependencies")
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        let deps_map = deps.as_object_mut().expect("dependencies is an object");
        for pkg in packages {
            deps_map
                .entry(pkg.clone())
                .or_insert_with(|| serde_json::Value::String("latest".to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_app_packages_dedupes_and_sorts() {
        let mut manifest = PyProjectManifest {
            raw: toml::from_str(
                "[project]\nname = \"user-project\"\n[dependency-groups]\nbase = []\napp = [\"requests\"]\n",
            )
            .unwrap(),
        };
        manifest.add_app_packages(&["pandas".to_string(), "requests".to_string()]);
        let app = manifest.raw["dependency-groups"]["app"].as_array().unwrap();
        let names: Vec<&str> = app.iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(names, vec!["pandas", "requests"]);
    }

    #[test]
    fn add_dependencies_latest_skips_existing() {
        let mut manifest = PackageJsonManifest {
            raw: serde_json::from_str(r#"{"dependencies": {"react": "^18.3.1"}}"#).unwrap(),
        };
        manifest.add_dependencies_latest(&["react".to_string(), "axios".to_string()]);
        let deps = manifest.raw["dependencies"].as_object().unwrap();
        assert_eq!(deps["react"], "^18.3.1");
        assert_eq!(deps["axios"], "latest");
    }
}
