//! Import → installable-package-name detection.
//!
//! Grounded on `package_detector.py`: allow-list the standard library and
//! the framework's own surface, then map the rest through a small table of
//! import names whose PyPI package name differs.

use crate::validator::{self, Language};
use std::collections::BTreeSet;

const PYTHON_STDLIB: &[&str] = &[
    "abc", "asyncio", "collections", "datetime", "decimal", "enum", "functools", "hashlib",
    "itertools", "json", "logging", "math", "os", "pathlib", "re", "sys", "time", "typing",
    "uuid", "warnings", "io", "copy", "traceback", "dataclasses", "base64", "hmac", "secrets",
    "string", "random", "tempfile", "shutil", "subprocess", "urllib", "http", "email",
    "mimetypes", "platform", "contextlib", "inspect", "dis", "gc", "weakref", "operator", "types",
];

const PYTHON_FRAMEWORK_PACKAGES: &[&str] = &["app", "databutton", "fastapi", "pydantic", "asyncpg"];

const PYTHON_PACKAGE_MAPPING: &[(&str, &str)] = &[
    ("cv2", "opencv-python"),
    ("PIL", "Pillow"),
    ("sklearn", "scikit-learn"),
    ("yaml", "pyyaml"),
    ("dotenv", "python-dotenv"),
    ("dateutil", "python-dateutil"),
    ("jwt", "pyjwt"),
    ("bs4", "beautifulsoup4"),
    ("psycopg2", "psycopg2-binary"),
];

const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "crypto", "dgram", "dns", "domain", "events",
    "fs", "http", "https", "net", "os", "path", "punycode", "querystring", "readline", "repl",
    "stream", "string_decoder", "timers", "tls", "tty", "url", "util", "v8", "vm", "zlib",
];

const NODE_FRAMEWORK_PACKAGES: &[&str] = &[
    "react",
    "react-dom",
    "react-router-dom",
    "@/components/ui",
    "@/hooks",
    "app",
    "types",
    "components",
    "utils",
];

fn map_python_package(import: &str) -> String {
    PYTHON_PACKAGE_MAPPING
        .iter()
        .find(|(k, _)| *k == import)
        .map(|(_, v)| v.to_string())
        .unwrap_or_else(|| import.to_string())
}

/// Detect the set of externally-installable package names referenced by
/// `source`, filtered to exclude stdlib/builtin/framework imports.
pub fn detect_packages(language: Language, source: &str) -> BTreeSet<String> {
    let result = validator::validate(language, source);
    match language {
        Language::Python => result
            .imports
            .into_iter()
            .filter(|pkg| {
                !PYTHON_STDLIB.contains(&pkg.as_str())
                    && !PYTHON_FRAMEWORK_PACKAGES.contains(&pkg.as_str())
            })
            .map(|pkg| map_python_package(&pkg))
            .collect(),
        Language::Typescript => result
            .imports
            .into_iter()
            .filter(|pkg| {
                !NODE_BUILTINS.contains(&pkg.as_str())
                    && !NODE_FRAMEWORK_PACKAGES.contains(&pkg.as_str())
                    && !pkg.starts_with("@/")
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_cv2_to_opencv_python() {
        let packages = detect_packages(Language::Python, "import cv2\n");
        assert_eq!(packages, BTreeSet::from(["opencv-python".to_string()]));
    }

    #[test]
    fn filters_stdlib_and_framework() {
        let packages = detect_packages(
            Language::Python,
            "import os\nimport pandas\nfrom fastapi import FastAPI\n",
        );
        assert_eq!(packages, BTreeSet::from(["pandas".to_string()]));
    }

    #[test]
    fn npm_scoped_package_kept_whole() {
        let packages = detect_packages(
            Language::Typescript,
            "import { Dialog } from '@radix-ui/react-dialog';\n",
        );
        assert_eq!(
            packages,
            BTreeSet::from(["@radix-ui/react-dialog".to_string()])
        );
    }

    #[test]
    fn npm_filters_react_and_alias_imports() {
        let packages = detect_packages(
            Language::Typescript,
            "import React from 'react';\nimport { Button } from '@/components/ui';\nimport axios from 'axios';\n",
        );
        assert_eq!(packages, BTreeSet::from(["axios".to_string()]));
    }
}
