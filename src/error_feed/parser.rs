//! Build-log parsing: turn raw esbuild/tsc output into `ErrorRecord`s.
//!
//! Grounded on `parse_and_report_build_errors()` in `original_source`'s
//! preview module — the same two regex shapes, reimplemented with named
//! capture groups.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBuildError {
    pub file: String,
    pub line: Option<i64>,
    pub column: Option<i64>,
    pub error_code: Option<String>,
    pub message: String,
}

fn esbuild_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^(?P<file>[^:\n]+\.tsx?):(?P<line>\d+):(?P<col>\d+):\s*ERROR:\s*(?P<msg>.+)$"#)
            .expect("valid esbuild regex")
    })
}

fn typescript_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^(?P<file>[^:\n]+\.tsx?):(?P<line>\d+):(?P<col>\d+)\s*-\s*error\s*(?P<code>[A-Z]+\d+):\s*(?P<msg>.+)$"#,
        )
        .expect("valid typescript regex")
    })
}

/// Parse every recognised error line out of `build_output`. `workspace_root`
/// is stripped from file paths so stored coordinates are workspace-relative.
pub fn parse_build_errors(build_output: &str, workspace_root: &str) -> Vec<ParsedBuildError> {
    let mut found = Vec::new();

    for caps in esbuild_pattern().captures_iter(build_output) {
        found.push(ParsedBuildError {
            file: normalize_file(&caps["file"], workspace_root),
            line: caps.name("line").and_then(|m| m.as_str().parse().ok()),
            column: caps.name("col").and_then(|m| m.as_str().parse().ok()),
            error_code: Some("ESBUILD".to_string()),
            message: caps["msg"].trim().to_string(),
        });
    }

    for caps in typescript_pattern().captures_iter(build_output) {
        found.push(ParsedBuildError {
            file: normalize_file(&caps["file"], workspace_root),
            line: caps.name("line").and_then(|m| m.as_str().parse().ok()),
            column: caps.name("col").and_then(|m| m.as_str().parse().ok()),
            error_code: Some(caps["code"].to_string()),
            message: caps["msg"].trim().to_string(),
        });
    }

    found
}

fn normalize_file(raw: &str, workspace_root: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix(workspace_root) {
        rest.trim_start_matches('/').to_string()
    } else if let Some(idx) = trimmed.find("frontend/src/") {
        format!("src/{}", &trimmed[idx + "frontend/src/".len()..])
    } else {
        trimmed.to_string()
    }
}

/// Best-effort ±2 lines of context around `line` from `file_path`. Missing
/// files or out-of-range lines return `None` rather than erroring.
pub fn read_code_snippet(file_path: &Path, line: i64) -> Option<String> {
    let content = std::fs::read_to_string(file_path).ok()?;
    let lines: Vec<&str> = content.lines().collect();
    if line < 1 {
        return None;
    }
    let idx = (line - 1) as usize;
    let start = idx.saturating_sub(2);
    let end = (idx + 3).min(lines.len());
    if start >= lines.len() {
        return None;
    }
    Some(lines[start..end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_esbuild_error() {
        let output = "/ws/project/frontend/src/components/Broken.tsx:16:12: ERROR: Expected \"}\" but found \";\"\n";
        let errors = parse_build_errors(output, "/ws/project");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "frontend/src/components/Broken.tsx");
        assert_eq!(errors[0].line, Some(16));
        assert_eq!(errors[0].error_code.as_deref(), Some("ESBUILD"));
    }

    #[test]
    fn parses_typescript_compiler_error() {
        let output = "src/App.tsx:10:5 - error TS2304: Cannot find name 'foo'.\n";
        let errors = parse_build_errors(output, "");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_code.as_deref(), Some("TS2304"));
        assert_eq!(errors[0].message, "Cannot find name 'foo'.");
    }

    #[test]
    fn no_matches_on_clean_output() {
        let errors = parse_build_errors("built in 1.2s\n", "");
        assert!(errors.is_empty());
    }
}
