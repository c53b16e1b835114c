//! Static, synchronous validation of generated source files.
//!
//! No I/O, no subprocesses — a scanner, not a compiler frontend. The point
//! is catching the handful of mistakes an AI codegen pass actually makes
//! (an unterminated string, an unbalanced bracket, a bad indent), not
//! accepting or rejecting arbitrary valid source.

pub mod python;
pub mod typescript;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Typescript,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub error_type: String,
    pub message: String,
    pub line_number: Option<usize>,
    pub column: Option<usize>,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub imports: Vec<String>,
}

pub fn validate(language: Language, source: &str) -> ValidationResult {
    match language {
        Language::Python => python::validate(source),
        Language::Typescript => typescript::validate(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_to_python() {
        let result = validate(Language::Python, "import requests\n");
        assert!(result.is_valid);
        assert_eq!(result.imports, vec!["requests".to_string()]);
    }

    #[test]
    fn dispatches_to_typescript() {
        let result = validate(Language::Typescript, "const x = (1 + 2;");
        assert!(!result.is_valid);
    }
}
