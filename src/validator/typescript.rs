//! TypeScript/JSX scanner: brace/paren/bracket balance plus import
//! extraction. Grounded on `code_validator.py`'s
//! `validate_typescript_syntax` — a basic structural check, not a real
//! parse, same limitation the original documents.

use super::{ValidationError, ValidationResult};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn import_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"import\s+(?:\{[^}]+\}|\w+|\*\s+as\s+\w+)\s+from\s+["']([^"']+)["']"#)
            .expect("valid regex")
    })
}

pub fn validate(source: &str) -> ValidationResult {
    let mut errors = Vec::new();
    let warnings = Vec::new();

    push_balance_error(source, '{', '}', "braces", &mut errors);
    push_balance_error(source, '(', ')', "parentheses", &mut errors);
    push_balance_error(source, '[', ']', "brackets", &mut errors);

    let imports = extract_imports(source);

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        imports,
    }
}

fn push_balance_error(
    source: &str,
    open: char,
    close: char,
    label: &str,
    errors: &mut Vec<ValidationError>,
) {
    let opens = source.matches(open).count();
    let closes = source.matches(close).count();
    if opens != closes {
        errors.push(ValidationError {
            error_type: "syntax".into(),
            message: format!("unmatched {label}: {opens} open, {closes} close"),
            line_number: None,
            column: None,
            suggestion: Some(format!("check for missing or extra {label}")),
        });
    }
}

fn extract_imports(source: &str) -> Vec<String> {
    let mut found = BTreeSet::new();
    for caps in import_pattern().captures_iter(source) {
        let spec = &caps[1];
        if spec.starts_with('.') {
            continue;
        }
        let segments: Vec<&str> = spec.split('/').collect();
        let package = if spec.starts_with('@') && segments.len() >= 2 {
            format!("{}/{}", segments[0], segments[1])
        } else {
            segments[0].to_string()
        };
        found.insert(package);
    }
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_code_is_valid() {
        let source = "import React from 'react';\nexport function App() {\n  return <div>hi</div>;\n}\n";
        let result = validate(source);
        assert!(result.is_valid);
        assert_eq!(result.imports, vec!["react".to_string()]);
    }

    #[test]
    fn unmatched_paren_is_reported() {
        let result = validate("const x = (1 + 2;\n");
        assert!(!result.is_valid);
    }

    #[test]
    fn scoped_package_reduced_to_org_and_name() {
        let result = validate("import { Dialog } from '@radix-ui/react-dialog';\n");
        assert_eq!(result.imports, vec!["@radix-ui/react-dialog".to_string()]);
    }

    #[test]
    fn relative_imports_are_excluded() {
        let result = validate("import { helper } from './utils';\n");
        assert!(result.imports.is_empty());
    }
}
