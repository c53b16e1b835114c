//! Python scanner: bracket balance, indentation-after-colon, unterminated
//! strings, plus import extraction. Grounded on `code_validator.py`'s
//! `validate_python_syntax`, reimplemented as a line scanner since this
//! crate carries no Python AST parser.

use super::{ValidationError, ValidationResult};
use std::collections::BTreeSet;

pub fn validate(source: &str) -> ValidationResult {
    let mut errors = Vec::new();
    let warnings = Vec::new();

    check_bracket_balance(source, &mut errors);
    check_unterminated_strings(source, &mut errors);
    check_indentation_after_colon(source, &mut errors);

    let imports = extract_imports(source);

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        imports,
    }
}

fn check_bracket_balance(source: &str, errors: &mut Vec<ValidationError>) {
    let mut stack: Vec<(char, usize, usize)> = Vec::new();
    let mut in_string: Option<char> = None;
    let mut in_comment = false;
    let mut escape = false;

    for (line_idx, line) in source.lines().enumerate() {
        in_comment = false;
        let mut chars = line.char_indices().peekable();
        while let Some((col, c)) = chars.next() {
            if in_comment {
                break;
            }
            if escape {
                escape = false;
                continue;
            }
            match in_string {
                Some(quote) => {
                    if c == '\\' {
                        escape = true;
                    } else if c == quote {
                        in_string = None;
                    }
                }
                None => match c {
                    '#' => in_comment = true,
                    '\'' | '"' => in_string = Some(c),
                    '(' | '[' | '{' => stack.push((c, line_idx + 1, col + 1)),
                    ')' | ']' | '}' => {
                        let expected = match c {
                            ')' => '(',
                            ']' => '[',
                            '}' => '{',
                            _ => unreachable!(),
                        };
                        match stack.pop() {
                            Some((open, _, _)) if open == expected => {}
                            _ => errors.push(ValidationError {
                                error_type: "syntax".into(),
                                message: format!("unmatched closing '{c}'"),
                                line_number: Some(line_idx + 1),
                                column: Some(col + 1),
                                suggestion: Some(
                                    "check for missing or extra brackets, parentheses, or braces"
                                        .into(),
                                ),
                            }),
                        }
                    }
                    _ => {}
                },
            }
        }
    }

    for (open, line, col) in stack {
        errors.push(ValidationError {
            error_type: "syntax".into(),
            message: format!("unclosed '{open}'"),
            line_number: Some(line),
            column: Some(col),
            suggestion: Some("check for a missing closing bracket, parenthesis, or brace".into()),
        });
    }
}

fn check_unterminated_strings(source: &str, errors: &mut Vec<ValidationError>) {
    for (line_idx, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            continue;
        }
        if line.contains("\"\"\"") || line.contains("'''") {
            continue;
        }
        let mut in_string: Option<char> = None;
        let mut escape = false;
        let mut started_fstring = false;
        for c in line.chars() {
            if escape {
                escape = false;
                continue;
            }
            match in_string {
                Some(quote) => {
                    if c == '\\' {
                        escape = true;
                    } else if c == quote {
                        in_string = None;
                    }
                }
                None => {
                    if c == '#' {
                        break;
                    }
                    if c == '\'' || c == '"' {
                        in_string = Some(c);
                        started_fstring = false;
                    }
                }
            }
        }
        let _ = started_fstring;
        if in_string.is_some() {
            errors.push(ValidationError {
                error_type: "syntax".into(),
                message: "unterminated string literal".into(),
                line_number: Some(line_idx + 1),
                column: None,
                suggestion: Some("check for a missing closing quote".into()),
            });
        }
        check_fstring_braces(line, line_idx + 1, errors);
    }
}

fn check_fstring_braces(line: &str, line_number: usize, errors: &mut Vec<ValidationError>) {
    let mut rest = line;
    while let Some(pos) = rest.find(|c| c == 'f' || c == 'F') {
        let after = &rest[pos + 1..];
        if let Some(quote) = after.chars().next().filter(|c| *c == '"' || *c == '\'') {
            if let Some(end) = after[1..].find(quote) {
                let body = &after[1..1 + end];
                let opens = body.matches('{').count();
                let closes = body.matches('}').count();
                if opens != closes {
                    errors.push(ValidationError {
                        error_type: "syntax".into(),
                        message: "unbalanced braces in f-string".into(),
                        line_number: Some(line_number),
                        column: None,
                        suggestion: Some("check f-string syntax, ensure matching { and }".into()),
                    });
                }
                rest = &after[1 + end + 1..];
                continue;
            }
        }
        rest = after;
    }
}

fn check_indentation_after_colon(source: &str, errors: &mut Vec<ValidationError>) {
    let lines: Vec<&str> = source.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();
        if trimmed.trim_start().starts_with('#') || trimmed.is_empty() {
            continue;
        }
        if !trimmed.ends_with(':') {
            continue;
        }
        let this_indent = indent_width(line);
        let mut next_idx = idx + 1;
        while next_idx < lines.len() && lines[next_idx].trim().is_empty() {
            next_idx += 1;
        }
        if let Some(next) = lines.get(next_idx) {
            if next.trim_start().starts_with('#') {
                continue;
            }
            let next_indent = indent_width(next);
            if next_indent <= this_indent {
                errors.push(ValidationError {
                    error_type: "syntax".into(),
                    message: "expected an indented block".into(),
                    line_number: Some(next_idx + 1),
                    column: None,
                    suggestion: Some("fix indentation after a line ending in ':'".into()),
                });
            }
        }
    }
}

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

fn extract_imports(source: &str) -> Vec<String> {
    let mut found = BTreeSet::new();
    for line in source.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("import ") {
            for part in rest.split(',') {
                let name = part.trim().split(" as ").next().unwrap_or("").trim();
                if let Some(base) = name.split('.').next() {
                    if !base.is_empty() {
                        found.insert(base.to_string());
                    }
                }
            }
        } else if let Some(rest) = trimmed.strip_prefix("from ") {
            if let Some(module) = rest.split(" import").next() {
                if let Some(base) = module.trim().split('.').next() {
                    if !base.is_empty() && base != "." {
                        found.insert(base.to_string());
                    }
                }
            }
        }
    }
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_code_has_no_errors() {
        let source = "import requests\n\ndef fetch():\n    return requests.get('x')\n";
        let result = validate(source);
        assert!(result.is_valid);
        assert_eq!(result.imports, vec!["requests".to_string()]);
    }

    #[test]
    fn unclosed_paren_is_reported() {
        let source = "def fetch(:\n    pass\n";
        let result = validate(source);
        assert!(!result.is_valid);
    }

    #[test]
    fn missing_indentation_after_colon_is_reported() {
        let source = "def fetch():\npass\n";
        let result = validate(source);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.message.contains("indented block")));
    }

    #[test]
    fn from_import_extracts_base_module() {
        let source = "from sqlalchemy.orm import Session\n";
        let result = validate(source);
        assert_eq!(result.imports, vec!["sqlalchemy".to_string()]);
    }

    #[test]
    fn unbalanced_fstring_braces_flagged() {
        let source = "x = f\"value: {y\"\n";
        let result = validate(source);
        assert!(!result.is_valid);
    }
}
