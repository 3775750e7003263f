//! Syntax validity of generated files

use std::path::Path;

use async_trait::async_trait;
use serde_json::json;

use super::{Judge, JudgeContext, safe_join_under_root};
use crate::cases::CaseKind;
use crate::error::EvalResult;
use crate::outcome::{JudgeResult, proportional_score};

const PASS_THRESHOLD: f64 = 80.0;

/// Parses each target file according to its extension
///
/// JSON, YAML and TOML go through their real parsers. JavaScript and
/// TypeScript sources get a delimiter balance check that skips strings and
/// comments. Other readable files are reported as unchecked and count as
/// valid.
#[derive(Debug, Default)]
pub struct SyntaxJudge;

impl SyntaxJudge {
    pub const ID: &'static str = "syntax-valid";
}

/// Extensions whose quoting and comment rules the delimiter scanner follows
const SCANNED_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

/// Outcome of a syntax check that did not find an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Checked {
    Valid,
    Unchecked,
}

fn check_source(path: &Path, content: &str) -> Result<Checked, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match ext.as_str() {
        "json" => serde_json::from_str::<serde_json::Value>(content)
            .map(|_| Checked::Valid)
            .map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::from_str::<serde_yaml::Value>(content)
            .map(|_| Checked::Valid)
            .map_err(|e| e.to_string()),
        "toml" => content
            .parse::<toml::Table>()
            .map(|_| Checked::Valid)
            .map_err(|e| e.to_string()),
        ext if SCANNED_EXTENSIONS.contains(&ext) => {
            check_delimiters(content).map(|_| Checked::Valid)
        }
        _ => Ok(Checked::Unchecked),
    }
}

/// Check that `()`, `[]` and `{}` are balanced outside strings and comments
pub(crate) fn check_delimiters(content: &str) -> Result<(), String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut chars = content.chars().peekable();
    let mut line = 1usize;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            '"' | '\'' | '`' => {
                let quote = c;
                let start = line;
                let mut closed = false;
                while let Some(s) = chars.next() {
                    match s {
                        '\\' => {
                            if chars.next() == Some('\n') {
                                line += 1;
                            }
                        }
                        '\n' => {
                            line += 1;
                            if quote != '`' {
                                // Unterminated single-line string; resync at end of line
                                closed = true;
                                break;
                            }
                        }
                        s if s == quote => {
                            closed = true;
                            break;
                        }
                        _ => {}
                    }
                }
                if !closed {
                    return Err(format!("Unterminated string starting on line {}", start));
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for s in chars.by_ref() {
                    if s == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let start = line;
                let mut closed = false;
                while let Some(s) = chars.next() {
                    if s == '\n' {
                        line += 1;
                    } else if s == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(format!("Unterminated block comment starting on line {}", start));
                }
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, open_line)) => {
                        return Err(format!(
                            "Mismatched '{}' on line {} (opened '{}' on line {})",
                            c, line, open, open_line
                        ));
                    }
                    None => return Err(format!("Unexpected '{}' on line {}", c, line)),
                }
            }
            _ => {}
        }
    }

    match stack.pop() {
        Some((open, open_line)) => Err(format!("Unclosed '{}' from line {}", open, open_line)),
        None => Ok(()),
    }
}

#[async_trait]
impl Judge for SyntaxJudge {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Checks that generated files are syntactically valid"
    }

    async fn evaluate(&self, ctx: &JudgeContext<'_>) -> EvalResult<JudgeResult> {
        let target_files = match &ctx.eval_case.kind {
            CaseKind::CodeGen { target_files, .. } if !target_files.is_empty() => target_files,
            _ => return Ok(JudgeResult::not_applicable(Self::ID, "no target files")),
        };

        let mut valid = 0;
        let mut errors = serde_json::Map::new();
        let mut unchecked = Vec::new();

        for file in target_files {
            let outcome = match safe_join_under_root(ctx.working_directory, file) {
                Ok(path) => match tokio::fs::read_to_string(&path).await {
                    Ok(content) => check_source(&path, &content),
                    Err(e) => Err(format!("Cannot read file: {}", e)),
                },
                Err(msg) => Err(msg),
            };

            match outcome {
                Ok(Checked::Valid) => valid += 1,
                Ok(Checked::Unchecked) => {
                    valid += 1;
                    unchecked.push(file.clone());
                }
                Err(msg) => {
                    errors.insert(file.clone(), json!(msg));
                }
            }
        }

        let score = proportional_score(valid, target_files.len());
        let reasoning = if errors.is_empty() && unchecked.is_empty() {
            format!("All {} files are syntactically valid", target_files.len())
        } else if errors.is_empty() {
            format!(
                "No syntax errors in {} files; not checked: {}",
                target_files.len(),
                unchecked.join(", ")
            )
        } else {
            let listed = errors
                .iter()
                .map(|(file, msg)| format!("{}: {}", file, msg.as_str().unwrap_or_default()))
                .collect::<Vec<_>>()
                .join("; ");
            format!("{}/{} files valid; {}", valid, target_files.len(), listed)
        };

        Ok(JudgeResult::new(Self::ID, score >= PASS_THRESHOLD, score, reasoning)
            .with_details(json!({ "errors": errors, "unchecked": unchecked })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::EvalCase;
    use crate::judges::test_support::execution;
    use tempfile::TempDir;

    #[test]
    fn test_delimiters_ignore_strings_and_comments() {
        let source = r#"
function f(a) {
  const s = "}"; // )
  /* ] */
  return [a, '{'];
}
"#;
        assert!(check_delimiters(source).is_ok());
    }

    #[test]
    fn test_delimiter_errors() {
        assert!(check_delimiters("fn main() {").unwrap_err().contains("Unclosed '{'"));
        assert!(check_delimiters("a)").unwrap_err().contains("Unexpected ')'"));
        assert!(check_delimiters("(]").unwrap_err().contains("Mismatched"));
        assert!(check_delimiters("/* open").is_err());
    }

    #[test]
    fn test_structured_formats() {
        assert!(check_source(Path::new("a.json"), r#"{"a": 1}"#).is_ok());
        assert!(check_source(Path::new("a.json"), r#"{"a": }"#).is_err());
        assert!(check_source(Path::new("a.toml"), "a = 1\n[b]\nc = 'x'").is_ok());
        assert!(check_source(Path::new("a.toml"), "a = = 1").is_err());
        assert!(check_source(Path::new("a.yml"), "a: [1, 2").is_err());
    }

    #[test]
    fn test_only_js_family_is_scanned() {
        assert_eq!(
            check_source(Path::new("lib.rs"), "fn f<'a>(x: &'a str) -> &'a str { x }"),
            Ok(Checked::Unchecked)
        );
        assert_eq!(
            check_source(Path::new("run.py"), "# don't (panic\nprint('ok')\n"),
            Ok(Checked::Unchecked)
        );
        assert_eq!(
            check_source(Path::new("a.tsx"), "const A = () => <div>{'x'}</div>;"),
            Ok(Checked::Valid)
        );
        assert!(check_source(Path::new("a.mjs"), "export function f( {").is_err());
    }

    #[tokio::test]
    async fn test_unchecked_files_pass() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "pub fn first<'a>(v: &'a [u8]) -> &'a u8 { &v[0] }\n").unwrap();

        let case = EvalCase::new(
            "gen-004",
            "Rust source",
            CaseKind::CodeGen {
                prompt: "p".into(),
                target_files: vec!["lib.rs".into()],
                expected_patterns: Vec::new(),
                forbidden_patterns: Vec::new(),
            },
        );
        let exec = execution("", Vec::new());
        let result = SyntaxJudge
            .evaluate(&JudgeContext::new(&case, &exec, dir.path()))
            .await
            .unwrap();
        assert!(result.passed);
        assert!(result.reasoning.contains("not checked: lib.rs"));
    }

    #[tokio::test]
    async fn test_missing_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ok.ts"), "export const x = () => {};").unwrap();

        let case = EvalCase::new(
            "gen-003",
            "Syntax",
            CaseKind::CodeGen {
                prompt: "p".into(),
                target_files: vec!["ok.ts".into(), "missing.ts".into()],
                expected_patterns: Vec::new(),
                forbidden_patterns: Vec::new(),
            },
        );
        let exec = execution("", Vec::new());
        let result = SyntaxJudge
            .evaluate(&JudgeContext::new(&case, &exec, dir.path()))
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.score, 50.0);
        assert!(result.reasoning.contains("missing.ts"));
    }
}
