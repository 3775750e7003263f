//! Expected and forbidden regex patterns

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use super::{Judge, JudgeContext, safe_join_under_root};
use crate::cases::CaseKind;
use crate::error::EvalResult;
use crate::outcome::{JudgeResult, proportional_score};

const PASS_THRESHOLD: f64 = 80.0;

/// Matches expected patterns and rejects forbidden ones
///
/// Code-gen cases are matched against the contents of their target files,
/// everything else against the agent output.
#[derive(Debug, Default)]
pub struct PatternMatchJudge;

impl PatternMatchJudge {
    pub const ID: &'static str = "pattern-match";
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid regex pattern");
            None
        }
    }
}

async fn target_contents(ctx: &JudgeContext<'_>, target_files: &[String]) -> String {
    let mut contents = Vec::new();
    for file in target_files {
        let Ok(path) = safe_join_under_root(ctx.working_directory, file) else {
            continue;
        };
        if let Ok(text) = tokio::fs::read_to_string(&path).await {
            contents.push(text);
        }
    }
    contents.join("\n")
}

#[async_trait]
impl Judge for PatternMatchJudge {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Checks output against expected and forbidden regex patterns"
    }

    async fn evaluate(&self, ctx: &JudgeContext<'_>) -> EvalResult<JudgeResult> {
        let (expected, forbidden, haystack) = match &ctx.eval_case.kind {
            CaseKind::Basic {
                expected_patterns,
                forbidden_patterns,
                ..
            }
            | CaseKind::MultiTurn {
                expected_patterns,
                forbidden_patterns,
                ..
            } => (
                expected_patterns,
                forbidden_patterns,
                ctx.execution.output.clone(),
            ),
            CaseKind::CodeGen {
                target_files,
                expected_patterns,
                forbidden_patterns,
                ..
            } => {
                let haystack = if target_files.is_empty() {
                    ctx.execution.output.clone()
                } else {
                    target_contents(ctx, target_files).await
                };
                (expected_patterns, forbidden_patterns, haystack)
            }
            _ => return Ok(JudgeResult::not_applicable(Self::ID, "no patterns for this category")),
        };

        let total = expected.len() + forbidden.len();
        if total == 0 {
            return Ok(JudgeResult::not_applicable(Self::ID, "no patterns"));
        }

        let mut unmatched = Vec::new();
        let mut present_forbidden = Vec::new();

        for pattern in expected {
            let matched = compile(pattern).is_some_and(|re| re.is_match(&haystack));
            if !matched {
                unmatched.push(pattern.clone());
            }
        }
        for pattern in forbidden {
            let clean = compile(pattern).is_some_and(|re| !re.is_match(&haystack));
            if !clean {
                present_forbidden.push(pattern.clone());
            }
        }

        let satisfied = total - unmatched.len() - present_forbidden.len();
        let score = proportional_score(satisfied, total);

        let mut problems = Vec::new();
        if !unmatched.is_empty() {
            problems.push(format!("missing expected: {}", unmatched.join(", ")));
        }
        if !present_forbidden.is_empty() {
            problems.push(format!("found forbidden: {}", present_forbidden.join(", ")));
        }
        let reasoning = if problems.is_empty() {
            format!("All {} patterns satisfied", total)
        } else {
            format!("{}/{} patterns satisfied; {}", satisfied, total, problems.join("; "))
        };

        Ok(
            JudgeResult::new(Self::ID, score >= PASS_THRESHOLD, score, reasoning).with_details(
                json!({ "unmatched": unmatched, "forbiddenFound": present_forbidden }),
            ),
        )
    }
}
