//! Tool invocation count check

use async_trait::async_trait;
use serde_json::json;

use super::{Judge, JudgeContext};
use crate::cases::CaseKind;
use crate::error::EvalResult;
use crate::outcome::JudgeResult;

/// Checks per-tool minimum and maximum call counts
///
/// Each bound is one constraint. The score is the share of satisfied
/// constraints; the verdict passes only when all are satisfied.
#[derive(Debug, Default)]
pub struct ToolCallsJudge;

impl ToolCallsJudge {
    pub const ID: &'static str = "tool-calls";
}

#[async_trait]
impl Judge for ToolCallsJudge {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Checks that tools were invoked within the expected bounds"
    }

    async fn evaluate(&self, ctx: &JudgeContext<'_>) -> EvalResult<JudgeResult> {
        let expectations = match &ctx.eval_case.kind {
            CaseKind::Tool {
                expected_tool_calls,
                ..
            } if !expected_tool_calls.is_empty() => expected_tool_calls,
            _ => return Ok(JudgeResult::not_applicable(Self::ID, "no expected tool calls")),
        };

        let mut total = 0usize;
        let mut satisfied = 0usize;
        let mut violations = Vec::new();
        let mut counts = serde_json::Map::new();

        for expectation in expectations {
            let actual = ctx.execution.tool_call_count(&expectation.tool_name);
            counts.insert(expectation.tool_name.clone(), json!(actual));

            if let Some(min) = expectation.effective_min() {
                total += 1;
                if actual >= min as usize {
                    satisfied += 1;
                } else {
                    violations.push(format!(
                        "{}: Expected at least {} call(s), got {}",
                        expectation.tool_name, min, actual
                    ));
                }
            }

            if let Some(max) = expectation.max_calls {
                total += 1;
                if actual <= max as usize {
                    satisfied += 1;
                } else {
                    violations.push(format!(
                        "{}: Expected at most {} call(s), got {}",
                        expectation.tool_name, max, actual
                    ));
                }
            }
        }

        let score = if total == 0 {
            100.0
        } else {
            satisfied as f64 / total as f64 * 100.0
        };
        let passed = satisfied == total;

        let reasoning = if passed {
            format!("All {} tool call constraints satisfied", total)
        } else {
            violations.join("; ")
        };

        Ok(JudgeResult::new(Self::ID, passed, score, reasoning)
            .with_details(json!({ "counts": counts, "violations": violations })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{EvalCase, ToolExpectation};
    use crate::judges::test_support::execution;
    use crate::outcome::ToolCallRecord;
    use std::path::Path;

    fn tool_case(expectations: Vec<ToolExpectation>) -> EvalCase {
        EvalCase::new(
            "tool-001",
            "Tools",
            CaseKind::Tool {
                prompt: "read things".into(),
                expected_tool_calls: expectations,
            },
        )
    }

    fn calls(names: &[&str]) -> Vec<ToolCallRecord> {
        names
            .iter()
            .map(|n| ToolCallRecord::new(*n, serde_json::Value::Null))
            .collect()
    }

    #[tokio::test]
    async fn test_too_few_calls() {
        let case = tool_case(vec![ToolExpectation::at_least("Read", 3)]);
        let exec = execution("", calls(&["Read", "Bash"]));
        let result = ToolCallsJudge
            .evaluate(&JudgeContext::new(&case, &exec, Path::new(".")))
            .await
            .unwrap();

        assert!(!result.passed);
        assert_eq!(result.score, 0.0);
        assert!(result.reasoning.contains("Expected at least 3 call(s), got 1"));
    }

    #[tokio::test]
    async fn test_partial_credit() {
        let case = tool_case(vec![
            ToolExpectation::at_least("Read", 1).with_max(2),
            ToolExpectation::at_most("Bash", 0),
        ]);
        let exec = execution("", calls(&["Read", "Bash"]));
        let result = ToolCallsJudge
            .evaluate(&JudgeContext::new(&case, &exec, Path::new(".")))
            .await
            .unwrap();

        assert!(!result.passed);
        assert!((result.score - 66.666).abs() < 0.01);
        assert!(result.reasoning.contains("Bash: Expected at most 0 call(s), got 1"));
    }

    #[tokio::test]
    async fn test_bare_expectation_means_at_least_once() {
        let case = tool_case(vec![ToolExpectation {
            tool_name: "Grep".into(),
            min_calls: None,
            max_calls: None,
        }]);
        let exec = execution("", calls(&["Grep"]));
        let result = ToolCallsJudge
            .evaluate(&JudgeContext::new(&case, &exec, Path::new(".")))
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.score, 100.0);
    }
}
