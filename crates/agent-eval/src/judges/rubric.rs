//! Natural-language rubric judge
//!
//! Grading is delegated to an external [`RubricGrader`], typically an LLM
//! behind a command.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Judge, JudgeContext};
use crate::agent::AgentCommand;
use crate::cases::EvalCase;
use crate::error::{EvalError, EvalResult};
use crate::outcome::JudgeResult;

const PASS_THRESHOLD: f64 = 70.0;

/// What the grader is asked to score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricRequest {
    pub rubric: String,
    pub prompt: String,
    pub output: String,
    pub eval_id: String,
}

/// The grader's verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricGrade {
    /// 0-100
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: String,
}

/// External grader for rubric cases
#[async_trait]
pub trait RubricGrader: Send + Sync {
    async fn grade(&self, request: &RubricRequest) -> anyhow::Result<RubricGrade>;
}

/// Grader backed by an external process
///
/// The request is written to stdin as JSON and the grade read back from the
/// last JSON object line on stdout.
pub struct CommandGrader {
    command: AgentCommand,
}

impl CommandGrader {
    pub fn new(command: AgentCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl RubricGrader for CommandGrader {
    async fn grade(&self, request: &RubricRequest) -> anyhow::Result<RubricGrade> {
        let cwd = std::env::current_dir()?;
        let reply = self
            .command
            .exchange(&serde_json::to_value(request)?, &cwd)
            .await?;
        Ok(serde_json::from_value(reply)?)
    }
}

/// Scores cases carrying a `rubric` with a [`RubricGrader`]
pub struct RubricJudge {
    grader: Option<Arc<dyn RubricGrader>>,
}

impl RubricJudge {
    pub const ID: &'static str = "llm-rubric";

    /// Judge without a grader; every applicable case errors
    pub fn new() -> Self {
        Self { grader: None }
    }

    pub fn with_grader(grader: Arc<dyn RubricGrader>) -> Self {
        Self {
            grader: Some(grader),
        }
    }

    fn prompt_text(case: &EvalCase) -> String {
        match case.prompt() {
            Some(prompt) => prompt.to_string(),
            None => case
                .turns()
                .unwrap_or_default()
                .iter()
                .map(|t| t.prompt.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

impl Default for RubricJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Judge for RubricJudge {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Grades the output against a natural-language rubric"
    }

    async fn evaluate(&self, ctx: &JudgeContext<'_>) -> EvalResult<JudgeResult> {
        let Some(rubric) = ctx.eval_case.rubric.as_deref() else {
            return Ok(JudgeResult::not_applicable(Self::ID, "no rubric"));
        };

        let grader = self
            .grader
            .as_ref()
            .ok_or_else(|| EvalError::judge(Self::ID, "no rubric grader configured"))?;

        let request = RubricRequest {
            rubric: rubric.to_string(),
            prompt: Self::prompt_text(ctx.eval_case),
            output: ctx.execution.output.clone(),
            eval_id: ctx.eval_case.id.clone(),
        };

        let grade = grader
            .grade(&request)
            .await
            .map_err(|e| EvalError::judge(Self::ID, format!("{:#}", e)))?;

        let passed = grade.passed.unwrap_or(grade.score >= PASS_THRESHOLD);
        let mut result = JudgeResult::new(Self::ID, passed, grade.score, grade.reasoning);
        if let Some(confidence) = grade.confidence {
            result = result.with_confidence(confidence);
        }
        Ok(result.with_details(json!({ "rubric": rubric })))
    }
}
