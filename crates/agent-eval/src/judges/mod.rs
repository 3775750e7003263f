//! Judges turn an execution outcome into a verdict
//!
//! A judge sees the case, the execution result and the workspace the agent
//! ran in. Judges that do not apply to a case's variant return
//! [`JudgeResult::not_applicable`].

mod file_exists;
mod panel;
mod pattern_match;
mod registry;
mod routing;
mod rubric;
mod syntax;
mod tool_calls;

pub use file_exists::FileExistsJudge;
pub use panel::JudgePanel;
pub use pattern_match::PatternMatchJudge;
pub use registry::JudgeRegistry;
pub use routing::RoutingJudge;
pub use rubric::{CommandGrader, RubricGrade, RubricGrader, RubricJudge, RubricRequest};
pub use syntax::SyntaxJudge;
pub use tool_calls::ToolCallsJudge;

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::cases::EvalCase;
use crate::error::EvalResult;
use crate::outcome::{ExecutionResult, JudgeResult};

/// Everything a judge may look at
#[derive(Debug, Clone, Copy)]
pub struct JudgeContext<'a> {
    pub eval_case: &'a EvalCase,
    pub execution: &'a ExecutionResult,
    /// Workspace the agent ran in; still present while judges run
    pub working_directory: &'a Path,
}

impl<'a> JudgeContext<'a> {
    pub fn new(
        eval_case: &'a EvalCase,
        execution: &'a ExecutionResult,
        working_directory: &'a Path,
    ) -> Self {
        Self {
            eval_case,
            execution,
            working_directory,
        }
    }
}

/// Scoring interface
#[async_trait]
pub trait Judge: Send + Sync {
    /// Stable identifier cases refer to
    fn id(&self) -> &str;

    /// One-line description
    fn description(&self) -> &str;

    /// Score one execution
    async fn evaluate(&self, ctx: &JudgeContext<'_>) -> EvalResult<JudgeResult>;
}

/// Join a case-relative path under the workspace root, rejecting escapes
pub(crate) fn safe_join_under_root(root: &Path, relative: &str) -> Result<PathBuf, String> {
    let rel_path = Path::new(relative);

    if rel_path.is_absolute() {
        return Err(format!("Absolute paths are not allowed: {}", relative));
    }

    if rel_path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(format!("Path traversal is not allowed: {}", relative));
    }

    Ok(root.join(rel_path))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::outcome::ToolCallRecord;

    pub fn execution(output: &str, tool_calls: Vec<ToolCallRecord>) -> ExecutionResult {
        ExecutionResult {
            success: true,
            output: output.to_string(),
            tool_calls,
            duration_ms: 1,
            error: None,
            session_id: None,
            usage: None,
            working_directory: PathBuf::from("."),
        }
    }
}
