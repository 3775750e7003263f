//! Execution outcomes, judge verdicts and suite aggregation

mod execution;
mod suite;
mod verdict;

pub use execution::{ExecutionResult, ToolCallRecord, Usage};
pub use suite::{
    CaseStatus, CategoryBreakdown, EvalCaseResult, EvalSuiteResult, FailedJudge, FailureSummary,
};
pub use verdict::{JudgeResult, proportional_score};
