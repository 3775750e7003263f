//! Agent evaluation harness
//!
//! Runs declarative eval cases against a pluggable agent, isolates each run
//! in its own workspace, scores the outcome with pluggable judges and
//! aggregates pass/fail statistics.
//!
//! # Features
//!
//! - **Eval cases**: YAML/JSON definitions for basic, tool, code-gen, routing
//!   and multi-turn cases
//! - **Isolated workspaces**: one directory per case, optionally seeded from a
//!   project template
//! - **Judges**: file presence, tool call counts, patterns, syntax, routing
//!   and rubric grading, plus custom judges via [`Judge`]
//! - **Runner**: sequential or batched parallel execution with retries and
//!   lifecycle hooks
//! - **Reports**: table, JSON and Markdown output
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agent_eval::{AgentResult, CaseFilter, CaseLoader, EvalRunner, FnAgent, JudgeRegistry, RunConfig};
//!
//! let agent = FnAgent::new(|prompt, _ctx| async move { Ok(AgentResult::success(prompt)) });
//! let runner = EvalRunner::new(RunConfig::default(), Arc::new(agent), Arc::new(JudgeRegistry::with_builtins()));
//! let suite = runner.run_from_source(&CaseLoader::new("evals"), &CaseFilter::default()).await?;
//! println!("{}/{} passed", suite.passed, suite.total);
//! ```

pub mod agent;
pub mod cases;
pub mod error;
pub mod harness;
pub mod judges;
pub mod outcome;
pub mod report;
pub mod runner;
pub mod workspace;

// Re-exports for convenience
pub use agent::{Agent, AgentCommand, AgentContext, AgentResult, CommandAgent, FnAgent};
pub use cases::{CaseFilter, CaseKind, CaseLoader, Category, EvalCase, ToolExpectation, Turn};
pub use error::{EvalError, EvalResult};
pub use harness::{HarnessConfig, JudgedExecution, TestHarness};
pub use judges::{
    CommandGrader, Judge, JudgeContext, JudgePanel, JudgeRegistry, RubricGrade, RubricGrader,
};
pub use outcome::{
    CaseStatus, EvalCaseResult, EvalSuiteResult, ExecutionResult, FailureSummary, JudgeResult,
    ToolCallRecord, Usage,
};
pub use report::{ReportFormat, generate_report, save_results};
pub use runner::{
    CommandHook, EvalProgress, EvalRunner, FnHook, ProgressCallback, ProgressStage, RetryPolicy,
    RunConfig, SuiteHook, SuiteHooks,
};
pub use workspace::{Workspace, WorkspaceManager};
