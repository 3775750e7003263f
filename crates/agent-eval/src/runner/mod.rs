//! Eval runner components
//!
//! Scheduling, retry, lifecycle hooks and run configuration.

mod config;
mod executor;
mod hooks;
mod retry;

pub use config::RunConfig;
pub use executor::{EvalProgress, EvalRunner, ProgressCallback, ProgressStage};
pub use hooks::{CommandHook, FnHook, HookContext, HookPhase, HooksConfig, SuiteHook, SuiteHooks};
pub use retry::RetryPolicy;
