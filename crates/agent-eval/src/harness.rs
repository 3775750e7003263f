//! Test harness for running individual eval cases
//!
//! Acquires a workspace, invokes the agent under a timeout, normalizes the
//! result and releases the workspace on every path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::{Agent, AgentContext};
use crate::cases::EvalCase;
use crate::error::{EvalError, EvalResult};
use crate::judges::{JudgeContext, JudgePanel};
use crate::outcome::{ExecutionResult, JudgeResult};
use crate::workspace::{Workspace, WorkspaceManager};

/// Harness settings shared by every case of a run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Timeout used when a case has no override
    pub default_timeout_ms: u64,
    /// Keep workspaces on disk after a case
    pub preserve_workspaces: bool,
    /// Template copied into each workspace
    pub workspace_template: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 300_000,
            preserve_workspaces: false,
            workspace_template: None,
        }
    }
}

/// Outcome of a judged execution
#[derive(Debug, Clone)]
pub struct JudgedExecution {
    /// Aggregate outcome for multi-turn cases, the single outcome otherwise
    pub execution: ExecutionResult,
    /// Per-turn outcomes, one element for single-prompt cases
    pub turns: Vec<ExecutionResult>,
    /// Verdicts in declared judge order
    pub judge_results: Vec<JudgeResult>,
}

impl JudgedExecution {
    /// Execution succeeded and every judge passed
    pub fn passed(&self) -> bool {
        self.execution.success && self.judge_results.iter().all(|r| r.passed)
    }
}

/// Runs eval cases against an agent
pub struct TestHarness {
    agent: Arc<dyn Agent>,
    workspaces: Arc<WorkspaceManager>,
    config: HarnessConfig,
}

impl TestHarness {
    pub fn new(
        agent: Arc<dyn Agent>,
        workspaces: Arc<WorkspaceManager>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            agent,
            workspaces,
            config,
        }
    }

    /// The workspace manager this harness draws from
    pub fn workspaces(&self) -> &Arc<WorkspaceManager> {
        &self.workspaces
    }

    /// Timeout for a case: its override or the run default
    pub fn timeout_for(&self, case: &EvalCase) -> u64 {
        case.timeout_ms.unwrap_or(self.config.default_timeout_ms)
    }

    /// Run a case once; multi-turn cases yield their aggregate
    pub async fn execute(&self, case: &EvalCase) -> EvalResult<ExecutionResult> {
        let turns = self.execute_turns(case).await?;
        ExecutionResult::aggregate_turns(&turns)
            .ok_or_else(|| EvalError::invalid_case(&case.id, "no prompt to run"))
    }

    /// Run every turn of a multi-turn case in one workspace
    pub async fn execute_multi_turn(&self, case: &EvalCase) -> EvalResult<Vec<ExecutionResult>> {
        if !case.is_multi_turn() {
            return Err(EvalError::invalid_case(&case.id, "not a multi-turn case"));
        }
        self.execute_turns(case).await
    }

    /// Run a case and score it before its workspace is released
    pub async fn execute_judged(
        &self,
        case: &EvalCase,
        panel: &JudgePanel,
    ) -> EvalResult<JudgedExecution> {
        let workspace = self.acquire().await?;

        let outcome = match self.run_prompts(case, &workspace).await {
            Ok(turns) => match ExecutionResult::aggregate_turns(&turns) {
                Some(execution) => {
                    let ctx = JudgeContext::new(case, &execution, &workspace.path);
                    let judge_results = panel.evaluate(&ctx).await;
                    Ok(JudgedExecution {
                        execution,
                        turns,
                        judge_results,
                    })
                }
                None => Err(EvalError::invalid_case(&case.id, "no prompt to run")),
            },
            Err(e) => Err(e),
        };

        self.release(&workspace).await;
        outcome
    }

    async fn execute_turns(&self, case: &EvalCase) -> EvalResult<Vec<ExecutionResult>> {
        let workspace = self.acquire().await?;
        let outcome = self.run_prompts(case, &workspace).await;
        self.release(&workspace).await;
        outcome
    }

    async fn acquire(&self) -> EvalResult<Workspace> {
        self.workspaces
            .create_workspace(self.config.workspace_template.as_deref())
            .await
    }

    async fn release(&self, workspace: &Workspace) {
        if self.config.preserve_workspaces {
            tracing::debug!(path = %workspace.path.display(), "Preserving workspace");
            return;
        }
        self.workspaces.cleanup_workspace(&workspace.id).await;
    }

    /// Run the case's prompts in order, threading the session id
    async fn run_prompts(
        &self,
        case: &EvalCase,
        workspace: &Workspace,
    ) -> EvalResult<Vec<ExecutionResult>> {
        let prompts: Vec<&str> = match case.prompt() {
            Some(prompt) => vec![prompt],
            None => case
                .turns()
                .unwrap_or_default()
                .iter()
                .map(|t| t.prompt.as_str())
                .collect(),
        };

        let timeout_ms = self.timeout_for(case);
        let mut results: Vec<ExecutionResult> = Vec::with_capacity(prompts.len());

        for (index, prompt) in prompts.into_iter().enumerate() {
            let ctx = AgentContext {
                working_directory: workspace.path.clone(),
                eval_id: case.id.clone(),
                eval_name: case.name.clone(),
                timeout_ms,
                session_id: results.last().and_then(|r| r.session_id.clone()),
            };

            tracing::debug!(eval_id = %case.id, turn = index + 1, "Invoking agent");
            results.push(self.invoke(prompt, ctx).await?);
        }

        Ok(results)
    }

    /// Invoke the agent on its own task and wait at most the timeout
    ///
    /// On expiry the task is detached, not aborted.
    async fn invoke(&self, prompt: &str, ctx: AgentContext) -> EvalResult<ExecutionResult> {
        let agent = Arc::clone(&self.agent);
        let prompt = prompt.to_string();
        let task_ctx = ctx.clone();
        let started = Instant::now();

        let handle = tokio::spawn(async move { agent.invoke(&prompt, &task_ctx).await });

        match tokio::time::timeout(Duration::from_millis(ctx.timeout_ms), handle).await {
            Err(_) => {
                tracing::warn!(
                    eval_id = %ctx.eval_id,
                    timeout_ms = ctx.timeout_ms,
                    "Agent timed out, abandoning invocation"
                );
                Err(EvalError::Timeout { ms: ctx.timeout_ms })
            }
            Ok(Err(join_err)) => {
                let message = if join_err.is_panic() {
                    let payload = join_err.into_panic();
                    let detail = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    format!("agent panicked: {}", detail)
                } else {
                    "agent task was cancelled".to_string()
                };
                Err(EvalError::agent(message))
            }
            Ok(Ok(Err(e))) => Err(EvalError::agent(format!("{:#}", e))),
            Ok(Ok(Ok(result))) => {
                let measured = started.elapsed().as_millis() as u64;
                Ok(result.into_execution(&ctx, measured))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentResult, FnAgent};
    use tempfile::TempDir;

    fn harness(base: &TempDir, agent: FnAgent) -> TestHarness {
        TestHarness::new(
            Arc::new(agent),
            Arc::new(WorkspaceManager::with_base_dir(base.path()).with_install(None)),
            HarnessConfig {
                default_timeout_ms: 2_000,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_execute_fills_working_directory() {
        let base = TempDir::new().unwrap();
        let harness = harness(
            &base,
            FnAgent::new(|_prompt, ctx| async move {
                assert!(ctx.working_directory.exists());
                Ok(AgentResult::success(ctx.working_directory.display().to_string()))
            }),
        );

        let exec = harness.execute(&EvalCase::basic("b1", "hi")).await.unwrap();
        assert!(exec.success);
        assert_eq!(exec.output, exec.working_directory.display().to_string());
        assert!(!exec.working_directory.exists());
        assert_eq!(harness.workspaces().active_count(), 0);
    }

    #[tokio::test]
    async fn test_agent_error_releases_workspace() {
        let base = TempDir::new().unwrap();
        let harness = harness(
            &base,
            FnAgent::new(|_prompt, _ctx| async move { Err(anyhow::anyhow!("model unavailable")) }),
        );

        let err = harness.execute(&EvalCase::basic("b2", "hi")).await.unwrap_err();
        assert!(matches!(err, EvalError::Agent(ref m) if m.contains("model unavailable")));
        assert_eq!(harness.workspaces().active_count(), 0);
    }

    #[tokio::test]
    async fn test_case_timeout_override() {
        let base = TempDir::new().unwrap();
        let harness = harness(
            &base,
            FnAgent::new(|_prompt, _ctx| async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(AgentResult::success("late"))
            }),
        );

        let case = EvalCase::basic("slow", "hi").with_timeout_ms(20);
        assert_eq!(harness.timeout_for(&case), 20);
        let err = harness.execute(&case).await.unwrap_err();
        assert_eq!(err.to_string(), "Agent timed out after 20 ms");
        assert_eq!(harness.workspaces().active_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_agent_is_agent_error() {
        let base = TempDir::new().unwrap();
        let harness = harness(
            &base,
            FnAgent::new(|_prompt, _ctx| async move {
                if true {
                    panic!("agent bug");
                }
                Ok(AgentResult::success("unreachable"))
            }),
        );

        let err = harness.execute(&EvalCase::basic("p", "hi")).await.unwrap_err();
        assert!(err.to_string().contains("agent bug"));
    }

    #[tokio::test]
    async fn test_multi_turn_rejects_single_prompt() {
        let base = TempDir::new().unwrap();
        let harness = harness(
            &base,
            FnAgent::new(|_prompt, _ctx| async move { Ok(AgentResult::success("x")) }),
        );
        assert!(harness
            .execute_multi_turn(&EvalCase::basic("b", "hi"))
            .await
            .is_err());
    }
}
