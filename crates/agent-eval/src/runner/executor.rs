//! Eval runner
//!
//! Schedules cases sequentially or in bounded concurrent batches, retries
//! unsuccessful attempts with exponential backoff and aggregates the suite.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;

use super::RunConfig;
use super::hooks::{HookPhase, SuiteHooks};
use crate::agent::Agent;
use crate::cases::{CaseFilter, CaseLoader, EvalCase};
use crate::error::EvalResult;
use crate::harness::{JudgedExecution, TestHarness};
use crate::judges::{JudgePanel, JudgeRegistry};
use crate::outcome::{CaseStatus, EvalCaseResult, EvalSuiteResult};
use crate::report;
use crate::workspace::WorkspaceManager;

/// Callback for progress updates during a run
pub type ProgressCallback = Box<dyn Fn(EvalProgress) + Send + Sync>;

/// Where in a case's lifecycle a progress update was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    CaseStarted,
    AttemptStarted,
    CaseCompleted(CaseStatus),
}

/// Progress update during a run
#[derive(Debug, Clone)]
pub struct EvalProgress {
    /// Case index in the run (0-based)
    pub current: usize,
    /// Total number of cases
    pub total: usize,
    pub case_id: String,
    pub case_name: String,
    /// Current attempt (1-based), 0 before the first attempt
    pub attempt: u32,
    pub max_attempts: u32,
    pub stage: ProgressStage,
    pub message: String,
}

/// Runs eval cases through the harness and judges
pub struct EvalRunner {
    config: RunConfig,
    agent: Arc<dyn Agent>,
    harness: TestHarness,
    registry: Arc<JudgeRegistry>,
    hooks: SuiteHooks,
    progress_callback: Option<ProgressCallback>,
}

impl EvalRunner {
    /// Create a runner with the default workspace manager
    pub fn new(config: RunConfig, agent: Arc<dyn Agent>, registry: Arc<JudgeRegistry>) -> Self {
        Self::with_workspaces(config, agent, registry, Arc::new(WorkspaceManager::new()))
    }

    /// Create a runner drawing workspaces from the given manager
    pub fn with_workspaces(
        config: RunConfig,
        agent: Arc<dyn Agent>,
        registry: Arc<JudgeRegistry>,
        workspaces: Arc<WorkspaceManager>,
    ) -> Self {
        let harness = TestHarness::new(Arc::clone(&agent), workspaces, config.harness_config());
        Self {
            config,
            agent,
            harness,
            registry,
            hooks: SuiteHooks::default(),
            progress_callback: None,
        }
    }

    /// Replace the workspace manager
    pub fn with_workspace_manager(mut self, workspaces: Arc<WorkspaceManager>) -> Self {
        self.harness = TestHarness::new(
            Arc::clone(&self.agent),
            workspaces,
            self.config.harness_config(),
        );
        self
    }

    /// Attach lifecycle hooks
    pub fn with_hooks(mut self, hooks: SuiteHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set progress callback
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress_callback = Some(callback);
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JudgeRegistry> {
        &self.registry
    }

    pub fn workspaces(&self) -> &Arc<WorkspaceManager> {
        self.harness.workspaces()
    }

    /// Load enabled cases passing the filter and run them
    pub async fn run_from_source(
        &self,
        loader: &CaseLoader,
        filter: &CaseFilter,
    ) -> EvalResult<EvalSuiteResult> {
        let cases = loader.load_filtered(filter)?;
        tracing::info!(
            count = cases.len(),
            dir = %loader.test_dir().display(),
            "Loaded eval cases"
        );
        self.run(cases).await
    }

    /// Run a set of cases
    ///
    /// Case-local failures are recorded in the result. Only setup and
    /// teardown hook failures return `Err`.
    pub async fn run(&self, cases: Vec<EvalCase>) -> EvalResult<EvalSuiteResult> {
        let start_time = Instant::now();
        let total = cases.len();

        self.hooks.run_suite(HookPhase::Setup).await?;

        let results = if self.config.parallel && total > 1 {
            let batch_size = self.config.effective_concurrency();
            let mut results = Vec::with_capacity(total);

            for (batch_index, batch) in cases.chunks(batch_size).enumerate() {
                tracing::debug!(batch = batch_index, size = batch.len(), "Running batch");
                let runs = batch.iter().enumerate().map(|(offset, case)| {
                    self.run_case_at(case, batch_index * batch_size + offset, total)
                });
                results.extend(join_all(runs).await);
            }

            results
        } else {
            let mut results = Vec::with_capacity(total);
            for (index, case) in cases.iter().enumerate() {
                results.push(self.run_case_at(case, index, total).await);
            }
            results
        };

        let teardown = self.hooks.run_suite(HookPhase::Teardown).await;

        if !self.config.preserve_workspaces {
            self.workspaces().cleanup_all().await;
        }

        teardown?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let suite = EvalSuiteResult::aggregate(results, duration_ms);

        tracing::info!(
            total = suite.total,
            passed = suite.passed,
            failed = suite.failed,
            errors = suite.errors,
            duration_ms,
            "Eval run complete"
        );

        if self.config.save_results {
            match report::save_results(&suite, &self.config.output_dir).await {
                Ok(path) => tracing::info!("Saved eval results to {:?}", path),
                Err(e) => tracing::warn!(error = %e, "Failed to save eval results"),
            }
        }

        Ok(suite)
    }

    /// Run one case with hooks and retries
    pub async fn run_case(&self, case: &EvalCase) -> EvalCaseResult {
        self.run_case_at(case, 0, 1).await
    }

    async fn run_case_at(&self, case: &EvalCase, index: usize, total: usize) -> EvalCaseResult {
        let started = Instant::now();
        let policy = self.config.retry_policy();
        let max_attempts = policy.max_attempts();

        let progress = |attempt: u32, stage: ProgressStage, message: String| EvalProgress {
            current: index,
            total,
            case_id: case.id.clone(),
            case_name: case.name.clone(),
            attempt,
            max_attempts,
            stage,
            message,
        };

        self.emit_progress(progress(0, ProgressStage::CaseStarted, format!("Starting {}", case.id)));

        if let Err(e) = self.hooks.run_case(HookPhase::BeforeEach, case).await {
            tracing::warn!(eval_id = %case.id, error = %e, "beforeEach hook failed, skipping case");
            let mut result = EvalCaseResult::errored(case.clone(), e.to_string(), 0);
            result.duration_ms = started.elapsed().as_millis() as u64;
            self.emit_progress(progress(
                0,
                ProgressStage::CaseCompleted(result.status()),
                e.to_string(),
            ));
            return result;
        }

        let panel = JudgePanel::resolve(&self.registry, &case.judges);

        let mut attempt = 0u32;
        let outcome = loop {
            self.emit_progress(progress(
                attempt + 1,
                ProgressStage::AttemptStarted,
                format!("Running attempt {}/{}", attempt + 1, max_attempts),
            ));

            let outcome = self.harness.execute_judged(case, &panel).await;
            let passed = matches!(&outcome, Ok(judged) if judged.passed());

            if passed || attempt + 1 >= max_attempts {
                break outcome;
            }

            let delay = policy.delay_for_attempt(attempt);
            match &outcome {
                Ok(_) => tracing::debug!(
                    eval_id = %case.id,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt unsuccessful, retrying"
                ),
                Err(e) => tracing::debug!(
                    eval_id = %case.id,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt errored, retrying"
                ),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        let mut result = match outcome {
            Ok(judged) => Self::case_result(case, judged, attempt),
            Err(e) => {
                tracing::error!(eval_id = %case.id, error = %e, "Eval case errored");
                EvalCaseResult::errored(case.clone(), e.to_string(), attempt)
            }
        };

        if let Err(e) = self.hooks.run_case(HookPhase::AfterEach, case).await {
            tracing::warn!(eval_id = %case.id, error = %e, "afterEach hook failed");
            result.success = false;
            result.error = Some(e.to_string());
        }

        result.duration_ms = started.elapsed().as_millis() as u64;

        self.emit_progress(progress(
            attempt + 1,
            ProgressStage::CaseCompleted(result.status()),
            format!("{} {:?}", case.id, result.status()),
        ));

        result
    }

    fn case_result(case: &EvalCase, judged: JudgedExecution, retry_count: u32) -> EvalCaseResult {
        EvalCaseResult {
            eval_case: case.clone(),
            success: judged.passed(),
            output: judged.execution.output.clone(),
            duration_ms: 0,
            judge_results: judged.judge_results,
            error: None,
            retry_count,
            execution: Some(judged.execution),
        }
    }

    /// Emit progress update
    fn emit_progress(&self, progress: EvalProgress) {
        if let Some(callback) = &self.progress_callback {
            callback(progress);
        }
    }
}
