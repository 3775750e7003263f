//! End-to-end runner tests
//!
//! Drive `EvalRunner` with in-process agents over a temporary workspace root.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use agent_eval::{
    AgentResult, CaseFilter, CaseLoader, CaseStatus, EvalCase, EvalError, EvalRunner, FnAgent,
    FnHook, JudgeRegistry, RunConfig, SuiteHooks, WorkspaceManager,
};
use parking_lot::Mutex;
use tempfile::TempDir;

fn manager(base: &TempDir) -> Arc<WorkspaceManager> {
    Arc::new(WorkspaceManager::with_base_dir(base.path()).with_install(None))
}

fn runner(config: RunConfig, agent: FnAgent, workspaces: Arc<WorkspaceManager>) -> EvalRunner {
    EvalRunner::with_workspaces(
        config.with_save_results(false),
        Arc::new(agent),
        Arc::new(JudgeRegistry::with_builtins()),
        workspaces,
    )
}

fn residual_dirs(base: &TempDir) -> usize {
    std::fs::read_dir(base.path()).unwrap().count()
}

#[tokio::test]
async fn test_failing_case_retries_with_backoff() {
    let base = TempDir::new().unwrap();
    let calls = Arc::new(Mutex::new(Vec::<Instant>::new()));
    let sink = Arc::clone(&calls);

    let runner = runner(
        RunConfig::default().with_retries(3, 10, 2.0),
        FnAgent::new(move |_prompt, _ctx| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(Instant::now());
                Ok(AgentResult::failure("nope"))
            }
        }),
        manager(&base),
    );

    let suite = runner.run(vec![EvalCase::basic("flaky", "hi")]).await.unwrap();

    let calls = calls.lock();
    assert_eq!(calls.len(), 4);
    for (gap, expected) in calls.windows(2).zip([10u64, 20, 40]) {
        assert!(gap[1] - gap[0] >= Duration::from_millis(expected));
    }

    let result = &suite.results[0];
    assert_eq!(result.status(), CaseStatus::Failed);
    assert_eq!(result.retry_count, 3);
    assert_eq!(suite.failed, 1);
}

#[tokio::test]
async fn test_retry_count_reflects_successful_attempt() {
    let base = TempDir::new().unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let runner = runner(
        RunConfig::default().with_retries(4, 1, 1.0),
        FnAgent::new(move |_prompt, _ctx| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    anyhow::bail!("transient failure {}", attempt);
                }
                Ok(AgentResult::success("done"))
            }
        }),
        manager(&base),
    );

    let suite = runner.run(vec![EvalCase::basic("third-time", "go")]).await.unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(suite.results[0].status(), CaseStatus::Passed);
    assert_eq!(suite.results[0].retry_count, 2);
    assert_eq!(suite.passed, 1);
}

#[tokio::test]
async fn test_parallel_batches_bound_concurrency() {
    let base = TempDir::new().unwrap();
    let workspaces = manager(&base);
    let peak = Arc::new(AtomicUsize::new(0));

    let observed = Arc::clone(&workspaces);
    let peak_sink = Arc::clone(&peak);
    let runner = runner(
        RunConfig::default().with_retries(0, 0, 1.0).with_parallel(2),
        FnAgent::new(move |prompt, _ctx| {
            let observed = Arc::clone(&observed);
            let peak_sink = Arc::clone(&peak_sink);
            async move {
                peak_sink.fetch_max(observed.active_count(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                peak_sink.fetch_max(observed.active_count(), Ordering::SeqCst);
                Ok(AgentResult::success(prompt))
            }
        }),
        Arc::clone(&workspaces),
    );

    let cases: Vec<_> = (0..5)
        .map(|i| EvalCase::basic(format!("case-{}", i), format!("prompt {}", i)))
        .collect();
    let suite = runner.run(cases).await.unwrap();

    assert_eq!(suite.total, 5);
    assert_eq!(suite.passed, 5);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(peak.load(Ordering::SeqCst) >= 1);

    let ids: Vec<_> = suite.results.iter().map(|r| r.eval_case.id.as_str()).collect();
    assert_eq!(ids, vec!["case-0", "case-1", "case-2", "case-3", "case-4"]);

    assert_eq!(workspaces.active_count(), 0);
    assert_eq!(residual_dirs(&base), 0);
}

#[tokio::test]
async fn test_preserved_workspaces_survive_run() {
    let base = TempDir::new().unwrap();
    let workspaces = manager(&base);
    let runner = runner(
        RunConfig::default()
            .with_retries(0, 0, 1.0)
            .with_preserve_workspaces(true),
        FnAgent::new(|_prompt, _ctx| async move { Ok(AgentResult::success("ok")) }),
        Arc::clone(&workspaces),
    );

    runner
        .run(vec![EvalCase::basic("a", "x"), EvalCase::basic("b", "y")])
        .await
        .unwrap();

    assert_eq!(residual_dirs(&base), 2);
}

#[tokio::test]
async fn test_timeout_is_errored_and_agent_keeps_running() {
    let base = TempDir::new().unwrap();
    let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = Arc::clone(&finished);

    let runner = runner(
        RunConfig::default().with_retries(0, 0, 1.0),
        FnAgent::new(move |_prompt, _ctx| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(AgentResult::success("late"))
            }
        }),
        manager(&base),
    );

    let case = EvalCase::basic("slow", "take your time").with_timeout_ms(20);
    let suite = runner.run(vec![case]).await.unwrap();

    let result = &suite.results[0];
    assert_eq!(result.status(), CaseStatus::Errored);
    assert_eq!(result.error.as_deref(), Some("Agent timed out after 20 ms"));
    assert_eq!(suite.errors, 1);
    assert!(!finished.load(Ordering::SeqCst));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_setup_failure_aborts_run() {
    let base = TempDir::new().unwrap();
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);

    let runner = runner(
        RunConfig::default(),
        FnAgent::new(move |_prompt, _ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(AgentResult::success("ok")) }
        }),
        manager(&base),
    )
    .with_hooks(SuiteHooks::new().with_setup(FnHook::new(|_ctx| async move {
        Err(anyhow::anyhow!("database unavailable"))
    })));

    let err = runner.run(vec![EvalCase::basic("a", "x")]).await.unwrap_err();
    match err {
        EvalError::Hook { phase, message } => {
            assert_eq!(phase, "setup");
            assert!(message.contains("database unavailable"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_before_each_failure_errors_only_that_case() {
    let base = TempDir::new().unwrap();
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);

    let runner = runner(
        RunConfig::default().with_retries(0, 0, 1.0),
        FnAgent::new(move |_prompt, _ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(AgentResult::success("ok")) }
        }),
        manager(&base),
    )
    .with_hooks(SuiteHooks::new().with_before_each(FnHook::new(|ctx| async move {
        if ctx.case_id.as_deref() == Some("blocked") {
            anyhow::bail!("fixture missing");
        }
        Ok(())
    })));

    let suite = runner
        .run(vec![EvalCase::basic("blocked", "x"), EvalCase::basic("open", "y")])
        .await
        .unwrap();

    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    assert_eq!(suite.results[0].status(), CaseStatus::Errored);
    assert!(suite.results[0].error.as_deref().unwrap().contains("fixture missing"));
    assert_eq!(suite.results[1].status(), CaseStatus::Passed);
}

#[tokio::test]
async fn test_after_each_failure_keeps_judge_results() {
    let base = TempDir::new().unwrap();
    let runner = runner(
        RunConfig::default().with_retries(0, 0, 1.0),
        FnAgent::new(|_prompt, _ctx| async move { Ok(AgentResult::success("hello")) }),
        manager(&base),
    )
    .with_hooks(SuiteHooks::new().with_after_each(FnHook::new(|_ctx| async move {
        Err(anyhow::anyhow!("cleanup script failed"))
    })));

    let case = EvalCase::new(
        "greet",
        "Greet",
        agent_eval::CaseKind::Basic {
            prompt: "say hello".into(),
            expected_patterns: vec!["hello".into()],
            forbidden_patterns: Vec::new(),
        },
    )
    .with_judge("pattern-match");

    let suite = runner.run(vec![case]).await.unwrap();
    let result = &suite.results[0];
    assert_eq!(result.status(), CaseStatus::Errored);
    assert!(!result.success);
    assert_eq!(result.judge_results.len(), 1);
    assert!(result.judge_results[0].passed);
}

#[tokio::test]
async fn test_teardown_failure_still_cleans_up() {
    let base = TempDir::new().unwrap();
    let runner = runner(
        RunConfig::default().with_retries(0, 0, 1.0),
        FnAgent::new(|_prompt, _ctx| async move { Ok(AgentResult::success("ok")) }),
        manager(&base),
    )
    .with_hooks(SuiteHooks::new().with_teardown(FnHook::new(|_ctx| async move {
        Err(anyhow::anyhow!("teardown broke"))
    })));

    let err = runner.run(vec![EvalCase::basic("a", "x")]).await.unwrap_err();
    assert!(matches!(err, EvalError::Hook { ref phase, .. } if phase == "teardown"));
    assert_eq!(residual_dirs(&base), 0);
}

#[tokio::test]
async fn test_run_from_source_applies_filter_and_enablement() {
    let base = TempDir::new().unwrap();
    let cases_dir = TempDir::new().unwrap();
    std::fs::write(
        cases_dir.path().join("suite.yaml"),
        r#"
- id: tool-001
  name: Reads files
  category: tool
  prompt: Read the readme
  expectedToolCalls:
    - toolName: Read
      minCalls: 3
  judges: [tool-calls]
  tags: [smoke]
- id: basic-001
  name: Greets
  category: basic
  prompt: hello
  tags: [smoke]
  enabled: false
- id: basic-002
  name: Untagged
  category: basic
  prompt: hello
"#,
    )
    .unwrap();

    let runner = runner(
        RunConfig::default().with_retries(0, 0, 1.0),
        FnAgent::new(|_prompt, _ctx| async move {
            Ok(AgentResult::success("read it").with_tool_call(agent_eval::ToolCallRecord::new(
                "Read",
                serde_json::json!({ "path": "README.md" }),
            )))
        }),
        manager(&base),
    );

    let suite = runner
        .run_from_source(
            &CaseLoader::new(cases_dir.path()),
            &CaseFilter::default().with_tags(vec!["smoke".into()]),
        )
        .await
        .unwrap();

    assert_eq!(suite.total, 1);
    let result = &suite.results[0];
    assert_eq!(result.eval_case.id, "tool-001");
    assert_eq!(result.status(), CaseStatus::Failed);
    assert!(
        result.judge_results[0]
            .reasoning
            .contains("Read: Expected at least 3 call(s), got 1")
    );
}
