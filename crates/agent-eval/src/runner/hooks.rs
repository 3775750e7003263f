//! Suite lifecycle hooks
//!
//! `setup`/`teardown` wrap the whole run; `beforeEach`/`afterEach` wrap every
//! case. Hooks are either closures ([`FnHook`]) or shell commands
//! ([`CommandHook`]).

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::cases::EvalCase;
use crate::error::{EvalError, EvalResult};

/// Point in the run lifecycle a hook is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Setup,
    Teardown,
    BeforeEach,
    AfterEach,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Setup => "setup",
            HookPhase::Teardown => "teardown",
            HookPhase::BeforeEach => "beforeEach",
            HookPhase::AfterEach => "afterEach",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a hook is told about the current lifecycle point
#[derive(Debug, Clone)]
pub struct HookContext {
    pub phase: HookPhase,
    /// Set for per-case hooks
    pub case_id: Option<String>,
    pub case_name: Option<String>,
}

impl HookContext {
    pub fn suite(phase: HookPhase) -> Self {
        Self {
            phase,
            case_id: None,
            case_name: None,
        }
    }

    pub fn for_case(phase: HookPhase, case: &EvalCase) -> Self {
        Self {
            phase,
            case_id: Some(case.id.clone()),
            case_name: Some(case.name.clone()),
        }
    }
}

/// A lifecycle hook
#[async_trait]
pub trait SuiteHook: Send + Sync {
    async fn run(&self, ctx: &HookContext) -> anyhow::Result<()>;
}

type BoxedHookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Hook backed by an async closure
pub struct FnHook {
    func: Arc<dyn Fn(HookContext) -> BoxedHookFuture + Send + Sync>,
}

impl FnHook {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |ctx| Box::pin(func(ctx))),
        }
    }
}

#[async_trait]
impl SuiteHook for FnHook {
    async fn run(&self, ctx: &HookContext) -> anyhow::Result<()> {
        (self.func)(ctx.clone()).await
    }
}

fn default_timeout() -> u64 {
    60
}

/// Shell command hook
///
/// Runs `sh -c <command>` with `EVAL_HOOK` and, for per-case hooks,
/// `EVAL_CASE_ID` set. Fails on non-zero exit or timeout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandHook {
    pub command: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl CommandHook {
    /// Create a new command hook
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout_secs: default_timeout(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    /// Set the timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Display for CommandHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)
    }
}

#[async_trait]
impl SuiteHook for CommandHook {
    async fn run(&self, ctx: &HookContext) -> anyhow::Result<()> {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .envs(&self.env)
            .env("EVAL_HOOK", ctx.phase.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(case_id) = &ctx.case_id {
            command.env("EVAL_CASE_ID", case_id);
        }
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .with_context(|| format!("Failed to spawn hook: {}", self.command))?;

        let output = match tokio::time::timeout(self.timeout(), child.wait_with_output()).await {
            Ok(output) => output.context("Failed to wait for hook")?,
            Err(_) => bail!("timed out after {} s", self.timeout_secs),
        };

        if !output.status.success() {
            bail!(
                "`{}` exited with code {:?}: {}",
                self.command,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

/// Command hooks as they appear in configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HooksConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<CommandHook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown: Option<CommandHook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_each: Option<CommandHook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_each: Option<CommandHook>,
}

impl HooksConfig {
    pub fn is_empty(&self) -> bool {
        self.setup.is_none()
            && self.teardown.is_none()
            && self.before_each.is_none()
            && self.after_each.is_none()
    }
}

/// Hooks attached to a run
#[derive(Clone, Default)]
pub struct SuiteHooks {
    setup: Option<Arc<dyn SuiteHook>>,
    teardown: Option<Arc<dyn SuiteHook>>,
    before_each: Option<Arc<dyn SuiteHook>>,
    after_each: Option<Arc<dyn SuiteHook>>,
}

impl SuiteHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks from configured commands
    pub fn from_config(config: &HooksConfig) -> Self {
        fn wrap(hook: &Option<CommandHook>) -> Option<Arc<dyn SuiteHook>> {
            hook.clone().map(|h| Arc::new(h) as Arc<dyn SuiteHook>)
        }

        Self {
            setup: wrap(&config.setup),
            teardown: wrap(&config.teardown),
            before_each: wrap(&config.before_each),
            after_each: wrap(&config.after_each),
        }
    }

    pub fn with_setup(mut self, hook: impl SuiteHook + 'static) -> Self {
        self.setup = Some(Arc::new(hook));
        self
    }

    pub fn with_teardown(mut self, hook: impl SuiteHook + 'static) -> Self {
        self.teardown = Some(Arc::new(hook));
        self
    }

    pub fn with_before_each(mut self, hook: impl SuiteHook + 'static) -> Self {
        self.before_each = Some(Arc::new(hook));
        self
    }

    pub fn with_after_each(mut self, hook: impl SuiteHook + 'static) -> Self {
        self.after_each = Some(Arc::new(hook));
        self
    }

    fn hook(&self, phase: HookPhase) -> Option<&Arc<dyn SuiteHook>> {
        match phase {
            HookPhase::Setup => self.setup.as_ref(),
            HookPhase::Teardown => self.teardown.as_ref(),
            HookPhase::BeforeEach => self.before_each.as_ref(),
            HookPhase::AfterEach => self.after_each.as_ref(),
        }
    }

    /// Run the hook for a suite-level phase, if any
    pub async fn run_suite(&self, phase: HookPhase) -> EvalResult<()> {
        self.run_with(HookContext::suite(phase)).await
    }

    /// Run the hook for a per-case phase, if any
    pub async fn run_case(&self, phase: HookPhase, case: &EvalCase) -> EvalResult<()> {
        self.run_with(HookContext::for_case(phase, case)).await
    }

    async fn run_with(&self, ctx: HookContext) -> EvalResult<()> {
        let Some(hook) = self.hook(ctx.phase) else {
            return Ok(());
        };

        tracing::debug!(phase = %ctx.phase, case_id = ?ctx.case_id, "Running hook");
        hook.run(&ctx)
            .await
            .map_err(|e| EvalError::hook(ctx.phase.as_str(), format!("{:#}", e)))
    }
}

impl fmt::Debug for SuiteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteHooks")
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .field("before_each", &self.before_each.is_some())
            .field("after_each", &self.after_each.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_command_hook_defaults() {
        let hook: CommandHook = serde_yaml::from_str("command: echo hi").unwrap();
        assert_eq!(hook.timeout_secs, 60);
        assert_eq!(hook.timeout(), Duration::from_secs(60));
        assert_eq!(hook.to_string(), "echo hi");
    }

    #[tokio::test]
    async fn test_fn_hook_and_missing_phase() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hooks = SuiteHooks::new().with_before_each(FnHook::new(move |ctx| {
            let counter = Arc::clone(&counter);
            async move {
                assert_eq!(ctx.case_id.as_deref(), Some("b1"));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        let case = EvalCase::basic("b1", "hi");
        hooks.run_case(HookPhase::BeforeEach, &case).await.unwrap();
        hooks.run_suite(HookPhase::Setup).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fn_hook_error_maps_to_hook_error() {
        let hooks = SuiteHooks::new()
            .with_setup(FnHook::new(|_ctx| async move { Err(anyhow::anyhow!("db down")) }));
        let err = hooks.run_suite(HookPhase::Setup).await.unwrap_err();
        assert_eq!(err.to_string(), "setup hook failed: db down");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_hook_env_and_exit_code() {
        let ok = CommandHook::new(r#"test "$EVAL_HOOK" = afterEach && test "$EVAL_CASE_ID" = c1"#);
        let case = EvalCase::basic("c1", "hi");
        ok.run(&HookContext::for_case(HookPhase::AfterEach, &case))
            .await
            .unwrap();

        let failing = CommandHook::new("echo broken >&2; exit 4");
        let err = failing
            .run(&HookContext::suite(HookPhase::Teardown))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_hook_timeout() {
        let hook = CommandHook::new("sleep 5").with_timeout(0);
        let err = hook
            .run(&HookContext::suite(HookPhase::Setup))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
