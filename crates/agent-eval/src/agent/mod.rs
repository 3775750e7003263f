//! Agent contract
//!
//! The agent under test is an opaque async function: prompt and invocation
//! context in, [`AgentResult`] out. The core never inspects how the result
//! is produced.

mod command;
mod normalize;

pub use command::{AgentCommand, CommandAgent};
pub use normalize::normalize_agent_value;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::outcome::{ExecutionResult, ToolCallRecord, Usage};

/// Context handed to the agent for one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    /// Workspace the agent must operate in
    pub working_directory: PathBuf,
    pub eval_id: String,
    pub eval_name: String,
    /// Resolved timeout for this invocation
    pub timeout_ms: u64,
    /// Session id returned by the previous turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// What an agent reports back; optional fields are filled in by the harness
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub output: String,
    pub success: bool,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResult {
    /// A successful result with the given output
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            ..Default::default()
        }
    }

    /// A failed result carrying the agent's own error
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Add a tool call
    pub fn with_tool_call(mut self, call: ToolCallRecord) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Set the session id
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set usage
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Convert into the canonical execution result
    ///
    /// `measured_ms` and the context's working directory are used when the
    /// agent did not report them.
    pub fn into_execution(self, ctx: &AgentContext, measured_ms: u64) -> ExecutionResult {
        ExecutionResult {
            success: self.success,
            output: self.output,
            tool_calls: self.tool_calls,
            duration_ms: self.duration_ms.unwrap_or(measured_ms),
            error: self.error,
            session_id: self.session_id,
            usage: self.usage,
            working_directory: ctx.working_directory.clone(),
        }
    }
}

/// The agent under test
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run one prompt in the given context
    async fn invoke(&self, prompt: &str, ctx: &AgentContext) -> anyhow::Result<AgentResult>;
}

type BoxedAgentFuture = Pin<Box<dyn Future<Output = anyhow::Result<AgentResult>> + Send>>;

/// Agent backed by an async closure
pub struct FnAgent {
    func: Arc<dyn Fn(String, AgentContext) -> BoxedAgentFuture + Send + Sync>,
}

impl FnAgent {
    /// Wrap a closure taking owned prompt and context
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(String, AgentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<AgentResult>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |prompt, ctx| Box::pin(func(prompt, ctx))),
        }
    }
}

#[async_trait]
impl Agent for FnAgent {
    async fn invoke(&self, prompt: &str, ctx: &AgentContext) -> anyhow::Result<AgentResult> {
        (self.func)(prompt.to_string(), ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AgentContext {
        AgentContext {
            working_directory: PathBuf::from("/tmp/ws-1"),
            eval_id: "basic-001".into(),
            eval_name: "Basic".into(),
            timeout_ms: 1000,
            session_id: None,
        }
    }

    #[test]
    fn test_into_execution_fills_missing_fields() {
        let exec = AgentResult::success("done").into_execution(&ctx(), 37);
        assert_eq!(exec.duration_ms, 37);
        assert_eq!(exec.working_directory, PathBuf::from("/tmp/ws-1"));
        assert!(exec.success);
    }

    #[test]
    fn test_into_execution_keeps_reported_duration() {
        let mut result = AgentResult::success("done");
        result.duration_ms = Some(5);
        assert_eq!(result.into_execution(&ctx(), 37).duration_ms, 5);
    }

    #[tokio::test]
    async fn test_fn_agent() {
        let agent = FnAgent::new(|prompt, ctx| async move {
            Ok(AgentResult::success(format!("{} in {}", prompt, ctx.eval_id)))
        });

        let result = agent.invoke("hello", &ctx()).await.unwrap();
        assert_eq!(result.output, "hello in basic-001");
    }
}
