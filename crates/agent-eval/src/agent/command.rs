//! Agent backed by an external process
//!
//! The process receives one JSON request on stdin:
//! `{"prompt": "...", "context": {"workingDirectory": "...", ...}}`
//! and prints its result as a JSON object on stdout. The last stdout line
//! that parses as a JSON object wins, so agents may log freely before it.

use std::collections::HashMap;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Agent, AgentContext, AgentResult, normalize_agent_value};

/// Command line of an external agent or grader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl AgentCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// Add an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run the command with `request` on stdin and return the parsed JSON reply
    pub async fn exchange(
        &self,
        request: &serde_json::Value,
        current_dir: &std::path::Path,
    ) -> Result<serde_json::Value> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .envs(&self.env)
            .current_dir(current_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(request)?;
            stdin
                .write_all(&payload)
                .await
                .context("Failed to write request to stdin")?;
            // Close stdin so the process sees EOF
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("Failed to wait for {}", self.command))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply = stdout
            .lines()
            .rev()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line.trim()).ok())
            .find(|value| value.is_object());

        match reply {
            Some(value) => {
                if !output.status.success() {
                    tracing::debug!(
                        command = %self.command,
                        status = ?output.status.code(),
                        "Process exited unsuccessfully but produced a result"
                    );
                }
                Ok(value)
            }
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!(
                    "{} exited with code {:?} without a JSON result; stderr: {}",
                    self.command,
                    output.status.code(),
                    stderr.trim()
                )
            }
        }
    }
}

impl std::fmt::Display for AgentCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Agent that runs an external process per invocation
pub struct CommandAgent {
    command: AgentCommand,
}

impl CommandAgent {
    pub fn new(command: AgentCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Agent for CommandAgent {
    async fn invoke(&self, prompt: &str, ctx: &AgentContext) -> Result<AgentResult> {
        tracing::debug!(
            eval_id = %ctx.eval_id,
            command = %self.command,
            "Invoking command agent"
        );

        let request = serde_json::json!({
            "prompt": prompt,
            "context": ctx,
        });

        let reply = self
            .command
            .exchange(&request, &ctx.working_directory)
            .await?;

        Ok(normalize_agent_value(reply))
    }
}
