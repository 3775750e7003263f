//! Canonical agent execution outcome

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One tool invocation reported by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    /// Tool name
    pub name: String,

    /// Input passed to the tool
    #[serde(default)]
    pub input: serde_json::Value,

    /// Output returned by the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Whether the tool reported an error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallRecord {
    /// Create a tool call record
    pub fn new(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            input,
            output: None,
            is_error: None,
        }
    }

    /// Set the tool output
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Mark the call as failed
    pub fn failed(mut self) -> Self {
        self.is_error = Some(true);
        self
    }
}

/// Token usage and cost reported by the agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,

    #[serde(default)]
    pub output_tokens: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

impl Usage {
    /// Total tokens used (input + output)
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Sum two usage records; cost is known if either side knows it
    pub fn merge(self, other: Usage) -> Usage {
        let cost_usd = match (self.cost_usd, other.cost_usd) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
        };
        Usage {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            cost_usd,
        }
    }
}

/// Result of one agent invocation (or one aggregated turn sequence)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Whether the agent reported success
    pub success: bool,

    /// Final text output
    pub output: String,

    /// Tool calls in invocation order
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// Error reported by the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Continuity token for the next turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Token usage and cost
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Directory the agent ran in
    pub working_directory: PathBuf,
}

impl ExecutionResult {
    /// Number of calls made to the named tool
    pub fn tool_call_count(&self, tool_name: &str) -> usize {
        self.tool_calls.iter().filter(|c| c.name == tool_name).count()
    }

    /// Fold an ordered sequence of turn results into one outcome
    ///
    /// Success requires every turn to succeed. Outputs are joined by a blank
    /// line, tool calls concatenated, durations and usage summed. Session id
    /// and error come from the last turn.
    pub fn aggregate_turns(turns: &[ExecutionResult]) -> Option<ExecutionResult> {
        let last = turns.last()?;

        let usage = turns
            .iter()
            .filter_map(|t| t.usage)
            .reduce(Usage::merge);

        Some(ExecutionResult {
            success: turns.iter().all(|t| t.success),
            output: turns
                .iter()
                .map(|t| t.output.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            tool_calls: turns.iter().flat_map(|t| t.tool_calls.clone()).collect(),
            duration_ms: turns.iter().map(|t| t.duration_ms).sum(),
            error: last.error.clone(),
            session_id: last.session_id.clone(),
            usage,
            working_directory: last.working_directory.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(output: &str, session: &str, success: bool) -> ExecutionResult {
        ExecutionResult {
            success,
            output: output.to_string(),
            tool_calls: vec![ToolCallRecord::new("Read", serde_json::json!({"path": output}))],
            duration_ms: 10,
            error: None,
            session_id: Some(session.to_string()),
            usage: Some(Usage {
                input_tokens: 100,
                output_tokens: 20,
                cost_usd: None,
            }),
            working_directory: PathBuf::from("/tmp/ws"),
        }
    }

    #[test]
    fn test_aggregate_turns() {
        let turns = vec![turn("one", "s1", true), turn("two", "s2", true)];
        let agg = ExecutionResult::aggregate_turns(&turns).unwrap();

        assert!(agg.success);
        assert_eq!(agg.output, "one\n\ntwo");
        assert_eq!(agg.tool_calls.len(), 2);
        assert_eq!(agg.duration_ms, 20);
        assert_eq!(agg.session_id.as_deref(), Some("s2"));
        assert_eq!(agg.usage.unwrap().total_tokens(), 240);
        assert_eq!(agg.tool_call_count("Read"), 2);
    }

    #[test]
    fn test_aggregate_turns_any_failure_fails() {
        let turns = vec![turn("one", "s1", true), turn("two", "s2", false)];
        assert!(!ExecutionResult::aggregate_turns(&turns).unwrap().success);
        assert!(ExecutionResult::aggregate_turns(&[]).is_none());
    }

    #[test]
    fn test_aggregate_error_comes_from_last_turn() {
        let mut first = turn("one", "s1", false);
        first.error = Some("first turn failed".into());
        let turns = vec![first, turn("two", "s2", true)];

        let agg = ExecutionResult::aggregate_turns(&turns).unwrap();
        assert!(!agg.success);
        assert_eq!(agg.error, None);

        let mut last = turn("three", "s3", false);
        last.error = Some("last turn failed".into());
        let turns = vec![turn("one", "s1", true), last];
        let agg = ExecutionResult::aggregate_turns(&turns).unwrap();
        assert_eq!(agg.error.as_deref(), Some("last turn failed"));
    }

    #[test]
    fn test_usage_merge_cost() {
        let a = Usage {
            input_tokens: 1,
            output_tokens: 1,
            cost_usd: Some(0.5),
        };
        let b = Usage::default();
        assert_eq!(a.merge(b).cost_usd, Some(0.5));
        assert_eq!(b.merge(b).cost_usd, None);
    }
}
